//! A small no-std scanner for the structure of GIF files.
//!
//! `gifscan` takes a fully buffered GIF and pulls out its logical screen descriptor, the global
//! color table, the Netscape loop count and, for every frame, the graphic control extension, the
//! image placement and the first block of compressed pixel data. It never decompresses LZW data;
//! frame payloads are handed out as owned bytes so they outlive the input buffer.
//!
//! Dimensions and colors use [`embedded_graphics`] types so a scanned file slots into an
//! embedded-graphics pipeline.
//!
//! ```
//! let gif: &[u8] = &[
//!     b'G', b'I', b'F', b'8', b'9', b'a', 2, 0, 1, 0, 0x80, 0, 0, // header, 2 color table
//!     0, 0, 0, 255, 255, 255, // palette
//!     0x21, 0xf9, 4, 0, 10, 0, 0, 0, // graphic control, 10cs delay
//!     0x2c, 0, 0, 0, 0, 2, 0, 1, 0, 0, 2, 2, 0x44, 0x01, 0, // image, 2x1
//!     0x3b,
//! ];
//!
//! let parsed = gifscan::parse_gif(gif).unwrap();
//! assert_eq!((parsed.width(), parsed.height()), (2, 1));
//! assert_eq!(parsed.loop_count(), 1);
//! assert_eq!(parsed.frames()[0].delay_ms(), 100);
//! assert_eq!(parsed.frames()[0].data(), &[0x44, 0x01]);
//! ```
//!
//! Broken frames do not fail the parse; they are dropped and reported through
//! [`ParsedGif::diagnostics`]. Only a bad header or a buffer too short for the screen descriptor
//! and color table is an error.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

use alloc::vec::Vec;
use embedded_graphics::prelude::*;
use tracing::debug;

mod common;
mod extension;
mod frame;
mod header;
mod options;
mod reader;
#[cfg(test)]
mod test_utils;

pub use common::{DescriptorDefect, Diagnostic, GceDefect, ParseError};
pub use extension::{loop_count, DisposalMethod, GraphicsControl, DEFAULT_LOOP_COUNT};
pub use frame::{Frame, FrameScanner};
pub use header::{check_header, check_version, ColorTable, Field, LogicalScreenDescriptor, Version};
pub use options::{CursorMode, DecodeOptions};
pub use reader::ByteReader;

/// Scans `bytes` with the default [`DecodeOptions`].
pub fn parse_gif(bytes: &[u8]) -> Result<ParsedGif, ParseError> {
    DecodeOptions::new().parse(bytes)
}

/// Everything the scanner extracted from one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGif {
    descriptor: LogicalScreenDescriptor,
    global_table: ColorTable,
    loop_count: u8,
    frames: Vec<Frame>,
    diagnostics: Vec<Diagnostic>,
}

impl ParsedGif {
    pub(crate) fn parse_with(bytes: &[u8], options: &DecodeOptions) -> Result<Self, ParseError> {
        let mut reader = ByteReader::from_slice(bytes);
        let descriptor = LogicalScreenDescriptor::parser(&mut reader)?;
        let global_table = ColorTable::global(&descriptor, &mut reader)?;
        let loop_count = loop_count(bytes);

        let mode = options.get_cursor_mode();
        let scanner = FrameScanner::new(bytes, &global_table, mode.scan_start(&descriptor), mode);
        let mut frames = Vec::new();
        let mut diagnostics = Vec::new();
        for item in scanner {
            match item {
                Ok(frame) => frames.push(frame),
                Err(diagnostic) => diagnostics.push(diagnostic),
            }
        }

        debug!(
            width = descriptor.width(),
            height = descriptor.height(),
            colors = global_table.len(),
            loop_count,
            frames = frames.len(),
            dropped = diagnostics.len(),
            "scanned gif"
        );

        Ok(Self {
            descriptor,
            global_table,
            loop_count,
            frames,
            diagnostics,
        })
    }

    pub fn descriptor(&self) -> &LogicalScreenDescriptor {
        &self.descriptor
    }

    pub fn width(&self) -> u16 {
        self.descriptor.width()
    }

    pub fn height(&self) -> u16 {
        self.descriptor.height()
    }

    /// Netscape loop count, [`DEFAULT_LOOP_COUNT`] when the file has none. Zero means forever.
    pub fn loop_count(&self) -> u8 {
        self.loop_count
    }

    /// Empty when the file has no global color table.
    pub fn global_color_table(&self) -> &ColorTable {
        &self.global_table
    }

    /// Frames in file order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn num_images(&self) -> usize {
        self.frames.len()
    }

    /// Frame-local errors in scan order, one per dropped frame.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl OriginDimensions for ParsedGif {
    fn size(&self) -> Size {
        Size::new(self.width() as u32, self.height() as u32)
    }
}

#[cfg(test)]
mod tests {
    use std::{borrow::Cow, io::Cursor, vec::Vec};

    use assert_matches::assert_matches;
    use embedded_graphics::{
        pixelcolor::Rgb888,
        prelude::{OriginDimensions, RgbColor},
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::test_utils::GifBuilder;

    const PALETTE: [[u8; 3]; 4] = [[0, 0, 0], [255, 255, 255], [200, 16, 16], [16, 16, 200]];

    fn animation() -> Vec<u8> {
        GifBuilder::new(32, 24, 0x91)
            .palette(&PALETTE)
            .netscape_loop(5)
            .graphic_control(4, 0b0000_0100, 10, 0)
            .image(0, 0, 32, 24, 0, &[1, 2, 3, 4])
            .graphic_control(4, 0b0000_1001, 20, 3)
            .image(8, 4, 16, 16, 0, &[5, 6, 7, 8, 9, 10, 11, 12, 13, 14])
            .build()
    }

    /// Encodes a three frame animation with the reference encoder.
    fn encode_with_gif_crate(repeat: Option<gif::Repeat>) -> Vec<u8> {
        let palette: Vec<u8> = PALETTE.iter().flatten().copied().collect();
        let mut out: Vec<u8> = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut out, 6, 4, &palette).unwrap();
            if let Some(repeat) = repeat {
                encoder.set_repeat(repeat).unwrap();
            }
            for (i, delay) in [10u16, 25, 40].into_iter().enumerate() {
                let mut frame = gif::Frame::default();
                frame.left = i as u16;
                frame.top = 1;
                frame.width = 3;
                frame.height = 2;
                frame.delay = delay;
                frame.buffer = Cow::Owned(vec![i as u8 % 4; 6]);
                encoder.write_frame(&frame).unwrap();
            }
        }
        out
    }

    #[test]
    fn parses_animation() {
        let parsed = parse_gif(&animation()).unwrap();

        assert_eq!(parsed.width(), 32);
        assert_eq!(parsed.height(), 24);
        assert_eq!(parsed.size(), Size::new(32, 24));
        assert_eq!(parsed.loop_count(), 5);
        assert_eq!(parsed.descriptor().bit_depth(), 2);
        assert_eq!(parsed.global_color_table().len(), 4);
        assert_eq!(parsed.global_color_table().get(1), Some(Rgb888::new(255, 255, 255)));
        assert!(parsed.diagnostics().is_empty());

        assert_eq!(parsed.num_images(), 2);
        let [first, second] = parsed.frames() else {
            panic!("expected two frames");
        };
        assert_eq!(first.control().disposal_method(), Some(DisposalMethod::DoNotDispose));
        assert_eq!(first.data(), &[1, 2, 3, 4]);
        assert_eq!(second.origin(), Point::new(8, 4));
        assert_eq!(second.img_size(), Size::new(16, 16));
        assert_eq!(second.data_size(), 10);
        assert_eq!(second.transparent_color(), Some(Rgb888::new(16, 16, 200)));
    }

    #[rstest]
    #[case(CursorMode::Corrected)]
    #[case(CursorMode::Legacy)]
    fn both_cursor_modes_agree_on_clean_files(#[case] mode: CursorMode) {
        let options = DecodeOptions::new().cursor_mode(mode);
        assert_eq!(options.parse(&animation()), parse_gif(&animation()));
    }

    #[rstest]
    #[case(b"GIF87a")]
    #[case(b"GIF89a")]
    fn accepts_both_versions(#[case] header: &[u8; 6]) {
        let gif = GifBuilder::with_header(*header, 1, 1, 0).build();
        let parsed = parse_gif(&gif).unwrap();
        assert_eq!(parsed.num_images(), 0);
        assert_eq!(parsed.loop_count(), DEFAULT_LOOP_COUNT);
    }

    #[test]
    fn rejects_bad_headers() {
        let gif = GifBuilder::with_header(*b"GIF\x00\x00\x00", 1, 1, 0).build();
        assert_eq!(parse_gif(&gif), Err(ParseError::UnsupportedVersion));

        let gif = GifBuilder::with_header(*b"BMP89a", 1, 1, 0).build();
        assert_eq!(parse_gif(&gif), Err(ParseError::InvalidSignature));
    }

    #[rstest]
    #[case(b"")]
    #[case(b"GIF")]
    #[case(b"GIF89a")]
    #[case(b"GIF89a\x10\x00\x10\x00\x00\x00")]
    fn short_buffers_are_truncated(#[case] bytes: &[u8]) {
        assert_matches!(parse_gif(bytes), Err(ParseError::TruncatedBuffer { .. }));
    }

    #[test]
    fn missing_color_table_bytes_are_truncated() {
        let gif = GifBuilder::new(4, 4, 0x82).palette(&PALETTE).into_bytes();
        assert_matches!(
            parse_gif(&gif),
            Err(ParseError::TruncatedBuffer {
                offset: 13,
                needed: 24,
                len: 25
            })
        );
    }

    #[test]
    fn empty_animation_is_not_an_error() {
        let gif = GifBuilder::new(4, 4, 0x81).palette(&PALETTE).build();
        let parsed = parse_gif(&gif).unwrap();
        assert!(parsed.frames().is_empty());
        assert!(parsed.diagnostics().is_empty());
    }

    #[test]
    fn dropped_frames_are_reported_and_scan_continues() {
        let gif = GifBuilder::new(8, 8, 0x81)
            .palette(&PALETTE)
            .graphic_control(0, 0, 0, 0)
            .image(0, 0, 1, 1, 0, &[1])
            .graphic_control(4, 0, 5, 0)
            .raw(&[0x00])
            .graphic_control(4, 0, 7, 1)
            .image(0, 0, 1, 1, 0, &[2])
            .build();

        let parsed = parse_gif(&gif).unwrap();

        assert_eq!(parsed.num_images(), 1);
        assert_eq!(parsed.frames()[0].control().delay_cs(), 7);
        let errors: Vec<&ParseError> = parsed.diagnostics().iter().map(|d| &d.error).collect();
        assert_eq!(
            errors,
            [
                &ParseError::MalformedGce(GceDefect::EmptyBlock),
                &ParseError::MalformedImageDescriptor(DescriptorDefect::MissingSeparator(0)),
            ]
        );
    }

    #[test]
    fn parsing_is_repeatable_and_outlives_input() {
        let bytes = animation();
        let first = parse_gif(&bytes).unwrap();
        let second = parse_gif(&bytes).unwrap();
        drop(bytes);

        assert_eq!(first, second);
        assert_eq!(first.frames()[0].data(), &[1, 2, 3, 4]);
    }

    #[test]
    fn matches_reference_decoder() {
        let bytes = encode_with_gif_crate(Some(gif::Repeat::Finite(5)));
        let parsed = parse_gif(&bytes).unwrap();

        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::Indexed);
        let mut golden = options.read_info(Cursor::new(&bytes)).unwrap();

        assert_eq!(parsed.width(), golden.width());
        assert_eq!(parsed.height(), golden.height());
        let palette: Vec<u8> = parsed
            .global_color_table()
            .iter()
            .flat_map(|c| [c.r(), c.g(), c.b()])
            .collect();
        assert_eq!(Some(palette.as_slice()), golden.global_palette());
        assert_eq!(parsed.loop_count(), 5);
        assert!(parsed.diagnostics().is_empty());

        let mut frames = parsed.frames().iter();
        while let Some(expected) = golden.read_next_frame().unwrap() {
            let frame = frames.next().expect("scanner missed a frame");
            assert_eq!(frame.control().delay_cs(), expected.delay);
            assert_eq!(frame.origin(), Point::new(expected.left as i32, expected.top as i32));
            assert_eq!(
                frame.img_size(),
                Size::new(expected.width as u32, expected.height as u32)
            );
            assert!(frame.data_size() > 0);
        }
        assert!(frames.next().is_none());
    }

    #[test]
    fn reference_file_without_repeat_uses_default_loop_count() {
        let bytes = encode_with_gif_crate(None);
        let parsed = parse_gif(&bytes).unwrap();

        assert_eq!(parsed.loop_count(), DEFAULT_LOOP_COUNT);
        assert_eq!(parsed.num_images(), 3);
        assert!(parsed.diagnostics().is_empty());
    }
}

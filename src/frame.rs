use alloc::vec::Vec;
use core::ops::BitAnd;

use embedded_graphics::{pixelcolor::Rgb888, prelude::*, primitives::Rectangle};
use tracing::{debug, trace, warn};

use crate::{
    common::{Block, DescriptorDefect, Diagnostic, ParseError, GCE_MARKER},
    extension::GraphicsControl,
    header::ColorTable,
    options::CursorMode,
    reader::ByteReader,
};

const LOCAL_COLOR_TABLE_FLAG: u8 = 0x80;
const INTERLACE_FLAG: u8 = 0x40;
const LOCAL_COLOR_TABLE_SIZE_MASK: u8 = 0x07;

/// Geometry and flags of an image descriptor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    origin: Point,
    size: Size,
    interlaced: bool,
    local_color_table: bool,
    lzw_min_code_size: u8,
}

impl ImageDescriptor {
    /// Reads the descriptor under the cursor up to and including the LZW minimum code size,
    /// stepping over a local color table if the flags announce one.
    pub fn parser(bytes: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        let separator = bytes.take_byte()?;
        if separator != Block::Image as u8 {
            return Err(ParseError::MalformedImageDescriptor(
                DescriptorDefect::MissingSeparator(separator),
            ));
        }

        let left = bytes.take_u16_le()? as i32;
        let top = bytes.take_u16_le()? as i32;
        let width = bytes.take_u16_le()? as u32;
        let height = bytes.take_u16_le()? as u32;

        let flags = bytes.take_byte()?;
        let local_color_table = flags.bitand(LOCAL_COLOR_TABLE_FLAG).eq(&LOCAL_COLOR_TABLE_FLAG);
        if local_color_table {
            let entries = 1usize << (flags.bitand(LOCAL_COLOR_TABLE_SIZE_MASK) + 1);
            bytes.seek_by(3 * entries)?;
        }
        let lzw_min_code_size = bytes.take_byte()?;

        Ok(Self {
            origin: Point::new(left, top),
            size: Size::new(width, height),
            interlaced: flags.bitand(INTERLACE_FLAG).eq(&INTERLACE_FLAG),
            local_color_table,
            lzw_min_code_size,
        })
    }

    pub fn has_local_color_table(&self) -> bool {
        self.local_color_table
    }
}

/// One animation frame: its control block, placement and first block of compressed pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    control: GraphicsControl,
    descriptor: ImageDescriptor,
    transparent_color: Option<Rgb888>,
    data: Vec<u8>,
}

impl Frame {
    /// Decodes a graphic control extension and the image that must follow it.
    ///
    /// The cursor has to sit on the `21 F9` marker; on success it is left right after the copied
    /// data sub-block.
    pub fn parse(bytes: &mut ByteReader<'_>, color_table: &ColorTable) -> Result<Self, ParseError> {
        let control = GraphicsControl::parse(bytes)?;
        let descriptor = ImageDescriptor::parser(bytes)?;
        Self::with_image_data(control, descriptor, bytes, color_table)
    }

    /// Finishes a frame whose descriptor has been read; the cursor sits on the first data
    /// sub-block's length byte.
    fn with_image_data(
        control: GraphicsControl,
        descriptor: ImageDescriptor,
        bytes: &mut ByteReader<'_>,
        color_table: &ColorTable,
    ) -> Result<Self, ParseError> {
        if descriptor.local_color_table {
            return Err(ParseError::MalformedImageDescriptor(
                DescriptorDefect::LocalColorTable,
            ));
        }
        let transparent_color = transparent_color(&control, color_table)?;
        let data_size = bytes.take_byte()? as usize;
        let data = bytes.take_slice(data_size)?.to_vec();

        Ok(Self {
            control,
            descriptor,
            transparent_color,
            data,
        })
    }

    pub fn control(&self) -> &GraphicsControl {
        &self.control
    }

    pub fn origin(&self) -> Point {
        self.descriptor.origin
    }

    pub fn img_size(&self) -> Size {
        self.descriptor.size
    }

    pub fn num_pixels(&self) -> usize {
        self.descriptor.size.width as usize * self.descriptor.size.height as usize
    }

    pub fn interlaced(&self) -> bool {
        self.descriptor.interlaced
    }

    pub fn lzw_min_code_size(&self) -> u8 {
        self.descriptor.lzw_min_code_size
    }

    /// Amount of time to delay until the next frame
    pub fn delay_ms(&self) -> u32 {
        self.control.delay_ms()
    }

    /// Global color table entry at the control block's transparent index. `None` when the file
    /// has no global color table and the frame is opaque.
    pub fn transparent_color(&self) -> Option<Rgb888> {
        self.transparent_color
    }

    /// Raw LZW data of the first image sub-block.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_size(&self) -> usize {
        self.data.len()
    }
}

impl Dimensions for Frame {
    fn bounding_box(&self) -> Rectangle {
        Rectangle::new(self.origin(), self.img_size())
    }
}

fn transparent_color(
    control: &GraphicsControl,
    color_table: &ColorTable,
) -> Result<Option<Rgb888>, ParseError> {
    let index = control.transparent_idx();
    match color_table.get(index) {
        Some(color) => Ok(Some(color)),
        None if color_table.is_empty() && !control.is_transparent() => Ok(None),
        None => Err(ParseError::InvalidColorIndex {
            index,
            table_len: color_table.len(),
        }),
    }
}

/// Reads the control block and image descriptor of the frame whose marker sits at `at`.
fn read_frame_header(
    bytes: &mut ByteReader<'_>,
    at: usize,
) -> Result<(GraphicsControl, ImageDescriptor), ParseError> {
    bytes.seek_to(at)?;
    let control = GraphicsControl::parse(bytes)?;
    let descriptor = ImageDescriptor::parser(bytes)?;
    Ok((control, descriptor))
}

/// Skips data sub-blocks up to and including the zero length terminator.
pub fn skip_image_data(bytes: &mut ByteReader<'_>) -> Result<(), ParseError> {
    loop {
        match bytes.take_byte()? {
            0 => return Ok(()),
            len => bytes.seek_by(len as usize)?,
        }
    }
}

/// Walks a gif buffer for graphic control extensions and decodes the frame behind each one.
///
/// Yields `Err` for every marker whose frame could not be decoded; the scan always moves on.
pub struct FrameScanner<'a, 't> {
    bytes: ByteReader<'a>,
    color_table: &'t ColorTable,
    mode: CursorMode,
    cursor: usize,
}

impl<'a, 't> FrameScanner<'a, 't> {
    pub fn new(
        bytes: &'a [u8],
        color_table: &'t ColorTable,
        start: usize,
        mode: CursorMode,
    ) -> Self {
        Self {
            bytes: ByteReader::from_slice(bytes),
            color_table,
            mode,
            cursor: start,
        }
    }

    /// Decodes the frame at `at`. A failure after the image descriptor was read comes back with
    /// the cursor on the frame's first data sub-block.
    fn decode_at(
        &self,
        at: usize,
    ) -> Result<(Frame, ByteReader<'a>), (ParseError, Option<ByteReader<'a>>)> {
        let mut bytes = self.bytes;
        let (control, descriptor) =
            read_frame_header(&mut bytes, at).map_err(|error| (error, None))?;
        let image_data = bytes;
        match Frame::with_image_data(control, descriptor, &mut bytes, self.color_table) {
            Ok(frame) => Ok((frame, bytes)),
            Err(error) => Err((error, Some(image_data))),
        }
    }

    fn next_cursor(&self, at: usize, frame: &Frame, rest: ByteReader<'a>) -> usize {
        match self.mode {
            CursorMode::Legacy => {
                at + frame.control().block_size() as usize + frame.data_size() + 1
            }
            CursorMode::Corrected => self.end_of_image_data(rest),
        }
    }

    /// Where to resume after dropping the frame at `at`.
    fn resume_after_drop(&self, at: usize, image_data: Option<ByteReader<'a>>) -> usize {
        match (self.mode, image_data) {
            (CursorMode::Corrected, Some(image_data)) => self.end_of_image_data(image_data),
            _ => at + 1,
        }
    }

    fn end_of_image_data(&self, mut rest: ByteReader<'a>) -> usize {
        match skip_image_data(&mut rest) {
            Ok(()) => rest.get_offset(),
            Err(_) => self.bytes.len(),
        }
    }
}

impl Iterator for FrameScanner<'_, '_> {
    type Item = Result<Frame, Diagnostic>;

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.bytes.find_marker(self.cursor, &GCE_MARKER)?;
        trace!(offset = at, "graphic control extension");

        match self.decode_at(at) {
            Ok((frame, rest)) => {
                self.cursor = self.next_cursor(at, &frame, rest);
                debug!(
                    offset = at,
                    bytes = frame.data_size(),
                    x = frame.origin().x,
                    y = frame.origin().y,
                    width = frame.img_size().width,
                    height = frame.img_size().height,
                    delay_cs = frame.control().delay_cs(),
                    "found a frame"
                );
                Some(Ok(frame))
            }
            Err((error, image_data)) => {
                self.cursor = self.resume_after_drop(at, image_data);
                warn!(offset = at, %error, "dropping frame");
                Some(Err(Diagnostic { offset: at, error }))
            }
        }
    }
}

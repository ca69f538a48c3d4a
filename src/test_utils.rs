use std::vec::Vec;

use crate::common::{Block, ExtensionLabel};

const TRAILER: u8 = 0x3b;
/// LZW minimum code size written before every image's data sub-blocks.
pub(crate) const LZW_MIN_CODE_SIZE: u8 = 2;

/// Assembles gif byte streams block by block, without any validation, so tests can build both
/// well formed and broken files.
pub(crate) struct GifBuilder {
    bytes: Vec<u8>,
}

impl GifBuilder {
    /// A GIF89a header and logical screen descriptor.
    pub fn new(width: u16, height: u16, packed: u8) -> Self {
        Self::with_header(*b"GIF89a", width, height, packed)
    }

    pub fn with_header(header: [u8; 6], width: u16, height: u16, packed: u8) -> Self {
        let mut bytes = Vec::from(header);
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        // packed, background color index, pixel aspect ratio
        bytes.extend_from_slice(&[packed, 0, 0]);
        Self { bytes }
    }

    pub fn background(mut self, index: u8) -> Self {
        self.bytes[11] = index;
        self
    }

    pub fn aspect_ratio(mut self, ratio: u8) -> Self {
        self.bytes[12] = ratio;
        self
    }

    pub fn palette(mut self, colors: &[[u8; 3]]) -> Self {
        self.bytes.extend(colors.iter().flatten());
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn application(mut self, id: &[u8; 8], auth_code: &[u8; 3], data: &[u8]) -> Self {
        self.bytes.extend_from_slice(&[Block::Extension as u8, ExtensionLabel::App as u8, 0x0b]);
        self.bytes.extend_from_slice(id);
        self.bytes.extend_from_slice(auth_code);
        self.bytes.push(data.len() as u8);
        self.bytes.extend_from_slice(data);
        self.bytes.push(0);
        self
    }

    pub fn netscape_loop(self, count: u8) -> Self {
        self.application(b"NETSCAPE", b"2.0", &[0x01, count, 0x00])
    }

    /// Writes the four control bytes, pads up to `block_size` and terminates the block.
    pub fn graphic_control(
        mut self,
        block_size: u8,
        packed: u8,
        delay: u16,
        transparent: u8,
    ) -> Self {
        self.bytes.extend_from_slice(&[
            Block::Extension as u8,
            ExtensionLabel::Graphics as u8,
            block_size,
            packed,
        ]);
        self.bytes.extend_from_slice(&delay.to_le_bytes());
        self.bytes.push(transparent);
        self.bytes
            .extend(core::iter::repeat(0u8).take(block_size.saturating_sub(4) as usize));
        self.bytes.push(0);
        self
    }

    /// An image descriptor followed by a single data sub-block.
    pub fn image(
        self,
        left: u16,
        top: u16,
        width: u16,
        height: u16,
        flags: u8,
        data: &[u8],
    ) -> Self {
        self.image_blocks(left, top, width, height, flags, &[data])
    }

    pub fn image_blocks(
        self,
        left: u16,
        top: u16,
        width: u16,
        height: u16,
        flags: u8,
        blocks: &[&[u8]],
    ) -> Self {
        self.descriptor(left, top, width, height, flags).data_blocks(blocks)
    }

    /// Separator, geometry and flags only. A local color table goes in with
    /// [`palette`](Self::palette) before the [`data_blocks`](Self::data_blocks).
    pub fn descriptor(mut self, left: u16, top: u16, width: u16, height: u16, flags: u8) -> Self {
        self.bytes.push(Block::Image as u8);
        for field in [left, top, width, height] {
            self.bytes.extend_from_slice(&field.to_le_bytes());
        }
        self.bytes.push(flags);
        self
    }

    /// LZW code size, the sub-blocks and their terminator.
    pub fn data_blocks(mut self, blocks: &[&[u8]]) -> Self {
        self.bytes.push(LZW_MIN_CODE_SIZE);
        for block in blocks {
            self.bytes.push(block.len() as u8);
            self.bytes.extend_from_slice(block);
        }
        self.bytes.push(0);
        self
    }

    /// Current length, i.e. the offset the next block will be written at.
    pub fn offset(&self) -> usize {
        self.bytes.len()
    }

    /// The bytes written so far, without a trailer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn build(mut self) -> Vec<u8> {
        self.bytes.push(TRAILER);
        self.bytes
    }
}

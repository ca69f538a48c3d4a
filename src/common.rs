use thiserror::Error;

/// GIF block labels the scanner looks for.
///
/// The scanner never walks the block structure the way a full decoder does; it searches for the
/// labels below and decodes the fixed layout that follows each hit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Block {
    /// Image descriptor.
    Image = 0x2C,
    /// Extension introducer.
    Extension = 0x21,
}

/// GIF extension labels, the byte after [`Block::Extension`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum ExtensionLabel {
    /// Graphic control extension.
    Graphics = 0xf9,
    /// Application extension.
    App = 0xff,
}

/// Length of the "GIF" signature plus the version string.
pub(crate) const HEADER_LEN: usize = 6;
/// Length of the header plus the logical screen descriptor.
pub(crate) const SCREEN_DESCRIPTOR_END: usize = 13;
/// Block size byte of every application extension.
const APPLICATION_BLOCK_SIZE: u8 = 0x0b;

pub(crate) const GCE_MARKER: [u8; 2] = [Block::Extension as u8, ExtensionLabel::Graphics as u8];
pub(crate) const APPLICATION_EXTENSION_MARKER: [u8; 3] = [
    Block::Extension as u8,
    ExtensionLabel::App as u8,
    APPLICATION_BLOCK_SIZE,
];

/// Errors that emerge when scanning a gif buffer.
///
/// [`InvalidSignature`](Self::InvalidSignature), [`UnsupportedVersion`](Self::UnsupportedVersion)
/// and [`TruncatedBuffer`](Self::TruncatedBuffer) raised while reading the header, screen
/// descriptor or global color table abort the parse. Everything raised while decoding a frame is
/// recorded as a [`Diagnostic`] and only drops that frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The buffer does not start with "GIF".
    #[error("buffer does not start with the GIF signature")]
    InvalidSignature,
    /// The version is neither "87a" nor "89a".
    #[error("unsupported GIF version")]
    UnsupportedVersion,
    /// A read would run past the end of the buffer.
    #[error("reading {needed} bytes at offset {offset} overruns the {len} byte buffer")]
    TruncatedBuffer {
        offset: usize,
        needed: usize,
        len: usize,
    },
    /// Graphic control extension with a bad block size or terminator.
    #[error("malformed graphic control extension: {0}")]
    MalformedGce(GceDefect),
    /// No usable image descriptor after a graphic control extension.
    #[error("malformed image descriptor: {0}")]
    MalformedImageDescriptor(DescriptorDefect),
    /// Transparent color index outside the global color table.
    #[error("transparent color index {index} is outside the {table_len} entry color table")]
    InvalidColorIndex { index: u8, table_len: usize },
}

/// What is wrong with a graphic control extension.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum GceDefect {
    #[error("block size is zero")]
    EmptyBlock,
    #[error("block size {0} is shorter than the 4 bytes of control data")]
    BlockTooShort(u8),
    #[error("expected block terminator 0x00, found {0:#04x}")]
    MissingTerminator(u8),
}

/// What is wrong with an image descriptor.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum DescriptorDefect {
    #[error("expected image separator 0x2c, found {0:#04x}")]
    MissingSeparator(u8),
    /// Local color tables shift the data layout and are not supported.
    #[error("local color tables are not supported")]
    LocalColorTable,
}

/// A frame-local error, recorded instead of aborting the scan.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("frame at offset {offset} dropped: {error}")]
pub struct Diagnostic {
    /// Offset of the graphic control extension marker that started the frame.
    pub offset: usize,
    pub error: ParseError,
}

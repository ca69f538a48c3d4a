use crate::common::{ParseError, HEADER_LEN};
use crate::header::LogicalScreenDescriptor;
use crate::ParsedGif;

/// How the frame scan picks its start and moves past a decoded frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CursorMode {
    /// Start after the global color table and step over a frame's whole data sub-block chain.
    #[default]
    Corrected,
    /// Start right after the header and step `block size + first data block size + 1` bytes past
    /// each graphic control marker, as older scanners did. Can resume inside a frame and pick up
    /// marker bytes from its compressed data.
    Legacy,
}

impl CursorMode {
    pub(crate) fn scan_start(self, descriptor: &LogicalScreenDescriptor) -> usize {
        match self {
            Self::Corrected => descriptor.color_table_end(),
            Self::Legacy => HEADER_LEN,
        }
    }
}

/// Options for scanning a gif buffer.
///
/// ```
/// use gifscan::{CursorMode, DecodeOptions};
///
/// let options = DecodeOptions::new().cursor_mode(CursorMode::Legacy);
/// assert!(options.parse(b"GIF89a").is_err());
/// ```
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    cursor_mode: CursorMode,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor_mode(mut self, mode: CursorMode) -> Self {
        self.cursor_mode = mode;
        self
    }

    pub fn get_cursor_mode(&self) -> CursorMode {
        self.cursor_mode
    }

    /// Scans `bytes` with these options. See [`parse_gif`](crate::parse_gif).
    pub fn parse(&self, bytes: &[u8]) -> Result<ParsedGif, ParseError> {
        ParsedGif::parse_with(bytes, self)
    }
}

use core::ops::{BitAnd, Shr};

use crate::common::{
    GceDefect, ParseError, APPLICATION_EXTENSION_MARKER, GCE_MARKER, HEADER_LEN,
};
use crate::reader::ByteReader;
use tracing::trace;

/// Loop count reported when the file carries no Netscape application extension.
pub const DEFAULT_LOOP_COUNT: u8 = 1;

const NETSCAPE_ID: &[u8; 8] = b"NETSCAPE";
const NETSCAPE_AUTH_CODE: &[u8; 3] = b"2.0";
/// Sub-block length byte and sub-block id byte between the auth code and the loop count.
const NETSCAPE_SUB_BLOCK_HEADER: usize = 2;

/// Smallest block size that holds the packed byte, the delay and the transparent index.
const GCE_MIN_BLOCK_SIZE: u8 = 4;

/// Process for displaying the next image in the file
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum DisposalMethod {
    NotSpecified = 0,
    DoNotDispose = 1,
    OverwriteWithBG = 2,
    OverwriteWithPrev = 3,
}

impl DisposalMethod {
    /// Values 4 to 7 are reserved.
    pub fn from_u8(n: u8) -> Option<Self> {
        match n {
            0 => Some(Self::NotSpecified),
            1 => Some(Self::DoNotDispose),
            2 => Some(Self::OverwriteWithBG),
            3 => Some(Self::OverwriteWithPrev),
            _ => None,
        }
    }
}

/// A decoded graphic control extension.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GraphicsControl {
    /// Block size byte, 4 in any well formed file.
    block_size: u8,
    /// Control byte
    ctrl: u8,
    ///Delay time, in hundredths of a second
    delay_time: u16,
    ///table index for a transparent color
    transparent_idx: u8,
}

impl GraphicsControl {
    /// Decodes the extension starting at the `21 F9` marker under the cursor.
    ///
    /// On success the cursor sits on the byte after the block terminator, `span()` bytes past the
    /// marker.
    pub fn parse(bytes: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        let marker: [u8; 2] = bytes.take_arr()?;
        debug_assert_eq!(marker, GCE_MARKER);

        let block_size = bytes.take_byte()?;
        if block_size == 0 {
            return Err(ParseError::MalformedGce(GceDefect::EmptyBlock));
        }
        if block_size < GCE_MIN_BLOCK_SIZE {
            return Err(ParseError::MalformedGce(GceDefect::BlockTooShort(block_size)));
        }

        let ctrl = bytes.take_byte()?;
        let delay_time = bytes.take_u16_le()?;
        let transparent_idx = bytes.take_byte()?;
        bytes.seek_by((block_size - GCE_MIN_BLOCK_SIZE) as usize)?;

        match bytes.take_byte()? {
            0 => Ok(Self {
                block_size,
                ctrl,
                delay_time,
                transparent_idx,
            }),
            found => Err(ParseError::MalformedGce(GceDefect::MissingTerminator(found))),
        }
    }

    pub fn block_size(&self) -> u8 {
        self.block_size
    }

    /// Bytes taken by the whole extension: marker, size byte, block and terminator.
    pub fn span(&self) -> usize {
        GCE_MARKER.len() + 1 + self.block_size as usize + 1
    }

    pub fn is_transparent(&self) -> bool {
        self.ctrl.bitand(1).eq(&1)
    }

    /// Raw transparent color index, meaningful only when [`is_transparent`](Self::is_transparent).
    pub fn transparent_idx(&self) -> u8 {
        self.transparent_idx
    }

    pub fn get_transparent_idx(&self) -> Option<u8> {
        self.is_transparent().then_some(self.transparent_idx)
    }

    pub fn user_input(&self) -> bool {
        self.ctrl.bitand(2).eq(&2)
    }

    pub fn disposal_method(&self) -> Option<DisposalMethod> {
        DisposalMethod::from_u8(self.ctrl.shr(2u8).bitand(0x7))
    }

    /// Delay in hundredths of a second.
    pub fn delay_cs(&self) -> u16 {
        self.delay_time
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_time as u32 * 10
    }
}

/// Scans for a Netscape 2.0 application extension and returns its loop count.
///
/// The search starts right after the header and returns [`DEFAULT_LOOP_COUNT`] when no such
/// extension exists or its payload runs past the end of the buffer.
pub fn loop_count(bytes: &[u8]) -> u8 {
    let reader = ByteReader::from_slice(bytes);
    let mut from = HEADER_LEN;

    while let Some(at) = reader.find_marker(from, &APPLICATION_EXTENSION_MARKER) {
        trace!(offset = at, "application extension");
        if let Ok(Some(count)) = netscape_loop_count(reader, at) {
            return count;
        }
        from = at + 1;
    }
    DEFAULT_LOOP_COUNT
}

fn netscape_loop_count(mut bytes: ByteReader<'_>, at: usize) -> Result<Option<u8>, ParseError> {
    bytes.seek_to(at + APPLICATION_EXTENSION_MARKER.len())?;
    let id: [u8; 8] = bytes.take_arr()?;
    let auth_code: [u8; 3] = bytes.take_arr()?;
    if &id != NETSCAPE_ID || &auth_code != NETSCAPE_AUTH_CODE {
        return Ok(None);
    }
    bytes.seek_by(NETSCAPE_SUB_BLOCK_HEADER)?;
    bytes.take_byte().map(Some)
}

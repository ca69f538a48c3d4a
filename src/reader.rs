use crate::common::ParseError;
use core::mem::size_of;

/// Bounds-checked forward cursor over an immutable gif buffer.
///
/// Every `take_*` either returns the requested bytes and advances, or fails with
/// [`ParseError::TruncatedBuffer`] and leaves the cursor where it was. Readers are `Copy`, so a
/// scan can fork one at a hit and discard it if the decode fails.
#[derive(Debug, Copy, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get_offset(&self) -> usize {
        self.offset
    }

    /// Bytes left between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn truncated(&self, offset: usize, needed: usize) -> ParseError {
        ParseError::TruncatedBuffer {
            offset,
            needed,
            len: self.bytes.len(),
        }
    }

    pub fn take_slice(&mut self, len: usize) -> Result<&'a [u8], ParseError> {
        if len > self.remaining() {
            return Err(self.truncated(self.offset, len));
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    #[inline]
    pub fn take_arr<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let mut arr = [0; N];
        arr.copy_from_slice(self.take_slice(N)?);
        Ok(arr)
    }

    pub fn take_byte(&mut self) -> Result<u8, ParseError> {
        self.take_arr::<{ size_of::<u8>() }>().map(|[byte]| byte)
    }

    pub fn take_u16_le(&mut self) -> Result<u16, ParseError> {
        self.take_arr::<{ size_of::<u16>() }>().map(u16::from_le_bytes)
    }

    /// Moves the cursor to `offset`; the end of the buffer is a valid position.
    pub fn seek_to(&mut self, offset: usize) -> Result<(), ParseError> {
        if offset > self.bytes.len() {
            return Err(self.truncated(offset, 0));
        }
        self.offset = offset;
        Ok(())
    }

    pub fn seek_by(&mut self, len: usize) -> Result<(), ParseError> {
        if len > self.remaining() {
            return Err(self.truncated(self.offset, len));
        }
        self.offset += len;
        Ok(())
    }

    /// Finds the first occurrence of `marker` starting at or after `from`.
    ///
    /// Only windows lying entirely inside the buffer are compared, so the search ends without a
    /// match once fewer than `marker.len()` bytes are left.
    pub fn find_marker(&self, from: usize, marker: &[u8]) -> Option<usize> {
        if marker.is_empty() || from >= self.bytes.len() {
            return None;
        }
        self.bytes[from..]
            .windows(marker.len())
            .position(|window| window == marker)
            .map(|pos| from + pos)
    }
}

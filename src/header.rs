use core::ops::BitAnd;

use crate::common::{ParseError, HEADER_LEN, SCREEN_DESCRIPTOR_END};
use crate::reader::ByteReader;
use embedded_graphics::pixelcolor::Rgb888;
use smallvec::SmallVec;

const SIGNATURE: &[u8; 3] = b"GIF";

/// Bytes per color table entry.
const CHANNELS: usize = 3;

/// Returns true when the buffer starts with "GIF".
pub fn check_header(bytes: &[u8]) -> bool {
    bytes.get(..SIGNATURE.len()) == Some(SIGNATURE.as_slice())
}

/// Returns true when bytes 3..6 are a supported version string.
pub fn check_version(bytes: &[u8]) -> bool {
    bytes
        .get(SIGNATURE.len()..HEADER_LEN)
        .and_then(Version::from_bytes)
        .is_some()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Version {
    Gif87a,
    Gif89a,
}

impl Version {
    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"87a" => Some(Self::Gif87a),
            b"89a" => Some(Self::Gif89a),
            _ => None,
        }
    }
}

/// Named fields of the header and logical screen descriptor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Field {
    Signature,
    Version,
    Width,
    Height,
    /// Packed global color table byte.
    GlobalColorTable,
    BackgroundColor,
    AspectRatio,
}

#[derive(Copy, Clone)]
struct FieldInfo {
    offset: usize,
    width: usize,
}

/// Indexed by `Field as usize`.
const FIELDS: [FieldInfo; 7] = [
    FieldInfo { offset: 0, width: 3 },
    FieldInfo { offset: 3, width: 3 },
    FieldInfo { offset: 6, width: 2 },
    FieldInfo { offset: 8, width: 2 },
    FieldInfo { offset: 10, width: 1 },
    FieldInfo { offset: 11, width: 1 },
    FieldInfo { offset: 12, width: 1 },
];

impl Field {
    fn info(self) -> &'static FieldInfo {
        &FIELDS[self as usize]
    }
}

/// The 6 byte header and the 7 byte logical screen descriptor that follows it.
///
/// Only the raw bytes are stored; every accessor decodes on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalScreenDescriptor {
    raw: [u8; SCREEN_DESCRIPTOR_END],
}

impl LogicalScreenDescriptor {
    /// Reads the descriptor, validating the signature and version first.
    pub fn parser(bytes: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        let header: [u8; HEADER_LEN] = bytes.take_arr()?;
        if !check_header(&header) {
            return Err(ParseError::InvalidSignature);
        }
        if !check_version(&header) {
            return Err(ParseError::UnsupportedVersion);
        }

        let mut raw = [0; SCREEN_DESCRIPTOR_END];
        raw[..HEADER_LEN].copy_from_slice(&header);
        raw[HEADER_LEN..].copy_from_slice(bytes.take_slice(SCREEN_DESCRIPTOR_END - HEADER_LEN)?);
        Ok(Self { raw })
    }

    /// Decodes `field` as a little-endian unsigned integer.
    pub fn read_field(&self, field: Field) -> u32 {
        let FieldInfo { offset, width } = *field.info();
        let bytes = &self.raw[offset..offset + width];
        match width {
            1 => bytes[0] as u32,
            2 => u16::from_le_bytes([bytes[0], bytes[1]]) as u32,
            3 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]),
            _ => unreachable!("field widths are 1, 2 or 3 bytes"),
        }
    }

    pub fn version(&self) -> Version {
        // The parser rejects anything else.
        match Version::from_bytes(&self.raw[3..HEADER_LEN]) {
            Some(version) => version,
            None => unreachable!("version validated by the parser"),
        }
    }

    pub fn width(&self) -> u16 {
        self.read_field(Field::Width) as u16
    }

    pub fn height(&self) -> u16 {
        self.read_field(Field::Height) as u16
    }

    fn packed(&self) -> u8 {
        self.read_field(Field::GlobalColorTable) as u8
    }

    pub fn has_global_color_table(&self) -> bool {
        self.packed().bitand(0x80).eq(&0x80)
    }

    /// Color resolution in bits per primary color, 1 to 8.
    pub fn bit_depth(&self) -> u8 {
        ((self.packed() >> 4) & 0x7) + 1
    }

    /// Number of global color table entries, a power of two from 2 to 256.
    pub fn color_count(&self) -> usize {
        1 << (self.packed().bitand(0x7) + 1)
    }

    pub fn background_color_index(&self) -> u8 {
        self.read_field(Field::BackgroundColor) as u8
    }

    pub fn pixel_aspect_ratio(&self) -> u8 {
        self.read_field(Field::AspectRatio) as u8
    }

    /// Offset of the first byte after the global color table.
    pub(crate) fn color_table_end(&self) -> usize {
        if self.has_global_color_table() {
            SCREEN_DESCRIPTOR_END + CHANNELS * self.color_count()
        } else {
            SCREEN_DESCRIPTOR_END
        }
    }
}

/// A palette of RGB colors in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorTable {
    table: SmallVec<[Rgb888; 256]>,
}

impl ColorTable {
    /// Reads `len` consecutive RGB triples.
    ///
    /// The whole table is bounds checked before anything is read.
    pub fn new(len: usize, bytes: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        let raw = bytes.take_slice(CHANNELS * len)?;
        let table = raw
            .chunks_exact(CHANNELS)
            .map(|rgb| Rgb888::new(rgb[0], rgb[1], rgb[2]))
            .collect();
        Ok(Self { table })
    }

    /// Reads the global color table announced by `descriptor`, which must directly precede the
    /// cursor. Returns an empty table when the descriptor announces none.
    pub fn global(
        descriptor: &LogicalScreenDescriptor,
        bytes: &mut ByteReader<'_>,
    ) -> Result<Self, ParseError> {
        if descriptor.has_global_color_table() {
            Self::new(descriptor.color_count(), bytes)
        } else {
            Ok(Self::default())
        }
    }

    pub fn get(&self, index: u8) -> Option<Rgb888> {
        self.table.get(index as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rgb888> + '_ {
        self.table.iter()
    }

    pub fn as_slice(&self) -> &[Rgb888] {
        &self.table
    }
}

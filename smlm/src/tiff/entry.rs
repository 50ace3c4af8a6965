//! Twelve-byte directory records.

use super::endian::Endianness;
use std::io::{self, Read};

/// Size in bytes of one directory record
pub const ENTRY_SIZE: usize = 12;

/// Declared storage type of a directory record's values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Byte,
    Ascii,
    Short,
    Long,
    Rational,
    Other(u16),
}

impl FieldType {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::Byte,
            2 => Self::Ascii,
            3 => Self::Short,
            4 => Self::Long,
            5 => Self::Rational,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Self::Byte => 1,
            Self::Ascii => 2,
            Self::Short => 3,
            Self::Long => 4,
            Self::Rational => 5,
            Self::Other(code) => code,
        }
    }

    /// Bytes occupied by one value, `None` for unrecognized types
    pub fn size(self) -> Option<usize> {
        match self {
            Self::Byte | Self::Ascii => Some(1),
            Self::Short => Some(2),
            Self::Long => Some(4),
            Self::Rational => Some(8),
            Self::Other(_) => None,
        }
    }

    /// How many values fit in the four-byte value field
    pub fn inline_capacity(self) -> usize {
        self.size().map_or(0, |size| 4 / size)
    }
}

/// One directory record as stored in the file.
///
/// `value` keeps the raw four payload bytes in file order; whether they hold the
/// values themselves or an offset to them depends on `field_type` and `count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub tag: u16,
    pub field_type: FieldType,
    pub count: u32,
    pub value: [u8; 4],
}

impl DirectoryEntry {
    pub fn read<R: Read>(reader: &mut R, order: Endianness) -> io::Result<Self> {
        let tag = order.read_u16(reader)?;
        let field_type = FieldType::from_code(order.read_u16(reader)?);
        let count = order.read_u32(reader)?;
        let mut value = [0u8; 4];
        reader.read_exact(&mut value)?;
        Ok(Self {
            tag,
            field_type,
            count,
            value,
        })
    }

    /// Payload interpreted as one 32-bit value (or an out-of-line offset)
    pub fn value_u32(&self, order: Endianness) -> u32 {
        order.u32_from(&self.value)
    }

    /// First 16-bit value packed into the payload
    pub fn first_u16(&self, order: Endianness) -> u16 {
        order.u16_from(&self.value[..2])
    }

    /// Second 16-bit value packed into the payload
    pub fn second_u16(&self, order: Endianness) -> u16 {
        order.u16_from(&self.value[2..])
    }

    /// True when every value lives in the payload rather than at an offset
    pub fn is_inline(&self) -> bool {
        (self.count as usize) <= self.field_type.inline_capacity()
    }
}

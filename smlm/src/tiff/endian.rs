//! Byte order of a TIFF container and endian-aware primitive I/O.

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use std::io::{self, Read};

/// Byte order declared by the two-byte marker at the start of a TIFF file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// "II" marker
    Little,
    /// "MM" marker
    Big,
}

impl Endianness {
    /// Decode the header marker, `None` for anything but "II" or "MM"
    pub fn from_marker(marker: [u8; 2]) -> Option<Self> {
        match &marker {
            b"II" => Some(Self::Little),
            b"MM" => Some(Self::Big),
            _ => None,
        }
    }

    pub fn marker(self) -> [u8; 2] {
        match self {
            Self::Little => *b"II",
            Self::Big => *b"MM",
        }
    }

    /// Byte order of the running host
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            Self::Little
        } else {
            Self::Big
        }
    }

    /// True when multi-byte values in the file must be swapped on this host
    pub fn needs_swap(self) -> bool {
        self != Self::native()
    }

    pub fn read_u16<R: Read>(self, reader: &mut R) -> io::Result<u16> {
        match self {
            Self::Little => reader.read_u16::<LittleEndian>(),
            Self::Big => reader.read_u16::<BigEndian>(),
        }
    }

    pub fn read_u32<R: Read>(self, reader: &mut R) -> io::Result<u32> {
        match self {
            Self::Little => reader.read_u32::<LittleEndian>(),
            Self::Big => reader.read_u32::<BigEndian>(),
        }
    }

    /// `value` laid out in this byte order
    pub fn u16_bytes(self, value: u16) -> [u8; 2] {
        let mut bytes = [0u8; 2];
        match self {
            Self::Little => LittleEndian::write_u16(&mut bytes, value),
            Self::Big => BigEndian::write_u16(&mut bytes, value),
        }
        bytes
    }

    /// `value` laid out in this byte order
    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        let mut bytes = [0u8; 4];
        match self {
            Self::Little => LittleEndian::write_u32(&mut bytes, value),
            Self::Big => BigEndian::write_u32(&mut bytes, value),
        }
        bytes
    }

    /// Value of a 16-bit field stored at the start of `bytes`
    pub fn u16_from(self, bytes: &[u8]) -> u16 {
        match self {
            Self::Little => LittleEndian::read_u16(bytes),
            Self::Big => BigEndian::read_u16(bytes),
        }
    }

    /// Value of a 32-bit field stored at the start of `bytes`
    pub fn u32_from(self, bytes: &[u8]) -> u32 {
        match self {
            Self::Little => LittleEndian::read_u32(bytes),
            Self::Big => BigEndian::read_u32(bytes),
        }
    }

    /// Decode a buffer of packed 16-bit samples into host-order values
    pub fn decode_u16_samples(self, bytes: &[u8], samples: &mut [u16]) {
        match self {
            Self::Little => LittleEndian::read_u16_into(bytes, samples),
            Self::Big => BigEndian::read_u16_into(bytes, samples),
        }
    }

    /// Encode host-order 16-bit samples into packed bytes in this order
    pub fn encode_u16_samples(self, samples: &[u16], bytes: &mut [u8]) {
        match self {
            Self::Little => LittleEndian::write_u16_into(samples, bytes),
            Self::Big => BigEndian::write_u16_into(samples, bytes),
        }
    }
}

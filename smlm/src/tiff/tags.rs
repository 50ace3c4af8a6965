//! Directory tags recognized by the decoder and the enumerations they carry.

use std::fmt;

/// Directory entry tags the decoder understands
///
/// Any other tag code is reported and skipped while parsing a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    ImageWidth,
    ImageLength,
    BitsPerSample,
    Compression,
    PhotometricInterpretation,
    FillOrder,
    ImageDescription,
    StripOffsets,
    Orientation,
    SamplesPerPixel,
    RowsPerStrip,
    StripByteCounts,
    XResolution,
    YResolution,
    PlanarConfiguration,
    ResolutionUnit,
    Software,
    SampleFormat,
    ImageId,
}

impl Tag {
    pub fn from_code(code: u16) -> Option<Self> {
        let tag = match code {
            0x100 => Self::ImageWidth,
            0x101 => Self::ImageLength,
            0x102 => Self::BitsPerSample,
            0x103 => Self::Compression,
            0x106 => Self::PhotometricInterpretation,
            0x10a => Self::FillOrder,
            0x10e => Self::ImageDescription,
            0x111 => Self::StripOffsets,
            0x112 => Self::Orientation,
            0x115 => Self::SamplesPerPixel,
            0x116 => Self::RowsPerStrip,
            0x117 => Self::StripByteCounts,
            0x11a => Self::XResolution,
            0x11b => Self::YResolution,
            0x11c => Self::PlanarConfiguration,
            0x128 => Self::ResolutionUnit,
            0x131 => Self::Software,
            0x153 => Self::SampleFormat,
            0x800d => Self::ImageId,
            _ => return None,
        };
        Some(tag)
    }

    pub fn code(self) -> u16 {
        match self {
            Self::ImageWidth => 0x100,
            Self::ImageLength => 0x101,
            Self::BitsPerSample => 0x102,
            Self::Compression => 0x103,
            Self::PhotometricInterpretation => 0x106,
            Self::FillOrder => 0x10a,
            Self::ImageDescription => 0x10e,
            Self::StripOffsets => 0x111,
            Self::Orientation => 0x112,
            Self::SamplesPerPixel => 0x115,
            Self::RowsPerStrip => 0x116,
            Self::StripByteCounts => 0x117,
            Self::XResolution => 0x11a,
            Self::YResolution => 0x11b,
            Self::PlanarConfiguration => 0x11c,
            Self::ResolutionUnit => 0x128,
            Self::Software => 0x131,
            Self::SampleFormat => 0x153,
            Self::ImageId => 0x800d,
        }
    }
}

/// Declares a `u16`-coded enumeration with a catch-all `Other` arm and display names.
macro_rules! coded_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:literal => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            /// Code outside the recognized set
            Other(u16),
        }

        impl $name {
            pub fn from_code(code: u16) -> Self {
                match code {
                    $($code => Self::$variant,)+
                    other => Self::Other(other),
                }
            }

            pub fn code(self) -> u16 {
                match self {
                    $(Self::$variant => $code,)+
                    Self::Other(code) => code,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $label),)+
                    Self::Other(code) => write!(f, "Unknown({code})"),
                }
            }
        }
    };
}

coded_enum!(
    /// Pixel data compression scheme
    Compression {
        None = 1 => "None",
        Ccitt = 2 => "CCITT",
        PackBits = 32773 => "PackBits",
    }
);

coded_enum!(
    /// Photometric interpretation of sample values
    Photometric {
        WhiteIsZero = 0 => "WhiteIsZero",
        BlackIsZero = 1 => "BlackIsZero",
        Rgb = 2 => "RGB",
        Palette = 3 => "Palette",
        TransparencyMask = 4 => "TransparencyMask",
    }
);

coded_enum!(
    /// Unit of the X/Y resolution fields
    ResolutionUnit {
        None = 1 => "None",
        Inch = 2 => "Inch",
        Centimeter = 3 => "Centimeter",
    }
);

coded_enum!(
    /// Interpretation of each sample's bits
    SampleFormat {
        Unsigned = 1 => "Unsigned",
        TwoComplement = 2 => "TwoComplement",
        IeeeFloat = 3 => "IEEEFloat",
        Undefined = 4 => "Undefined",
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_codes_round_trip() {
        for code in 0..=u16::MAX {
            if let Some(tag) = Tag::from_code(code) {
                assert_eq!(tag.code(), code);
            }
        }
        assert_eq!(Tag::from_code(0x100), Some(Tag::ImageWidth));
        assert_eq!(Tag::from_code(0x8769), None);
    }

    #[test]
    fn test_coded_enum_names() {
        assert_eq!(Compression::from_code(32773), Compression::PackBits);
        assert_eq!(Compression::PackBits.to_string(), "PackBits");
        assert_eq!(Photometric::from_code(1).to_string(), "BlackIsZero");
        assert_eq!(SampleFormat::from_code(3).to_string(), "IEEEFloat");
        assert_eq!(ResolutionUnit::Centimeter.code(), 3);
    }

    #[test]
    fn test_unlisted_code_is_preserved() {
        let compression = Compression::from_code(7);
        assert_eq!(compression, Compression::Other(7));
        assert_eq!(compression.code(), 7);
        assert_eq!(compression.to_string(), "Unknown(7)");
    }
}

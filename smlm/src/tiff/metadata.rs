//! Per-directory image description.

use super::tags::{Compression, Photometric, ResolutionUnit, SampleFormat, Tag};
use super::TiffError;

/// Unsigned rational value (numerator, denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

/// Everything one image directory declared about its frame.
///
/// Geometry and strip layout are kept as read; [`FrameMetadata::strip_layout`]
/// checks them against each other before pixels are fetched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameMetadata {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bits_per_sample: Vec<u16>,
    pub samples_per_pixel: Option<u16>,
    pub compression: Option<Compression>,
    pub photometric: Option<Photometric>,
    pub fill_order: Option<u16>,
    pub orientation: Option<u16>,
    pub planar_configuration: Option<u16>,
    pub strip_offsets: Vec<u32>,
    pub strip_byte_counts: Vec<u32>,
    /// Absent means the whole image is one strip
    pub rows_per_strip: Option<u32>,
    pub x_resolution: Option<Rational>,
    pub y_resolution: Option<Rational>,
    pub resolution_unit: Option<ResolutionUnit>,
    pub sample_formats: Vec<SampleFormat>,
    pub description: Option<String>,
    pub software: Option<String>,
    pub image_id: Option<String>,
}

/// Strip layout of a 16-bit single-channel frame, validated against its geometry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripLayout {
    pub width: usize,
    pub height: usize,
    /// Bytes of packed 16-bit samples, `width * height * 2`
    pub image_bytes: usize,
    /// (offset, byte count) per strip, in file order
    pub strips: Vec<(u64, usize)>,
}

impl FrameMetadata {
    /// Rows per strip with the TIFF default applied
    pub fn effective_rows_per_strip(&self) -> u32 {
        self.rows_per_strip.unwrap_or(u32::MAX)
    }

    /// Number of strips implied by height and rows per strip
    pub fn expected_strip_count(&self) -> Option<usize> {
        let height = self.height? as u64;
        let rows = self.effective_rows_per_strip() as u64;
        if rows == 0 {
            return None;
        }
        Some(height.div_ceil(rows) as usize)
    }

    /// Check that this directory describes an uncompressed 16-bit single-sample frame
    /// whose strips add up to exactly its geometry.
    pub fn strip_layout(&self) -> Result<StripLayout, TiffError> {
        let width = self.width.ok_or(TiffError::MissingTag(Tag::ImageWidth))? as usize;
        let height = self.height.ok_or(TiffError::MissingTag(Tag::ImageLength))? as usize;
        let samples = self
            .samples_per_pixel
            .ok_or(TiffError::MissingTag(Tag::SamplesPerPixel))?;
        let bits = *self
            .bits_per_sample
            .first()
            .ok_or(TiffError::MissingTag(Tag::BitsPerSample))?;

        if samples != 1 || bits != 16 {
            return Err(TiffError::UnsupportedFormat(format!(
                "{samples} samples per pixel at {bits} bits, need 1 at 16"
            )));
        }
        if let Some(compression) = self.compression {
            if compression != Compression::None {
                return Err(TiffError::UnsupportedFormat(format!(
                    "{compression} compression"
                )));
            }
        }
        if self.strip_offsets.is_empty() {
            return Err(TiffError::MissingTag(Tag::StripOffsets));
        }
        if self.strip_byte_counts.is_empty() {
            return Err(TiffError::MissingTag(Tag::StripByteCounts));
        }

        let expected_strips = self.expected_strip_count().ok_or_else(|| {
            TiffError::Format("rows per strip must be positive".to_string())
        })?;
        if expected_strips != self.strip_offsets.len() {
            return Err(TiffError::SizeMismatch {
                what: "strip offsets",
                expected: expected_strips,
                actual: self.strip_offsets.len(),
            });
        }
        if self.strip_byte_counts.len() != self.strip_offsets.len() {
            return Err(TiffError::SizeMismatch {
                what: "strip byte counts",
                expected: self.strip_offsets.len(),
                actual: self.strip_byte_counts.len(),
            });
        }

        let image_bytes = width
            .checked_mul(height)
            .and_then(|pixels| pixels.checked_mul(2))
            .ok_or_else(|| TiffError::Format(format!("{width}x{height} image is too large")))?;

        let layout = StripLayout {
            width,
            height,
            image_bytes,
            strips: self
                .strip_offsets
                .iter()
                .zip(&self.strip_byte_counts)
                .map(|(&offset, &count)| (offset as u64, count as usize))
                .collect(),
        };

        let total: usize = layout.strips.iter().map(|&(_, count)| count).sum();
        if total != layout.image_bytes {
            return Err(TiffError::SizeMismatch {
                what: "image bytes",
                expected: layout.image_bytes,
                actual: total,
            });
        }

        Ok(layout)
    }
}

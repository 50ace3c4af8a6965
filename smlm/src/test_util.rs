//! Synthetic inputs for tests: TIFF stacks written in memory and rendered emitters.

use ndarray::{s, Array2};
use std::path::Path;

use crate::psf::{integrated_gaussian, ParameterVector, PsfParameters};
use crate::tiff::{Endianness, FieldType, Tag, TIFF_MAGIC};

/// Pixels per centimeter written to the resolution tags (80 nm pixels)
const PIXELS_PER_CM: u32 = 125_000;

struct RawEntry {
    tag: u16,
    field_type: FieldType,
    count: u32,
    /// Encoded values, already in the container byte order
    data: Vec<u8>,
}

/// Writes minimal uncompressed 16-bit grayscale TIFF stacks.
///
/// Each page becomes one image directory. Strips hold `rows_per_strip` rows
/// (the whole page when unset). `declared_rows_per_strip` overrides only the
/// value written to the directory, which produces inconsistent containers.
#[derive(Debug, Clone)]
pub struct TiffBuilder {
    order: Endianness,
    rows_per_strip: Option<u32>,
    declared_rows_per_strip: Option<u32>,
    bits_per_sample: u16,
    description: Option<String>,
    terminate_description: bool,
    extra_shorts: Vec<(u16, u16)>,
    pages: Vec<Array2<u16>>,
}

impl TiffBuilder {
    pub fn new(order: Endianness) -> Self {
        Self {
            order,
            rows_per_strip: None,
            declared_rows_per_strip: None,
            bits_per_sample: 16,
            description: None,
            terminate_description: true,
            extra_shorts: Vec::new(),
            pages: Vec::new(),
        }
    }

    pub fn rows_per_strip(mut self, rows: u32) -> Self {
        self.rows_per_strip = Some(rows);
        self
    }

    pub fn declared_rows_per_strip(mut self, rows: u32) -> Self {
        self.declared_rows_per_strip = Some(rows);
        self
    }

    /// Declared bits per sample; pixel data is always written as 16-bit
    pub fn bits_per_sample(mut self, bits: u16) -> Self {
        self.bits_per_sample = bits;
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self.terminate_description = true;
        self
    }

    /// Description written without its trailing null byte
    pub fn unterminated_description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self.terminate_description = false;
        self
    }

    /// Add a SHORT entry with an arbitrary tag code to every directory
    pub fn extra_short(mut self, tag: u16, value: u16) -> Self {
        self.extra_shorts.push((tag, value));
        self
    }

    pub fn page(mut self, pixels: Array2<u16>) -> Self {
        self.pages.push(pixels);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let order = self.order;
        let mut out = Vec::new();
        out.extend_from_slice(&order.marker());
        out.extend_from_slice(&order.u16_bytes(TIFF_MAGIC));
        let mut link = out.len();
        out.extend_from_slice(&[0; 4]);

        for page in &self.pages {
            let (height, width) = page.dim();
            let rows = self
                .rows_per_strip
                .map_or(height, |r| r as usize)
                .min(height)
                .max(1);

            let mut offsets = Vec::new();
            let mut counts = Vec::new();
            for start in (0..height).step_by(rows) {
                let end = (start + rows).min(height);
                let samples: Vec<u16> = page.slice(s![start..end, ..]).iter().copied().collect();
                let mut bytes = vec![0u8; samples.len() * 2];
                order.encode_u16_samples(&samples, &mut bytes);

                offsets.push(out.len() as u32);
                counts.push(bytes.len() as u32);
                out.extend_from_slice(&bytes);
            }

            let mut entries = vec![
                self.longs(Tag::ImageWidth.code(), &[width as u32]),
                self.longs(Tag::ImageLength.code(), &[height as u32]),
                self.shorts(Tag::BitsPerSample.code(), &[self.bits_per_sample]),
                self.shorts(Tag::Compression.code(), &[1]),
                self.shorts(Tag::PhotometricInterpretation.code(), &[1]),
                self.longs(Tag::StripOffsets.code(), &offsets),
                self.shorts(Tag::SamplesPerPixel.code(), &[1]),
                self.longs(
                    Tag::RowsPerStrip.code(),
                    &[self.declared_rows_per_strip.unwrap_or(rows as u32)],
                ),
                self.longs(Tag::StripByteCounts.code(), &counts),
                self.rational(Tag::XResolution.code(), PIXELS_PER_CM, 1),
                self.rational(Tag::YResolution.code(), PIXELS_PER_CM, 1),
                self.shorts(Tag::ResolutionUnit.code(), &[3]),
                self.ascii(Tag::Software.code(), "smlm", true),
                self.shorts(Tag::SampleFormat.code(), &[1]),
            ];
            if let Some(text) = &self.description {
                entries.push(self.ascii(
                    Tag::ImageDescription.code(),
                    text,
                    self.terminate_description,
                ));
            }
            for &(tag, value) in &self.extra_shorts {
                entries.push(self.shorts(tag, &[value]));
            }
            entries.sort_by_key(|entry| entry.tag);

            // Out-of-line values first, then the directory itself
            let mut payloads = Vec::with_capacity(entries.len());
            for entry in &entries {
                if entry.data.len() <= 4 {
                    let mut inline = [0u8; 4];
                    inline[..entry.data.len()].copy_from_slice(&entry.data);
                    payloads.push(inline);
                } else {
                    align_to_word(&mut out);
                    payloads.push(order.u32_bytes(out.len() as u32));
                    out.extend_from_slice(&entry.data);
                }
            }

            align_to_word(&mut out);
            let directory = out.len() as u32;
            out[link..link + 4].copy_from_slice(&order.u32_bytes(directory));

            out.extend_from_slice(&order.u16_bytes(entries.len() as u16));
            for (entry, payload) in entries.iter().zip(&payloads) {
                out.extend_from_slice(&order.u16_bytes(entry.tag));
                out.extend_from_slice(&order.u16_bytes(entry.field_type.code()));
                out.extend_from_slice(&order.u32_bytes(entry.count));
                out.extend_from_slice(payload);
            }
            link = out.len();
            out.extend_from_slice(&[0; 4]);
        }

        out
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.build())
    }

    fn shorts(&self, tag: u16, values: &[u16]) -> RawEntry {
        RawEntry {
            tag,
            field_type: FieldType::Short,
            count: values.len() as u32,
            data: values
                .iter()
                .flat_map(|&v| self.order.u16_bytes(v))
                .collect(),
        }
    }

    fn longs(&self, tag: u16, values: &[u32]) -> RawEntry {
        RawEntry {
            tag,
            field_type: FieldType::Long,
            count: values.len() as u32,
            data: values
                .iter()
                .flat_map(|&v| self.order.u32_bytes(v))
                .collect(),
        }
    }

    fn rational(&self, tag: u16, numerator: u32, denominator: u32) -> RawEntry {
        let mut data = self.order.u32_bytes(numerator).to_vec();
        data.extend_from_slice(&self.order.u32_bytes(denominator));
        RawEntry {
            tag,
            field_type: FieldType::Rational,
            count: 1,
            data,
        }
    }

    fn ascii(&self, tag: u16, text: &str, terminated: bool) -> RawEntry {
        let mut data = text.as_bytes().to_vec();
        if terminated {
            data.push(0);
        }
        RawEntry {
            tag,
            field_type: FieldType::Ascii,
            count: data.len() as u32,
            data,
        }
    }
}

fn align_to_word(out: &mut Vec<u8>) {
    if out.len() % 2 == 1 {
        out.push(0);
    }
}

/// Ideal point emitter for rendering synthetic frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emitter {
    /// Center column in pixels
    pub x: f64,
    /// Center row in pixels
    pub y: f64,
    /// Gaussian sigma in pixels
    pub sigma: f64,
    /// Integrated photon count
    pub photons: f64,
}

impl Emitter {
    pub fn new(x: f64, y: f64, sigma: f64, photons: f64) -> Self {
        Self {
            x,
            y,
            sigma,
            photons,
        }
    }

    /// PSF parameter vector for this emitter with zero background
    pub fn parameters(&self) -> ParameterVector {
        PsfParameters {
            x: self.x,
            y: self.y,
            width: self.sigma.sqrt(),
            sqrt_amplitude: self.photons.sqrt(),
            sqrt_background: 0.0,
        }
        .to_vector()
    }
}

/// Render noise-free emitters over a flat background, in photons per pixel
pub fn render_emitters(
    width: usize,
    height: usize,
    emitters: &[Emitter],
    background: f64,
) -> Array2<f64> {
    let parameters: Vec<_> = emitters.iter().map(Emitter::parameters).collect();
    Array2::from_shape_fn((height, width), |(y, x)| {
        background
            + parameters
                .iter()
                .map(|p| integrated_gaussian(x as f64, y as f64, p))
                .sum::<f64>()
    })
}

/// Quantize a photon image to raw 16-bit counts for a given photon scale
pub fn to_counts(photons: &Array2<f64>, photon_scale: f64) -> Array2<u16> {
    photons.mapv(|v| (v / photon_scale).round().clamp(0.0, u16::MAX as f64) as u16)
}

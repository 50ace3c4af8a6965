//! Decoder for uncompressed 16-bit grayscale TIFF stacks
//!
//! Covers the subset of baseline TIFF written by camera acquisition software:
//! one sample per pixel, 16 bits per sample, pixel data in one or more strips,
//! one image directory per frame, in either byte order.
//!
//! # Usage
//!
//! ```no_run
//! use smlm::tiff::TiffReader;
//!
//! let mut reader = TiffReader::open("stack.tif")?;
//! for frame in reader.frames() {
//!     let frame = frame?;
//!     println!("frame {} is {}x{}", frame.index, frame.width(), frame.height());
//! }
//! # Ok::<(), smlm::tiff::TiffError>(())
//! ```

mod endian;
mod entry;
mod metadata;
mod tags;

pub use endian::Endianness;
pub use entry::{DirectoryEntry, FieldType, ENTRY_SIZE};
pub use metadata::{FrameMetadata, Rational, StripLayout};
pub use tags::{Compression, Photometric, ResolutionUnit, SampleFormat, Tag};

use crate::frame::Frame;
use ndarray::Array2;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use thiserror::Error;

/// Check constant following the byte-order marker
pub const TIFF_MAGIC: u16 = 42;

/// Errors raised while decoding a container
#[derive(Error, Debug)]
pub enum TiffError {
    #[error("Malformed TIFF: {0}")]
    Format(String),

    #[error("Unsupported TIFF layout: {0}")]
    UnsupportedFormat(String),

    #[error("Size mismatch in {what}: expected {expected}, found {actual}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Required tag {0:?} not present in directory")]
    MissingTag(Tag),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// One parsed image directory
#[derive(Debug, Clone, PartialEq)]
pub struct Directory {
    pub metadata: FrameMetadata,
    /// Offset of the following directory, 0 when this is the last one
    pub next_offset: u32,
}

/// Positioned reader over a TIFF container.
///
/// All reads seek explicitly, so one reader must not be shared between
/// concurrent consumers.
pub struct TiffReader<R> {
    reader: R,
    order: Endianness,
    first_directory: u32,
}

impl TiffReader<BufReader<File>> {
    /// Open a file and read its header
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TiffError> {
        let file = File::open(path)?;
        Self::start(BufReader::new(file))
    }
}

impl<R: Read + Seek> TiffReader<R> {
    /// Read the 8-byte header: byte-order marker, check constant and first directory offset.
    pub fn start(mut reader: R) -> Result<Self, TiffError> {
        reader.seek(SeekFrom::Start(0))?;

        let mut marker = [0u8; 2];
        reader.read_exact(&mut marker)?;
        let order = Endianness::from_marker(marker).ok_or_else(|| {
            TiffError::Format(format!("unrecognized byte order marker {marker:02x?}"))
        })?;

        let check = order.read_u16(&mut reader)?;
        log::debug!(
            "TIFF header [{}]: check {check}, byte swap {}",
            String::from_utf8_lossy(&marker),
            order.needs_swap()
        );
        if check != TIFF_MAGIC {
            return Err(TiffError::Format(format!(
                "check constant {check}, expected {TIFF_MAGIC}"
            )));
        }

        let first_directory = order.read_u32(&mut reader)?;
        log::debug!("first directory at {first_directory}");

        Ok(Self {
            reader,
            order,
            first_directory,
        })
    }

    pub fn byte_order(&self) -> Endianness {
        self.order
    }

    pub fn first_directory(&self) -> u32 {
        self.first_directory
    }

    /// Parse the directory at `offset` into fresh metadata.
    ///
    /// Unrecognized tags are logged and skipped.
    pub fn parse_directory(&mut self, offset: u32) -> Result<Directory, TiffError> {
        self.reader.seek(SeekFrom::Start(offset as u64))?;
        let entry_count = self.order.read_u16(&mut self.reader)?;
        log::debug!("directory at {offset}: {entry_count} entries");

        let entries = (0..entry_count)
            .map(|_| DirectoryEntry::read(&mut self.reader, self.order))
            .collect::<Result<Vec<_>, _>>()?;
        let next_offset = self.order.read_u32(&mut self.reader)?;

        let mut metadata = FrameMetadata::default();
        for entry in &entries {
            match Tag::from_code(entry.tag) {
                Some(tag) => self.apply_entry(&mut metadata, tag, entry)?,
                None => log::info!("unprocessed tag: {}", entry.tag),
            }
        }

        log::debug!("next directory: {next_offset}");
        Ok(Directory {
            metadata,
            next_offset,
        })
    }

    fn apply_entry(
        &mut self,
        metadata: &mut FrameMetadata,
        tag: Tag,
        entry: &DirectoryEntry,
    ) -> Result<(), TiffError> {
        match tag {
            Tag::ImageWidth => metadata.width = Some(self.scalar(entry)?),
            Tag::ImageLength => metadata.height = Some(self.scalar(entry)?),
            Tag::BitsPerSample => metadata.bits_per_sample = self.shorts(entry)?,
            Tag::Compression => {
                metadata.compression = Some(Compression::from_code(self.short(entry)?))
            }
            Tag::PhotometricInterpretation => {
                metadata.photometric = Some(Photometric::from_code(self.short(entry)?))
            }
            Tag::FillOrder => metadata.fill_order = Some(self.short(entry)?),
            Tag::ImageDescription => metadata.description = Some(self.string(entry)?),
            Tag::StripOffsets => metadata.strip_offsets = self.offsets(entry)?,
            Tag::Orientation => metadata.orientation = Some(self.short(entry)?),
            Tag::SamplesPerPixel => metadata.samples_per_pixel = Some(self.short(entry)?),
            Tag::RowsPerStrip => metadata.rows_per_strip = Some(self.scalar(entry)?),
            Tag::StripByteCounts => metadata.strip_byte_counts = self.offsets(entry)?,
            Tag::XResolution => metadata.x_resolution = Some(self.rational(entry)?),
            Tag::YResolution => metadata.y_resolution = Some(self.rational(entry)?),
            Tag::PlanarConfiguration => {
                metadata.planar_configuration = Some(self.short(entry)?)
            }
            Tag::ResolutionUnit => {
                metadata.resolution_unit = Some(ResolutionUnit::from_code(self.short(entry)?))
            }
            Tag::Software => metadata.software = Some(self.string(entry)?),
            Tag::SampleFormat => {
                metadata.sample_formats = self
                    .shorts(entry)?
                    .into_iter()
                    .map(SampleFormat::from_code)
                    .collect()
            }
            Tag::ImageId => metadata.image_id = Some(self.string(entry)?),
        }
        Ok(())
    }

    /// Read the pixels of a parsed directory as a (height, width) array.
    pub fn read_pixels(&mut self, metadata: &FrameMetadata) -> Result<Array2<u16>, TiffError> {
        let layout = metadata.strip_layout()?;

        let mut bytes = vec![0u8; layout.image_bytes];
        let mut filled = 0;
        for &(offset, count) in &layout.strips {
            self.reader.seek(SeekFrom::Start(offset))?;
            self.reader.read_exact(&mut bytes[filled..filled + count])?;
            filled += count;
        }

        let mut samples = vec![0u16; layout.width * layout.height];
        self.order.decode_u16_samples(&bytes, &mut samples);

        Array2::from_shape_vec((layout.height, layout.width), samples)
            .map_err(|e| TiffError::Format(e.to_string()))
    }

    /// Parse the directory at `offset` and decode its frame.
    pub fn read_frame(&mut self, offset: u32, index: usize) -> Result<(Frame, u32), TiffError> {
        let directory = self.parse_directory(offset)?;
        let pixels = self.read_pixels(&directory.metadata)?;
        Ok((Frame::new(index, pixels), directory.next_offset))
    }

    /// Iterate over every frame in directory-chain order.
    pub fn frames(&mut self) -> Frames<'_, R> {
        let next = self.first_directory;
        Frames {
            reader: self,
            next,
            index: 0,
            visited: HashSet::new(),
            done: false,
        }
    }

    /// Scalar integer record: LONG inline value, or the first SHORT of the payload
    fn scalar(&self, entry: &DirectoryEntry) -> Result<u32, TiffError> {
        match entry.field_type {
            FieldType::Long => Ok(entry.value_u32(self.order)),
            FieldType::Short => Ok(entry.first_u16(self.order) as u32),
            other => Err(type_error(entry, other, "SHORT or LONG")),
        }
    }

    fn short(&self, entry: &DirectoryEntry) -> Result<u16, TiffError> {
        let value = self.scalar(entry)?;
        u16::try_from(value).map_err(|_| {
            TiffError::Format(format!("tag {} value {value} exceeds 16 bits", entry.tag))
        })
    }

    fn shorts(&mut self, entry: &DirectoryEntry) -> Result<Vec<u16>, TiffError> {
        if entry.field_type != FieldType::Short {
            return Err(type_error(entry, entry.field_type, "SHORT"));
        }
        if entry.is_inline() {
            let packed = [entry.first_u16(self.order), entry.second_u16(self.order)];
            return Ok(packed[..entry.count as usize].to_vec());
        }
        self.seek_to_values(entry)?;
        (0..entry.count)
            .map(|_| Ok(self.order.read_u16(&mut self.reader)?))
            .collect()
    }

    fn longs(&mut self, entry: &DirectoryEntry) -> Result<Vec<u32>, TiffError> {
        if entry.field_type != FieldType::Long {
            return Err(type_error(entry, entry.field_type, "LONG"));
        }
        if entry.is_inline() {
            let inline = [entry.value_u32(self.order)];
            return Ok(inline[..entry.count as usize].to_vec());
        }
        self.seek_to_values(entry)?;
        (0..entry.count)
            .map(|_| Ok(self.order.read_u32(&mut self.reader)?))
            .collect()
    }

    /// Strip offset or byte count array, which writers store as SHORT or LONG
    fn offsets(&mut self, entry: &DirectoryEntry) -> Result<Vec<u32>, TiffError> {
        match entry.field_type {
            FieldType::Short => Ok(self.shorts(entry)?.into_iter().map(u32::from).collect()),
            _ => self.longs(entry),
        }
    }

    fn rational(&mut self, entry: &DirectoryEntry) -> Result<Rational, TiffError> {
        if entry.field_type != FieldType::Rational {
            return Err(type_error(entry, entry.field_type, "RATIONAL"));
        }
        self.seek_to_values(entry)?;
        let numerator = self.order.read_u32(&mut self.reader)?;
        let denominator = self.order.read_u32(&mut self.reader)?;
        Ok(Rational {
            numerator,
            denominator,
        })
    }

    /// ASCII record. A missing null terminator is tolerated with a warning.
    fn string(&mut self, entry: &DirectoryEntry) -> Result<String, TiffError> {
        if entry.field_type != FieldType::Ascii {
            return Err(type_error(entry, entry.field_type, "ASCII"));
        }
        let count = entry.count as usize;
        let bytes = if entry.is_inline() {
            entry.value[..count].to_vec()
        } else {
            self.seek_to_values(entry)?;
            let mut buffer = vec![0u8; count];
            self.reader.read_exact(&mut buffer)?;
            buffer
        };

        match bytes.last() {
            None | Some(0) => {}
            Some(_) => log::warn!("string for tag {} does not end with '\\0'", entry.tag),
        }

        let text = bytes.split(|&b| b == 0).next().unwrap_or(&[]);
        Ok(String::from_utf8_lossy(text).into_owned())
    }

    fn seek_to_values(&mut self, entry: &DirectoryEntry) -> Result<(), TiffError> {
        let offset = entry.value_u32(self.order) as u64;
        self.reader.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}

fn type_error(entry: &DirectoryEntry, found: FieldType, expected: &str) -> TiffError {
    TiffError::Format(format!(
        "tag {} has type {}, expected {expected}",
        entry.tag,
        found.code()
    ))
}

/// Iterator over the frames of a stack, see [`TiffReader::frames`].
///
/// Stops after the last directory or at the first error.
pub struct Frames<'a, R> {
    reader: &'a mut TiffReader<R>,
    next: u32,
    index: usize,
    visited: HashSet<u32>,
    done: bool,
}

impl<R: Read + Seek> Iterator for Frames<'_, R> {
    type Item = Result<Frame, TiffError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next == 0 {
            return None;
        }
        if !self.visited.insert(self.next) {
            self.done = true;
            return Some(Err(TiffError::Format(format!(
                "directory chain revisits offset {}",
                self.next
            ))));
        }

        match self.reader.read_frame(self.next, self.index) {
            Ok((frame, next)) => {
                self.next = next;
                self.index += 1;
                Some(Ok(frame))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TiffBuilder;
    use ndarray::Array2;
    use std::io::Cursor;

    fn ramp(width: usize, height: usize) -> Array2<u16> {
        Array2::from_shape_fn((height, width), |(y, x)| (y * 1000 + x * 7) as u16)
    }

    #[test]
    fn test_rejects_unknown_byte_order() {
        let bytes = b"XX\x2a\x00\x08\x00\x00\x00".to_vec();
        assert!(matches!(
            TiffReader::start(Cursor::new(bytes)),
            Err(TiffError::Format(_))
        ));
    }

    #[test]
    fn test_rejects_bad_check_constant() {
        let bytes = b"II\x2b\x00\x08\x00\x00\x00".to_vec();
        assert!(matches!(
            TiffReader::start(Cursor::new(bytes)),
            Err(TiffError::Format(_))
        ));
    }

    #[test]
    fn test_truncated_header_is_io_error() {
        let bytes = b"MM\x00".to_vec();
        assert!(matches!(
            TiffReader::start(Cursor::new(bytes)),
            Err(TiffError::Io(_))
        ));
    }

    #[test]
    fn test_parse_directory_reads_metadata() {
        let bytes = TiffBuilder::new(Endianness::Big)
            .description("synthetic stack")
            .page(ramp(6, 5))
            .build();
        let mut reader = TiffReader::start(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.byte_order(), Endianness::Big);

        let directory = reader.parse_directory(reader.first_directory()).unwrap();
        let metadata = &directory.metadata;
        assert_eq!(directory.next_offset, 0);
        assert_eq!(metadata.width, Some(6));
        assert_eq!(metadata.height, Some(5));
        assert_eq!(metadata.bits_per_sample, vec![16]);
        assert_eq!(metadata.samples_per_pixel, Some(1));
        assert_eq!(metadata.compression, Some(Compression::None));
        assert_eq!(metadata.photometric, Some(Photometric::BlackIsZero));
        assert_eq!(metadata.resolution_unit, Some(ResolutionUnit::Centimeter));
        assert_eq!(metadata.sample_formats, vec![SampleFormat::Unsigned]);
        assert_eq!(metadata.description.as_deref(), Some("synthetic stack"));
        assert_eq!(metadata.software.as_deref(), Some("smlm"));
        assert_eq!(
            metadata.x_resolution,
            Some(Rational {
                numerator: 125000,
                denominator: 1
            })
        );
    }

    #[test]
    fn test_unknown_tags_are_skipped() {
        let bytes = TiffBuilder::new(Endianness::Little)
            .extra_short(0x8769, 3)
            .page(ramp(3, 3))
            .build();
        let mut reader = TiffReader::start(Cursor::new(bytes)).unwrap();
        let frames: Vec<_> = reader.frames().collect::<Result<_, _>>().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].pixels, ramp(3, 3));
    }

    #[test]
    fn test_short_inline_string() {
        let bytes = TiffBuilder::new(Endianness::Little)
            .description("abc")
            .page(ramp(2, 2))
            .build();
        let mut reader = TiffReader::start(Cursor::new(bytes)).unwrap();
        let directory = reader.parse_directory(reader.first_directory()).unwrap();
        assert_eq!(directory.metadata.description.as_deref(), Some("abc"));
    }

    #[test]
    fn test_unterminated_string_is_kept() {
        let image = ramp(5, 4);
        let bytes = TiffBuilder::new(Endianness::Big)
            .unterminated_description("no terminator here")
            .page(image.clone())
            .build();
        let mut reader = TiffReader::start(Cursor::new(bytes)).unwrap();
        let directory = reader.parse_directory(reader.first_directory()).unwrap();
        assert_eq!(
            directory.metadata.description.as_deref(),
            Some("no terminator here")
        );
        assert_eq!(directory.metadata.software.as_deref(), Some("smlm"));

        let pixels = reader.read_pixels(&directory.metadata).unwrap();
        assert_eq!(pixels, image);
    }

    #[test]
    fn test_read_pixels_multi_strip() {
        let image = ramp(7, 9);
        for order in [Endianness::Little, Endianness::Big] {
            let bytes = TiffBuilder::new(order)
                .rows_per_strip(2)
                .page(image.clone())
                .build();
            let mut reader = TiffReader::start(Cursor::new(bytes)).unwrap();
            let directory = reader.parse_directory(reader.first_directory()).unwrap();
            assert_eq!(directory.metadata.strip_offsets.len(), 5);

            let pixels = reader.read_pixels(&directory.metadata).unwrap();
            assert_eq!(pixels, image);
        }
    }

    #[test]
    fn test_frames_walks_directory_chain() {
        let pages: Vec<_> = (0..3u16)
            .map(|i| Array2::from_elem((4, 5), i * 100 + 1))
            .collect();
        let mut builder = TiffBuilder::new(Endianness::Little);
        for page in &pages {
            builder = builder.page(page.clone());
        }
        let mut reader = TiffReader::start(Cursor::new(builder.build())).unwrap();

        let frames: Vec<_> = reader.frames().collect::<Result<_, _>>().unwrap();
        assert_eq!(frames.len(), 3);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index, i);
            assert_eq!(frame.pixels, pages[i]);
        }
    }

    #[test]
    fn test_directory_cycle_is_format_error() {
        let mut bytes = TiffBuilder::new(Endianness::Little)
            .page(ramp(2, 2))
            .build();
        // Point the directory's next-offset back at itself
        let first = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let entries = u16::from_le_bytes([bytes[first], bytes[first + 1]]) as usize;
        let next_field = first + 2 + entries * ENTRY_SIZE;
        bytes[next_field..next_field + 4].copy_from_slice(&(first as u32).to_le_bytes());

        let mut reader = TiffReader::start(Cursor::new(bytes)).unwrap();
        let results: Vec<_> = reader.frames().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(TiffError::Format(_))));
    }

    #[test]
    fn test_wrong_entry_type_is_format_error() {
        let mut reader = TiffReader::start(Cursor::new(
            TiffBuilder::new(Endianness::Little).page(ramp(2, 2)).build(),
        ))
        .unwrap();
        let entry = DirectoryEntry {
            tag: Tag::StripOffsets.code(),
            field_type: FieldType::Rational,
            count: 1,
            value: [8, 0, 0, 0],
        };
        assert!(matches!(reader.offsets(&entry), Err(TiffError::Format(_))));
        assert!(matches!(reader.string(&entry), Err(TiffError::Format(_))));
    }

    #[test]
    fn test_short_strip_arrays_accepted() {
        let mut reader = TiffReader::start(Cursor::new(
            TiffBuilder::new(Endianness::Big).page(ramp(2, 2)).build(),
        ))
        .unwrap();
        let entry = DirectoryEntry {
            tag: Tag::StripByteCounts.code(),
            field_type: FieldType::Short,
            count: 2,
            value: [0, 4, 0, 6],
        };
        assert_eq!(reader.offsets(&entry).unwrap(), vec![4, 6]);
    }
}

//! Decoding synthetic stacks written by the in-crate builder

use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::io::Cursor;

use smlm::test_util::TiffBuilder;
use smlm::tiff::{Endianness, TiffError, TiffReader};
use smlm::{LocalizationConfig, Localizer};

fn random_page(rng: &mut ChaCha8Rng, width: usize, height: usize) -> Array2<u16> {
    Array2::from_shape_fn((height, width), |_| rng.random())
}

fn decode_all(bytes: Vec<u8>) -> Result<Vec<Array2<u16>>, TiffError> {
    let mut reader = TiffReader::start(Cursor::new(bytes))?;
    reader
        .frames()
        .map(|frame| frame.map(|f| f.pixels))
        .collect()
}

#[test]
fn test_round_trip_single_and_multi_strip() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    for order in [Endianness::Little, Endianness::Big] {
        for rows_per_strip in [None, Some(1), Some(3), Some(7)] {
            let pages = vec![random_page(&mut rng, 13, 11), random_page(&mut rng, 13, 11)];
            let mut builder = TiffBuilder::new(order);
            if let Some(rows) = rows_per_strip {
                builder = builder.rows_per_strip(rows);
            }
            for page in &pages {
                builder = builder.page(page.clone());
            }

            let decoded = decode_all(builder.build()).unwrap();
            assert_eq!(decoded, pages, "{order:?} with {rows_per_strip:?} rows per strip");
        }
    }
}

#[test]
fn test_byte_orders_decode_identically() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let page = random_page(&mut rng, 20, 9);

    let little = TiffBuilder::new(Endianness::Little)
        .rows_per_strip(4)
        .page(page.clone())
        .build();
    let big = TiffBuilder::new(Endianness::Big)
        .rows_per_strip(4)
        .page(page.clone())
        .build();
    assert_ne!(little, big);

    let little = decode_all(little).unwrap();
    let big = decode_all(big).unwrap();
    assert_eq!(little, big);
    assert_eq!(little[0], page);
}

#[test]
fn test_frames_are_indexed_in_chain_order() {
    let pages: Vec<_> = (0..4u16)
        .map(|i| Array2::from_elem((5, 6), i * 100))
        .collect();
    let mut builder = TiffBuilder::new(Endianness::Little);
    for page in &pages {
        builder = builder.page(page.clone());
    }

    let mut reader = TiffReader::start(Cursor::new(builder.build())).unwrap();
    let frames: Vec<_> = reader.frames().collect::<Result<_, _>>().unwrap();
    assert_eq!(frames.len(), 4);
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame.index, i);
        assert_eq!(frame.pixels[[2, 3]], i as u16 * 100);
    }
}

#[test]
fn test_malformed_strip_count_yields_no_particles() {
    // 9 rows in 5 strips of 2, declared as strips of 3
    let bytes = TiffBuilder::new(Endianness::Big)
        .rows_per_strip(2)
        .declared_rows_per_strip(3)
        .page(Array2::from_elem((9, 12), 100))
        .build();

    let result = decode_all(bytes.clone());
    assert!(matches!(
        result,
        Err(TiffError::SizeMismatch {
            expected: 3,
            actual: 5,
            ..
        })
    ));

    let localizer = Localizer::new(LocalizationConfig::default()).unwrap();
    let mut reader = TiffReader::start(Cursor::new(bytes)).unwrap();
    assert!(matches!(
        localizer.process_stack(&mut reader),
        Err(TiffError::SizeMismatch { .. })
    ));
}

#[test]
fn test_unsupported_bit_depth() {
    let bytes = TiffBuilder::new(Endianness::Little)
        .bits_per_sample(8)
        .page(Array2::zeros((4, 4)))
        .build();
    assert!(matches!(
        decode_all(bytes),
        Err(TiffError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_truncated_stream_is_io_error() {
    let mut bytes = TiffBuilder::new(Endianness::Little)
        .page(Array2::from_elem((8, 8), 7))
        .build();
    let first = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    bytes.truncate(first + 6);

    assert!(matches!(decode_all(bytes), Err(TiffError::Io(_))));
}

#[test]
fn test_bad_header() {
    assert!(matches!(
        TiffReader::start(Cursor::new(b"XX\x2a\x00\x08\x00\x00\x00".to_vec())),
        Err(TiffError::Format(_))
    ));
    assert!(matches!(
        TiffReader::start(Cursor::new(b"II\x2b\x00\x08\x00\x00\x00".to_vec())),
        Err(TiffError::Format(_))
    ));
}

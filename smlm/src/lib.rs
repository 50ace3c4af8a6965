//! Single-molecule localization microscopy
//!
//! Reads 16-bit TIFF stacks, finds candidate emitters in each frame with a
//! wavelet-style band-pass filter and a local-maximum scan, and fits an
//! integrated Gaussian PSF to every candidate by Poisson maximum likelihood.
//! Accepted fits are reported in nanometers and photons.
//!
//! ```no_run
//! use smlm::{LocalizationConfig, Localizer, TiffReader};
//!
//! let localizer = Localizer::new(LocalizationConfig::default())?;
//! let mut reader = TiffReader::open("stack.tif")?;
//! for result in localizer.process_stack(&mut reader)? {
//!     println!("frame {}: {} particles", result.frame, result.particles.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod fit;
pub mod frame;
pub mod image_proc;
pub mod output;
pub mod pipeline;
pub mod psf;
pub mod test_util;
pub mod tiff;

pub use config::{ConfigError, LocalizationConfig};
pub use fit::{Particle, Rejection};
pub use frame::Frame;
pub use output::{write_records, LocalizationRecord};
pub use pipeline::{FrameResult, Localizer};
pub use psf::PsfParameters;
pub use tiff::{TiffError, TiffReader};

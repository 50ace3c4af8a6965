//! Frame preprocessing and candidate detection
//!
//! Smooths each frame with a separable binomial kernel, derives a band-pass image
//! and a noise threshold, then scans the band-pass image for local maxima.

pub mod detection;
pub mod filter;

pub use detection::{detect_candidates, Candidate};
pub use filter::{convolve_separable, preprocess, FilteredFrame, SMOOTHING_KERNEL, WIDE_KERNEL};

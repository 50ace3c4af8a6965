//! Decoded camera frame.

use ndarray::{Array2, ArrayView2};

/// One decoded 16-bit frame of a stack
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Zero-based position in the stack
    pub index: usize,
    /// Raw intensities, shape (height, width), row-major
    pub pixels: Array2<u16>,
}

impl Frame {
    pub fn new(index: usize, pixels: Array2<u16>) -> Self {
        Self { index, pixels }
    }

    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    pub fn view(&self) -> ArrayView2<'_, u16> {
        self.pixels.view()
    }

    /// Raw intensities widened to f64
    pub fn to_f64(&self) -> Array2<f64> {
        self.pixels.mapv(f64::from)
    }
}

//! Separable smoothing, band-pass filtering and noise threshold estimation.

use ndarray::{Array2, ArrayView2, Zip};

/// Binomial smoothing kernel `[1, 4, 6, 4, 1] / 16`
pub const SMOOTHING_KERNEL: [f64; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

/// Smoothing kernel dilated by one pixel, `[1, 0, 4, 0, 6, 0, 4, 0, 1] / 16`
pub const WIDE_KERNEL: [f64; 9] = [
    1.0 / 16.0,
    0.0,
    4.0 / 16.0,
    0.0,
    6.0 / 16.0,
    0.0,
    4.0 / 16.0,
    0.0,
    1.0 / 16.0,
];

/// Output of [`preprocess`] for one frame
#[derive(Debug, Clone)]
pub struct FilteredFrame {
    /// Input smoothed once with [`SMOOTHING_KERNEL`]
    pub smoothed: Array2<f64>,
    /// `smoothed` minus its own [`WIDE_KERNEL`] smoothing
    pub band_pass: Array2<f64>,
    /// Detection threshold derived from the residual `input - smoothed`
    pub threshold: f64,
}

/// Convolve rows then columns with a symmetric odd-length kernel.
///
/// Output has the input's shape. Taps falling outside the image are dropped and
/// the remaining weights are not renormalized, so border pixels come out low.
pub fn convolve_separable(image: ArrayView2<f64>, kernel: &[f64]) -> Array2<f64> {
    let (rows, cols) = image.dim();
    let half = kernel.len() / 2;

    let mut horizontal = Array2::zeros((rows, cols));
    for y in 0..rows {
        for x in 0..cols {
            let mut sum = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let Some(col) = (x + k).checked_sub(half) else {
                    continue;
                };
                if col < cols {
                    sum += image[[y, col]] * weight;
                }
            }
            horizontal[[y, x]] = sum;
        }
    }

    let mut output = Array2::zeros((rows, cols));
    for y in 0..rows {
        for x in 0..cols {
            let mut sum = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let Some(row) = (y + k).checked_sub(half) else {
                    continue;
                };
                if row < rows {
                    sum += horizontal[[row, x]] * weight;
                }
            }
            output[[y, x]] = sum;
        }
    }

    output
}

/// Population mean and standard deviation of `image - smoothed` in one pass.
///
/// Variance is clamped at zero against rounding.
pub fn residual_statistics(image: ArrayView2<f64>, smoothed: ArrayView2<f64>) -> (f64, f64) {
    let count = image.len();
    if count == 0 {
        return (0.0, 0.0);
    }

    let mut sum = 0.0;
    let mut sum_squares = 0.0;
    Zip::from(image).and(smoothed).for_each(|&raw, &smooth| {
        let residual = raw - smooth;
        sum += residual;
        sum_squares += residual * residual;
    });

    let mean = sum / count as f64;
    let mean_square = sum_squares / count as f64;
    (mean, (mean_square - mean * mean).max(0.0).sqrt())
}

/// Smooth, band-pass and threshold one frame.
///
/// `threshold = threshold_factor * std(image - smoothed)`.
pub fn preprocess(image: ArrayView2<f64>, threshold_factor: f64) -> FilteredFrame {
    let smoothed = convolve_separable(image, &SMOOTHING_KERNEL);
    let (mean, std_dev) = residual_statistics(image, smoothed.view());
    let threshold = threshold_factor * std_dev;
    log::info!("threshold = {threshold:.4} (residual mean {mean:.4}, std {std_dev:.4})");

    let wide = convolve_separable(smoothed.view(), &WIDE_KERNEL);
    let band_pass = &smoothed - &wide;

    FilteredFrame {
        smoothed,
        band_pass,
        threshold,
    }
}

//! Pixel-integrated Gaussian PSF and its Poisson likelihood
//!
//! The model intensity of pixel (x, y) is
//!
//! ```text
//! psf(x, y) = Φx · Φy · a² + b²
//! Φx = ½ [erf((x − x0 + ½) / s) − erf((x − x0 − ½) / s)],   s = √2 · w²
//! ```
//!
//! with parameter vector `[x0, y0, w, a, b]`. Width, amplitude and background
//! enter squared, so any real parameter vector yields a non-negative model.

use libm::erf;
use ndarray::ArrayView2;
use std::f64::consts::SQRT_2;

/// Number of free parameters in the PSF model
pub const PARAMETER_COUNT: usize = 5;

/// Raw optimizer vector: `[x-offset, y-offset, width, sqrt-amplitude, sqrt-background]`
pub type ParameterVector = [f64; PARAMETER_COUNT];

/// Named view of a [`ParameterVector`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsfParameters {
    /// Center column, relative to the fit window origin
    pub x: f64,
    /// Center row, relative to the fit window origin
    pub y: f64,
    /// Square root of the Gaussian sigma in pixels
    pub width: f64,
    /// Square root of the integrated photon count
    pub sqrt_amplitude: f64,
    /// Square root of the per-pixel background in photons
    pub sqrt_background: f64,
}

impl PsfParameters {
    pub fn from_vector(p: &ParameterVector) -> Self {
        Self {
            x: p[0],
            y: p[1],
            width: p[2],
            sqrt_amplitude: p[3],
            sqrt_background: p[4],
        }
    }

    /// Inverse of [`PsfParameters::from_vector`]
    pub fn to_vector(&self) -> ParameterVector {
        [
            self.x,
            self.y,
            self.width,
            self.sqrt_amplitude,
            self.sqrt_background,
        ]
    }

    /// Gaussian sigma in pixels
    pub fn sigma(&self) -> f64 {
        self.width * self.width
    }

    /// Total photons in the spot
    pub fn amplitude(&self) -> f64 {
        self.sqrt_amplitude * self.sqrt_amplitude
    }

    /// Background photons per pixel
    pub fn background(&self) -> f64 {
        self.sqrt_background * self.sqrt_background
    }
}

/// Fraction of a 1D Gaussian centered at `center` that falls in the unit pixel at `coord`.
///
/// `scale` is `√2 · σ`.
pub fn pixel_fraction(coord: f64, center: f64, scale: f64) -> f64 {
    0.5 * (erf((coord - center + 0.5) / scale) - erf((coord - center - 0.5) / scale))
}

/// Model intensity of pixel (x, y)
pub fn integrated_gaussian(x: f64, y: f64, p: &ParameterVector) -> f64 {
    let scale = SQRT_2 * p[2] * p[2];
    pixel_fraction(x, p[0], scale) * pixel_fraction(y, p[1], scale) * p[3] * p[3] + p[4] * p[4]
}

/// Negative Poisson log-likelihood of a photon-count window under the PSF model.
///
/// Window coordinates are (row, column) = (y, x) with the origin at the top-left
/// pixel. Each call to [`PoissonLikelihood::evaluate`] is counted.
#[derive(Debug)]
pub struct PoissonLikelihood<'a> {
    window: ArrayView2<'a, f64>,
    evaluations: usize,
    column_fractions: Vec<f64>,
    row_fractions: Vec<f64>,
}

impl<'a> PoissonLikelihood<'a> {
    pub fn new(window: ArrayView2<'a, f64>) -> Self {
        let (rows, cols) = window.dim();
        Self {
            window,
            evaluations: 0,
            column_fractions: vec![0.0; cols],
            row_fractions: vec![0.0; rows],
        }
    }

    /// `−Σ (data · ln(psf) − psf)` over the window.
    ///
    /// Returns +inf when the model is not strictly positive somewhere in the window.
    pub fn evaluate(&mut self, p: &ParameterVector) -> f64 {
        self.evaluations += 1;

        let scale = SQRT_2 * p[2] * p[2];
        let amplitude = p[3] * p[3];
        let background = p[4] * p[4];

        for (x, fraction) in self.column_fractions.iter_mut().enumerate() {
            *fraction = pixel_fraction(x as f64, p[0], scale);
        }
        for (y, fraction) in self.row_fractions.iter_mut().enumerate() {
            *fraction = pixel_fraction(y as f64, p[1], scale);
        }

        let mut log_likelihood = 0.0;
        for ((y, x), &data) in self.window.indexed_iter() {
            let model = self.column_fractions[x] * self.row_fractions[y] * amplitude + background;
            if model.is_nan() || model <= 0.0 {
                return f64::INFINITY;
            }
            log_likelihood += data * model.ln() - model;
        }
        -log_likelihood
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    #[test]
    fn test_pixel_fractions_sum_to_one() {
        let scale = SQRT_2 * 1.3;
        let total: f64 = (-20..=20)
            .map(|x| pixel_fraction(x as f64, 0.3, scale))
            .sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_integrated_gaussian_is_symmetric() {
        let p = [4.0, 4.0, 1.2, 10.0, 1.0];
        assert_relative_eq!(
            integrated_gaussian(3.0, 4.0, &p),
            integrated_gaussian(5.0, 4.0, &p),
            epsilon = 1e-12
        );
        assert!(integrated_gaussian(4.0, 4.0, &p) > integrated_gaussian(5.0, 5.0, &p));
        // Far from the center only the background remains
        assert_relative_eq!(integrated_gaussian(40.0, 40.0, &p), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_squared_parameters_are_sign_free() {
        let p = [4.0, 4.0, 1.2, 10.0, 1.0];
        let flipped = [4.0, 4.0, -1.2, -10.0, -1.0];
        assert_relative_eq!(
            integrated_gaussian(3.0, 5.0, &p),
            integrated_gaussian(3.0, 5.0, &flipped)
        );

        let named = PsfParameters::from_vector(&flipped);
        assert_relative_eq!(named.sigma(), 1.44, epsilon = 1e-12);
        assert_relative_eq!(named.amplitude(), 100.0);
        assert_relative_eq!(named.background(), 1.0);
        assert_eq!(named.to_vector(), flipped);
    }

    #[test]
    fn test_likelihood_is_smallest_at_truth() {
        let truth = [4.2, 3.9, 1.1, 30.0, 2.0];
        let window = Array2::from_shape_fn((9, 9), |(y, x)| {
            integrated_gaussian(x as f64, y as f64, &truth)
        });
        let mut likelihood = PoissonLikelihood::new(window.view());

        let at_truth = likelihood.evaluate(&truth);
        for (axis, delta) in [(0, 0.3), (1, -0.3), (2, 0.1), (3, 2.0), (4, 0.5)] {
            let mut moved = truth;
            moved[axis] += delta;
            assert!(likelihood.evaluate(&moved) > at_truth, "axis {axis}");
        }
        assert_eq!(likelihood.evaluations(), 6);
    }

    #[test]
    fn test_likelihood_matches_direct_sum() {
        let window = Array2::from_shape_fn((5, 5), |(y, x)| (x + 2 * y) as f64);
        let p = [2.0, 2.5, 1.0, 8.0, 1.5];
        let mut likelihood = PoissonLikelihood::new(window.view());

        let mut expected = 0.0;
        for ((y, x), &data) in window.indexed_iter() {
            let model = integrated_gaussian(x as f64, y as f64, &p);
            expected -= data * model.ln() - model;
        }
        assert_relative_eq!(likelihood.evaluate(&p), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_zero_model_is_infinite() {
        let window = Array2::from_elem((3, 3), 1.0);
        let mut likelihood = PoissonLikelihood::new(window.view());
        assert_eq!(likelihood.evaluate(&[1.0, 1.0, 1.0, 0.0, 0.0]), f64::INFINITY);
    }
}

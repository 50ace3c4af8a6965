//! Per-candidate maximum likelihood PSF fitting
//!
//! Each candidate gets a square window of side `2 * fit_radius + 1` cropped from
//! the photon-count image. The Poisson likelihood of the window is minimized with
//! Nelder-Mead from a guess at the window center, and the fit is kept only if it
//! passes [`check_plausibility`].

use ndarray::{s, ArrayView2};
use smlm_math::Minimum;
use std::fmt;

use crate::config::LocalizationConfig;
use crate::image_proc::Candidate;
use crate::psf::{ParameterVector, PoissonLikelihood, PsfParameters, PARAMETER_COUNT};

/// A fitted, plausibility-accepted emitter
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// Zero-based frame index
    pub frame: usize,
    /// Detection column
    pub x: usize,
    /// Detection row
    pub y: usize,
    /// Fitted parameters relative to the window origin
    pub params: PsfParameters,
    /// Half-width of the window the fit ran in
    pub fit_radius: usize,
    pub iterations: usize,
    pub evaluations: usize,
    /// False if the minimizer stopped on its iteration cap
    pub converged: bool,
}

impl Particle {
    /// Sub-pixel column in frame coordinates
    pub fn position_x(&self) -> f64 {
        self.x as f64 - self.fit_radius as f64 + self.params.x
    }

    /// Sub-pixel row in frame coordinates
    pub fn position_y(&self) -> f64 {
        self.y as f64 - self.fit_radius as f64 + self.params.y
    }
}

/// Why a converged fit was discarded
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// Center drifted more than half the fit radius from the window center
    Offset { x: f64, y: f64 },
    /// Width parameter outside the accepted range
    Width(f64),
    /// |sqrt-amplitude| above the configured cap
    Amplitude(f64),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offset { x, y } => write!(f, "center ({x:.3}, {y:.3}) too far from window center"),
            Self::Width(width) => write!(f, "width parameter {width:.3} out of range"),
            Self::Amplitude(amplitude) => {
                write!(f, "amplitude parameter {amplitude:.3} exceeds limit")
            }
        }
    }
}

/// Accept or reject fitted window parameters.
///
/// With `r = fit_radius` and `h = r / 2` (integer division):
/// x and y offsets must lie in `[r - h, r + h]`, the width parameter in
/// `[min_width_param, h]`, and `|sqrt-amplitude|` must not exceed `max_amplitude_param`.
pub fn check_plausibility(
    params: &PsfParameters,
    config: &LocalizationConfig,
) -> Result<(), Rejection> {
    let center = config.fit_radius as f64;
    let half = (config.fit_radius / 2) as f64;

    let in_window = |offset: f64| offset >= center - half && offset <= center + half;
    if !in_window(params.x) || !in_window(params.y) {
        return Err(Rejection::Offset {
            x: params.x,
            y: params.y,
        });
    }
    if !(params.width >= config.min_width_param && params.width <= half) {
        return Err(Rejection::Width(params.width));
    }
    if !(params.sqrt_amplitude.abs() <= config.max_amplitude_param) {
        return Err(Rejection::Amplitude(params.sqrt_amplitude));
    }
    Ok(())
}

/// Starting point for a window: its center, the configured width, and amplitude and
/// background from the window's extremes.
pub fn initial_guess(window: ArrayView2<f64>, config: &LocalizationConfig) -> ParameterVector {
    let (min, max) = window
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let center = config.fit_radius as f64;
    [
        center,
        center,
        config.initial_sigma.sqrt(),
        (max - min).max(0.0).sqrt(),
        min.max(0.0).sqrt(),
    ]
}

/// Minimize the Poisson likelihood of one window.
///
/// Returns the minimizer outcome and the number of likelihood evaluations.
pub fn fit_window(
    window: ArrayView2<f64>,
    config: &LocalizationConfig,
) -> (Minimum<PARAMETER_COUNT>, usize) {
    let start = initial_guess(window, config);
    let mut likelihood = PoissonLikelihood::new(window);
    let minimum = config
        .minimizer
        .minimize(|p| likelihood.evaluate(p), start, config.initial_steps);
    (minimum, likelihood.evaluations())
}

/// Fit one candidate in a photon-count image and apply the plausibility filter.
///
/// `None` if the window would leave the image or the fit is rejected.
pub fn fit_candidate(
    photons: ArrayView2<f64>,
    candidate: Candidate,
    frame: usize,
    config: &LocalizationConfig,
) -> Option<Particle> {
    let radius = config.fit_radius;
    let (height, width) = photons.dim();
    let Candidate { x, y } = candidate;
    if x < radius || y < radius || x + radius >= width || y + radius >= height {
        log::warn!("candidate ({x}, {y}) too close to the frame edge for a fit window");
        return None;
    }

    let window = photons.slice(s![y - radius..=y + radius, x - radius..=x + radius]);
    let (minimum, evaluations) = fit_window(window, config);
    let params = PsfParameters::from_vector(&minimum.point);

    log::debug!(
        "frame {frame} candidate ({x}, {y}): {} iterations, {evaluations} evaluations, {:?}",
        minimum.iterations,
        minimum.termination
    );

    if let Err(rejection) = check_plausibility(&params, config) {
        log::debug!("frame {frame} candidate ({x}, {y}) rejected: {rejection}");
        return None;
    }

    Some(Particle {
        frame,
        x,
        y,
        params,
        fit_radius: radius,
        iterations: minimum.iterations,
        evaluations,
        converged: minimum.converged(),
    })
}

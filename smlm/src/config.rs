//! Localization settings with JSON persistence.

use serde::{Deserialize, Serialize};
use smlm_math::NelderMead;
use std::path::Path;
use thiserror::Error;

use crate::psf::ParameterVector;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for detection, fitting and output.
///
/// Missing fields in a JSON file fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizationConfig {
    /// Raw intensity to photon count factor
    pub photon_scale: f64,
    /// Physical pixel size in nanometers
    pub pixel_size_nm: f64,
    /// Half-width of the square fit window, also the detection margin
    pub fit_radius: usize,
    /// Multiplier on the residual standard deviation for the detection threshold
    pub threshold_factor: f64,
    /// Starting Gaussian sigma in pixels
    pub initial_sigma: f64,
    /// Initial simplex steps per parameter
    pub initial_steps: ParameterVector,
    /// Largest accepted |sqrt-amplitude|
    pub max_amplitude_param: f64,
    /// Smallest accepted width parameter (square root of sigma)
    pub min_width_param: f64,
    pub minimizer: NelderMead,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            photon_scale: 3.6,
            pixel_size_nm: 80.0,
            fit_radius: 4,
            threshold_factor: 1.5,
            initial_sigma: 1.6,
            initial_steps: [1.0, 1.0, 0.2, 1.0, 1.0],
            max_amplitude_param: 1000.0,
            min_width_param: 0.5,
            minimizer: NelderMead::default(),
        }
    }
}

impl LocalizationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!(
                    "{name} must be positive and finite, got {value}"
                )))
            }
        }

        if self.fit_radius == 0 {
            return Err(ConfigError::Invalid(
                "fit_radius must be at least 1".to_string(),
            ));
        }
        positive("photon_scale", self.photon_scale)?;
        positive("pixel_size_nm", self.pixel_size_nm)?;
        positive("initial_sigma", self.initial_sigma)?;
        positive("max_amplitude_param", self.max_amplitude_param)?;

        if !(self.threshold_factor >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "threshold_factor must be non-negative, got {}",
                self.threshold_factor
            )));
        }
        if !(self.min_width_param >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "min_width_param must be non-negative, got {}",
                self.min_width_param
            )));
        }
        if self.initial_steps.iter().any(|step| !step.is_finite()) {
            return Err(ConfigError::Invalid(
                "initial_steps must be finite".to_string(),
            ));
        }

        let minimizer = &self.minimizer;
        if !(minimizer.value_tolerance >= 0.0) || !(minimizer.position_tolerance >= 0.0) {
            return Err(ConfigError::Invalid(
                "minimizer tolerances must be non-negative".to_string(),
            ));
        }

        Ok(())
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file and validate
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

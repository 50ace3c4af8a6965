//! Localization table in physical units.

use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::fit::Particle;

/// One row of the localization table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizationRecord {
    /// One-based frame number
    pub frame: usize,
    pub x_nm: f64,
    pub y_nm: f64,
    /// Gaussian sigma in nanometers
    pub sigma_nm: f64,
    /// Integrated photon count
    pub photons: f64,
    /// Background photons per pixel
    pub background: f64,
}

impl LocalizationRecord {
    pub fn from_particle(particle: &Particle, pixel_size_nm: f64) -> Self {
        Self {
            frame: particle.frame + 1,
            x_nm: particle.position_x() * pixel_size_nm,
            y_nm: particle.position_y() * pixel_size_nm,
            sigma_nm: particle.params.sigma() * pixel_size_nm,
            photons: particle.params.amplitude(),
            background: particle.params.background(),
        }
    }
}

/// Write records as CSV with a header row.
pub fn write_records<W: Write>(writer: W, records: &[LocalizationRecord]) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

//! Numerical primitives shared by the localization pipeline.
//!
//! Currently provides a dimension-generic Nelder-Mead simplex minimizer.

pub mod nelder_mead;

pub use nelder_mead::{Minimum, NelderMead, Termination};

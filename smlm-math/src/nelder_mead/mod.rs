//! Nelder-Mead downhill simplex minimization
//!
//! Derivative-free minimizer for a scalar objective over a fixed-size parameter
//! vector. The dimension is a const generic so parameter vectors live on the stack
//! and the objective is any `FnMut(&[f64; N]) -> f64`.
//!
//! The step logic follows the classic reflect / expand / contract / shrink scheme
//! with one deviation: when the reflected point only beats the worst vertex and
//! contracting towards it does not improve on the reflection, the reflection is
//! accepted instead of shrinking the simplex.
//!
//! # Usage
//!
//! ```rust
//! use smlm_math::NelderMead;
//!
//! let minimizer = NelderMead::default();
//! let result = minimizer.minimize(
//!     |p: &[f64; 2]| (p[0] - 1.0).powi(2) + (p[1] + 2.0).powi(2),
//!     [0.0, 0.0],
//!     [1.0, 1.0],
//! );
//! assert!(result.converged());
//! assert!((result.point[0] - 1.0).abs() < 1e-4);
//! ```

mod simplex;

use serde::{Deserialize, Serialize};
use simplex::{along, Ranking, Simplex};

/// Reflection coefficient
const REFLECTION: f64 = 1.0;
/// Expansion coefficient
const EXPANSION: f64 = 2.0;
/// Contraction coefficient (both inside and outside contraction)
const CONTRACTION: f64 = 0.5;
/// Shrink coefficient
const SHRINK: f64 = 0.5;

/// Why the minimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Both the value range and the vertex spread fell below tolerance
    Converged,
    /// The iteration cap was reached first
    MaxIterations,
}

/// Outcome of one minimization run.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum<const N: usize> {
    /// Best vertex found
    pub point: [f64; N],
    /// Objective value at `point`
    pub value: f64,
    /// Number of simplex steps taken
    pub iterations: usize,
    /// Number of objective evaluations, including the initial simplex
    pub evaluations: usize,
    /// Terminal state of the run
    pub termination: Termination,
}

impl<const N: usize> Minimum<N> {
    /// True if the run stopped on tolerance rather than the iteration cap
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Nelder-Mead minimizer settings.
///
/// A minimizer holds no state between calls; each call to [`NelderMead::minimize`]
/// builds and discards its own simplex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NelderMead {
    /// Required spread of objective values across the simplex
    pub value_tolerance: f64,
    /// Required spread of vertex coordinates along every axis
    pub position_tolerance: f64,
    /// Maximum number of simplex steps
    pub max_iterations: usize,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            value_tolerance: 1e-5,
            position_tolerance: 1e-5,
            max_iterations: 1000,
        }
    }
}

impl NelderMead {
    /// Minimize `objective` starting from `start`.
    ///
    /// The initial simplex is `start` plus one vertex per axis displaced by the
    /// matching entry of `steps`. NaN objective values are treated as +inf so a
    /// vertex in an undefined region always ranks worst.
    ///
    /// Hitting the iteration cap is not an error: the best vertex found so far is
    /// returned with [`Termination::MaxIterations`], unless the final step left the
    /// simplex within tolerance.
    pub fn minimize<const N: usize, F>(
        &self,
        mut objective: F,
        start: [f64; N],
        steps: [f64; N],
    ) -> Minimum<N>
    where
        F: FnMut(&[f64; N]) -> f64,
    {
        let mut evaluations = 0usize;
        let mut eval = |p: &[f64; N]| {
            evaluations += 1;
            let value = objective(p);
            if value.is_nan() {
                f64::INFINITY
            } else {
                value
            }
        };

        if N == 0 {
            let value = eval(&start);
            return Minimum {
                point: start,
                value,
                iterations: 0,
                evaluations: 1,
                termination: Termination::Converged,
            };
        }

        let mut simplex = Simplex::new(start, steps, &mut eval);
        let mut termination = Termination::MaxIterations;
        let mut iterations = 0;

        while iterations < self.max_iterations {
            let rank = simplex.rank();
            let (best, worst, second_worst) = (rank.best, rank.worst, rank.second_worst);

            if self.within_tolerance(&simplex, &rank) {
                termination = Termination::Converged;
                break;
            }

            let worst_vertex = *simplex.vertex(worst);
            let centroid = simplex.centroid_excluding(worst);

            let reflected = along(&centroid, &worst_vertex, -REFLECTION);
            let reflected_value = eval(&reflected);

            if reflected_value < simplex.value(best) {
                let expanded = along(&centroid, &worst_vertex, -EXPANSION);
                let expanded_value = eval(&expanded);
                if expanded_value < reflected_value {
                    simplex.replace(worst, expanded, expanded_value);
                } else {
                    simplex.replace(worst, reflected, reflected_value);
                }
            } else if reflected_value < simplex.value(second_worst) {
                simplex.replace(worst, reflected, reflected_value);
            } else if reflected_value < simplex.value(worst) {
                // Outside contraction; keep the reflection rather than shrink
                let contracted = along(&centroid, &reflected, CONTRACTION);
                let contracted_value = eval(&contracted);
                if contracted_value < reflected_value {
                    simplex.replace(worst, contracted, contracted_value);
                } else {
                    simplex.replace(worst, reflected, reflected_value);
                }
            } else {
                let contracted = along(&centroid, &worst_vertex, CONTRACTION);
                let contracted_value = eval(&contracted);
                if contracted_value < simplex.value(worst) {
                    simplex.replace(worst, contracted, contracted_value);
                } else {
                    simplex.shrink_towards(best, SHRINK, &mut eval);
                }
            }

            iterations += 1;
        }

        let rank = simplex.rank();
        // The last step before the cap may itself have converged
        if termination == Termination::MaxIterations && self.within_tolerance(&simplex, &rank) {
            termination = Termination::Converged;
        }
        let best = rank.best;
        let point = *simplex.vertex(best);
        let value = simplex.value(best);

        log::trace!(
            "nelder-mead stopped after {iterations} iterations ({evaluations} evaluations), {termination:?}"
        );

        Minimum {
            point,
            value,
            iterations,
            evaluations,
            termination,
        }
    }

    /// Value range and vertex spread both below their tolerances
    fn within_tolerance<const N: usize>(&self, simplex: &Simplex<N>, rank: &Ranking) -> bool {
        simplex.value(rank.worst) - simplex.value(rank.best) < self.value_tolerance
            && simplex.max_spread() < self.position_tolerance
    }
}

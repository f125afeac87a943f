//! decoder — observation likelihood over a grid of candidate times.
//!
//! Purpose
//! -------
//! Score test observations against every candidate circular time on a grid,
//! under the model that features are conditionally independent Gaussians
//! given time, with per-feature mean and variance curves supplying the
//! moments. The returned grid implicitly defines a maximum-likelihood
//! decoder: the predicted time for an observation is the argmax over its
//! score row, performed by the caller.
//!
//! Key behaviors
//! -------------
//! - For each candidate time `t` and feature `j`: mean = mean curve at `t`,
//!   SD = `sqrt(max(variance curve at t, 0.0025))`, per-cell score = the
//!   Gaussian log-density of the test value.
//! - Per-observation, per-time score = weighted sum of log-densities over
//!   the observation's present features.
//! - Return natural-scale values unless `log_scale` is requested.
//!
//! Invariants & assumptions
//! ------------------------
//! - The variance floor (floor variance 0.0025, minimum SD 0.05) is a
//!   silent documented correction, not an error path: it is what makes the
//!   non-negativity gap in the general variance fit safe to consume.
//! - Missing test cells contribute nothing to their observation's score;
//!   under conditional independence the likelihood simply factorizes over
//!   the present features. A row with no present cells at all is rejected
//!   up front: its score would be constant over the grid, and an argmax on
//!   it meaningless.
//! - Default weights are uniform (1 per feature); the default grid spans
//!   the full period at resolution `0.01 · time_max`.
//!
//! Conventions
//! -----------
//! - The output matrix is `n_test × |time_grid|`, rows in observation
//!   order, columns in grid order.
//!
//! Testing notes
//! -------------
//! - Tests cover the log/linear correspondence, the SD floor under a
//!   negative variance prediction, argmax decoding of a known phase, and
//!   the missing-cell and weight semantics.

use ndarray::Array2;
use statrs::distribution::{Continuous, Normal};

use crate::circular::diff::validate_time_max;
use crate::curve::Predictable;
use crate::errors::{PhaseError, PhaseResult};
use crate::model::data::MaskedMatrix;
use crate::model::validation::validate_time_labels;

/// Variance floor applied before a variance prediction is used as a density
/// scale; corresponds to a minimum standard deviation of 0.05.
pub const VARIANCE_FLOOR: f64 = 0.0025;

/// Grid resolution of the default candidate grid, as a fraction of the
/// period.
const DEFAULT_GRID_STEP: f64 = 0.01;

/// DecodeOptions — configuration for likelihood scoring.
///
/// Fields
/// ------
/// - `beta`: `Option<Vec<f64>>`
///   Per-feature weights in the log-density sum; `None` means uniform
///   weight 1. Must be finite and match the feature count.
/// - `time_grid`: `Option<Vec<f64>>`
///   Candidate circular times; `None` means the full period at resolution
///   `0.01 · time_max`. Supplied grids must lie in `[0, time_max)`.
/// - `log_scale`: `bool`
///   Return log-likelihoods instead of exponentiated values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeOptions {
    pub beta: Option<Vec<f64>>,
    pub time_grid: Option<Vec<f64>>,
    pub log_scale: bool,
}

/// Score test observations against a grid of candidate circular times.
///
/// Parameters
/// ----------
/// - `x_test`: `&MaskedMatrix`
///   n_test × p test observations; cells may be absent.
/// - `mean_models`: `&[C]`
///   Per-feature mean curves, in column order.
/// - `var_models`: `&[C]`
///   Per-feature variance curves, in column order. Predictions are floored
///   at [`VARIANCE_FLOOR`] before use.
/// - `time_max`: `f64`
///   Period length.
/// - `options`: `&DecodeOptions`
///   Weights, grid, and output scale.
///
/// Returns
/// -------
/// `PhaseResult<Array2<f64>>`
///   n_test × |grid| matrix of (log-)likelihood scores.
///
/// Errors
/// ------
/// - `PhaseError::ShapeMismatch`
///   When model counts or the weight vector disagree with the feature
///   count.
/// - `PhaseError::EmptyInput`
///   When there are no test rows or no mean models.
/// - `PhaseError::EmptyTestRow`
///   When a test row has no present cells.
/// - `PhaseError::TimeOutOfRange` / `InvalidTimeMax`
///   For a malformed supplied grid or period.
/// - `PhaseError::NonFiniteValue`
///   When a weight is non-finite or a curve predicts a non-finite mean.
pub fn decode_likelihood<C: Predictable>(
    x_test: &MaskedMatrix, mean_models: &[C], var_models: &[C], time_max: f64,
    options: &DecodeOptions,
) -> PhaseResult<Array2<f64>> {
    validate_time_max(time_max)?;
    let p = mean_models.len();
    if p == 0 {
        return Err(PhaseError::EmptyInput("mean models"));
    }
    if x_test.nrows() == 0 {
        return Err(PhaseError::EmptyInput("test observations"));
    }
    if var_models.len() != p {
        return Err(PhaseError::ShapeMismatch {
            what: "variance models vs mean models",
            expected: p,
            actual: var_models.len(),
        });
    }
    if x_test.ncols() != p {
        return Err(PhaseError::ShapeMismatch {
            what: "test feature columns vs mean models",
            expected: p,
            actual: x_test.ncols(),
        });
    }
    for i in 0..x_test.nrows() {
        if (0..p).all(|j| x_test.get(i, j).is_none()) {
            return Err(PhaseError::EmptyTestRow { row: i });
        }
    }

    let beta = match &options.beta {
        Some(weights) => {
            if weights.len() != p {
                return Err(PhaseError::ShapeMismatch {
                    what: "feature weights vs mean models",
                    expected: p,
                    actual: weights.len(),
                });
            }
            for &w in weights {
                if !w.is_finite() {
                    return Err(PhaseError::NonFiniteValue { what: "feature weight", value: w });
                }
            }
            weights.clone()
        }
        None => vec![1.0; p],
    };

    let grid: Vec<f64> = match &options.time_grid {
        Some(grid) => {
            validate_time_labels(grid, time_max)?;
            grid.clone()
        }
        None => {
            let steps = (1.0 / DEFAULT_GRID_STEP).round() as usize;
            (0..steps).map(|k| k as f64 * DEFAULT_GRID_STEP * time_max).collect()
        }
    };

    // Per-feature, per-candidate densities are shared by every observation;
    // build them once.
    let mut densities = Vec::with_capacity(grid.len());
    for &t in &grid {
        let mut per_feature = Vec::with_capacity(p);
        for j in 0..p {
            let mu = mean_models[j].predict(t);
            if !mu.is_finite() {
                return Err(PhaseError::NonFiniteValue { what: "predicted mean", value: mu });
            }
            let sd = var_models[j].predict(t).max(VARIANCE_FLOOR).sqrt();
            let normal = Normal::new(mu, sd).map_err(|_| PhaseError::NonFiniteValue {
                what: "gaussian density scale",
                value: sd,
            })?;
            per_feature.push(normal);
        }
        densities.push(per_feature);
    }

    let mut out = Array2::zeros((x_test.nrows(), grid.len()));
    for i in 0..x_test.nrows() {
        for (g, per_feature) in densities.iter().enumerate() {
            let mut score = 0.0;
            for j in 0..p {
                if let Some(x) = x_test.get(i, j) {
                    score += beta[j] * per_feature[j].ln_pdf(x);
                }
            }
            out[(i, g)] = if options.log_scale { score } else { score.exp() };
        }
    }
    Ok(out)
}

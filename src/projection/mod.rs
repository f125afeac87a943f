//! projection — noise-normalized sparse components of the mean curves.
//!
//! Purpose
//! -------
//! Reduce the time-indexed feature-mean matrix to a small set of
//! interpretable components: discretize each fitted mean curve over one
//! period, center and noise-normalize per feature, then decompose with the
//! sparsity-constrained primitive or a plain SVD.
//!
//! Key behaviors
//! -------------
//! - Discretize at `n_time` equally spaced phases covering exactly one
//!   period: `k · time_max / n_time` for `k = 0 .. n_time-1`.
//! - Center each feature's discretized column by its own mean across the
//!   `n_time` points (not across observations).
//! - Scale each feature column by `1 / sqrt(mean squared residual)` so
//!   high- and low-noise features contribute equally before decomposition.
//! - Dispatch to the [`Decomposer`](sparse::Decomposer) seam when sparsity
//!   is requested, or to [`plain_svd`](sparse::plain_svd) otherwise.
//!
//! Invariants & assumptions
//! ------------------------
//! - The number of components never exceeds the number of discretization
//!   points (nor the feature count).
//! - Mean models and the residual matrix come from the same
//!   [`MeanFit`](crate::model::MeanFit); the residual mean squares are the
//!   noise scales of exactly these curves.
//! - A feature with zero mean squared residual has no defined noise scale
//!   and is rejected rather than silently amplified to infinity.
//!
//! Conventions
//! -----------
//! - Loadings are per feature (feature importance per component); scores are
//!   per phase (the component's waveform over the period).
//!
//! Testing notes
//! -------------
//! - Tests cover the centering and scaling arithmetic, equality of the
//!   dense path with a direct SVD of the prepared matrix, and option
//!   validation.

pub mod sparse;

pub use self::sparse::{plain_svd, Decomposer, Decomposition, PenalizedDecomposer};

use ndarray::Array2;

use crate::circular::diff::validate_time_max;
use crate::curve::Predictable;
use crate::errors::{PhaseError, PhaseResult};
use crate::model::data::MaskedMatrix;

/// ProjectOptions — configuration for component projection.
///
/// Fields
/// ------
/// - `n_time`: `usize`
///   Number of equally spaced discretization phases over one period.
/// - `sparsity`: `f64`
///   L1 budget on each unit-norm loading vector; feasible range
///   `[1, sqrt(p)]`. Ignored when `use_sparse` is false.
/// - `rank`: `Option<usize>`
///   Number of components to request; defaults to `n_time` and is capped
///   at `min(n_time, p)`.
/// - `orthogonal`: `bool`
///   Keep component score directions mutually orthogonal (sparse path;
///   the SVD path is orthogonal by construction).
/// - `use_sparse`: `bool`
///   Choose the sparsity-constrained primitive over the plain SVD.
///
/// Notes
/// -----
/// - `Default` gives 10 phases, budget 1.5, full rank, orthogonal sparse
///   decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectOptions {
    pub n_time: usize,
    pub sparsity: f64,
    pub rank: Option<usize>,
    pub orthogonal: bool,
    pub use_sparse: bool,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        ProjectOptions { n_time: 10, sparsity: 1.5, rank: None, orthogonal: true, use_sparse: true }
    }
}

/// ComponentSet — sparse components of the discretized mean curves.
///
/// Purpose
/// -------
/// Expose the projection result with its interpretation attached: which
/// features drive each component and what waveform the component traces
/// over the period.
///
/// Fields
/// ------
/// - `loadings`: `Array2<f64>` (p × k)
///   Per-feature loading weights per component.
/// - `scores`: `Array2<f64>` (n_time × k)
///   Per-phase component scores (waveforms), scaled by strength.
/// - `strengths`: `Vec<f64>`
///   Component magnitudes in extraction order.
/// - `phases`: `Vec<f64>`
///   The discretization phases the score rows correspond to.
///
/// Invariants
/// ----------
/// - `k <= min(n_time, p)`; the sparse path may return fewer components
///   than requested when the matrix deflates to zero early.
#[derive(Debug, Clone)]
pub struct ComponentSet {
    pub loadings: Array2<f64>,
    pub scores: Array2<f64>,
    pub strengths: Vec<f64>,
    pub phases: Vec<f64>,
}

/// Project fitted mean curves onto sparse, noise-normalized components.
///
/// Parameters
/// ----------
/// - `models`: `&[C]`
///   Per-feature fitted mean curves, in column order.
/// - `residuals`: `&MaskedMatrix`
///   Residual matrix of the same fit; supplies the per-feature noise
///   scales.
/// - `time_max`: `f64`
///   Period length the curves were fit over.
/// - `options`: `&ProjectOptions`
///   Discretization and decomposition configuration.
/// - `decomposer`: `&D`
///   Sparse decomposition primitive; only consulted when
///   `options.use_sparse` is set.
///
/// Returns
/// -------
/// `PhaseResult<ComponentSet>`
///   Components of the centered, noise-scaled discretized mean matrix.
///
/// Errors
/// ------
/// - `PhaseError::EmptyInput` when no models are supplied.
/// - `PhaseError::ShapeMismatch` when models and residual columns disagree.
/// - `PhaseError::InvalidOption` when `n_time == 0` or the sparse budget /
///   rank are out of range.
/// - `PhaseError::InsufficientData` when a feature has no present
///   residuals, `PhaseError::NonFiniteValue` when its noise scale
///   degenerates (zero mean squared residual).
pub fn project_components<C: Predictable, D: Decomposer>(
    models: &[C], residuals: &MaskedMatrix, time_max: f64, options: &ProjectOptions,
    decomposer: &D,
) -> PhaseResult<ComponentSet> {
    validate_time_max(time_max)?;
    if models.is_empty() {
        return Err(PhaseError::EmptyInput("mean models"));
    }
    if models.len() != residuals.ncols() {
        return Err(PhaseError::ShapeMismatch {
            what: "mean models vs residual columns",
            expected: residuals.ncols(),
            actual: models.len(),
        });
    }
    if options.n_time == 0 {
        return Err(PhaseError::InvalidOption {
            name: "n_time",
            detail: "need at least one discretization phase".to_string(),
        });
    }

    let phases: Vec<f64> =
        (0..options.n_time).map(|k| k as f64 * time_max / options.n_time as f64).collect();
    let prepared = discretize_and_scale(models, residuals, &phases)?;

    let rank = options.rank.unwrap_or(options.n_time);
    let decomposition = if options.use_sparse {
        decomposer.decompose(&prepared, options.sparsity, rank, options.orthogonal)?
    } else {
        plain_svd(&prepared)?
    };

    Ok(ComponentSet {
        loadings: decomposition.loadings,
        scores: decomposition.scores,
        strengths: decomposition.strengths,
        phases,
    })
}

/// Build the centered, noise-scaled discretized mean matrix.
///
/// Entry `(k, j)` is `(predict_j(phase_k) - column_mean_j) / sqrt(msr_j)`
/// where the column mean runs over the discretization phases and `msr_j` is
/// feature `j`'s mean squared residual over all observations.
fn discretize_and_scale<C: Predictable>(
    models: &[C], residuals: &MaskedMatrix, phases: &[f64],
) -> PhaseResult<Array2<f64>> {
    let n_time = phases.len();
    let p = models.len();
    let mut matrix = Array2::zeros((n_time, p));

    for (j, model) in models.iter().enumerate() {
        let column: Vec<f64> = phases.iter().map(|&t| model.predict(t)).collect();
        let mean = column.iter().sum::<f64>() / n_time as f64;

        let mean_sq = residuals
            .column_mean_sq(j)
            .ok_or(PhaseError::InsufficientData { feature: j, needed: 1, available: 0 })?;
        let scale = 1.0 / mean_sq.sqrt();
        if !scale.is_finite() {
            return Err(PhaseError::NonFiniteValue { what: "feature noise scale", value: scale });
        }

        for k in 0..n_time {
            matrix[(k, j)] = (column[k] - mean) * scale;
        }
    }
    Ok(matrix)
}

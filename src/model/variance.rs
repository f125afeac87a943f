//! model::variance — per-feature periodic variance curves.
//!
//! Purpose
//! -------
//! Estimate `E[residual²]` as a function of circular time for each feature,
//! either as a genuine periodic fit of squared residuals or as the constant
//! degenerate mode that pins a flat curve at the feature's mean squared
//! residual.
//!
//! Key behaviors
//! -------------
//! - Constant mode: compute the mean of squared present residuals per
//!   feature and fit a zero-harmonic curve through three fixed phase
//!   anchors (0, 0.3·time_max, 0.7·time_max) all holding that value. Going
//!   through the fitting primitive with a constant-capable basis guarantees
//!   a valid periodic curve object without relying on the primitive's
//!   general degrees of freedom.
//! - General mode: fit a periodic curve of squared present residuals
//!   against time, per feature, with the caller's smoothness settings.
//!
//! Invariants & assumptions
//! ------------------------
//! - Only present residual cells are consumed; a feature with zero present
//!   residuals is a hard error.
//! - Known gap, preserved deliberately: the general fit can predict
//!   negative values at some phases. No constraint enforces non-negativity
//!   at fit time; the likelihood decoder floors the prediction at
//!   evaluation time. Callers reading variance curves directly must apply
//!   their own floor.
//!
//! Conventions
//! -----------
//! - Verbosity is controlled by `FitOptions::quiet` on this call only; there
//!   is no process-wide suppression state.
//!
//! Testing notes
//! -------------
//! - Tests cover the constant-mode anchor value, the general mode tracking
//!   a time-varying noise profile, and the empty-feature error branch.

use tracing::debug;

use crate::curve::{CurveFitter, FitOptions};
use crate::errors::{PhaseError, PhaseResult};
use crate::model::data::MaskedMatrix;
use crate::model::mean::tag_feature;
use crate::model::validation::{validate_alignment, validate_time_labels};

/// Phase anchors (as fractions of the period) for the constant-variance fit.
const CONST_ANCHORS: [f64; 3] = [0.0, 0.3, 0.7];

/// Fit per-feature periodic variance curves from residuals.
///
/// Parameters
/// ----------
/// - `time`: `&[f64]`
///   Length-n circular time labels in `[0, time_max)`.
/// - `residuals`: `&MaskedMatrix`
///   n × p residual matrix from [`fit_mean`](crate::model::fit_mean);
///   absent cells are excluded per feature.
/// - `time_max`: `f64`
///   Period length.
/// - `const_var`: `bool`
///   When set, each feature gets a flat curve at its mean squared residual
///   instead of a time-varying fit.
/// - `fitter`: `&F`
///   Periodic fitting primitive.
/// - `options`: `&FitOptions`
///   Fitting configuration; the constant mode overrides the harmonic count
///   to zero but honors `ridge` and `quiet`.
///
/// Returns
/// -------
/// `PhaseResult<Vec<F::Curve>>`
///   One variance curve per feature, in column order.
///
/// Errors
/// ------
/// - `PhaseError::InsufficientData { feature, .. }`
///   When a feature has no present residuals (constant mode) or fewer
///   distinct usable time points than the fitter requires (general mode).
/// - `PhaseError::FitFailure { feature, .. }`
///   When the fitting primitive reports numerical failure.
/// - Validation variants as for [`fit_mean`](crate::model::fit_mean).
///
/// Notes
/// -----
/// - General-mode predictions are not constrained to be non-negative; the
///   decoder floors them at evaluation time (floor variance 0.0025).
pub fn fit_variance<F: CurveFitter>(
    time: &[f64], residuals: &MaskedMatrix, time_max: f64, const_var: bool, fitter: &F,
    options: &FitOptions,
) -> PhaseResult<Vec<F::Curve>> {
    validate_time_labels(time, time_max)?;
    validate_alignment(residuals, time)?;

    let p = residuals.ncols();
    let mut models = Vec::with_capacity(p);

    for feature in 0..p {
        let curve = if const_var {
            let mean_sq = residuals.column_mean_sq(feature).ok_or(
                PhaseError::InsufficientData { feature, needed: 1, available: 0 },
            )?;
            let xs: Vec<f64> = CONST_ANCHORS.iter().map(|&a| a * time_max).collect();
            let ys = vec![mean_sq; CONST_ANCHORS.len()];
            fitter
                .fit(&xs, &ys, time_max, &options.with_harmonics(0))
                .map_err(|err| tag_feature(err, feature))?
        } else {
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for (row, r) in residuals.column_present(feature) {
                xs.push(time[row]);
                ys.push(r * r);
            }
            fitter
                .fit(&xs, &ys, time_max, options)
                .map_err(|err| tag_feature(err, feature))?
        };
        models.push(curve);
    }

    if !options.quiet {
        debug!(features = p, const_var, "fitted variance curves");
    }

    Ok(models)
}

//! model::mean — per-feature periodic mean curves and residuals.
//!
//! Purpose
//! -------
//! Fit one periodic mean curve per feature against the circular time label
//! and assemble the residual matrix that every downstream component (variance
//! fitting, projection scaling, SNR) consumes.
//!
//! Key behaviors
//! -------------
//! - Mask each feature to its present rows, fit on the surviving
//!   `(time, value)` pairs, and record `predict(time) - observed` at exactly
//!   those rows; absent cells stay absent in the residual matrix.
//! - Surface a feature with too few usable points as
//!   `InsufficientData { feature, .. }` before any numerical work for that
//!   feature, and re-tag fitter-reported failures with the feature index.
//!
//! Invariants & assumptions
//! ------------------------
//! - The residual matrix has the same shape and the same mask as the input
//!   observations.
//! - The sign convention is predicted minus observed, preserved for signed
//!   diagnostics even though all internal consumers square it.
//! - Fitted models are immutable; `MeanFit` owns both the models and the
//!   residuals and is consumed read-only downstream.
//!
//! Testing notes
//! -------------
//! - Tests cover the exact residual convention, missing-cell propagation,
//!   recovery of a known periodic function, and the per-feature
//!   insufficient-data error.

use tracing::debug;

use crate::curve::{CurveFitter, FitOptions};
use crate::errors::{PhaseError, PhaseResult};
use crate::model::data::MaskedMatrix;
use crate::model::validation::{validate_alignment, validate_time_labels};

/// MeanFit — fitted mean curves plus the residual matrix they induce.
///
/// Purpose
/// -------
/// Bundle the per-feature mean models with the residuals of the fit so the
/// two can never drift apart: every consumer that scales by noise reads the
/// residuals that belong to exactly these models.
///
/// Fields
/// ------
/// - `models`: `Vec<C>`
///   One fitted periodic curve per feature, in column order.
/// - `residuals`: [`MaskedMatrix`]
///   `predict(time) - observed` at present cells, absent elsewhere; same
///   shape and mask as the input observations.
/// - `time_max`: `f64`
///   Period the curves were fit over.
///
/// Invariants
/// ----------
/// - `models.len() == residuals.ncols()`.
/// - Immutable once constructed; no refitting in place.
#[derive(Debug, Clone)]
pub struct MeanFit<C> {
    pub models: Vec<C>,
    pub residuals: MaskedMatrix,
    pub time_max: f64,
}

/// Fit per-feature periodic mean curves and compute residuals.
///
/// Parameters
/// ----------
/// - `observations`: `&MaskedMatrix`
///   n × p observation matrix; cells may be absent.
/// - `time`: `&[f64]`
///   Length-n circular time labels in `[0, time_max)`.
/// - `time_max`: `f64`
///   Period length.
/// - `fitter`: `&F`
///   Periodic fitting primitive.
/// - `options`: `&FitOptions`
///   Fitting configuration passed through to the primitive.
///
/// Returns
/// -------
/// `PhaseResult<MeanFit<F::Curve>>`
///   Fitted models and residuals on success.
///
/// Errors
/// ------
/// - `PhaseError::InsufficientData { feature, .. }`
///   When a feature has fewer distinct usable time points than the fitter
///   requires. A feature with zero present cells always fails here.
/// - `PhaseError::FitFailure { feature, .. }`
///   When the fitting primitive reports numerical failure for a feature.
/// - `PhaseError::InvalidTimeMax` / `TimeOutOfRange` / `ShapeMismatch` /
///   `EmptyInput`
///   From up-front input validation, before any fitting work begins.
///
/// Notes
/// -----
/// - Features are fit independently; the first failing feature aborts the
///   whole call, so a partially fit result is never observable.
pub fn fit_mean<F: CurveFitter>(
    observations: &MaskedMatrix, time: &[f64], time_max: f64, fitter: &F, options: &FitOptions,
) -> PhaseResult<MeanFit<F::Curve>> {
    validate_time_labels(time, time_max)?;
    validate_alignment(observations, time)?;

    let p = observations.ncols();
    let mut models = Vec::with_capacity(p);
    let mut residuals = MaskedMatrix::all_missing(observations.nrows(), p);

    for feature in 0..p {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for (row, value) in observations.column_present(feature) {
            xs.push(time[row]);
            ys.push(value);
        }

        let curve = fitter
            .fit(&xs, &ys, time_max, options)
            .map_err(|err| tag_feature(err, feature))?;

        for (row, value) in observations.column_present(feature) {
            use crate::curve::Predictable;
            residuals.insert(row, feature, curve.predict(time[row]) - value);
        }
        models.push(curve);
    }

    if !options.quiet {
        debug!(features = p, observations = observations.nrows(), "fitted mean curves");
    }

    Ok(MeanFit { models, residuals, time_max })
}

/// Re-tag a fitter-level error with the feature column it occurred in.
pub(crate) fn tag_feature(err: PhaseError, feature: usize) -> PhaseError {
    match err {
        PhaseError::InsufficientData { needed, available, .. } => {
            PhaseError::InsufficientData { feature, needed, available }
        }
        PhaseError::FitFailure { detail, .. } => PhaseError::FitFailure { feature, detail },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{FourierFitter, Predictable};
    use ndarray::Array2;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Recovery of a known smooth periodic function at held-out phases.
    // - The exact residual = predicted - observed convention.
    // - Missing cells staying absent in the residual matrix.
    // - The per-feature InsufficientData error carrying the column index.
    //
    // They intentionally DO NOT cover:
    // - Noise robustness and significance behavior; those live in the
    //   significance and integration tests.
    // -------------------------------------------------------------------------

    fn rhythm(t: f64) -> f64 {
        1.0 + 0.8 * (2.0 * std::f64::consts::PI * t / 24.0).cos()
    }

    fn sample_observations(n: usize) -> (MaskedMatrix, Vec<f64>) {
        let time: Vec<f64> = (0..n).map(|i| 24.0 * i as f64 / n as f64).collect();
        let values = Array2::from_shape_fn((n, 1), |(i, _)| rhythm(time[i]));
        (MaskedMatrix::from_complete(values).unwrap(), time)
    }

    #[test]
    // Purpose
    // -------
    // Verify that fitting a clean periodic feature recovers the generating
    // function at held-out phases and that residuals obey the sign
    // convention exactly.
    //
    // Given
    // -----
    // - 40 noise-free samples of a single-harmonic rhythm over [0, 24).
    //
    // Expect
    // ------
    // - Held-out predictions within 1e-6; residual(i, 0) equals
    //   predict(time[i]) - observed(i, 0) exactly.
    fn fit_mean_recovers_rhythm_and_preserves_residual_convention() {
        // Arrange
        let (obs, time) = sample_observations(40);

        // Act
        let fit = fit_mean(&obs, &time, 24.0, &FourierFitter, &FitOptions::default()).unwrap();

        // Assert: recovery at held-out phases
        for &t in &[0.5, 7.3, 13.0, 20.9] {
            let err = (fit.models[0].predict(t) - rhythm(t)).abs();
            assert!(err < 1e-6, "held-out prediction at {t} off by {err}");
        }

        // Assert: residual convention, bitwise
        for i in 0..obs.nrows() {
            let expected = fit.models[0].predict(time[i]) - obs.get(i, 0).unwrap();
            assert_eq!(fit.residuals.get(i, 0).unwrap(), expected);
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify that missing cells never appear in the residual matrix and are
    // excluded from the mean-squared-residual statistic.
    //
    // Given
    // -----
    // - 30 samples of a rhythm with rows 3 and 17 masked out.
    //
    // Expect
    // ------
    // - Residuals at rows 3 and 17 are absent; present_count drops by 2.
    fn missing_cells_stay_absent_in_residuals() {
        // Arrange
        let n = 30;
        let time: Vec<f64> = (0..n).map(|i| 24.0 * i as f64 / n as f64).collect();
        let values = Array2::from_shape_fn((n, 1), |(i, _)| rhythm(time[i]));
        let mut mask = Array2::from_elem((n, 1), true);
        mask[(3, 0)] = false;
        mask[(17, 0)] = false;
        let obs = MaskedMatrix::new(values, mask).unwrap();

        // Act
        let fit = fit_mean(&obs, &time, 24.0, &FourierFitter, &FitOptions::default()).unwrap();

        // Assert
        assert_eq!(fit.residuals.get(3, 0), None);
        assert_eq!(fit.residuals.get(17, 0), None);
        assert_eq!(fit.residuals.present_count(0), n - 2);
    }

    #[test]
    // Purpose
    // -------
    // Verify that a feature with too few usable points fails with an error
    // naming that feature, even when other features are fittable.
    //
    // Given
    // -----
    // - Two features over 20 rows; feature 1 has only 3 present cells while
    //   the default basis needs 7 distinct phases.
    //
    // Expect
    // ------
    // - InsufficientData with feature == 1.
    fn sparse_feature_fails_with_its_column_index() {
        // Arrange
        let n = 20;
        let time: Vec<f64> = (0..n).map(|i| i as f64 / n as f64).collect();
        let values = Array2::from_shape_fn((n, 2), |(i, _)| rhythm(24.0 * time[i]));
        let mut mask = Array2::from_elem((n, 2), true);
        for i in 3..n {
            mask[(i, 1)] = false;
        }
        let obs = MaskedMatrix::new(values, mask).unwrap();

        // Act & Assert
        match fit_mean(&obs, &time, 1.0, &FourierFitter, &FitOptions::default()) {
            Err(PhaseError::InsufficientData { feature: 1, available: 3, .. }) => (),
            other => panic!("expected InsufficientData for feature 1, got {other:?}"),
        }
    }
}

//! significance — permutation test for per-feature periodicity strength.
//!
//! Purpose
//! -------
//! Quantify how strongly each feature's level depends on the circular time
//! label. The statistic is a signal-to-noise ratio — fitted mean curve's
//! peak-to-trough range divided by the root-mean-squared residual — and the
//! reference distribution comes from refitting under random permutations of
//! the time labels.
//!
//! Key behaviors
//! -------------
//! - [`snr`] evaluates each fitted curve over a fine grid (resolution
//!   0.001 of the period) and divides the range by the residual RMS.
//! - [`test_significance`] fits once on the true labels, then `n_iter`
//!   times on seeded, pre-assigned permutations (each a bijection of the
//!   existing labels onto the observations), dispatched through an explicit
//!   [`ParallelMap`](executor::ParallelMap) executor, and reports the
//!   per-feature fraction of permutations whose SNR reaches the observed
//!   one.
//!
//! Invariants & assumptions
//! ------------------------
//! - Permutation assignment is decided before dispatch from a single seeded
//!   generator, so results are reproducible for a fixed seed and iteration
//!   count regardless of worker count or scheduling order.
//! - Any permutation whose refit fails aborts the whole computation;
//!   silently dropping permutations would bias the p-value.
//! - P-value contract is the literal counting rule: the attainable floor is
//!   exactly `0`, reached when no permutation matches or exceeds the
//!   observed SNR. No smoothing term is added.
//! - Each permutation iteration owns its transient fit and residuals; they
//!   are discarded after their SNR vector is extracted.
//!
//! Conventions
//! -----------
//! - The comparison is one-sided and conservative: ties (`>=`) count
//!   against significance.
//!
//! Testing notes
//! -------------
//! - Tests cover the SNR arithmetic on known curves, p-value range and
//!   behavior on pure noise vs an engineered signal, seed/executor
//!   reproducibility, and option validation. The end-to-end statistical
//!   scenario lives in the integration tests.

pub mod executor;

pub use self::executor::{ParallelMap, RayonMap, SerialMap};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::circular::diff::validate_time_max;
use crate::curve::{CurveFitter, FitOptions, Predictable};
use crate::errors::{PhaseError, PhaseResult};
use crate::model::data::MaskedMatrix;
use crate::model::mean::fit_mean;

/// Grid resolution for the SNR range scan, as a fraction of the period.
const SNR_GRID_STEP: f64 = 0.001;

/// SignificanceOptions — permutation-test configuration.
///
/// Fields
/// ------
/// - `n_iter`: `usize`
///   Number of permutations. Must be at least 1.
/// - `seed`: `u64`
///   Seed for the permutation generator; fixing it fixes the whole
///   permutation assignment.
///
/// Notes
/// -----
/// - `Default` gives 100 iterations with seed 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignificanceOptions {
    pub n_iter: usize,
    pub seed: u64,
}

impl Default for SignificanceOptions {
    fn default() -> Self {
        SignificanceOptions { n_iter: 100, seed: 0 }
    }
}

/// SignificanceOutcome — permutation-test result per feature.
///
/// Purpose
/// -------
/// Bundle the per-feature p-values with the observed SNR vector they were
/// computed from, so downstream reporting never pairs p-values with a
/// statistic from a different fit.
///
/// Fields
/// ------
/// - `p_values`: length-p, each in `[0, 1]`.
/// - `observed_snr`: length-p baseline SNR vector from the true labels.
/// - `n_iter`: permutation count the fractions are over.
///
/// Invariants
/// ----------
/// - `p_values[j]` is a multiple of `1 / n_iter`; the floor is exactly `0`
///   (literal counting contract), attained only when no permutation ever
///   matched or exceeded the observed SNR.
#[derive(Debug, Clone)]
pub struct SignificanceOutcome {
    p_values: Vec<f64>,
    observed_snr: Vec<f64>,
    n_iter: usize,
}

impl SignificanceOutcome {
    /// Per-feature permutation p-values, in `[0, 1]`.
    pub fn p_values(&self) -> &[f64] {
        &self.p_values
    }

    /// Observed per-feature SNR from the true-label fit.
    pub fn observed_snr(&self) -> &[f64] {
        &self.observed_snr
    }

    /// Number of permutations the p-values are fractions of.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }
}

/// Per-feature signal-to-noise ratio of fitted mean curves.
///
/// Parameters
/// ----------
/// - `models`: `&[C]`
///   Per-feature fitted mean curves.
/// - `residuals`: `&MaskedMatrix`
///   Residual matrix of the same fit; supplies the RMS denominator from
///   present cells only.
/// - `time_max`: `f64`
///   Period length.
///
/// Returns
/// -------
/// `PhaseResult<Vec<f64>>`
///   `(max - min of the curve over a 0.001-resolution grid) / rms residual`
///   per feature.
///
/// Errors
/// ------
/// - `PhaseError::ShapeMismatch` when models and residual columns disagree.
/// - `PhaseError::InsufficientData` when a feature has no present
///   residuals.
/// - `PhaseError::NonFiniteValue` when a feature's residual RMS is zero,
///   leaving the ratio undefined.
pub fn snr<C: Predictable>(
    models: &[C], residuals: &MaskedMatrix, time_max: f64,
) -> PhaseResult<Vec<f64>> {
    validate_time_max(time_max)?;
    if models.len() != residuals.ncols() {
        return Err(PhaseError::ShapeMismatch {
            what: "mean models vs residual columns",
            expected: residuals.ncols(),
            actual: models.len(),
        });
    }

    let steps = (1.0 / SNR_GRID_STEP).round() as usize;
    let mut out = Vec::with_capacity(models.len());
    for (j, model) in models.iter().enumerate() {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for k in 0..steps {
            let y = model.predict(k as f64 * SNR_GRID_STEP * time_max);
            lo = lo.min(y);
            hi = hi.max(y);
        }

        let mean_sq = residuals
            .column_mean_sq(j)
            .ok_or(PhaseError::InsufficientData { feature: j, needed: 1, available: 0 })?;
        let rms = mean_sq.sqrt();
        if rms == 0.0 {
            return Err(PhaseError::NonFiniteValue { what: "residual rms", value: rms });
        }
        out.push((hi - lo) / rms);
    }
    Ok(out)
}

/// Permutation test of per-feature periodicity strength.
///
/// Parameters
/// ----------
/// - `observations`: `&MaskedMatrix`
///   n × p observation matrix; shared read-only by every permutation.
/// - `time`: `&[f64]`
///   Length-n circular time labels in `[0, time_max)`.
/// - `time_max`: `f64`
///   Period length.
/// - `fitter`: `&F`
///   Periodic fitting primitive, shared across iterations.
/// - `fit_options`: `&FitOptions`
///   Fitting configuration for the baseline fit. Permutation refits run
///   with the same settings but `quiet` forced on, so the loop does not
///   flood the diagnostics.
/// - `options`: `&SignificanceOptions`
///   Iteration count and seed.
/// - `executor`: `&E`
///   Parallel-map executor; the result is identical for any conforming
///   executor because permutations are assigned before dispatch.
///
/// Returns
/// -------
/// `PhaseResult<SignificanceOutcome>`
///   Per-feature p-values and the observed SNR vector.
///
/// Errors
/// ------
/// - `PhaseError::InvalidOption` when `n_iter == 0`.
/// - Any error from the baseline fit, or from any permutation's refit
///   (fail-fast: one failed permutation aborts the whole test).
///
/// Notes
/// -----
/// - P-value per feature = fraction of the `n_iter` permutations whose SNR
///   is `>=` the observed SNR. This literal counting rule can reach exactly
///   `0`; it is not smoothed to a `1 / n_iter` floor.
pub fn test_significance<F, E>(
    observations: &MaskedMatrix, time: &[f64], time_max: f64, fitter: &F,
    fit_options: &FitOptions, options: &SignificanceOptions, executor: &E,
) -> PhaseResult<SignificanceOutcome>
where
    F: CurveFitter + Sync,
    F::Curve: Send,
    E: ParallelMap,
{
    if options.n_iter == 0 {
        return Err(PhaseError::InvalidOption {
            name: "n_iter",
            detail: "need at least one permutation".to_string(),
        });
    }

    let baseline = fit_mean(observations, time, time_max, fitter, fit_options)?;
    let observed = snr(&baseline.models, &baseline.residuals, time_max)?;
    drop(baseline);

    // Assign all permutations up front from one seeded generator; worker
    // threads only consume them.
    let mut rng = StdRng::seed_from_u64(options.seed);
    let permutations: Vec<Vec<f64>> = (0..options.n_iter)
        .map(|_| {
            let mut shuffled = time.to_vec();
            shuffled.shuffle(&mut rng);
            shuffled
        })
        .collect();

    let quiet_options = FitOptions { quiet: true, ..fit_options.clone() };
    let per_iteration: Vec<PhaseResult<Vec<f64>>> =
        executor.map(permutations, |permuted_time| {
            let fit = fit_mean(observations, &permuted_time, time_max, fitter, &quiet_options)?;
            snr(&fit.models, &fit.residuals, time_max)
        });

    let p = observed.len();
    let mut exceed_counts = vec![0usize; p];
    for result in per_iteration {
        let permuted = result?;
        for j in 0..p {
            if permuted[j] >= observed[j] {
                exceed_counts[j] += 1;
            }
        }
    }

    let p_values: Vec<f64> =
        exceed_counts.iter().map(|&c| c as f64 / options.n_iter as f64).collect();

    if !fit_options.quiet {
        debug!(
            n_iter = options.n_iter,
            seed = options.seed,
            features = p,
            "permutation significance test complete"
        );
    }

    Ok(SignificanceOutcome { p_values, observed_snr: observed, n_iter: options.n_iter })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{FourierCurve, FourierFitter};
    use ndarray::Array2;
    use rand::Rng;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - SNR arithmetic on a known curve/residual combination.
    // - P-value range, behavior on pure noise, and on an engineered signal.
    // - Reproducibility: identical results for the same seed across the
    //   serial and rayon executors.
    // - The n_iter validation branch.
    //
    // They intentionally DO NOT cover:
    // - The mixed signal/noise end-to-end scenario; that lives in the
    //   integration tests.
    // -------------------------------------------------------------------------

    fn quiet_options() -> FitOptions {
        FitOptions { quiet: true, ..FitOptions::default() }
    }

    fn noise_observations(n: usize, p: usize, seed: u64) -> MaskedMatrix {
        let mut rng = StdRng::seed_from_u64(seed);
        let values = Array2::from_shape_fn((n, p), |_| rng.gen::<f64>() - 0.5);
        MaskedMatrix::from_complete(values).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Verify the SNR definition on a hand-built case: a cosine curve with
    // known range and residuals with known RMS.
    //
    // Given
    // -----
    // - A fitted cosine of amplitude 1.5 (range 3.0) and alternate-sign
    //   residuals of magnitude 0.5 (RMS 0.5).
    //
    // Expect
    // ------
    // - SNR == 3.0 / 0.5 == 6.0 to fine-grid accuracy.
    fn snr_is_curve_range_over_residual_rms() {
        // Arrange
        use crate::curve::CurveFitter;
        let xs: Vec<f64> = (0..16).map(|i| i as f64 / 16.0).collect();
        let ys: Vec<f64> =
            xs.iter().map(|&t| 1.5 * (2.0 * std::f64::consts::PI * t).cos()).collect();
        let fit_opts = FitOptions { harmonics: 1, ridge: 1e-10, quiet: true };
        let curve = FourierFitter.fit(&xs, &ys, 1.0, &fit_opts).unwrap();
        let residuals = MaskedMatrix::from_complete(Array2::from_shape_fn(
            (8, 1),
            |(i, _)| if i % 2 == 0 { 0.5 } else { -0.5 },
        ))
        .unwrap();

        // Act
        let result = snr(&[curve], &residuals, 1.0).unwrap();

        // Assert: the grid does not sample the exact extrema, hence the
        // loose-ish tolerance
        assert!((result[0] - 6.0).abs() < 1e-3, "got {}", result[0]);
    }

    #[test]
    // Purpose
    // -------
    // Verify that a flat curve has SNR zero and that a zero residual RMS is
    // rejected as undefined.
    //
    // Given
    // -----
    // - A constant curve with nonzero residuals, then any curve with an
    //   all-zero residual column.
    //
    // Expect
    // ------
    // - SNR 0.0 in the first case; NonFiniteValue in the second.
    fn snr_degenerate_cases() {
        // Arrange
        let flat = FourierCurve::constant(3.0, 1.0);
        let residuals = MaskedMatrix::from_complete(Array2::from_elem((4, 1), 0.2)).unwrap();

        // Act & Assert: flat curve
        let result = snr(&[flat.clone()], &residuals, 1.0).unwrap();
        assert_eq!(result[0], 0.0);

        // Act & Assert: zero RMS
        let zeros = MaskedMatrix::from_complete(Array2::zeros((4, 1))).unwrap();
        match snr(&[flat], &zeros, 1.0) {
            Err(PhaseError::NonFiniteValue { .. }) => (),
            other => panic!("expected NonFiniteValue, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify the p-value contract on pure noise: values lie in [0, 1] and
    // are large on average, since no feature tracks the labels.
    //
    // Given
    // -----
    // - 40 observations of 8 label-independent noise features, 200
    //   permutations, fixed seed.
    //
    // Expect
    // ------
    // - All p-values in [0, 1]; mean p-value above 0.25 (a loose bound far
    //   below the uniform expectation of 0.5).
    fn pure_noise_yields_large_p_values() {
        // Arrange
        let n = 40;
        let obs = noise_observations(n, 8, 7);
        let time: Vec<f64> = (0..n).map(|i| i as f64 / n as f64).collect();
        let options = SignificanceOptions { n_iter: 200, seed: 11 };

        // Act
        let outcome = test_significance(
            &obs,
            &time,
            1.0,
            &FourierFitter,
            &quiet_options(),
            &options,
            &SerialMap,
        )
        .unwrap();

        // Assert
        for &p in outcome.p_values() {
            assert!((0.0..=1.0).contains(&p), "p-value out of range: {p}");
        }
        let mean: f64 =
            outcome.p_values().iter().sum::<f64>() / outcome.p_values().len() as f64;
        assert!(mean > 0.25, "noise features should not look periodic; mean p = {mean}");
    }

    #[test]
    // Purpose
    // -------
    // Verify that an engineered strong periodic signal is detected with a
    // p-value at (or near) the floor.
    //
    // Given
    // -----
    // - 40 observations of one sinusoidal feature (amplitude 2, noise
    //   amplitude 0.1), 100 permutations.
    //
    // Expect
    // ------
    // - p-value ≤ 0.05 and observed SNR well above 1.
    fn strong_signal_reaches_the_p_value_floor() {
        // Arrange
        let n = 40;
        let mut rng = StdRng::seed_from_u64(3);
        let time: Vec<f64> = (0..n).map(|i| i as f64 / n as f64).collect();
        let values = Array2::from_shape_fn((n, 1), |(i, _)| {
            2.0 * (2.0 * std::f64::consts::PI * time[i]).sin() + 0.1 * (rng.gen::<f64>() - 0.5)
        });
        let obs = MaskedMatrix::from_complete(values).unwrap();

        // Act
        let outcome = test_significance(
            &obs,
            &time,
            1.0,
            &FourierFitter,
            &quiet_options(),
            &SignificanceOptions { n_iter: 100, seed: 5 },
            &SerialMap,
        )
        .unwrap();

        // Assert
        assert!(outcome.p_values()[0] <= 0.05, "got p = {}", outcome.p_values()[0]);
        assert!(outcome.observed_snr()[0] > 1.0, "got snr = {}", outcome.observed_snr()[0]);
    }

    #[test]
    // Purpose
    // -------
    // Verify executor independence: for the same seed, the serial and rayon
    // executors produce bitwise-identical p-values and SNR vectors, because
    // permutation assignment happens before dispatch.
    //
    // Given
    // -----
    // - The same noise data and options run through SerialMap and RayonMap.
    //
    // Expect
    // ------
    // - Identical p-value and observed-SNR vectors.
    fn same_seed_is_reproducible_across_executors() {
        // Arrange
        let n = 30;
        let obs = noise_observations(n, 4, 21);
        let time: Vec<f64> = (0..n).map(|i| i as f64 / n as f64).collect();
        let options = SignificanceOptions { n_iter: 50, seed: 99 };

        // Act
        let serial = test_significance(
            &obs,
            &time,
            1.0,
            &FourierFitter,
            &quiet_options(),
            &options,
            &SerialMap,
        )
        .unwrap();
        let parallel = test_significance(
            &obs,
            &time,
            1.0,
            &FourierFitter,
            &quiet_options(),
            &options,
            &RayonMap,
        )
        .unwrap();

        // Assert
        assert_eq!(serial.p_values(), parallel.p_values());
        assert_eq!(serial.observed_snr(), parallel.observed_snr());
    }

    #[test]
    // Purpose
    // -------
    // Verify that a zero iteration count is rejected before any fitting
    // work.
    //
    // Given
    // -----
    // - n_iter == 0.
    //
    // Expect
    // ------
    // - InvalidOption naming n_iter.
    fn zero_iterations_are_rejected() {
        // Arrange
        let obs = noise_observations(10, 1, 0);
        let time: Vec<f64> = (0..10).map(|i| i as f64 / 10.0).collect();

        // Act & Assert
        match test_significance(
            &obs,
            &time,
            1.0,
            &FourierFitter,
            &quiet_options(),
            &SignificanceOptions { n_iter: 0, seed: 0 },
            &SerialMap,
        ) {
            Err(PhaseError::InvalidOption { name: "n_iter", .. }) => (),
            other => panic!("expected InvalidOption, got {other:?}"),
        }
    }
}

//! Integration tests for the circular-phase fitting and decoding pipeline.
//!
//! Purpose
//! -------
//! - Validate the end-to-end flow: from masked observations and circular
//!   time labels, through per-feature mean/variance fitting, to component
//!   projection, likelihood decoding, and the permutation significance
//!   test.
//! - Exercise a realistic mixed regime — half the features carrying a
//!   clean sinusoidal signal, half pure noise — rather than toy edge cases
//!   only.
//!
//! Coverage
//! --------
//! - `model`:
//!   - `fit_mean` / `fit_variance` on a 50 × 20 matrix with mixed
//!     signal/noise features.
//! - `projection::project_components`:
//!   - Sparse path concentrating loading mass on the signal features.
//! - `decoder::decode_likelihood`:
//!   - Argmax decoding of held-out observations to within a few grid
//!     steps of their true phase, measured circularly.
//! - `significance::test_significance`:
//!   - Signal features at small p-values, noise features mostly large,
//!     through the rayon executor.
//!
//! Exclusions
//! ----------
//! - Fine-grained validation of low-level building blocks (circular
//!   arithmetic, fitter internals, decomposition algebra) — covered by
//!   unit tests.
//! - Python bindings — expected to be tested at the Python level.
//! - Exhaustive sweeps over sample sizes and noise regimes — those belong
//!   in targeted statistical studies, not CI tests.

use circaphase::circular;
use circaphase::curve::{FitOptions, FourierFitter};
use circaphase::decoder::{decode_likelihood, DecodeOptions};
use circaphase::model::{fit_mean, fit_variance, MaskedMatrix};
use circaphase::projection::{project_components, PenalizedDecomposer, ProjectOptions};
use circaphase::significance::{test_significance, RayonMap, SignificanceOptions};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const N_OBS: usize = 50;
const N_FEATURES: usize = 20;
const N_SIGNAL: usize = 10;
const PERIOD: f64 = 24.0;

/// Purpose
/// -------
/// Build the mixed signal/noise training set used by every scenario:
/// features 0..N_SIGNAL are phase-shifted sinusoids with mild noise,
/// features N_SIGNAL.. are label-independent noise.
///
/// Parameters
/// ----------
/// - `seed`: RNG seed for the noise, so each scenario is reproducible on
///   its own.
///
/// Returns
/// -------
/// - `(observations, time)` with `time[i] = PERIOD · i / N_OBS`.
///
/// Invariants
/// ----------
/// - Signal features have amplitude 1.0 and noise amplitude 0.15; noise
///   features have amplitude 0.5 around a constant level, so their
///   residual RMS is comfortably nonzero.
fn mixed_training_set(seed: u64) -> (MaskedMatrix, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let time: Vec<f64> = (0..N_OBS).map(|i| PERIOD * i as f64 / N_OBS as f64).collect();
    let values = Array2::from_shape_fn((N_OBS, N_FEATURES), |(i, j)| {
        let noise = rng.gen::<f64>() - 0.5;
        if j < N_SIGNAL {
            signal_level(time[i], j) + 0.3 * noise
        } else {
            1.0 * noise
        }
    });
    (MaskedMatrix::from_complete(values).unwrap(), time)
}

/// Noise-free level of signal feature `j` at phase `t`: a unit-amplitude
/// sinusoid whose phase offset varies with the feature index, so the
/// feature panel jointly identifies the phase without mirror ambiguity.
fn signal_level(t: f64, j: usize) -> f64 {
    let offset = j as f64 * 0.45;
    (2.0 * std::f64::consts::PI * t / PERIOD + offset).sin()
}

#[test]
// Purpose
// -------
// Run the permutation significance test on the mixed panel and verify the
// separation the statistic is designed for.
//
// Given
// -----
// - 50 observations of 20 features, 10 sinusoidal and 10 noise, with
//   n_iter = 100 through the rayon executor.
//
// Expect
// ------
// - Every p-value lies in [0, 1].
// - All 10 signal features get p < 0.05.
// - Noise features are mostly above 0.2 (at least 6 of 10; the assertion
//   is statistical, not exact).
fn significance_separates_signal_from_noise_features() {
    // Arrange
    let (obs, time) = mixed_training_set(42);
    let options = FitOptions { quiet: true, ..FitOptions::default() };

    // Act
    let outcome = test_significance(
        &obs,
        &time,
        PERIOD,
        &FourierFitter,
        &options,
        &SignificanceOptions { n_iter: 100, seed: 7 },
        &RayonMap,
    )
    .unwrap();

    // Assert
    let p = outcome.p_values();
    assert_eq!(p.len(), N_FEATURES);
    for &value in p {
        assert!((0.0..=1.0).contains(&value), "p-value out of range: {value}");
    }
    for (j, &value) in p.iter().take(N_SIGNAL).enumerate() {
        assert!(value < 0.05, "signal feature {j} got p = {value}");
    }
    let loose_noise = p[N_SIGNAL..].iter().filter(|&&value| value > 0.2).count();
    assert!(loose_noise >= 6, "only {loose_noise} of 10 noise features above 0.2: {:?}", &p[N_SIGNAL..]);
}

#[test]
// Purpose
// -------
// Fit the full model on the mixed panel, decode held-out observations, and
// verify the maximum-likelihood phase lands near the truth under circular
// distance.
//
// Given
// -----
// - The trained mean/variance models (constant-variance mode) and 8 test
//   observations generated at known phases with mild noise.
//
// Expect
// ------
// - For each test row, the circular distance between the argmax phase and
//   the true phase is below 1.5 hours (period 24, default grid step 0.24).
fn decoder_recovers_held_out_phases_circularly() {
    // Arrange
    let (obs, time) = mixed_training_set(42);
    let options = FitOptions { quiet: true, ..FitOptions::default() };
    let mean_fit = fit_mean(&obs, &time, PERIOD, &FourierFitter, &options).unwrap();
    let var_models =
        fit_variance(&time, &mean_fit.residuals, PERIOD, true, &FourierFitter, &options).unwrap();

    let truths = [0.5, 3.0, 7.25, 10.0, 13.5, 17.0, 20.75, 23.0];
    let mut rng = StdRng::seed_from_u64(99);
    let test_values = Array2::from_shape_fn((truths.len(), N_FEATURES), |(i, j)| {
        let noise = rng.gen::<f64>() - 0.5;
        if j < N_SIGNAL { signal_level(truths[i], j) + 0.3 * noise } else { 1.0 * noise }
    });
    let x_test = MaskedMatrix::from_complete(test_values).unwrap();

    // Act
    let scores = decode_likelihood(
        &x_test,
        &mean_fit.models,
        &var_models,
        PERIOD,
        &DecodeOptions { log_scale: true, ..DecodeOptions::default() },
    )
    .unwrap();

    // Assert
    for (i, &truth) in truths.iter().enumerate() {
        let best = (0..scores.ncols())
            .max_by(|&a, &b| scores[(i, a)].total_cmp(&scores[(i, b)]))
            .unwrap();
        let decoded = best as f64 * 0.01 * PERIOD;
        let err = circular::diff(truth, decoded, PERIOD).unwrap().abs();
        assert!(err < 1.5, "row {i}: decoded {decoded:.2}, truth {truth:.2}, circular error {err:.2}");
    }
}

#[test]
// Purpose
// -------
// Project the fitted mean curves onto sparse components and verify the
// loading mass concentrates on the signal features, which are the only
// ones with periodic structure after noise normalization.
//
// Given
// -----
// - The trained mean fit, 12 discretization phases, rank 2, orthogonal
//   sparse decomposition with a moderate L1 budget.
//
// Expect
// ------
// - The leading component's absolute loading mass on signal features
//   exceeds its mass on noise features by at least a factor of 3.
// - Scores cover one period: 12 phases starting at 0, step 2 hours.
fn sparse_components_concentrate_on_signal_features() {
    // Arrange
    let (obs, time) = mixed_training_set(42);
    let options = FitOptions { quiet: true, ..FitOptions::default() };
    let mean_fit = fit_mean(&obs, &time, PERIOD, &FourierFitter, &options).unwrap();
    let project_options = ProjectOptions {
        n_time: 12,
        sparsity: (N_FEATURES as f64).sqrt() * 0.6,
        rank: Some(2),
        orthogonal: true,
        use_sparse: true,
    };

    // Act
    let set = project_components(
        &mean_fit.models,
        &mean_fit.residuals,
        PERIOD,
        &project_options,
        &PenalizedDecomposer,
    )
    .unwrap();

    // Assert: discretization phases
    assert_eq!(set.phases.len(), 12);
    assert_eq!(set.phases[0], 0.0);
    assert!((set.phases[1] - 2.0).abs() < 1e-12);

    // Assert: loading mass concentration on the leading component
    let signal_mass: f64 = (0..N_SIGNAL).map(|j| set.loadings[(j, 0)].abs()).sum();
    let noise_mass: f64 = (N_SIGNAL..N_FEATURES).map(|j| set.loadings[(j, 0)].abs()).sum();
    assert!(
        signal_mass > 3.0 * noise_mass,
        "signal mass {signal_mass:.3} vs noise mass {noise_mass:.3}"
    );
}

//! curve::fourier — truncated-Fourier periodic least squares.
//!
//! Purpose
//! -------
//! Provide the crate's built-in periodic fitting primitive: ordinary least
//! squares on a truncated Fourier basis with a small ridge term, solved by
//! Cholesky factorization of the normal equations. The basis is periodic by
//! construction, so the fitted curve's value and derivative match at the two
//! ends of the domain without explicit boundary constraints.
//!
//! Key behaviors
//! -------------
//! - Build the design matrix `[1, cos(kωx), sin(kωx)]` for `k = 1..=H` with
//!   `ω = 2π / time_max`, solve the normal equations with the ridge weight
//!   added to the harmonic diagonal entries (the intercept is never
//!   penalized), and store the coefficient vector in a [`FourierCurve`].
//! - Refuse fits with fewer distinct sample phases than basis functions
//!   (`2H + 1`) via `PhaseError::InsufficientData`.
//! - Surface a failed Cholesky factorization as `PhaseError::FitFailure`
//!   rather than panicking.
//!
//! Invariants & assumptions
//! ------------------------
//! - Sample phases are finite and lie in `[0, time_max)`; upstream
//!   validation enforces this before the fitter runs.
//! - With `ridge > 0` the normal-equation matrix is positive definite
//!   whenever the distinct-phase requirement holds (the unpenalized
//!   intercept entry is the sample count), so factorization failures
//!   indicate severe conditioning problems, not routine inputs.
//!
//! Conventions
//! -----------
//! - Coefficients are ordered intercept first, then `(cos, sin)` pairs by
//!   ascending harmonic.
//! - Dense linear algebra uses `nalgebra`; the public fitting surfaces stay
//!   on `ndarray` containers and slices.
//!
//! Testing notes
//! -------------
//! - Tests cover recovery of a known sinusoid at held-out phases,
//!   wraparound evaluation, the constant (`harmonics == 0`) mode,
//!   insufficient-data and invalid-option branches, and the `predict_many`
//!   default.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::curve::{CurveFitter, FitOptions, Predictable};
use crate::errors::{PhaseError, PhaseResult};

/// FourierCurve — fitted periodic curve on a truncated Fourier basis.
///
/// Purpose
/// -------
/// Store the fitted coefficients of a periodic least-squares fit as plain
/// data, decoupled from the fitting algorithm that produced them.
///
/// Fields
/// ------
/// - `intercept`: `f64`
///   Constant term of the fit.
/// - `harmonics`: `Vec<(f64, f64)>`
///   `(cosine, sine)` coefficient pairs for harmonics `1..=H`.
/// - `time_max`: `f64`
///   Period length; evaluation wraps into `[0, time_max)`.
///
/// Invariants
/// ----------
/// - All coefficients are finite; a fit that would produce non-finite
///   coefficients fails instead of constructing a curve.
/// - Immutable once fit: the struct has no mutating methods.
///
/// Performance
/// -----------
/// - Evaluation is O(H) per phase with no allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct FourierCurve {
    intercept: f64,
    harmonics: Vec<(f64, f64)>,
    time_max: f64,
}

impl FourierCurve {
    /// Constant curve at `value` over `[0, time_max)`.
    ///
    /// Used in tests and by callers that need a degenerate flat curve
    /// without running the fitting machinery.
    pub fn constant(value: f64, time_max: f64) -> Self {
        FourierCurve { intercept: value, harmonics: Vec::new(), time_max }
    }

    /// Period length of the fitted domain.
    pub fn time_max(&self) -> f64 {
        self.time_max
    }
}

impl Predictable for FourierCurve {
    fn predict(&self, x: f64) -> f64 {
        let wrapped = x.rem_euclid(self.time_max);
        let omega = 2.0 * std::f64::consts::PI / self.time_max;
        let mut y = self.intercept;
        for (k, &(a, b)) in self.harmonics.iter().enumerate() {
            let angle = omega * (k + 1) as f64 * wrapped;
            y += a * angle.cos() + b * angle.sin();
        }
        y
    }
}

/// FourierFitter — the built-in periodic fitting primitive.
///
/// Purpose
/// -------
/// Implement [`CurveFitter`] with ridge-regularized least squares on the
/// truncated Fourier basis. Stateless: all configuration lives in
/// [`FitOptions`], so one fitter value can be shared across features and
/// threads.
///
/// Notes
/// -----
/// - The minimum distinct-phase requirement equals the basis size
///   `2 * harmonics + 1`; callers check it per feature so the resulting
///   error can name the feature index.
#[derive(Debug, Clone, Copy, Default)]
pub struct FourierFitter;

impl CurveFitter for FourierFitter {
    type Curve = FourierCurve;

    fn fit(
        &self, xs: &[f64], ys: &[f64], time_max: f64, options: &FitOptions,
    ) -> PhaseResult<FourierCurve> {
        if xs.len() != ys.len() {
            return Err(PhaseError::ShapeMismatch {
                what: "sample phases vs sample values",
                expected: xs.len(),
                actual: ys.len(),
            });
        }
        if !options.ridge.is_finite() || options.ridge < 0.0 {
            return Err(PhaseError::InvalidOption {
                name: "ridge",
                detail: format!("must be finite and non-negative, got {}", options.ridge),
            });
        }

        let needed = self.min_distinct_points(options);
        let distinct = count_distinct(xs);
        if distinct < needed {
            return Err(PhaseError::InsufficientData { feature: 0, needed, available: distinct });
        }

        let n = xs.len();
        let m = 2 * options.harmonics + 1;
        let omega = 2.0 * std::f64::consts::PI / time_max;

        let design = DMatrix::from_fn(n, m, |i, j| {
            if j == 0 {
                1.0
            } else {
                let k = ((j - 1) / 2 + 1) as f64;
                let angle = omega * k * xs[i];
                if j % 2 == 1 { angle.cos() } else { angle.sin() }
            }
        });
        let y = DVector::from_fn(n, |i, _| ys[i]);

        let mut normal = design.transpose() * &design;
        // Penalize harmonic coefficients only: the intercept entry is n > 0
        // already, and shrinking it would bias constant fits.
        for d in 1..m {
            normal[(d, d)] += options.ridge;
        }
        let rhs = design.transpose() * y;

        let beta = normal
            .cholesky()
            .map(|chol| chol.solve(&rhs))
            .ok_or_else(|| PhaseError::FitFailure {
                feature: 0,
                detail: "normal equations are not positive definite".to_string(),
            })?;

        if beta.iter().any(|c| !c.is_finite()) {
            return Err(PhaseError::FitFailure {
                feature: 0,
                detail: "fit produced non-finite coefficients".to_string(),
            });
        }

        if !options.quiet {
            debug!(
                samples = n,
                distinct_phases = distinct,
                harmonics = options.harmonics,
                "fitted periodic curve"
            );
        }

        let harmonics = (0..options.harmonics)
            .map(|k| (beta[2 * k + 1], beta[2 * k + 2]))
            .collect();
        Ok(FourierCurve { intercept: beta[0], harmonics, time_max })
    }

    fn min_distinct_points(&self, options: &FitOptions) -> usize {
        2 * options.harmonics + 1
    }
}

/// Count distinct values in a slice by exact bit pattern.
///
/// Exact comparison is intentional: two phases are "the same design row"
/// only when they are bitwise equal, which is the condition under which the
/// design matrix loses rank.
fn count_distinct(xs: &[f64]) -> usize {
    let mut sorted: Vec<f64> = xs.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.dedup_by(|a, b| a.to_bits() == b.to_bits());
    sorted.len()
}

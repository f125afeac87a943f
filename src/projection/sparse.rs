//! projection::sparse — sparse and dense decomposition primitives.
//!
//! Purpose
//! -------
//! Provide the decomposition collaborators behind the projection layer: a
//! [`Decomposer`] trait (the external-primitive seam), the built-in
//! [`PenalizedDecomposer`] implementing L1-budgeted rank-1 power iterations
//! with deflation, and a plain [`plain_svd`] fallback.
//!
//! Key behaviors
//! -------------
//! - `PenalizedDecomposer` extracts components one at a time: alternate
//!   `u ∝ M v` and `v ∝ soft_threshold(Mᵀ u, δ)`, choosing `δ` by bisection
//!   so the unit-norm loading vector satisfies the L1 budget, optionally
//!   orthogonalizing `u` against previously extracted score directions,
//!   then deflating `M` by the fitted rank-1 term.
//! - `plain_svd` wraps nalgebra's SVD and reports loadings (right vectors),
//!   scores (left vectors scaled by singular values), and strengths.
//! - Both paths sign-normalize each component so its largest-magnitude
//!   loading entry is positive, making outputs comparable across paths.
//!
//! Invariants & assumptions
//! ------------------------
//! - The L1 budget applies to the unit-L2 loading vector, so feasible
//!   budgets lie in `[1, sqrt(p)]`; a budget of 1 forces a single nonzero
//!   loading, `sqrt(p)` is unconstrained.
//! - Power iterations are deterministic: the starting vector is fixed, so
//!   repeated runs on the same matrix give identical components.
//! - A residual matrix that deflates to (numerical) zero before `rank`
//!   components are extracted truncates the output early rather than
//!   emitting zero components.
//!
//! Conventions
//! -----------
//! - Public surfaces use `ndarray`; dense linear algebra runs on `nalgebra`
//!   internally.
//!
//! Testing notes
//! -------------
//! - Tests cover SVD reconstruction and orthogonality, the sparsity of
//!   penalized loadings under a tight budget, agreement of the penalized
//!   path with the SVD under a slack budget, and budget validation.

use nalgebra::{DMatrix, DVector};
use ndarray::Array2;

use crate::errors::{PhaseError, PhaseResult};

/// Iteration cap for one rank-1 extraction.
const MAX_ITER: usize = 200;
/// Convergence tolerance on the loading vector between iterations.
const TOL: f64 = 1e-9;

/// Decomposition — loadings, scores, and strengths of a matrix factorization.
///
/// Purpose
/// -------
/// Common output shape for both the sparse and the plain-SVD paths so the
/// projection layer is agnostic to which primitive produced it.
///
/// Fields
/// ------
/// - `loadings`: `Array2<f64>` (p × k)
///   One column per component; rows index features. Interpretable as
///   feature importance per component.
/// - `scores`: `Array2<f64>` (rows(M) × k)
///   One column per component over the discretized phases; the component's
///   waveform over the period, scaled by its strength.
/// - `strengths`: `Vec<f64>` (length k)
///   Singular values (plain path) or fitted rank-1 magnitudes `uᵀMv`
///   (penalized path), in extraction order.
#[derive(Debug, Clone)]
pub struct Decomposition {
    pub loadings: Array2<f64>,
    pub scores: Array2<f64>,
    pub strengths: Vec<f64>,
}

/// A sparsity-constrained decomposition primitive.
///
/// The projection layer programs against this seam; callers with their own
/// decomposition machinery implement it and pass it in.
pub trait Decomposer {
    /// Decompose `matrix` into at most `rank` components whose unit-norm
    /// loading vectors satisfy the L1 budget `sparsity`; when `orthogonal`
    /// is set, score directions are kept mutually orthogonal.
    fn decompose(
        &self, matrix: &Array2<f64>, sparsity: f64, rank: usize, orthogonal: bool,
    ) -> PhaseResult<Decomposition>;
}

/// PenalizedDecomposer — L1-budgeted power iteration with deflation.
///
/// Stateless; all knobs are fixed constants, so one value can be shared
/// freely. Deterministic given the input matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct PenalizedDecomposer;

impl Decomposer for PenalizedDecomposer {
    fn decompose(
        &self, matrix: &Array2<f64>, sparsity: f64, rank: usize, orthogonal: bool,
    ) -> PhaseResult<Decomposition> {
        let p = matrix.ncols();
        if !sparsity.is_finite() || sparsity < 1.0 {
            return Err(PhaseError::InvalidOption {
                name: "sparsity",
                detail: format!("L1 budget must be >= 1, got {sparsity}"),
            });
        }
        if rank == 0 {
            return Err(PhaseError::InvalidOption {
                name: "rank",
                detail: "requested rank must be at least 1".to_string(),
            });
        }

        let n = matrix.nrows();
        let mut work = DMatrix::from_fn(n, p, |i, j| matrix[(i, j)]);
        let rank = rank.min(n).min(p);

        let mut loadings = Array2::zeros((p, rank));
        let mut scores = Array2::zeros((n, rank));
        let mut strengths = Vec::with_capacity(rank);
        let mut prev_scores: Vec<DVector<f64>> = Vec::new();
        let mut extracted = 0usize;

        for _ in 0..rank {
            match extract_component(&work, sparsity, orthogonal, &prev_scores) {
                Some((u, v, d)) => {
                    // Deflate before sign normalization so the residual uses
                    // the fitted directions as-is.
                    work -= &u * v.transpose() * d;

                    let (u, v) = sign_normalize(u, v);
                    for j in 0..p {
                        loadings[(j, extracted)] = v[j];
                    }
                    for i in 0..n {
                        scores[(i, extracted)] = u[i] * d;
                    }
                    strengths.push(d);
                    prev_scores.push(u);
                    extracted += 1;
                }
                None => break, // residual matrix is numerically zero
            }
        }

        Ok(Decomposition {
            loadings: loadings.slice_move(ndarray::s![.., ..extracted]),
            scores: scores.slice_move(ndarray::s![.., ..extracted]),
            strengths,
        })
    }
}

/// Plain singular-value decomposition fallback.
///
/// Parameters
/// ----------
/// - `matrix`: `&Array2<f64>`
///   Matrix to decompose (rows × features).
///
/// Returns
/// -------
/// `PhaseResult<Decomposition>`
///   Loadings = right singular vectors, scores = left singular vectors
///   scaled by their singular values, strengths = singular values in
///   descending order. Components are sign-normalized.
///
/// Errors
/// ------
/// - `PhaseError::FitFailure`
///   When the SVD fails to converge.
pub fn plain_svd(matrix: &Array2<f64>) -> PhaseResult<Decomposition> {
    let n = matrix.nrows();
    let p = matrix.ncols();
    let m = DMatrix::from_fn(n, p, |i, j| matrix[(i, j)]);

    let svd = m.svd(true, true);
    let u = svd.u.ok_or_else(|| svd_failure())?;
    let v_t = svd.v_t.ok_or_else(|| svd_failure())?;
    let k = svd.singular_values.len();

    let mut loadings = Array2::zeros((p, k));
    let mut scores = Array2::zeros((n, k));
    let mut strengths = Vec::with_capacity(k);

    for c in 0..k {
        let sigma = svd.singular_values[c];
        let u_col = DVector::from_fn(n, |i, _| u[(i, c)]);
        let v_col = DVector::from_fn(p, |j, _| v_t[(c, j)]);
        let (u_col, v_col) = sign_normalize(u_col, v_col);
        for j in 0..p {
            loadings[(j, c)] = v_col[j];
        }
        for i in 0..n {
            scores[(i, c)] = u_col[i] * sigma;
        }
        strengths.push(sigma);
    }

    Ok(Decomposition { loadings, scores, strengths })
}

fn svd_failure() -> PhaseError {
    PhaseError::FitFailure {
        feature: 0,
        detail: "singular value decomposition did not produce factors".to_string(),
    }
}

/// Flip a component's sign so its largest-magnitude loading entry is
/// positive. SVD signs are arbitrary per component; fixing them makes the
/// sparse and plain paths comparable.
fn sign_normalize(u: DVector<f64>, v: DVector<f64>) -> (DVector<f64>, DVector<f64>) {
    let dominant = v.iter().cloned().fold(0.0_f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
    if dominant < 0.0 { (-u, -v) } else { (u, v) }
}

/// One rank-1 extraction: alternating power iterations with an L1-budgeted
/// loading vector. Returns `None` when the working matrix carries no signal.
fn extract_component(
    work: &DMatrix<f64>, sparsity: f64, orthogonal: bool, prev_scores: &[DVector<f64>],
) -> Option<(DVector<f64>, DVector<f64>, f64)> {
    let p = work.ncols();

    // Deterministic start: unit vector along the largest-norm column.
    let start = (0..p)
        .max_by(|&a, &b| work.column(a).norm().total_cmp(&work.column(b).norm()))?;
    if work.column(start).norm() < 1e-12 {
        return None;
    }
    let mut v = DVector::zeros(p);
    v[start] = 1.0;

    for _ in 0..MAX_ITER {
        let mut u = work * &v;
        if orthogonal {
            for prev in prev_scores {
                let proj = prev.dot(&u);
                u -= prev * proj;
            }
        }
        let u_norm = u.norm();
        if u_norm < 1e-12 {
            return None;
        }
        u /= u_norm;

        let w = work.transpose() * &u;
        let v_new = budgeted_loading(&w, sparsity)?;

        let delta = (&v_new - &v).norm();
        v = v_new;
        if delta < TOL {
            break;
        }
    }

    let mut u = work * &v;
    if orthogonal {
        for prev in prev_scores {
            let proj = prev.dot(&u);
            u -= prev * proj;
        }
    }
    let d = u.norm();
    if d < 1e-12 {
        return None;
    }
    u /= d;
    Some((u, v, d))
}

/// Soft-threshold and renormalize `w` so the result has unit L2 norm and L1
/// norm at most `budget`. The threshold is found by bisection on `[0,
/// max|w|]`; `budget >= 1` guarantees feasibility since a one-hot vector has
/// L1 norm exactly 1.
fn budgeted_loading(w: &DVector<f64>, budget: f64) -> Option<DVector<f64>> {
    let unit = normalized_soft(w, 0.0)?;
    if unit.iter().map(|x| x.abs()).sum::<f64>() <= budget {
        return Some(unit);
    }

    let mut lo = 0.0;
    let mut hi = w.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
    for _ in 0..60 {
        let mid = 0.5 * (lo + hi);
        match normalized_soft(w, mid) {
            Some(candidate) => {
                if candidate.iter().map(|x| x.abs()).sum::<f64>() > budget {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            // Thresholded everything away; back off.
            None => hi = mid,
        }
    }
    normalized_soft(w, hi)
}

/// Soft-threshold `w` at `delta` and scale to unit L2 norm.
fn normalized_soft(w: &DVector<f64>, delta: f64) -> Option<DVector<f64>> {
    let soft = w.map(|x| x.signum() * (x.abs() - delta).max(0.0));
    let norm = soft.norm();
    if norm < 1e-12 { None } else { Some(soft / norm) }
}

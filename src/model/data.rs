//! model::data — value matrix with explicit per-cell presence mask.
//!
//! Purpose
//! -------
//! Hold real-valued observation and residual matrices in which individual
//! cells may be absent. Absence is tracked by a boolean mask parallel to the
//! value matrix, so "missing" can never be confused with a numeric zero or a
//! NaN sentinel crossing a language boundary.
//!
//! Key behaviors
//! -------------
//! - Validate on construction that the mask matches the value shape and that
//!   every present cell is finite.
//! - Provide per-column iteration over present `(row, value)` pairs, which
//!   is the access pattern of every fitting routine.
//! - Provide the per-column mean of squared present values, the noise
//!   statistic shared by projection scaling and the SNR computation.
//!
//! Invariants & assumptions
//! ------------------------
//! - `values` and `mask` always have identical shape.
//! - A present cell (`mask == true`) always holds a finite value; the value
//!   under an absent cell is unspecified and never read.
//!
//! Conventions
//! -----------
//! - Rows are observations, columns are features.
//!
//! Testing notes
//! -------------
//! - Tests cover construction validation, present-pair iteration, the
//!   mean-square statistic with and without missing cells, and the NaN
//!   rejection branch.

use ndarray::Array2;

use crate::errors::{PhaseError, PhaseResult};

/// MaskedMatrix — an observations × features matrix with per-cell presence.
///
/// Purpose
/// -------
/// Represent raw observations, residuals, and test data uniformly: a dense
/// `f64` matrix plus a boolean mask marking which cells actually carry a
/// measurement.
///
/// Parameters
/// ----------
/// Constructed via:
/// - [`MaskedMatrix::new`] from a value matrix and a mask of the same shape.
/// - [`MaskedMatrix::from_complete`] from a fully observed value matrix.
/// - [`MaskedMatrix::all_missing`] as an empty shell to be filled cell by
///   cell (used internally when assembling residuals).
///
/// Fields
/// ------
/// - `values`: `Array2<f64>`
///   Cell values; meaningful only where the mask is set.
/// - `mask`: `Array2<bool>`
///   `true` where a measurement is present.
///
/// Invariants
/// ----------
/// - Shapes of `values` and `mask` agree.
/// - Present cells are finite. Constructors reject NaN/±∞ under a set mask
///   bit, so downstream numeric code never needs to re-check.
///
/// Performance
/// -----------
/// - Cell access is O(1); per-column present iteration is O(rows) without
///   allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedMatrix {
    values: Array2<f64>,
    mask: Array2<bool>,
}

impl MaskedMatrix {
    /// Build from a value matrix and a parallel presence mask.
    ///
    /// Errors
    /// ------
    /// - `PhaseError::ShapeMismatch` when the mask shape differs from the
    ///   value shape.
    /// - `PhaseError::NonFiniteValue` when a present cell is NaN or ±∞.
    pub fn new(values: Array2<f64>, mask: Array2<bool>) -> PhaseResult<Self> {
        if values.dim() != mask.dim() {
            return Err(PhaseError::ShapeMismatch {
                what: "presence mask vs value matrix",
                expected: values.len(),
                actual: mask.len(),
            });
        }
        for ((i, j), &present) in mask.indexed_iter() {
            if present && !values[(i, j)].is_finite() {
                return Err(PhaseError::NonFiniteValue {
                    what: "present observation cell",
                    value: values[(i, j)],
                });
            }
        }
        Ok(MaskedMatrix { values, mask })
    }

    /// Build from a fully observed value matrix (every cell present).
    pub fn from_complete(values: Array2<f64>) -> PhaseResult<Self> {
        let mask = Array2::from_elem(values.raw_dim(), true);
        MaskedMatrix::new(values, mask)
    }

    /// Empty shell of the given shape with every cell absent.
    pub fn all_missing(nrows: usize, ncols: usize) -> Self {
        MaskedMatrix {
            values: Array2::zeros((nrows, ncols)),
            mask: Array2::from_elem((nrows, ncols), false),
        }
    }

    /// Number of observation rows.
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of feature columns.
    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Value at `(row, col)` if present.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if self.mask[(row, col)] { Some(self.values[(row, col)]) } else { None }
    }

    /// Mark `(row, col)` present with the given value.
    ///
    /// Internal assembly helper; the value must be finite, which callers
    /// guarantee because residuals are differences of validated finite
    /// numbers.
    pub(crate) fn insert(&mut self, row: usize, col: usize, value: f64) {
        self.values[(row, col)] = value;
        self.mask[(row, col)] = true;
    }

    /// Present `(row, value)` pairs of one feature column, in row order.
    pub fn column_present(&self, col: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        (0..self.nrows()).filter_map(move |i| self.get(i, col).map(|v| (i, v)))
    }

    /// Number of present cells in one feature column.
    pub fn present_count(&self, col: usize) -> usize {
        self.column_present(col).count()
    }

    /// Mean of squared present values in one feature column.
    ///
    /// Returns `None` when the column has no present cells. This is the
    /// noise statistic used for projection scaling and the SNR denominator:
    /// applied to a residual column it is the mean squared residual.
    pub fn column_mean_sq(&self, col: usize) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for (_, v) in self.column_present(col) {
            sum += v * v;
            count += 1;
        }
        if count == 0 { None } else { Some(sum / count as f64) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction validation (shape agreement, finiteness under the mask).
    // - Present-pair iteration skipping absent cells.
    // - The column mean-square statistic with and without missing cells.
    //
    // They intentionally DO NOT cover:
    // - Fitting behavior on masked data; that lives in the mean/variance
    //   fitting tests.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify that absent cells are skipped by `column_present` and excluded
    // from the mean-square statistic, while a NaN under an absent mask bit
    // is tolerated.
    //
    // Given
    // -----
    // - A 3×2 matrix whose (1, 0) cell is absent and holds NaN.
    //
    // Expect
    // ------
    // - Column 0 iterates rows 0 and 2 only; its mean square uses those two
    //   values; `get(1, 0)` is None.
    fn absent_cells_are_skipped_and_tolerate_nan_under_mask() {
        // Arrange
        let values = array![[2.0, 1.0], [f64::NAN, 1.0], [4.0, 1.0]];
        let mask = array![[true, true], [false, true], [true, true]];

        // Act
        let m = MaskedMatrix::new(values, mask).unwrap();

        // Assert
        assert_eq!(m.get(1, 0), None);
        let pairs: Vec<(usize, f64)> = m.column_present(0).collect();
        assert_eq!(pairs, vec![(0, 2.0), (2, 4.0)]);
        assert!((m.column_mean_sq(0).unwrap() - 10.0).abs() < 1e-12); // (4 + 16) / 2
        assert_eq!(m.present_count(0), 2);
    }

    #[test]
    // Purpose
    // -------
    // Verify that construction rejects a NaN in a *present* cell and a mask
    // whose shape disagrees with the values.
    //
    // Given
    // -----
    // - A matrix with NaN under a set mask bit; a mask of the wrong shape.
    //
    // Expect
    // ------
    // - NonFiniteValue and ShapeMismatch errors respectively.
    fn construction_rejects_nan_present_cells_and_bad_shapes() {
        // Arrange
        let values = array![[1.0, f64::NAN]];
        let mask = array![[true, true]];

        // Act & Assert: NaN under a present bit
        match MaskedMatrix::new(values.clone(), mask) {
            Err(PhaseError::NonFiniteValue { .. }) => (),
            other => panic!("expected NonFiniteValue, got {other:?}"),
        }

        // Act & Assert: shape mismatch
        let bad_mask = array![[true], [true]];
        match MaskedMatrix::new(values, bad_mask) {
            Err(PhaseError::ShapeMismatch { .. }) => (),
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify that an all-absent column reports no mean-square statistic
    // rather than zero.
    //
    // Given
    // -----
    // - A 2×1 all-missing shell.
    //
    // Expect
    // ------
    // - `column_mean_sq(0)` is None and `present_count(0)` is 0.
    fn empty_column_has_no_mean_square() {
        // Arrange
        let m = MaskedMatrix::all_missing(2, 1);

        // Act & Assert
        assert_eq!(m.column_mean_sq(0), None);
        assert_eq!(m.present_count(0), 0);
    }
}

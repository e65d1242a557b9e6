//! Linear operator abstraction for matrix-vector products.
//!
//! The conjugate gradient solver only needs `y = A * x`. Keeping the product
//! behind a trait lets tests drive CG with hand-built matrices and lets the
//! Newton driver hand it the Jacobian values laid over the mesh pattern
//! without copying the topology.

use boussinesq_core::Mesh;

/// A linear operator that computes y = A * x for real (f64) vectors.
pub trait RealOperator {
    /// Dimension of the operator (N x N).
    fn dim(&self) -> usize;

    /// Apply the operator: y = A * x.
    ///
    /// `x` and `y` are f64 vectors of length `dim()`.
    fn apply(&self, x: &[f64], y: &mut [f64]);
}

/// Square CSR matrix borrowing its pattern from a [`Mesh`].
///
/// `values` is aligned with the mesh column indices.
#[derive(Debug, Clone, Copy)]
pub struct CsrOperator<'a> {
    row_ptr: &'a [usize],
    col_idx: &'a [usize],
    values: &'a [f64],
}

impl<'a> CsrOperator<'a> {
    /// Lay `values` over the sparsity pattern of `mesh`.
    ///
    /// # Panics
    ///
    /// Panics if `values.len()` differs from the number of stored entries.
    pub fn new(mesh: &'a Mesh, values: &'a [f64]) -> Self {
        Self::from_parts(mesh.row_ptr(), mesh.col_idx(), values)
    }

    /// Build from raw CSR arrays.
    ///
    /// # Panics
    ///
    /// Panics if `row_ptr` is empty or the arrays are not aligned.
    pub fn from_parts(row_ptr: &'a [usize], col_idx: &'a [usize], values: &'a [f64]) -> Self {
        assert!(!row_ptr.is_empty(), "row_ptr must hold at least one entry");
        assert_eq!(col_idx.len(), values.len(), "CSR values not aligned with columns");
        assert_eq!(
            row_ptr[row_ptr.len() - 1],
            col_idx.len(),
            "row_ptr does not end at nnz"
        );
        Self {
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Stored values.
    pub fn values(&self) -> &[f64] {
        self.values
    }

    /// Dot product of row `i` with `x`.
    #[inline]
    pub fn row_dot(&self, i: usize, x: &[f64]) -> f64 {
        (self.row_ptr[i]..self.row_ptr[i + 1])
            .map(|k| self.values[k] * x[self.col_idx[k]])
            .sum()
    }
}

impl RealOperator for CsrOperator<'_> {
    fn dim(&self) -> usize {
        self.row_ptr.len() - 1
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) {
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = self.row_dot(i, x);
        }
    }
}

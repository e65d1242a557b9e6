//! Conjugate gradient solver for symmetric positive definite systems.
//!
//! Solves A*x = b where A is represented by a [`RealOperator`]. The Jacobian
//! of the groundwater system is symmetric with non-positive off-diagonals and
//! a dominant diagonal, so plain CG without preconditioning is enough.
//!
//! Besides the solution, the result carries the signed largest and smallest
//! entries of `x` together with their positions; the Newton driver uses them
//! as its convergence measure.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::operator::RealOperator;

/// CG solver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CgConfig {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Convergence tolerance (residual norm relative to the RHS norm).
    pub tol: f64,
    /// Absolute residual norm below which the solve counts as converged.
    pub abs_tol: f64,
}

impl Default for CgConfig {
    fn default() -> Self {
        Self {
            max_iter: 10_000,
            tol: 1e-12,
            abs_tol: 1e-50,
        }
    }
}

impl CgConfig {
    /// Set the iteration cap.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the relative tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }
}

/// A signed extremal entry of a vector and its position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum {
    /// Entry value.
    pub value: f64,
    /// Entry position.
    pub index: usize,
}

/// Result of a CG solve.
#[derive(Debug, Clone)]
pub struct CgResult {
    /// Solution vector.
    pub x: DVector<f64>,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Final relative residual.
    pub residual: f64,
    /// Largest entry of `x`.
    pub max: Extremum,
    /// Smallest entry of `x`.
    pub min: Extremum,
}

impl CgResult {
    /// Largest magnitude among the extremal entries, i.e. the infinity norm of `x`.
    pub fn max_abs(&self) -> f64 {
        self.max.value.abs().max(self.min.value.abs())
    }

    fn new(x: DVector<f64>, iterations: usize, residual: f64) -> Self {
        let (max, min) = extrema(&x);
        Self {
            x,
            iterations,
            residual,
            max,
            min,
        }
    }
}

/// Solve A*x = b using the conjugate gradient method, starting from x = 0.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if `b` does not match the operator.
/// - [`Error::NotPositiveDefinite`] if a search direction has non-positive curvature.
/// - [`Error::ConvergenceFailed`] if the iteration cap is reached first.
pub fn solve_cg(op: &dyn RealOperator, b: &DVector<f64>, config: &CgConfig) -> Result<CgResult> {
    let n = op.dim();
    if b.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: b.len(),
        });
    }

    let b_norm = b.norm();
    if b_norm <= config.abs_tol {
        return Ok(CgResult::new(DVector::zeros(n), 0, 0.0));
    }
    let threshold = (config.tol * b_norm).max(config.abs_tol);

    let mut x = DVector::zeros(n);
    let mut r = b.clone();
    let mut p = r.clone();
    let mut ap = DVector::zeros(n);
    let mut rs_old = r.dot(&r);

    for iteration in 1..=config.max_iter {
        op.apply(p.as_slice(), ap.as_mut_slice());

        let curvature = p.dot(&ap);
        if !(curvature > 0.0) {
            return Err(Error::NotPositiveDefinite {
                iteration,
                curvature,
            });
        }

        let alpha = rs_old / curvature;
        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);

        let rs_new = r.dot(&r);
        let r_norm = rs_new.sqrt();
        if r_norm <= threshold {
            return Ok(CgResult::new(x, iteration, r_norm / b_norm));
        }

        // p = r + beta * p
        p.axpy(1.0, &r, rs_new / rs_old);
        rs_old = rs_new;
    }

    Err(Error::ConvergenceFailed {
        iterations: config.max_iter,
        residual: rs_old.sqrt() / b_norm,
    })
}

/// Signed maximum and minimum entries of `x` (first occurrence wins).
fn extrema(x: &DVector<f64>) -> (Extremum, Extremum) {
    let mut max = Extremum {
        value: 0.0,
        index: 0,
    };
    let mut min = max;
    for (i, &v) in x.iter().enumerate() {
        if i == 0 || v > max.value {
            max = Extremum { value: v, index: i };
        }
        if i == 0 || v < min.value {
            min = Extremum { value: v, index: i };
        }
    }
    (max, min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::CsrOperator;
    use nalgebra::dvector;

    // [ 4 -1  0  0]
    // [-1  4 -1  0]
    // [ 0 -1  4 -1]
    // [ 0  0 -1  3]
    const ROW_PTR: [usize; 5] = [0, 2, 5, 8, 10];
    const COL_IDX: [usize; 10] = [0, 1, 0, 1, 2, 1, 2, 3, 2, 3];
    const VALUES: [f64; 10] = [4.0, -1.0, -1.0, 4.0, -1.0, -1.0, 4.0, -1.0, -1.0, 3.0];

    fn operator() -> CsrOperator<'static> {
        CsrOperator::from_parts(&ROW_PTR, &COL_IDX, &VALUES)
    }

    #[test]
    fn test_cg_known_solution() {
        let op = operator();
        let expected = dvector![1.0, -2.0, 3.0, 0.5];
        let mut b = DVector::zeros(4);
        op.apply(expected.as_slice(), b.as_mut_slice());

        let result = solve_cg(&op, &b, &CgConfig::default()).unwrap();

        for i in 0..4 {
            assert!(
                (result.x[i] - expected[i]).abs() < 1e-10,
                "x[{}] = {} (expected {})",
                i,
                result.x[i],
                expected[i]
            );
        }
        assert!(result.iterations <= 10, "took {} iterations", result.iterations);
        assert!(result.residual <= 1e-12);

        assert_eq!(result.max.index, 2);
        assert!((result.max.value - 3.0).abs() < 1e-10);
        assert_eq!(result.min.index, 1);
        assert!((result.min.value + 2.0).abs() < 1e-10);
        assert!((result.max_abs() - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_cg_zero_rhs() {
        let op = operator();
        let b = DVector::zeros(4);
        let result = solve_cg(&op, &b, &CgConfig::default()).unwrap();

        assert_eq!(result.iterations, 0);
        assert!(result.x.iter().all(|&v| v == 0.0));
        assert_eq!(result.max_abs(), 0.0);
    }

    #[test]
    fn test_cg_iteration_cap() {
        let op = operator();
        let b = dvector![1.0, 2.0, 3.0, 4.0];
        let config = CgConfig::default().with_max_iter(1);

        let result = solve_cg(&op, &b, &config);
        assert!(matches!(
            result,
            Err(Error::ConvergenceFailed { iterations: 1, .. })
        ));
    }

    #[test]
    fn test_cg_indefinite_breakdown() {
        let row_ptr = [0, 1, 2];
        let col_idx = [0, 1];
        let values = [1.0, -1.0];
        let op = CsrOperator::from_parts(&row_ptr, &col_idx, &values);
        let b = dvector![0.0, 1.0];

        let result = solve_cg(&op, &b, &CgConfig::default());
        assert!(matches!(
            result,
            Err(Error::NotPositiveDefinite { iteration: 1, .. })
        ));
    }

    #[test]
    fn test_cg_dimension_mismatch() {
        let op = operator();
        let b = dvector![1.0, 2.0];
        let result = solve_cg(&op, &b, &CgConfig::default());
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 4,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_cg_zero_row_with_zero_rhs_entry() {
        // Row 1 is empty apart from a zero diagonal: a dry cell with no
        // residual. Its correction must stay exactly zero.
        let row_ptr = [0, 1, 2, 3];
        let col_idx = [0, 1, 2];
        let values = [2.0, 0.0, 4.0];
        let op = CsrOperator::from_parts(&row_ptr, &col_idx, &values);
        let b = dvector![2.0, 0.0, -8.0];

        let result = solve_cg(&op, &b, &CgConfig::default()).unwrap();
        assert!((result.x[0] - 1.0).abs() < 1e-12);
        assert_eq!(result.x[1], 0.0);
        assert!((result.x[2] + 2.0).abs() < 1e-12);
        assert_eq!(result.min.index, 2);
    }
}

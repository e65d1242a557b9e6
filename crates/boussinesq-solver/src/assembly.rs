//! Residual and Jacobian of the discrete mass balance.
//!
//! Over one step `dt` every cell must satisfy
//!
//! ```text
//! S_i(eta_i) + sum_j T_ij * eta_j = b_i
//! S_i(eta)   = V_i(eta) + dt * A_i * c_i * (V_i(eta) / A_i)^m_i
//! ```
//!
//! where `V_i` is the stored water volume, the second storage term is the
//! implicit nonlinear drainage, and `b` gathers the volume at the start of the
//! step, the source term and any prescribed-head contribution. The Jacobian
//! shares the mesh pattern: off-diagonals are the transmissivities and the
//! diagonal adds the storage derivative to the row sum already held by `T_ii`.

use boussinesq_core::{Aquifer, wet};
use nalgebra::DVector;

use crate::operator::CsrOperator;

/// Linearized system handed to the Newton driver by a boundary strategy.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    /// Transmissivity acting on the unknown heads, aligned with the mesh columns.
    pub matrix: Vec<f64>,
    /// Known right-hand side `b`.
    pub rhs: DVector<f64>,
}

/// Drainage volume over the step for a cell holding `volume` (m^3).
#[inline]
pub fn drainage(aquifer: &Aquifer, i: usize, volume: f64, dt: f64) -> f64 {
    let cells = aquifer.cells();
    let c = cells.drainage_c[i];
    if c == 0.0 || volume <= 0.0 {
        return 0.0;
    }
    let area = cells.area[i];
    dt * area * c * (volume / area).powf(cells.drainage_m[i])
}

/// Storage function `S_i(eta)` (m^3).
pub fn storage(aquifer: &Aquifer, i: usize, eta: f64, dt: f64) -> f64 {
    let volume = aquifer.water_volume(i, eta);
    volume + drainage(aquifer, i, volume, dt)
}

/// Derivative of the storage function with respect to the head (m^2).
pub fn storage_derivative(aquifer: &Aquifer, i: usize, eta: f64, dt: f64) -> f64 {
    let cells = aquifer.cells();
    let area = cells.area[i];
    let dv = cells.porosity[i] * wet::wet_area(eta, cells.bedrock[i], area);
    if dv == 0.0 {
        return 0.0;
    }

    let c = cells.drainage_c[i];
    let volume = aquifer.water_volume(i, eta);
    if c == 0.0 || volume <= 0.0 {
        return dv;
    }
    let m = cells.drainage_m[i];
    dv * (1.0 + dt * c * m * (volume / area).powf(m - 1.0))
}

/// Known terms of the free cells: volume at the start of the step plus the
/// volume supplied by sources over the step.
pub fn known_terms(aquifer: &Aquifer, eta_prev: &DVector<f64>, dt: f64) -> DVector<f64> {
    let cells = aquifer.cells();
    DVector::from_fn(aquifer.num_cells(), |i, _| {
        aquifer.water_volume(i, eta_prev[i]) + dt * cells.area[i] * cells.source[i]
    })
}

/// Residual `r_i = S_i(eta_i) + (T eta)_i - b_i`.
pub fn compute_residual(
    aquifer: &Aquifer,
    system: &LinearSystem,
    eta: &DVector<f64>,
    dt: f64,
) -> DVector<f64> {
    let op = CsrOperator::new(aquifer.mesh(), &system.matrix);
    let x = eta.as_slice();
    DVector::from_fn(aquifer.num_cells(), |i, _| {
        storage(aquifer, i, eta[i], dt) + op.row_dot(i, x) - system.rhs[i]
    })
}

/// Jacobian values over the mesh pattern.
pub fn compute_jacobian(
    aquifer: &Aquifer,
    system: &LinearSystem,
    eta: &DVector<f64>,
    dt: f64,
) -> Vec<f64> {
    let mesh = aquifer.mesh();
    let mut jacobian = system.matrix.clone();
    for i in 0..mesh.num_cells() {
        jacobian[mesh.diag(i)] += storage_derivative(aquifer, i, eta[i], dt);
    }
    jacobian
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::RealOperator;
    use crate::transmissivity::{InterfaceThickness, compute_transmissivity};
    use boussinesq_core::{CellProperties, Edge, Mesh};
    use nalgebra::dvector;

    fn aquifer(n: usize, cells: impl FnOnce(&mut CellProperties)) -> Aquifer {
        let edges: Vec<Edge> = (0..n - 1)
            .map(|i| Edge::new(i, i + 1, 1.0, 1.0, 1e-4))
            .collect();
        let mesh = Mesh::from_edges(n, &edges).unwrap();
        let mut props = CellProperties::uniform(n, 0.0, 0.4, 2.0);
        cells(&mut props);
        Aquifer::new(mesh, props).unwrap()
    }

    fn system(aq: &Aquifer, eta: &DVector<f64>, dt: f64) -> LinearSystem {
        LinearSystem {
            matrix: compute_transmissivity(aq, eta.as_slice(), dt, InterfaceThickness::Upwind),
            rhs: known_terms(aq, eta, dt),
        }
    }

    #[test]
    fn test_flat_water_table_is_at_rest() {
        let aq = aquifer(4, |_| {});
        let eta = dvector![1.5, 1.5, 1.5, 1.5];
        let sys = system(&aq, &eta, 3600.0);

        let r = compute_residual(&aq, &sys, &eta, 3600.0);
        assert!(r.amax() < 1e-14, "residual = {}", r);
    }

    #[test]
    fn test_source_enters_residual() {
        let aq = aquifer(2, |c| c.source[1] = 1e-6);
        let eta = dvector![1.0, 1.0];
        let sys = system(&aq, &eta, 100.0);

        let r = compute_residual(&aq, &sys, &eta, 100.0);
        // Missing volume dt * A * s in cell 1.
        assert!(r[0].abs() < 1e-15);
        assert!((r[1] + 100.0 * 2.0 * 1e-6).abs() < 1e-15);
    }

    #[test]
    fn test_jacobian_matches_finite_differences() {
        let aq = aquifer(3, |c| {
            c.drainage_c = vec![1e-5, 0.0, 2e-5];
            c.drainage_m = vec![1.0, 1.0, 1.5];
        });
        let dt = 3600.0;
        let eta = dvector![1.2, 0.8, 0.5];
        let sys = system(&aq, &eta, dt);

        let jac = compute_jacobian(&aq, &sys, &eta, dt);
        let op = CsrOperator::new(aq.mesh(), &jac);

        let h = 1e-7;
        let r0 = compute_residual(&aq, &sys, &eta, dt);
        for col in 0..3 {
            let mut shifted = eta.clone();
            shifted[col] += h;
            let r1 = compute_residual(&aq, &sys, &shifted, dt);

            let mut e = [0.0; 3];
            e[col] = 1.0;
            let mut jcol = [0.0; 3];
            op.apply(&e, &mut jcol);

            for row in 0..3 {
                let fd = (r1[row] - r0[row]) / h;
                assert!(
                    (fd - jcol[row]).abs() < 1e-5,
                    "J[{}][{}] = {} (finite difference {})",
                    row,
                    col,
                    jcol[row],
                    fd
                );
            }
        }
    }

    #[test]
    fn test_jacobian_symmetric_and_diagonally_dominant() {
        let aq = aquifer(5, |_| {});
        let eta = dvector![1.0, 0.9, 0.7, 0.2, 0.4];
        let sys = system(&aq, &eta, 3600.0);
        let jac = compute_jacobian(&aq, &sys, &eta, 3600.0);
        let mesh = aq.mesh();

        for i in 0..mesh.num_cells() {
            let off: f64 = mesh.neighbors(i).map(|(k, _)| jac[k].abs()).sum();
            assert!(jac[mesh.diag(i)] > off);
            for (k, j) in mesh.neighbors(i) {
                assert_eq!(jac[k], jac[mesh.position(j, i).unwrap()]);
            }
        }
    }

    #[test]
    fn test_dry_cell_storage() {
        let aq = aquifer(2, |c| {
            c.bedrock[1] = 2.0;
            c.drainage_c[1] = 1e-3;
        });
        assert_eq!(storage(&aq, 1, 1.0, 3600.0), 0.0);
        assert_eq!(storage_derivative(&aq, 1, 1.0, 3600.0), 0.0);
        assert_eq!(drainage(&aq, 1, 0.0, 3600.0), 0.0);
    }

    #[test]
    fn test_cell_on_bedrock_has_storage_derivative() {
        let aq = aquifer(2, |c| {
            c.bedrock = vec![1.0, 1.0];
            c.drainage_c[0] = 1e-3;
        });
        // Empty, but the derivative is taken from the wet side.
        assert_eq!(storage(&aq, 0, 1.0, 3600.0), 0.0);
        assert!((storage_derivative(&aq, 0, 1.0, 3600.0) - 0.4 * 2.0).abs() < 1e-15);
        assert!((storage_derivative(&aq, 1, 1.0, 3600.0) - 0.4 * 2.0).abs() < 1e-15);

        // Recharge on a dry pair gives a non-singular Jacobian.
        let eta = dvector![1.0, 1.0];
        let mut sys = system(&aq, &eta, 3600.0);
        sys.rhs[0] += 3600.0 * 2.0 * 1e-7;
        let jac = compute_jacobian(&aq, &sys, &eta, 3600.0);
        let mesh = aq.mesh();
        assert!(jac[mesh.diag(0)] > 0.0 && jac[mesh.diag(1)] > 0.0);
        let r = compute_residual(&aq, &sys, &eta, 3600.0);
        assert!(r[0] < 0.0);
    }

    #[test]
    fn test_linear_drainage() {
        let aq = aquifer(2, |c| c.drainage_c[0] = 1e-5);
        // V = 0.4 * 2 * 1 = 0.8; drainage = dt * A * c * V / A = 3600 * 1e-5 * 0.8
        let s = storage(&aq, 0, 1.0, 3600.0);
        assert!((s - (0.8 + 3600.0 * 1e-5 * 0.8)).abs() < 1e-12);
        let ds = storage_derivative(&aq, 0, 1.0, 3600.0);
        assert!((ds - 0.8 * (1.0 + 3600.0 * 1e-5)).abs() < 1e-12);
    }
}

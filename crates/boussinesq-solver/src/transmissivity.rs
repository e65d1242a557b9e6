//! Head-dependent transmissivity between neighbouring cells.
//!
//! For a side `(i, j)` of length `l`, centroid distance `d` and conductivity
//! `K`, the flux over one time step `dt` is driven by
//!
//! ```text
//! T_ij = -dt * K * H_ij * l / d        (i != j)
//! T_ii = -sum_{j != i} T_ij
//! ```
//!
//! where `H_ij` is the saturated thickness on the interface. The values are
//! laid over the mesh pattern, so `T * eta` is the net outflow of every cell.
//! Off-diagonals are non-positive and every row sums to zero.

use boussinesq_core::{Aquifer, wet};
use serde::{Deserialize, Serialize};

/// Rule giving the saturated thickness on the interface between two cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterfaceThickness {
    /// Highest head minus highest bedrock of the pair, clamped at zero.
    #[default]
    Upwind,
    /// Mean of the two saturated thicknesses.
    Arithmetic,
}

impl InterfaceThickness {
    /// Interface thickness for heads `eta_i`, `eta_j` over bedrock `z_i`, `z_j` (m).
    #[inline]
    pub fn thickness(&self, eta_i: f64, eta_j: f64, z_i: f64, z_j: f64) -> f64 {
        match self {
            InterfaceThickness::Upwind => (eta_i.max(eta_j) - z_i.max(z_j)).max(0.0),
            InterfaceThickness::Arithmetic => {
                0.5 * (wet::thickness(eta_i, z_i) + wet::thickness(eta_j, z_j))
            }
        }
    }
}

/// When the transmissivity is re-evaluated during a time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransmissivityUpdate {
    /// Recompute from the current iterate at every Newton iteration.
    #[default]
    EveryIteration,
    /// Evaluate once from the head at the start of the step.
    StartOfStep,
}

/// Assemble the transmissivity values for head field `eta` over a step `dt`.
///
/// The returned vector is aligned with the mesh column indices.
pub fn compute_transmissivity(
    aquifer: &Aquifer,
    eta: &[f64],
    dt: f64,
    rule: InterfaceThickness,
) -> Vec<f64> {
    let mesh = aquifer.mesh();
    let edges = mesh.edges();
    let bedrock = &aquifer.cells().bedrock;
    let mut values = vec![0.0; mesh.nnz()];

    for i in 0..mesh.num_cells() {
        let mut row_sum = 0.0;
        for (k, j) in mesh.neighbors(i) {
            let h = rule.thickness(eta[i], eta[j], bedrock[i], bedrock[j]);
            let t = -dt * edges.conductivity[k] * h * edges.length[k] / edges.distance[k];
            values[k] = t;
            row_sum += t;
        }
        values[mesh.diag(i)] = -row_sum;
    }

    values
}

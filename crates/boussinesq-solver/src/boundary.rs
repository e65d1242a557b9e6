//! Boundary-condition regimes.
//!
//! A run either holds some cells at a prescribed head (Dirichlet regime) or
//! is driven purely by fluxes and sources (no-Dirichlet regime). Both are
//! exposed through [`BoundaryStrategy`], chosen once from the configuration,
//! so the Newton driver runs the same loop for either regime.

use std::fmt;

use boussinesq_core::Aquifer;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::assembly::{LinearSystem, known_terms, storage};
use crate::transmissivity::{InterfaceThickness, TransmissivityUpdate, compute_transmissivity};

/// Boundary-condition regime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoundaryRegime {
    /// Cells marked `Prescribed` hold their head.
    #[default]
    Dirichlet,
    /// No prescribed heads; every cell is an unknown.
    NoDirichlet,
}

impl BoundaryRegime {
    /// Strategy implementing this regime.
    pub fn strategy(&self) -> Box<dyn BoundaryStrategy> {
        match self {
            BoundaryRegime::Dirichlet => Box::new(DirichletStrategy),
            BoundaryRegime::NoDirichlet => Box::new(NoDirichletStrategy),
        }
    }

    /// Short name for display.
    pub fn name(&self) -> &'static str {
        match self {
            BoundaryRegime::Dirichlet => "Dirichlet",
            BoundaryRegime::NoDirichlet => "no-Dirichlet",
        }
    }
}

impl fmt::Display for BoundaryRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Everything fixed for the duration of one time step.
#[derive(Debug)]
pub struct StepContext<'a> {
    /// Domain.
    pub aquifer: &'a Aquifer,
    /// Head at the start of the step.
    pub eta_prev: &'a DVector<f64>,
    /// Step length (s).
    pub dt: f64,
    /// Interface thickness rule.
    pub thickness: InterfaceThickness,
    /// Transmissivity frozen at `eta_prev`, if the run asks for it.
    frozen: Option<Vec<f64>>,
}

impl<'a> StepContext<'a> {
    /// Prepare the context of a step starting from `eta_prev`.
    pub fn new(
        aquifer: &'a Aquifer,
        eta_prev: &'a DVector<f64>,
        dt: f64,
        thickness: InterfaceThickness,
        update: TransmissivityUpdate,
    ) -> Self {
        let frozen = match update {
            TransmissivityUpdate::StartOfStep => Some(compute_transmissivity(
                aquifer,
                eta_prev.as_slice(),
                dt,
                thickness,
            )),
            TransmissivityUpdate::EveryIteration => None,
        };
        Self {
            aquifer,
            eta_prev,
            dt,
            thickness,
            frozen,
        }
    }

    /// Transmissivity to use with the iterate `eta`.
    pub fn transmissivity(&self, eta: &DVector<f64>) -> Vec<f64> {
        match &self.frozen {
            Some(t) => t.clone(),
            None => compute_transmissivity(self.aquifer, eta.as_slice(), self.dt, self.thickness),
        }
    }
}

/// Builds the linear system of a Newton iteration for one boundary regime.
pub trait BoundaryStrategy {
    /// Regime implemented by this strategy.
    fn regime(&self) -> BoundaryRegime;

    /// Overwrite the heads of prescribed cells before a step.
    fn impose_heads(&self, aquifer: &Aquifer, eta: &mut DVector<f64>);

    /// Assemble the transmissivity acting on the unknowns and the right-hand
    /// side for the iterate `eta`.
    fn assemble_system(&self, ctx: &StepContext<'_>, eta: &DVector<f64>) -> LinearSystem;
}

/// Transmissivity split into the prescribed-head part and the part acting
/// on free heads, both laid over the mesh pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitTransmissivity {
    /// Entries coupling to prescribed heads (moved to the right-hand side).
    pub dirichlet: Vec<f64>,
    /// Entries acting on free heads (kept in the Jacobian).
    pub free: Vec<f64>,
}

/// Split `t` according to the boundary marking of `aquifer`.
///
/// Rows of prescribed cells go verbatim to the Dirichlet part and are zero in
/// the free part. In the row of a free cell an entry belongs to the Dirichlet
/// part iff its column is a prescribed cell; the diagonal therefore stays in
/// the free part.
pub fn split_dirichlet(aquifer: &Aquifer, t: &[f64]) -> SplitTransmissivity {
    let mesh = aquifer.mesh();
    let col_idx = mesh.col_idx();
    let mut dirichlet = vec![0.0; t.len()];
    let mut free = vec![0.0; t.len()];

    for i in 0..mesh.num_cells() {
        if aquifer.boundary(i).is_prescribed() {
            for k in mesh.row(i) {
                dirichlet[k] = t[k];
            }
        } else {
            for k in mesh.row(i) {
                if aquifer.boundary(col_idx[k]).is_prescribed() {
                    dirichlet[k] = t[k];
                } else {
                    free[k] = t[k];
                }
            }
        }
    }

    SplitTransmissivity { dirichlet, free }
}

/// Prescribed heads enter through the right-hand side.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirichletStrategy;

impl BoundaryStrategy for DirichletStrategy {
    fn regime(&self) -> BoundaryRegime {
        BoundaryRegime::Dirichlet
    }

    fn impose_heads(&self, aquifer: &Aquifer, eta: &mut DVector<f64>) {
        for (i, head) in eta.iter_mut().enumerate() {
            if let Some(prescribed) = aquifer.boundary(i).prescribed_head() {
                *head = prescribed;
            }
        }
    }

    fn assemble_system(&self, ctx: &StepContext<'_>, eta: &DVector<f64>) -> LinearSystem {
        let aquifer = ctx.aquifer;
        let mesh = aquifer.mesh();
        let col_idx = mesh.col_idx();

        let split = split_dirichlet(aquifer, &ctx.transmissivity(eta));
        let mut rhs = known_terms(aquifer, ctx.eta_prev, ctx.dt);

        for i in 0..mesh.num_cells() {
            match aquifer.boundary(i).prescribed_head() {
                // The row reduces to S_i(eta_i) = S_i(eta_D).
                Some(head) => rhs[i] = storage(aquifer, i, head, ctx.dt),
                None => {
                    let inflow: f64 = mesh
                        .row(i)
                        .filter_map(|k| {
                            aquifer
                                .boundary(col_idx[k])
                                .prescribed_head()
                                .map(|head| split.dirichlet[k] * head)
                        })
                        .sum();
                    rhs[i] -= inflow;
                }
            }
        }

        LinearSystem {
            matrix: split.free,
            rhs,
        }
    }
}

/// The assembled transmissivity is used as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDirichletStrategy;

impl BoundaryStrategy for NoDirichletStrategy {
    fn regime(&self) -> BoundaryRegime {
        BoundaryRegime::NoDirichlet
    }

    fn impose_heads(&self, _aquifer: &Aquifer, _eta: &mut DVector<f64>) {}

    fn assemble_system(&self, ctx: &StepContext<'_>, eta: &DVector<f64>) -> LinearSystem {
        LinearSystem {
            matrix: ctx.transmissivity(eta),
            rhs: known_terms(ctx.aquifer, ctx.eta_prev, ctx.dt),
        }
    }
}

//! Time integration of the Boussinesq groundwater equation.
//!
//! This crate provides:
//! - Head-dependent transmissivity assembly over the mesh pattern
//! - Dirichlet and no-Dirichlet boundary regimes behind one strategy trait
//! - Residual and Jacobian of the cell mass balance, with implicit drainage
//! - A conjugate gradient solver and the Newton driver built on it
//! - Fixed-step transient runs with a global volume ledger

pub mod assembly;
pub mod boundary;
pub mod cg;
pub mod config;
pub mod error;
pub mod newton;
pub mod operator;
pub mod output;
pub mod transient;
pub mod transmissivity;
pub mod volume;

pub use assembly::{LinearSystem, compute_jacobian, compute_residual, known_terms};
pub use boundary::{
    BoundaryRegime, BoundaryStrategy, DirichletStrategy, NoDirichletStrategy,
    SplitTransmissivity, StepContext, split_dirichlet,
};
pub use cg::{CgConfig, CgResult, Extremum, solve_cg};
pub use config::SimulationConfig;
pub use error::{Error, Result};
pub use newton::{NewtonConfig, NewtonMetrics, solve_newton};
pub use operator::{CsrOperator, RealOperator};
pub use output::{LogWriter, OutputWriter, RecordingWriter, StepReport};
pub use transient::{Simulation, SimulationResult, solve_transient};
pub use transmissivity::{InterfaceThickness, TransmissivityUpdate, compute_transmissivity};
pub use volume::{CellOutputs, VolumeCheck, VolumeLedger};

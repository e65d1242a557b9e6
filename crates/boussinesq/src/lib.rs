//! # Boussinesq
//!
//! A mass-conservative finite-volume solver for the two-dimensional
//! groundwater flow (Boussinesq) equation on polygonal meshes.
//!
//! The head in every cell is advanced with fixed time steps. Each step is a
//! nonlinear mass balance solved with Newton's method, whose linear systems
//! are symmetric positive definite and handled by conjugate gradient. Cells
//! can hold a prescribed head, and the total water volume is checked against
//! the initial one after every step.
//!
//! ## Quick Start
//!
//! ```rust
//! use boussinesq::prelude::*;
//!
//! // Three cells in a row, the first held at 1 m.
//! let mesh = Mesh::from_edges(
//!     3,
//!     &[Edge::new(0, 1, 1.0, 1.0, 1e-4), Edge::new(1, 2, 1.0, 1.0, 1e-4)],
//! )
//! .unwrap();
//! let cells = CellProperties::uniform(3, 0.0, 0.4, 1.0)
//!     .with_boundary(0, Boundary::Prescribed(1.0));
//! let aquifer = Aquifer::new(mesh, cells).unwrap();
//!
//! let config = SimulationConfig::default().with_horizon(3600.0);
//! let mut writer = RecordingWriter::new();
//! let result = solve_transient(aquifer, DVector::from_element(3, 0.5), config, &mut writer)
//!     .unwrap();
//!
//! assert_eq!(result.head[0], 1.0);
//! assert!(result.head[1] > 0.5);
//! ```

// Re-export member crates
pub use boussinesq_core as core;
pub use boussinesq_solver as solver;

pub use boussinesq_core::{Aquifer, Boundary, CellProperties, Edge, EdgeGeometry, Mesh};

pub use boussinesq_solver::{
    // Boundary regimes
    BoundaryRegime,
    BoundaryStrategy,
    // Linear solver
    CgConfig,
    CgResult,
    // Errors
    Error,
    // Transmissivity
    InterfaceThickness,
    // Output
    LogWriter,
    // Newton
    NewtonConfig,
    NewtonMetrics,
    OutputWriter,
    RecordingWriter,
    Result,
    // Transient
    Simulation,
    SimulationConfig,
    SimulationResult,
    StepReport,
    TransmissivityUpdate,
    solve_cg,
    solve_newton,
    solve_transient,
};

pub use nalgebra::DVector;

/// Prelude module for convenient imports.
///
/// ```rust
/// use boussinesq::prelude::*;
/// ```
pub mod prelude {
    // Domain
    pub use crate::{Aquifer, Boundary, CellProperties, Edge, EdgeGeometry, Mesh};

    // Configuration
    pub use crate::{
        BoundaryRegime, CgConfig, InterfaceThickness, NewtonConfig, SimulationConfig,
        TransmissivityUpdate,
    };

    // Running
    pub use crate::{
        LogWriter, OutputWriter, RecordingWriter, Simulation, SimulationResult, StepReport,
        solve_transient,
    };

    pub use crate::DVector;
}

//! Mesh topology and cell state for the Boussinesq groundwater solver.
//!
//! This crate provides the fundamental data structures the solver consumes:
//! the CSR adjacency of the polygonal mesh with its edge geometry, the
//! per-cell physical properties and boundary marking, and the wetted
//! geometry relations linking head and stored water volume.

pub mod aquifer;
pub mod cell;
pub mod error;
pub mod mesh;
pub mod wet;

pub use aquifer::Aquifer;
pub use cell::{Boundary, CellProperties};
pub use error::{Error, Result};
pub use mesh::{Edge, EdgeGeometry, Mesh, compute_diag_index};

//! Error types for boussinesq-core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("row {row} has no diagonal entry")]
    MissingDiagonal { row: usize },

    #[error("row {row} has {count} diagonal entries (expected exactly one)")]
    DuplicateDiagonal { row: usize, count: usize },

    #[error("column index {col} at position {position} is out of range for {num_cells} cells")]
    ColumnOutOfRange {
        position: usize,
        col: usize,
        num_cells: usize,
    },

    #[error("entry ({row}, {col}) has no symmetric counterpart")]
    AsymmetricPattern { row: usize, col: usize },

    #[error("edge geometry of ({row}, {col}) differs from ({col}, {row})")]
    AsymmetricGeometry { row: usize, col: usize },

    #[error("invalid edge at position {position}: {reason}")]
    InvalidEdge { position: usize, reason: String },

    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("array `{name}` has length {actual}, expected {expected}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid property of cell {cell}: {reason}")]
    InvalidCell { cell: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

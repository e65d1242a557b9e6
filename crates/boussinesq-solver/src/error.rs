//! Error types for boussinesq-solver.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("conjugate gradient did not converge after {iterations} iterations (relative residual {residual:e})")]
    ConvergenceFailed { iterations: usize, residual: f64 },

    #[error("conjugate gradient breakdown at iteration {iteration}: non-positive curvature {curvature:e}")]
    NotPositiveDefinite { iteration: usize, curvature: f64 },

    #[error("Newton iteration {iteration}: linear solve failed: {source}")]
    LinearSolve {
        iteration: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Newton iteration did not converge after {iterations} iterations (max correction {max_correction:e})")]
    NewtonDiverged {
        iterations: usize,
        max_correction: f64,
    },

    #[error("time step {step} (t = {time} s) failed: {source}")]
    TimeStep {
        step: usize,
        time: f64,
        #[source]
        source: Box<Error>,
    },

    #[error("invalid vector dimensions: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("output writer failed at step {step}: {message}")]
    Output { step: usize, message: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Domain(#[from] boussinesq_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

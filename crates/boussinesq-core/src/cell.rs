//! Per-cell physical state and boundary marking.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Boundary marking of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Boundary {
    /// Head is an unknown of the problem.
    #[default]
    Free,
    /// Head is held at the given value (m).
    Prescribed(f64),
}

impl Boundary {
    /// Whether the head of this cell is prescribed.
    #[inline]
    pub fn is_prescribed(&self) -> bool {
        matches!(self, Boundary::Prescribed(_))
    }

    /// The prescribed head, if any.
    #[inline]
    pub fn prescribed_head(&self) -> Option<f64> {
        match *self {
            Boundary::Prescribed(head) => Some(head),
            Boundary::Free => None,
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Free => write!(f, "free"),
            Boundary::Prescribed(head) => write!(f, "prescribed({} m)", head),
        }
    }
}

/// Physical properties of every cell, stored as parallel arrays indexed
/// like the rows of the mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellProperties {
    /// Bedrock elevation (m).
    pub bedrock: Vec<f64>,
    /// Drainable porosity (-).
    pub porosity: Vec<f64>,
    /// Planimetric area (m^2).
    pub area: Vec<f64>,
    /// Coefficient `c` of the nonlinear drainage `c * (V/A)^m` (1/s for m = 1).
    pub drainage_c: Vec<f64>,
    /// Exponent `m` of the nonlinear drainage.
    pub drainage_m: Vec<f64>,
    /// Source (recharge > 0) rate per unit area (m/s).
    pub source: Vec<f64>,
    /// Boundary marking.
    pub boundary: Vec<Boundary>,
}

impl CellProperties {
    /// `n` identical free cells without drainage or sources.
    pub fn uniform(n: usize, bedrock: f64, porosity: f64, area: f64) -> Self {
        Self {
            bedrock: vec![bedrock; n],
            porosity: vec![porosity; n],
            area: vec![area; n],
            drainage_c: vec![0.0; n],
            drainage_m: vec![1.0; n],
            source: vec![0.0; n],
            boundary: vec![Boundary::Free; n],
        }
    }

    /// Set the boundary marking of one cell.
    pub fn with_boundary(mut self, cell: usize, boundary: Boundary) -> Self {
        self.boundary[cell] = boundary;
        self
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.bedrock.len()
    }

    /// Whether there are no cells.
    pub fn is_empty(&self) -> bool {
        self.bedrock.is_empty()
    }

    /// Whether any cell carries a prescribed head.
    pub fn has_prescribed(&self) -> bool {
        self.boundary.iter().any(Boundary::is_prescribed)
    }

    /// Check array lengths against `num_cells` and value ranges.
    pub fn validate(&self, num_cells: usize) -> Result<()> {
        let lengths = [
            ("bedrock", self.bedrock.len()),
            ("porosity", self.porosity.len()),
            ("area", self.area.len()),
            ("drainage_c", self.drainage_c.len()),
            ("drainage_m", self.drainage_m.len()),
            ("source", self.source.len()),
            ("boundary", self.boundary.len()),
        ];
        for (name, actual) in lengths {
            if actual != num_cells {
                return Err(Error::LengthMismatch {
                    name,
                    expected: num_cells,
                    actual,
                });
            }
        }

        for i in 0..num_cells {
            let invalid = |reason: String| Error::InvalidCell { cell: i, reason };
            if !(self.porosity[i] > 0.0 && self.porosity[i] <= 1.0) {
                return Err(invalid(format!(
                    "porosity must lie in (0, 1], got {}",
                    self.porosity[i]
                )));
            }
            if !(self.area[i].is_finite() && self.area[i] > 0.0) {
                return Err(invalid(format!("area must be positive, got {}", self.area[i])));
            }
            if !self.bedrock[i].is_finite() || !self.source[i].is_finite() {
                return Err(invalid("bedrock and source must be finite".into()));
            }
            if !(self.drainage_c[i].is_finite() && self.drainage_c[i] >= 0.0) {
                return Err(invalid(format!(
                    "drainage coefficient must be non-negative, got {}",
                    self.drainage_c[i]
                )));
            }
            if !(self.drainage_m[i].is_finite() && self.drainage_m[i] > 0.0) {
                return Err(invalid(format!(
                    "drainage exponent must be positive, got {}",
                    self.drainage_m[i]
                )));
            }
            if let Some(head) = self.boundary[i].prescribed_head() {
                if !head.is_finite() {
                    return Err(invalid(format!("prescribed head must be finite, got {}", head)));
                }
            }
        }
        Ok(())
    }
}

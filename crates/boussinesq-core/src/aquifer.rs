//! The computational domain: mesh topology together with cell properties.

use crate::cell::{Boundary, CellProperties};
use crate::error::Result;
use crate::mesh::Mesh;

/// Mesh and cell properties validated against each other.
///
/// Both parts are immutable once the aquifer is built; the solver only ever
/// reads them.
#[derive(Debug, Clone)]
pub struct Aquifer {
    mesh: Mesh,
    cells: CellProperties,
}

impl Aquifer {
    /// Pair a mesh with its cell properties.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell arrays do not match the number of mesh
    /// cells or hold out-of-range values.
    pub fn new(mesh: Mesh, cells: CellProperties) -> Result<Self> {
        cells.validate(mesh.num_cells())?;
        Ok(Self { mesh, cells })
    }

    /// Mesh topology and edge geometry.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Cell properties.
    pub fn cells(&self) -> &CellProperties {
        &self.cells
    }

    /// Number of cells.
    pub fn num_cells(&self) -> usize {
        self.mesh.num_cells()
    }

    /// Boundary marking of cell `i`.
    #[inline]
    pub fn boundary(&self, i: usize) -> Boundary {
        self.cells.boundary[i]
    }

    /// Water volume of cell `i` at head `eta` (m^3).
    #[inline]
    pub fn water_volume(&self, i: usize, eta: f64) -> f64 {
        crate::wet::water_volume(
            eta,
            self.cells.bedrock[i],
            self.cells.porosity[i],
            self.cells.area[i],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mesh::Edge;

    #[test]
    fn test_cell_count_must_match_mesh() {
        let mesh = Mesh::from_edges(3, &[Edge::new(0, 1, 1.0, 1.0, 1e-4)]).unwrap();
        let cells = CellProperties::uniform(2, 0.0, 0.4, 1.0);
        assert!(matches!(
            Aquifer::new(mesh, cells),
            Err(Error::LengthMismatch { expected: 3, .. })
        ));
    }

    #[test]
    fn test_water_volume() {
        let mesh = Mesh::from_edges(2, &[Edge::new(0, 1, 1.0, 1.0, 1e-4)]).unwrap();
        let mut cells = CellProperties::uniform(2, 0.0, 0.25, 4.0);
        cells.bedrock[1] = 1.0;
        let aquifer = Aquifer::new(mesh, cells).unwrap();

        assert!((aquifer.water_volume(0, 2.0) - 2.0).abs() < 1e-12);
        assert_eq!(aquifer.water_volume(1, 0.5), 0.0);
    }
}

//! Compressed sparse row (CSR) adjacency of the polygonal mesh.
//!
//! The adjacency pattern doubles as the sparsity pattern of every matrix the
//! solver assembles: row `i` lists the cells sharing a side with cell `i`
//! plus cell `i` itself (the diagonal). Per-edge geometry is stored in arrays
//! aligned with the column indices, so position `k` of `col_idx` and
//! position `k` of every geometry array describe the same side.
//!
//! ```text
//! cells:   0 --- 1 --- 2
//!
//! row_ptr: [0, 2, 5, 7]
//! col_idx: [0, 1 | 0, 1, 2 | 1, 2]
//! diag:    [0,     3,       6]
//! ```

use std::ops::Range;

use crate::error::{Error, Result};

/// Per-edge geometry aligned with the column indices of a [`Mesh`].
///
/// Values stored at diagonal positions are never read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeGeometry {
    /// Length of the side shared by the two cells (m).
    pub length: Vec<f64>,
    /// Distance between the centroids of the two cells (m).
    pub distance: Vec<f64>,
    /// Saturated hydraulic conductivity across the side (m/s).
    pub conductivity: Vec<f64>,
}

impl EdgeGeometry {
    /// Geometry with `nnz` zeroed entries.
    pub fn zeros(nnz: usize) -> Self {
        Self {
            length: vec![0.0; nnz],
            distance: vec![0.0; nnz],
            conductivity: vec![0.0; nnz],
        }
    }
}

/// An undirected side between two cells, consumed by [`Mesh::from_edges`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// First cell.
    pub a: usize,
    /// Second cell.
    pub b: usize,
    /// Length of the shared side (m).
    pub length: f64,
    /// Centroid-to-centroid distance (m).
    pub distance: f64,
    /// Hydraulic conductivity across the side (m/s).
    pub conductivity: f64,
}

impl Edge {
    /// Create a new edge between cells `a` and `b`.
    pub fn new(a: usize, b: usize, length: f64, distance: f64, conductivity: f64) -> Self {
        Self {
            a,
            b,
            length,
            distance,
            conductivity,
        }
    }
}

/// Immutable mesh adjacency in CSR form with cached diagonal positions.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Row pointers (length `num_cells + 1`).
    row_ptr: Vec<usize>,
    /// Column index of each stored entry.
    col_idx: Vec<usize>,
    /// Position of the diagonal entry of each row.
    diag_idx: Vec<usize>,
    /// Geometry aligned with `col_idx`.
    edges: EdgeGeometry,
}

impl Mesh {
    /// Create a mesh from CSR arrays supplied by a mesh provider.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `row_ptr` is empty, does not start at 0, decreases, or does not end at `col_idx.len()`
    /// - a column index is out of range
    /// - a row does not hold exactly one diagonal entry
    /// - a geometry array is not aligned with `col_idx`
    /// - an off-diagonal side has a non-positive distance or a negative length/conductivity
    /// - the pattern or the geometry is not symmetric
    pub fn new(row_ptr: Vec<usize>, col_idx: Vec<usize>, edges: EdgeGeometry) -> Result<Self> {
        let num_cells = row_ptr.len().checked_sub(1).ok_or_else(|| {
            Error::InvalidTopology("row_ptr must hold at least one entry".into())
        })?;

        if row_ptr[0] != 0 {
            return Err(Error::InvalidTopology(format!(
                "row_ptr[0] = {} (expected 0)",
                row_ptr[0]
            )));
        }
        if let Some(i) = row_ptr.windows(2).position(|w| w[1] < w[0]) {
            return Err(Error::InvalidTopology(format!(
                "row_ptr decreases between rows {} and {}",
                i,
                i + 1
            )));
        }
        let nnz = col_idx.len();
        if row_ptr[num_cells] != nnz {
            return Err(Error::LengthMismatch {
                name: "col_idx",
                expected: row_ptr[num_cells],
                actual: nnz,
            });
        }
        if let Some((position, &col)) = col_idx.iter().enumerate().find(|(_, c)| **c >= num_cells)
        {
            return Err(Error::ColumnOutOfRange {
                position,
                col,
                num_cells,
            });
        }
        for (name, values) in [
            ("edge_length", &edges.length),
            ("distance", &edges.distance),
            ("conductivity", &edges.conductivity),
        ] {
            if values.len() != nnz {
                return Err(Error::LengthMismatch {
                    name,
                    expected: nnz,
                    actual: values.len(),
                });
            }
        }

        let diag_idx = compute_diag_index(num_cells, &row_ptr, &col_idx)?;

        let mesh = Self {
            row_ptr,
            col_idx,
            diag_idx,
            edges,
        };
        mesh.validate_geometry()?;
        mesh.validate_symmetry()?;
        Ok(mesh)
    }

    /// Assemble the CSR pattern from an undirected list of sides.
    ///
    /// Every cell receives a diagonal entry; columns are sorted within each
    /// row and both directions of every side carry the same geometry.
    pub fn from_edges(num_cells: usize, edges: &[Edge]) -> Result<Self> {
        let mut rows: Vec<Vec<(usize, f64, f64, f64)>> = (0..num_cells)
            .map(|i| vec![(i, 0.0, 0.0, 0.0)])
            .collect();

        for (position, e) in edges.iter().enumerate() {
            if e.a >= num_cells || e.b >= num_cells {
                return Err(Error::ColumnOutOfRange {
                    position,
                    col: e.a.max(e.b),
                    num_cells,
                });
            }
            if e.a == e.b {
                return Err(Error::InvalidEdge {
                    position,
                    reason: format!("self-loop on cell {}", e.a),
                });
            }
            if rows[e.a].iter().any(|&(c, ..)| c == e.b) {
                return Err(Error::InvalidEdge {
                    position,
                    reason: format!("duplicate side between cells {} and {}", e.a, e.b),
                });
            }
            rows[e.a].push((e.b, e.length, e.distance, e.conductivity));
            rows[e.b].push((e.a, e.length, e.distance, e.conductivity));
        }

        let nnz = rows.iter().map(Vec::len).sum();
        let mut row_ptr = Vec::with_capacity(num_cells + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut geometry = EdgeGeometry {
            length: Vec::with_capacity(nnz),
            distance: Vec::with_capacity(nnz),
            conductivity: Vec::with_capacity(nnz),
        };

        row_ptr.push(0);
        for mut row in rows {
            row.sort_by_key(|&(c, ..)| c);
            for (col, length, distance, conductivity) in row {
                col_idx.push(col);
                geometry.length.push(length);
                geometry.distance.push(distance);
                geometry.conductivity.push(conductivity);
            }
            row_ptr.push(col_idx.len());
        }

        Self::new(row_ptr, col_idx, geometry)
    }

    /// Number of cells (rows).
    pub fn num_cells(&self) -> usize {
        self.diag_idx.len()
    }

    /// Number of stored entries, diagonals included.
    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    /// Row pointers.
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    /// Column indices.
    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    /// Cached diagonal positions, one per row.
    pub fn diag_idx(&self) -> &[usize] {
        &self.diag_idx
    }

    /// Position of the diagonal entry of row `i`.
    #[inline]
    pub fn diag(&self, i: usize) -> usize {
        self.diag_idx[i]
    }

    /// Range of entry positions belonging to row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> Range<usize> {
        self.row_ptr[i]..self.row_ptr[i + 1]
    }

    /// Off-diagonal entries of row `i` as `(position, neighbour)` pairs.
    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.row(i)
            .map(move |k| (k, self.col_idx[k]))
            .filter(move |&(_, j)| j != i)
    }

    /// Position of entry `(row, col)`, if present.
    pub fn position(&self, row: usize, col: usize) -> Option<usize> {
        self.row(row).find(|&k| self.col_idx[k] == col)
    }

    /// Per-edge geometry.
    pub fn edges(&self) -> &EdgeGeometry {
        &self.edges
    }

    fn validate_geometry(&self) -> Result<()> {
        for i in 0..self.num_cells() {
            for (k, _) in self.neighbors(i) {
                let length = self.edges.length[k];
                let distance = self.edges.distance[k];
                let conductivity = self.edges.conductivity[k];
                if !(distance.is_finite() && distance > 0.0) {
                    return Err(Error::InvalidEdge {
                        position: k,
                        reason: format!("distance must be positive, got {}", distance),
                    });
                }
                if !(length.is_finite() && length >= 0.0) {
                    return Err(Error::InvalidEdge {
                        position: k,
                        reason: format!("side length must be non-negative, got {}", length),
                    });
                }
                if !(conductivity.is_finite() && conductivity >= 0.0) {
                    return Err(Error::InvalidEdge {
                        position: k,
                        reason: format!("conductivity must be non-negative, got {}", conductivity),
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_symmetry(&self) -> Result<()> {
        for i in 0..self.num_cells() {
            for (k, j) in self.neighbors(i) {
                let kt = self
                    .position(j, i)
                    .ok_or(Error::AsymmetricPattern { row: i, col: j })?;
                let same = self.edges.length[k] == self.edges.length[kt]
                    && self.edges.distance[k] == self.edges.distance[kt]
                    && self.edges.conductivity[k] == self.edges.conductivity[kt];
                if !same {
                    return Err(Error::AsymmetricGeometry { row: i, col: j });
                }
            }
        }
        Ok(())
    }
}

/// Locate the diagonal entry of every row of a CSR pattern.
///
/// # Errors
///
/// Returns [`Error::MissingDiagonal`] or [`Error::DuplicateDiagonal`] when a
/// row does not hold exactly one entry with `col_idx == row`.
pub fn compute_diag_index(
    num_cells: usize,
    row_ptr: &[usize],
    col_idx: &[usize],
) -> Result<Vec<usize>> {
    let mut diag_idx = Vec::with_capacity(num_cells);
    for i in 0..num_cells {
        let mut found = None;
        let mut count = 0;
        for k in row_ptr[i]..row_ptr[i + 1] {
            if col_idx[k] == i {
                if found.is_none() {
                    found = Some(k);
                }
                count += 1;
            }
        }
        match (found, count) {
            (Some(k), 1) => diag_idx.push(k),
            (None, _) => return Err(Error::MissingDiagonal { row: i }),
            (Some(_), count) => return Err(Error::DuplicateDiagonal { row: i, count }),
        }
    }
    Ok(diag_idx)
}

//! In-memory atomic structure.

use crate::cell::{Cell, CellError};
use nalgebra::Vector3;

/// Atoms with species, Cartesian positions and an optional periodic cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Atoms {
    pub symbols: Vec<String>,
    pub positions: Vec<Vector3<f64>>,
    /// Lattice vectors as rows.
    pub cell: Option<[[f64; 3]; 3]>,
    pub pbc: [bool; 3],
}

impl Atoms {
    /// A non-periodic structure.
    pub fn new(symbols: Vec<String>, positions: Vec<Vector3<f64>>) -> Self {
        Self {
            symbols,
            positions,
            cell: None,
            pbc: [false; 3],
        }
    }

    pub fn with_cell(mut self, rows: [[f64; 3]; 3], pbc: [bool; 3]) -> Self {
        self.cell = Some(rows);
        self.pbc = pbc;
        self
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn is_periodic(&self) -> bool {
        self.cell.is_some() && self.pbc.iter().any(|&p| p)
    }

    /// The cell neighbor searches run in, or `None` for a non-periodic
    /// structure. Missing lattice vectors along open axes are completed first.
    pub fn search_cell(&self) -> Result<Option<Cell>, CellError> {
        match self.cell {
            Some(rows) if self.is_periodic() => {
                Cell::from_rows(complete_cell(rows), self.pbc).map(Some)
            }
            _ => Ok(None),
        }
    }
}

/// Replaces zero-length lattice vectors by unit vectors orthogonal to the
/// others, so slabs and wires with an empty vacuum axis still give an
/// invertible cell.
pub fn complete_cell(rows: [[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut v: Vec<Vector3<f64>> = rows.iter().map(|r| Vector3::from(*r)).collect();
    let missing: Vec<usize> = (0..3).filter(|&k| v[k].norm() < 1e-12).collect();
    match missing.len() {
        1 => {
            let k = missing[0];
            let normal = v[(k + 1) % 3].cross(&v[(k + 2) % 3]);
            if normal.norm() > 0.0 {
                v[k] = normal.normalize();
            }
        }
        2 => {
            let kept = (0..3).find(|k| !missing.contains(k)).unwrap_or(0);
            let dir = v[kept].normalize();
            // any axis not parallel to the kept vector
            let trial = if dir.x.abs() < 0.9 {
                Vector3::x()
            } else {
                Vector3::y()
            };
            let first = dir.cross(&trial).normalize();
            let second = dir.cross(&first).normalize();
            v[missing[0]] = first;
            v[missing[1]] = second;
        }
        3 => {
            v = vec![Vector3::x(), Vector3::y(), Vector3::z()];
        }
        _ => {}
    }
    [
        [v[0].x, v[0].y, v[0].z],
        [v[1].x, v[1].y, v[1].z],
        [v[2].x, v[2].y, v[2].z],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_molecule_has_no_search_cell() {
        let atoms = Atoms::new(vec!["H".into()], vec![Vector3::zeros()]);
        assert!(!atoms.is_periodic());
        assert!(atoms.search_cell().unwrap().is_none());

        // a cell without periodicity is ignored as well
        let atoms = atoms.with_cell([[5.0, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 5.0]], [false; 3]);
        assert!(atoms.search_cell().unwrap().is_none());
    }

    #[test]
    fn test_slab_cell_is_completed() {
        let rows = [[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 0.0]];
        let atoms = Atoms::new(vec!["C".into()], vec![Vector3::zeros()])
            .with_cell(rows, [true, true, false]);
        let cell = atoms.search_cell().unwrap().unwrap();
        assert_relative_eq!(cell.h()[(2, 2)].abs(), 1.0);
        assert_eq!(cell.pbc(), &Vector3::new(true, true, false));
    }

    #[test]
    fn test_complete_cell_wire() {
        let rows = complete_cell([[0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 3.0]]);
        let a = Vector3::from(rows[0]);
        let b = Vector3::from(rows[1]);
        let c = Vector3::from(rows[2]);
        assert_relative_eq!(a.dot(&c), 0.0, epsilon = 1e-12);
        assert_relative_eq!(b.dot(&c), 0.0, epsilon = 1e-12);
        assert_relative_eq!(a.dot(&b), 0.0, epsilon = 1e-12);
        assert_relative_eq!(a.norm(), 1.0);
    }
}

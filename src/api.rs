use crate::batch;
use crate::cell::Cell;
use crate::error::{Result, check_cutoff};
use crate::search::{Cutoffs, pairs_to_edges};
use crate::single;
use nalgebra::Vector3;

/// A container for neighbor list results.
///
/// This struct holds the edge indices and shift vectors for a neighbor list.
/// It is designed to be compatible with PyTorch Geometric (PyG) conventions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeList {
    /// Edge indices: [source_0, source_1, ..., target_0, target_1, ...]
    /// Length is 2 * num_edges.
    pub edge_index: Vec<i64>,
    /// Shift vectors: [x_0, y_0, z_0, x_1, y_1, z_1, ...]
    /// Length is 3 * num_edges.
    pub shifts: Vec<i32>,
}

impl EdgeList {
    pub fn num_edges(&self) -> usize {
        self.edge_index.len() / 2
    }

    pub fn sources(&self) -> &[i64] {
        &self.edge_index[..self.num_edges()]
    }

    pub fn targets(&self) -> &[i64] {
        &self.edge_index[self.num_edges()..]
    }

    fn from_parts(mut edge_i: Vec<i64>, edge_j: Vec<i64>, shifts: Vec<i32>) -> Self {
        edge_i.extend(edge_j);
        Self {
            edge_index: edge_i,
            shifts,
        }
    }
}

/// Periodic cell as lattice vectors in rows, with periodicity flags.
pub type CellRows = ([[f64; 3]; 3], [bool; 3]);

fn as_vectors(positions: &[[f64; 3]]) -> &[Vector3<f64>] {
    bytemuck::cast_slice(positions)
}

/// Build neighbor lists for a single system.
///
/// Each pair within `cutoff` is reported once with `i < j`. `cell` holds the
/// lattice vectors as rows; `None` means an isolated system.
pub fn build_neighborlists(
    positions: &[[f64; 3]],
    cutoff: f64,
    cell: Option<(&[[f64; 3]; 3], [bool; 3])>,
    parallel: bool,
) -> Result<EdgeList> {
    check_cutoff(cutoff)?;
    let cell = cell
        .map(|(rows, pbc)| Cell::from_rows(*rows, pbc))
        .transpose()?;
    let pairs = single::search_single(
        as_vectors(positions),
        cell.as_ref(),
        Cutoffs::Uniform(cutoff),
        false,
        parallel,
    )?;
    let (ei, ej, s) = pairs_to_edges(pairs);
    Ok(EdgeList::from_parts(ei, ej, s))
}

/// Build neighbor lists for a batch of systems concatenated along the atom
/// axis. `batch[k]` is the system of atom `k`; ids must be non-decreasing.
/// `cells[s]` is the cell of system `s`, `None` for an isolated one.
pub fn build_neighborlists_batch(
    positions: &[[f64; 3]],
    batch: &[i32],
    cutoff: f64,
    cells: Option<&[Option<CellRows>]>,
    parallel: bool,
) -> Result<EdgeList> {
    check_cutoff(cutoff)?;
    let n_systems = batch::system_ranges(batch)?.len();
    let cells: Vec<Option<Cell>> = match cells {
        Some(cells) => cells
            .iter()
            .map(|c| c.map(|(rows, pbc)| Cell::from_rows(rows, pbc)).transpose())
            .collect::<std::result::Result<_, _>>()?,
        None => vec![None; n_systems],
    };
    let (ei, ej, s) = batch::search_batch(as_vectors(positions), batch, &cells, cutoff, parallel)?;
    Ok(EdgeList::from_parts(ei, ej, s))
}

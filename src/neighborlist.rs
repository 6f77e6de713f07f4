//! Neighbor list over an [`Atoms`] object with per-atom cutoffs, skin and
//! rebuild on motion.

use crate::atoms::Atoms;
use crate::cell::Cell;
use crate::error::{NeighborError, Result};
use crate::periodic;
use crate::search::{CellList, Cutoffs, Pair};
use crate::single::search_frame;
use nalgebra::Vector3;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info_span};

/// Search algorithm behind a [`NeighborList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Primitive {
    /// Cell list with Morton-ordered bins.
    Binned,
    /// Replicated periodic images in a k-d tree.
    #[default]
    Tree,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Binned => write!(f, "binned"),
            Primitive::Tree => write!(f, "tree"),
        }
    }
}

impl FromStr for Primitive {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binned" | "new" => Ok(Primitive::Binned),
            "tree" | "old" => Ok(Primitive::Tree),
            other => Err(format!("unknown primitive '{other}'")),
        }
    }
}

/// State of the structure at the last rebuild.
#[derive(Debug, Clone)]
struct Snapshot {
    positions: Vec<Vector3<f64>>,
    cell: Option<[[f64; 3]; 3]>,
    pbc: [bool; 3],
}

/// Neighbor list with one cutoff radius per atom. Atoms `i` and `j` are
/// neighbors when `d < cutoffs[i] + cutoffs[j] + skin`.
#[derive(Debug, Clone)]
pub struct NeighborList {
    cutoffs: Vec<f64>,
    skin: f64,
    self_interaction: bool,
    bothways: bool,
    primitive: Primitive,

    snapshot: Option<Snapshot>,
    nupdates: usize,
    /// `offsets[i]..offsets[i + 1]` indexes the neighbors of atom `i`.
    offsets: Vec<usize>,
    indices: Vec<usize>,
    images: Vec<Vector3<i32>>,
}

impl NeighborList {
    pub fn new(cutoffs: Vec<f64>) -> Self {
        Self {
            cutoffs,
            skin: 0.3,
            self_interaction: true,
            bothways: false,
            primitive: Primitive::default(),
            snapshot: None,
            nupdates: 0,
            offsets: Vec::new(),
            indices: Vec::new(),
            images: Vec::new(),
        }
    }

    pub fn skin(mut self, skin: f64) -> Self {
        self.skin = skin;
        self
    }

    pub fn self_interaction(mut self, self_interaction: bool) -> Self {
        self.self_interaction = self_interaction;
        self
    }

    pub fn bothways(mut self, bothways: bool) -> Self {
        self.bothways = bothways;
        self
    }

    pub fn primitive(mut self, primitive: Primitive) -> Self {
        self.primitive = primitive;
        self
    }

    pub fn get_primitive(&self) -> Primitive {
        self.primitive
    }

    pub fn is_bothways(&self) -> bool {
        self.bothways
    }

    /// Rebuilds the list if needed and reports whether it did.
    pub fn update(&mut self, atoms: &Atoms) -> Result<bool> {
        if !self.skin.is_finite() || self.skin < 0.0 {
            return Err(NeighborError::InvalidSkin(self.skin));
        }
        if self.cutoffs.len() != atoms.len() {
            return Err(NeighborError::CutoffCountMismatch {
                expected: atoms.len(),
                found: self.cutoffs.len(),
            });
        }
        if let Some(&bad) = self.cutoffs.iter().find(|c| !c.is_finite() || **c < 0.0) {
            return Err(NeighborError::InvalidCutoff(bad));
        }
        if !self.needs_rebuild(atoms) {
            return Ok(false);
        }
        self.build(atoms)?;
        Ok(true)
    }

    fn needs_rebuild(&self, atoms: &Atoms) -> bool {
        let Some(last) = &self.snapshot else {
            return true;
        };
        if last.positions.len() != atoms.len() || last.cell != atoms.cell || last.pbc != atoms.pbc {
            return true;
        }
        let limit_sq = 0.25 * self.skin * self.skin;
        last.positions
            .iter()
            .zip(&atoms.positions)
            .any(|(old, new)| (new - old).norm_squared() > limit_sq)
    }

    fn build(&mut self, atoms: &Atoms) -> Result<()> {
        let _span = info_span!("NeighborList::build", n_atoms = atoms.len(), primitive = %self.primitive)
            .entered();
        let cutoffs = Cutoffs::PerAtom {
            radii: &self.cutoffs,
            skin: self.skin,
        };
        let cell = atoms.search_cell()?;
        let pairs = if atoms.is_empty() || cutoffs.max_pair() <= 0.0 {
            Vec::new()
        } else {
            match self.primitive {
                Primitive::Binned => binned_pairs(&atoms.positions, cell.as_ref(), cutoffs, self.self_interaction)?,
                Primitive::Tree => tree_pairs(&atoms.positions, cell.as_ref(), cutoffs, self.self_interaction)?,
            }
        };
        self.store(atoms.len(), pairs);
        self.snapshot = Some(Snapshot {
            positions: atoms.positions.clone(),
            cell: atoms.cell,
            pbc: atoms.pbc,
        });
        self.nupdates += 1;
        debug!(nneighbors = self.indices.len(), nupdates = self.nupdates, "neighbor list rebuilt");
        Ok(())
    }

    /// Packs half-list pairs into per-atom rows sorted by neighbor and image.
    fn store(&mut self, natoms: usize, pairs: Vec<Pair>) {
        let mut rows: Vec<(usize, usize, [i32; 3])> = Vec::with_capacity(pairs.len() * 2);
        for (i, j, sx, sy, sz) in pairs {
            rows.push((i, j, [sx, sy, sz]));
            if self.bothways && !(i == j && sx == 0 && sy == 0 && sz == 0) {
                rows.push((j, i, [-sx, -sy, -sz]));
            }
        }
        rows.sort_unstable();

        self.offsets = vec![0; natoms + 1];
        for &(i, _, _) in &rows {
            self.offsets[i + 1] += 1;
        }
        for i in 0..natoms {
            self.offsets[i + 1] += self.offsets[i];
        }
        self.indices = rows.iter().map(|&(_, j, _)| j).collect();
        self.images = rows.iter().map(|&(_, _, s)| Vector3::from(s)).collect();
    }

    /// Neighbors of atom `i` and the lattice offsets to apply to them: the
    /// neighbor sits at `positions[j] + offset · cell`.
    pub fn get_neighbors(&self, i: usize) -> Result<(&[usize], &[Vector3<i32>])> {
        if self.snapshot.is_none() {
            return Err(NeighborError::NotBuilt);
        }
        let natoms = self.natoms();
        if i >= natoms {
            return Err(NeighborError::IndexOutOfRange { index: i, natoms });
        }
        let range = self.offsets[i]..self.offsets[i + 1];
        Ok((&self.indices[range.clone()], &self.images[range]))
    }

    /// Total number of stored neighbor entries.
    pub fn nneighbors(&self) -> usize {
        self.indices.len()
    }

    pub fn nupdates(&self) -> usize {
        self.nupdates
    }

    pub fn natoms(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Whether both lists hold the same neighbors for every atom.
    pub fn matches(&self, other: &NeighborList) -> bool {
        self.natoms() == other.natoms()
            && self.offsets == other.offsets
            && self.indices == other.indices
            && self.images == other.images
    }
}

fn binned_pairs(
    positions: &[Vector3<f64>],
    cell: Option<&Cell>,
    cutoffs: Cutoffs<'_>,
    self_interaction: bool,
) -> Result<Vec<Pair>> {
    let cutoff = cutoffs.max_pair();
    let (cell, positions) = search_frame(positions, cell, cutoff)?;
    let cl = CellList::build(&cell, &positions, cutoff);
    Ok(cl.par_search(&cell, cutoffs, self_interaction))
}

fn tree_pairs(
    positions: &[Vector3<f64>],
    cell: Option<&Cell>,
    cutoffs: Cutoffs<'_>,
    self_interaction: bool,
) -> Result<Vec<Pair>> {
    let cell = match cell {
        Some(cell) => cell.clone(),
        None => Cell::new(nalgebra::Matrix3::identity(), Vector3::new(false, false, false))?,
    };
    periodic::tree_search(&cell, positions, cutoffs, self_interaction)
}

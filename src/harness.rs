//! Drives the neighbor list the way a structure-file benchmark does: one
//! uniform cutoff, one update, one query per atom.

use crate::atoms::Atoms;
use crate::error::Result;
use crate::neighborlist::{NeighborList, Primitive};
use std::time::{Duration, Instant};
use tracing::info_span;

/// Neighbor list options of a harness run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub skin: f64,
    pub self_interaction: bool,
    pub bothways: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            skin: 0.0,
            self_interaction: false,
            bothways: true,
        }
    }
}

/// Outcome of one harness run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub primitive: Primitive,
    /// Neighbor entries seen while querying every atom.
    pub visited: usize,
    pub elapsed: Duration,
    pub list: NeighborList,
}

/// Builds the list for `atoms` with per-atom radius `cutoff / 2` and queries
/// the neighbors of every atom.
pub fn run_primitive(
    atoms: &Atoms,
    cutoff: f64,
    primitive: Primitive,
    options: RunOptions,
) -> Result<RunReport> {
    let _span = info_span!("run_primitive", %primitive, natoms = atoms.len(), cutoff).entered();
    crate::error::check_cutoff(cutoff)?;
    let start = Instant::now();
    let cutoffs = vec![cutoff / 2.0; atoms.len()];
    let mut nl = NeighborList::new(cutoffs)
        .skin(options.skin)
        .self_interaction(options.self_interaction)
        .bothways(options.bothways)
        .primitive(primitive);
    nl.update(atoms)?;
    let mut visited = 0;
    for i in 0..atoms.len() {
        let (indices, _offsets) = nl.get_neighbors(i)?;
        visited += indices.len();
    }
    Ok(RunReport {
        primitive,
        visited,
        elapsed: start.elapsed(),
        list: nl,
    })
}

/// Binned primitive, no skin, no self-interaction, both directions.
pub fn test_new_nl(atoms: &Atoms, cutoff: f64) -> Result<usize> {
    run_primitive(atoms, cutoff, Primitive::Binned, RunOptions::default()).map(|r| r.visited)
}

/// Tree primitive, no skin, no self-interaction, both directions.
pub fn test_nl(atoms: &Atoms, cutoff: f64) -> Result<usize> {
    run_primitive(atoms, cutoff, Primitive::Tree, RunOptions::default()).map(|r| r.visited)
}

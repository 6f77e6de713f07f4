use crate::cell::Cell;
use crate::config;
use crate::error::Result;
use crate::search::{self, CellList, Cutoffs, Pair};
use nalgebra::Vector3;
use std::borrow::Cow;
use tracing::debug;

/// Extra room, beyond the cutoff, around the box built for a non-periodic system.
pub const AUTO_BOX_MARGIN: f64 = 1.0;

/// Cell and positions a search runs on. Non-periodic systems get an
/// axis-aligned bounding box, with positions moved to its origin.
pub(crate) fn search_frame<'a>(
    positions: &'a [Vector3<f64>],
    cell: Option<&Cell>,
    cutoff: f64,
) -> Result<(Cell, Cow<'a, [Vector3<f64>]>)> {
    match cell {
        Some(cell) if cell.is_periodic() => Ok((cell.clone(), Cow::Borrowed(positions))),
        _ => {
            let (bbox, origin) = Cell::bounding_box(positions, cutoff + AUTO_BOX_MARGIN)?;
            let shifted = positions.iter().map(|p| p - origin).collect();
            Ok((bbox, Cow::Owned(shifted)))
        }
    }
}

/// Half-list search of one system, picking brute force or a cell list by
/// size.
pub fn search_single(
    positions: &[Vector3<f64>],
    cell: Option<&Cell>,
    cutoffs: Cutoffs<'_>,
    self_interaction: bool,
    parallel: bool,
) -> Result<Vec<Pair>> {
    let n_atoms = positions.len();
    let cutoff = cutoffs.max_pair();
    if n_atoms == 0 || cutoff <= 0.0 {
        return Ok(Vec::new());
    }

    let (cell_inner, positions) = search_frame(positions, cell, cutoff)?;

    let perp = cell_inner.perpendicular_widths();
    let min_width = perp.x.min(perp.y).min(perp.z);
    let mic_safe = cutoff * 2.0 < min_width;

    if n_atoms < config::get_brute_force_threshold() && mic_safe {
        debug!(n_atoms, "brute force search");
        Ok(search::brute_force_search(
            &cell_inner,
            &positions,
            cutoffs,
            self_interaction,
        ))
    } else {
        let cl = CellList::build(&cell_inner, &positions, cutoff);
        if parallel && n_atoms >= config::get_parallel_threshold() {
            Ok(cl.par_search(&cell_inner, cutoffs, self_interaction))
        } else {
            Ok(cl.search(&cell_inner, cutoffs, self_interaction))
        }
    }
}

use crate::cell::Cell;
use crate::error::{NeighborError, Result};
use crate::search::{Cutoffs, EdgeResult, pairs_to_edges};
use crate::single::search_single;
use nalgebra::Vector3;
use rayon::prelude::*;
use tracing::info_span;

/// Contiguous `start..end` ranges of equal batch ids. Ids must not decrease.
pub fn system_ranges(batch: &[i32]) -> Result<Vec<(usize, usize)>> {
    let mut ranges = Vec::new();
    let Some(&first) = batch.first() else {
        return Ok(ranges);
    };
    let mut current_start = 0;
    let mut current_batch_val = first;
    for (i, &val) in batch.iter().enumerate().skip(1) {
        if val < current_batch_val {
            return Err(NeighborError::BatchNotMonotonic);
        }
        if val != current_batch_val {
            ranges.push((current_start, i));
            current_start = i;
            current_batch_val = val;
        }
    }
    ranges.push((current_start, batch.len()));
    Ok(ranges)
}

/// Half-list search of several concatenated systems, one rayon task per
/// system. Indices in the result are global.
pub fn search_batch(
    positions: &[Vector3<f64>],
    batch: &[i32],
    cells: &[Option<Cell>],
    cutoff: f64,
    parallel: bool,
) -> Result<EdgeResult> {
    let n_total = positions.len();
    if batch.len() != n_total {
        return Err(NeighborError::BatchLengthMismatch);
    }
    let system_indices = system_ranges(batch)?;
    let n_systems = system_indices.len();
    if cells.len() < n_systems {
        return Err(NeighborError::NotEnoughCells {
            expected: n_systems,
            found: cells.len(),
        });
    }
    let _span = info_span!("search_batch", n_total, n_systems).entered();

    let results: Result<Vec<EdgeResult>> = system_indices
        .par_iter()
        .enumerate()
        .map(|(i, &(start, end))| {
            let pairs = search_single(
                &positions[start..end],
                cells[i].as_ref(),
                Cutoffs::Uniform(cutoff),
                false,
                parallel,
            )?;
            let (ei, ej, s) = pairs_to_edges(pairs);
            let offset = start as i64;
            let ei_global = ei.into_iter().map(|idx| idx + offset).collect();
            let ej_global = ej.into_iter().map(|idx| idx + offset).collect();
            Ok((ei_global, ej_global, s))
        })
        .collect();

    let results = results?;

    let total_edges: usize = results.iter().map(|r| r.0.len()).sum();
    let mut final_edge_i = Vec::with_capacity(total_edges);
    let mut final_edge_j = Vec::with_capacity(total_edges);
    let mut final_shift = Vec::with_capacity(total_edges * 3);

    for (ei, ej, s) in results {
        final_edge_i.extend(ei);
        final_edge_j.extend(ej);
        final_shift.extend(s);
    }

    Ok((final_edge_i, final_edge_j, final_shift))
}

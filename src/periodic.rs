//! Periodic search by explicit replication of the atoms into the images
//! surrounding the home cell.

use crate::cell::Cell;
use crate::error::{NeighborError, Result};
use crate::points::PointTree;
use crate::search::{Cutoffs, Pair, keep_half_pair};
use nalgebra::Vector3;
use rayon::prelude::*;
use tracing::{debug, info_span};

/// Slack on the replication window so points exactly on a face are kept.
const WINDOW_EPSILON: f64 = 1e-9;

/// Upper bound on the number of replicas an [`ImageTree`] may hold.
pub const MAX_REPLICAS: usize = 1 << 26;

/// k-d tree over the home-cell atoms and every image that can lie within
/// `radius` of a point of the home cell.
#[derive(Debug, Clone)]
pub struct ImageTree {
    cell: Cell,
    radius: f64,
    tree: PointTree,
    /// Atom index and lattice image of each replica, relative to the stored
    /// (unwrapped) position.
    replicas: Vec<(usize, Vector3<i32>)>,
}

impl ImageTree {
    /// Fails when `radius` would need more than [`MAX_REPLICAS`] replicas.
    pub fn build(cell: &Cell, positions: &[Vector3<f64>], radius: f64) -> Result<Self> {
        let _span = info_span!("ImageTree::build", n_atoms = positions.len(), radius).entered();
        let pbc = cell.pbc();
        let widths = cell.perpendicular_widths();
        let window = Vector3::from_fn(|k, _| {
            if pbc[k] {
                radius / widths[k] + WINDOW_EPSILON
            } else {
                0.0
            }
        });

        // each periodic axis spans at most 2 * window + 2 images per atom
        let estimated = positions.len() as f64
            * window
                .iter()
                .zip(pbc.iter())
                .map(|(&w, &p)| if p { 2.0 * w + 2.0 } else { 1.0 })
                .product::<f64>();
        if !radius.is_finite() || estimated > MAX_REPLICAS as f64 {
            return Err(NeighborError::TooManyImages {
                radius,
                replicas: estimated,
                limit: MAX_REPLICAS,
            });
        }

        let mut points = Vec::new();
        let mut replicas = Vec::new();
        for (i, pos) in positions.iter().enumerate() {
            let shift = cell.wrap_shift(pos);
            let frac = cell.to_fractional(pos) + shift.cast::<f64>();

            // images n with -window <= frac + n <= 1 + window on each periodic axis
            let range = |k: usize| -> (i32, i32) {
                if pbc[k] {
                    (
                        (-window[k] - frac[k]).ceil() as i32,
                        (1.0 + window[k] - frac[k]).floor() as i32,
                    )
                } else {
                    (0, 0)
                }
            };
            let (ax, bx) = range(0);
            let (ay, by) = range(1);
            let (az, bz) = range(2);
            for nx in ax..=bx {
                for ny in ay..=by {
                    for nz in az..=bz {
                        let image = shift + Vector3::new(nx, ny, nz);
                        let p = pos + cell.image_translation(&image);
                        points.push([p.x, p.y, p.z]);
                        replicas.push((i, image));
                    }
                }
            }
        }
        debug!(n_replicas = replicas.len(), "replicated periodic images");

        Ok(Self {
            cell: cell.clone(),
            radius,
            tree: PointTree::new(&points),
            replicas,
        })
    }

    /// Radius the tree was built for; queries must not exceed it.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Returns `(atom, distance, image)` for every replica within `radius` of
    /// `point`, boundary included. The neighbor sits at
    /// `positions[atom] + h * image`.
    pub fn search(&self, point: &Vector3<f64>, radius: f64) -> Vec<(usize, f64, Vector3<i32>)> {
        debug_assert!(radius <= self.radius * (1.0 + WINDOW_EPSILON));
        let t = self.cell.wrap_shift(point);
        let q = point + self.cell.image_translation(&t);
        self.tree
            .within(&[q.x, q.y, q.z], radius)
            .into_iter()
            .map(|(idx, distance)| {
                let (atom, image) = self.replicas[idx];
                (atom, distance, image - t)
            })
            .collect()
    }
}

/// Half-list search through an [`ImageTree`], with the same pair rules as the
/// cell list.
pub fn tree_search(
    cell: &Cell,
    positions: &[Vector3<f64>],
    cutoffs: Cutoffs<'_>,
    self_interaction: bool,
) -> Result<Vec<Pair>> {
    let _span = info_span!("tree_search", n_atoms = positions.len()).entered();
    let images = ImageTree::build(cell, positions, cutoffs.max_pair())?;
    let pairs: Vec<Pair> = positions
        .par_iter()
        .enumerate()
        .flat_map_iter(|(i, pos_i)| {
            let mut found: Vec<Pair> = images
                .search(pos_i, cutoffs.max_for(i))
                .into_iter()
                .filter_map(|(j, _, image)| {
                    let shift = [image.x, image.y, image.z];
                    if !keep_half_pair(i, j, shift, self_interaction) {
                        return None;
                    }
                    let disp = positions[j] + cell.image_translation(&image) - pos_i;
                    (disp.norm_squared() < cutoffs.pair_sq(i, j))
                        .then_some((i, j, image.x, image.y, image.z))
                })
                .collect();
            found.sort_unstable();
            found
        })
        .collect();
    Ok(pairs)
}

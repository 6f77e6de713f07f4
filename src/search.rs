use crate::cell::Cell;
use nalgebra::Vector3;
use rayon::prelude::*;
use tracing::info_span;

// Internal tuning parameters
const BRUTE_FORCE_CAPACITY_FACTOR: usize = 10;
const Z_ORDER_BITS: u32 = 21;
const Z_ORDER_CLAMP_MAX: f64 = 0.999999;
const PARALLEL_TASKS_PER_THREAD: usize = 64;
const MAX_BINS_PER_ATOM_AXIS: f64 = 2.0;

pub type EdgeResult = (Vec<i64>, Vec<i64>, Vec<i32>);

/// `(i, j, sx, sy, sz)`: atom `j` translated by `h * s` is a neighbor of atom `i`.
pub type Pair = (usize, usize, i32, i32, i32);

/// Pair cutoff rule.
#[derive(Clone, Copy, Debug)]
pub enum Cutoffs<'a> {
    /// Same cutoff for every pair.
    Uniform(f64),
    /// Pair cutoff is `radii[i] + radii[j] + skin`.
    PerAtom { radii: &'a [f64], skin: f64 },
}

impl Cutoffs<'_> {
    /// Largest pair cutoff that can occur.
    pub fn max_pair(&self) -> f64 {
        match *self {
            Cutoffs::Uniform(c) => c,
            Cutoffs::PerAtom { radii, skin } => {
                let max_r = radii.iter().cloned().fold(0.0, f64::max);
                2.0 * max_r + skin
            }
        }
    }

    /// Largest cutoff of any pair involving atom `i`.
    pub fn max_for(&self, i: usize) -> f64 {
        match *self {
            Cutoffs::Uniform(c) => c,
            Cutoffs::PerAtom { radii, skin } => {
                let max_r = radii.iter().cloned().fold(0.0, f64::max);
                radii[i] + max_r + skin
            }
        }
    }

    #[inline]
    pub fn pair_sq(&self, i: usize, j: usize) -> f64 {
        match *self {
            Cutoffs::Uniform(c) => c * c,
            Cutoffs::PerAtom { radii, skin } => {
                let c = radii[i] + radii[j] + skin;
                c * c
            }
        }
    }
}

/// Whether a pair found by a search is kept in a half list.
///
/// Distinct atoms are kept once as `i < j`. A periodic image of an atom is kept
/// for the lexicographically positive shift only, and the atom itself at zero
/// shift only with `self_interaction`.
#[inline]
pub fn keep_half_pair(i: usize, j: usize, shift: [i32; 3], self_interaction: bool) -> bool {
    if i != j {
        return i < j;
    }
    match shift.iter().find(|&&s| s != 0) {
        Some(&s) => s > 0,
        None => self_interaction,
    }
}

pub struct CellList {
    /// particles[sorted_idx] = original_idx
    particles: Vec<usize>,
    /// cell_starts[bin_rank] = start index in particles
    cell_starts: Vec<usize>,
    /// Maps linear bin index (bx + nx*(by + ny*bz)) to Morton rank
    bin_ranks: Vec<usize>,
    /// Wrapped positions in sorted order (index matches sorted_idx).
    pos_wrapped: Vec<Vector3<f64>>,
    /// Wrapping shifts in sorted order (index matches sorted_idx).
    atom_shifts: Vec<Vector3<i32>>,
    /// Bin of each atom in sorted order.
    atom_bins: Vec<Vector3<i32>>,
    num_bins: Vector3<usize>,
    n_search: Vector3<i32>,
    pbc: Vector3<bool>,
}

impl CellList {
    pub fn build(cell: &Cell, positions: &[Vector3<f64>], cutoff: f64) -> Self {
        let _span = info_span!("CellList::build", n_atoms = positions.len()).entered();
        let n_atoms = positions.len();
        let pbc = *cell.pbc();

        // 1. Wrap periodic axes and compute Z-order keys in parallel
        let mut atom_data: Vec<(u64, usize, Vector3<f64>, Vector3<i32>)> = {
            let _s = info_span!("compute_z_order").entered();
            positions
                .par_iter()
                .enumerate()
                .map(|(i, pos)| {
                    let shift = cell.wrap_shift(pos);
                    let frac = cell.to_fractional(pos) + shift.cast::<f64>();
                    (compute_z_order(&frac), i, frac, shift)
                })
                .collect()
        };

        // 2. Sort atoms spatially by global Z-order
        {
            let _s = info_span!("spatial_sort").entered();
            atom_data.sort_unstable_by_key(|&(z, i, _, _)| (z, i));
        }

        // 3. Setup bins and compute Morton ranks for bins
        let perp_widths = cell.perpendicular_widths();
        let nx = (perp_widths.x / cutoff).floor() as usize;
        let ny = (perp_widths.y / cutoff).floor() as usize;
        let nz = (perp_widths.z / cutoff).floor() as usize;
        // Cap the grid so a tiny cutoff in a large box cannot explode the bin count
        let max_bins = ((n_atoms.max(1) as f64).cbrt() * MAX_BINS_PER_ATOM_AXIS).ceil() as usize;
        let num_bins = Vector3::new(
            nx.clamp(1, max_bins),
            ny.clamp(1, max_bins),
            nz.clamp(1, max_bins),
        );
        let total_bins = num_bins.x * num_bins.y * num_bins.z;

        let mut bin_ranks = vec![0; total_bins];
        {
            let _s = info_span!("compute_bin_ranks").entered();
            let mut bin_morton: Vec<(u64, usize)> = (0..total_bins)
                .map(|i| {
                    let bx = i % num_bins.x;
                    let by = (i / num_bins.x) % num_bins.y;
                    let bz = i / (num_bins.x * num_bins.y);
                    (
                        interleave_3(bx as u64)
                            | (interleave_3(by as u64) << 1)
                            | (interleave_3(bz as u64) << 2),
                        i,
                    )
                })
                .collect();
            bin_morton.sort_unstable_by_key(|&(z, _)| z);
            for (rank, &(_z, linear_idx)) in bin_morton.iter().enumerate() {
                bin_ranks[linear_idx] = rank;
            }
        }

        let mut n_search = Vector3::new(
            (cutoff * num_bins.x as f64 / perp_widths.x).ceil() as i32,
            (cutoff * num_bins.y as f64 / perp_widths.y).ceil() as i32,
            (cutoff * num_bins.z as f64 / perp_widths.z).ceil() as i32,
        );
        // Without periodicity there is nothing beyond the last bin
        for k in 0..3 {
            if !pbc[k] {
                n_search[k] = n_search[k].min(num_bins[k] as i32 - 1);
            }
        }

        // 4. Compute bin counts directly from atom_data
        let bins: Vec<Vector3<i32>> = atom_data
            .iter()
            .map(|(_, _, frac, _)| bin_of(frac, &num_bins))
            .collect();
        let mut counts = vec![0; total_bins];
        for b in &bins {
            counts[bin_ranks[linear_index(b, &num_bins)]] += 1;
        }

        let mut cell_starts = vec![0; total_bins + 1];
        let mut accum = 0;
        for i in 0..total_bins {
            cell_starts[i] = accum;
            accum += counts[i];
        }
        cell_starts[total_bins] = accum;

        let mut final_pos_wrapped = vec![Vector3::zeros(); n_atoms];
        let mut final_atom_shifts = vec![Vector3::zeros(); n_atoms];
        let mut final_atom_bins = vec![Vector3::zeros(); n_atoms];
        let mut final_particles = vec![0; n_atoms];
        let mut current_fill = cell_starts.clone();

        // 5. Fill final arrays
        {
            let _s = info_span!("bin_fill").entered();
            for (&(_z, original_idx, _, atom_shift), b) in atom_data.iter().zip(&bins) {
                let rank = bin_ranks[linear_index(b, &num_bins)];
                let loc = current_fill[rank];
                final_pos_wrapped[loc] =
                    positions[original_idx] + cell.image_translation(&atom_shift);
                final_atom_shifts[loc] = atom_shift;
                final_atom_bins[loc] = *b;
                final_particles[loc] = original_idx;
                current_fill[rank] += 1;
            }
        }

        Self {
            particles: final_particles,
            cell_starts,
            bin_ranks,
            pos_wrapped: final_pos_wrapped,
            atom_shifts: final_atom_shifts,
            atom_bins: final_atom_bins,
            num_bins,
            n_search,
            pbc,
        }
    }

    pub fn num_bins(&self) -> Vector3<usize> {
        self.num_bins
    }

    pub fn get_atoms_in_bin(&self, bx: usize, by: usize, bz: usize) -> &[usize] {
        if bx >= self.num_bins.x || by >= self.num_bins.y || bz >= self.num_bins.z {
            return &[];
        }
        let linear_idx = bx + self.num_bins.x * (by + self.num_bins.y * bz);
        let rank = self.bin_ranks[linear_idx];
        &self.particles[self.cell_starts[rank]..self.cell_starts[rank + 1]]
    }

    /// Serial half-list search.
    pub fn search(&self, cell: &Cell, cutoffs: Cutoffs<'_>, self_interaction: bool) -> Vec<Pair> {
        let _span = info_span!("CellList::search").entered();
        let mut neighbors = Vec::new();
        for i in 0..self.particles.len() {
            self.search_atom_neighbors(i, cell, cutoffs, self_interaction, &mut neighbors);
        }
        neighbors
    }

    /// Parallel half-list search. The result holds the same pairs as
    /// [`CellList::search`], not necessarily in the same order.
    pub fn par_search(
        &self,
        cell: &Cell,
        cutoffs: Cutoffs<'_>,
        self_interaction: bool,
    ) -> Vec<Pair> {
        let _span = info_span!("CellList::par_search").entered();
        let n_atoms = self.particles.len();

        let num_threads = rayon::current_num_threads();
        let min_len = (n_atoms / (num_threads * PARALLEL_TASKS_PER_THREAD)).max(1);

        (0..n_atoms)
            .into_par_iter()
            .with_min_len(min_len)
            .flat_map_iter(|i| {
                let mut local_neighbors = Vec::new();
                self.search_atom_neighbors(i, cell, cutoffs, self_interaction, &mut local_neighbors);
                local_neighbors
            })
            .collect()
    }

    fn search_atom_neighbors(
        &self,
        i: usize,
        cell: &Cell,
        cutoffs: Cutoffs<'_>,
        self_interaction: bool,
        neighbors: &mut Vec<Pair>,
    ) {
        let pos_i_w = self.pos_wrapped[i];
        let s_i = self.atom_shifts[i];
        let b_i = self.atom_bins[i];
        let i_orig = self.particles[i];

        let nb = Vector3::new(
            self.num_bins.x as i32,
            self.num_bins.y as i32,
            self.num_bins.z as i32,
        );

        for dx in -self.n_search.x..=self.n_search.x {
            let Some((nbx, sx)) = self.neighbor_bin(0, b_i.x + dx, nb.x) else {
                continue;
            };
            for dy in -self.n_search.y..=self.n_search.y {
                let Some((nby, sy)) = self.neighbor_bin(1, b_i.y + dy, nb.y) else {
                    continue;
                };
                for dz in -self.n_search.z..=self.n_search.z {
                    let Some((nbz, sz)) = self.neighbor_bin(2, b_i.z + dz, nb.z) else {
                        continue;
                    };

                    let linear_idx = nbx + self.num_bins.x * (nby + self.num_bins.y * nbz);
                    let rank = self.bin_ranks[linear_idx];
                    let start_j = self.cell_starts[rank];
                    let end_j = self.cell_starts[rank + 1];

                    if start_j == end_j {
                        continue;
                    }

                    let offset_vec = cell.image_translation(&Vector3::new(sx, sy, sz));

                    for sorted_idx_j in start_j..end_j {
                        let j_orig = self.particles[sorted_idx_j];
                        if i_orig > j_orig {
                            continue;
                        }
                        let s_j = self.atom_shifts[sorted_idx_j];
                        let shift = [
                            s_j.x - s_i.x + sx,
                            s_j.y - s_i.y + sy,
                            s_j.z - s_i.z + sz,
                        ];
                        if !keep_half_pair(i_orig, j_orig, shift, self_interaction) {
                            continue;
                        }
                        let disp: Vector3<f64> =
                            (self.pos_wrapped[sorted_idx_j] - pos_i_w) + offset_vec;

                        if disp.norm_squared() < cutoffs.pair_sq(i_orig, j_orig) {
                            neighbors.push((i_orig, j_orig, shift[0], shift[1], shift[2]));
                        }
                    }
                }
            }
        }
    }

    /// Resolves a bin index along `axis` that may lie outside the grid:
    /// folded back with an image shift on periodic axes, rejected otherwise.
    #[inline]
    fn neighbor_bin(&self, axis: usize, val: i32, max: i32) -> Option<(usize, i32)> {
        if self.pbc[axis] {
            Some(div_mod(val, max))
        } else if (0..max).contains(&val) {
            Some((val as usize, 0))
        } else {
            None
        }
    }
}

fn div_mod(val: i32, max: i32) -> (usize, i32) {
    let rem = val.rem_euclid(max);
    let shift = val.div_euclid(max);
    (rem as usize, shift)
}

fn bin_of(frac: &Vector3<f64>, num_bins: &Vector3<usize>) -> Vector3<i32> {
    let axis = |f: f64, n: usize| ((f * n as f64).floor() as i64).clamp(0, n as i64 - 1) as i32;
    Vector3::new(
        axis(frac.x, num_bins.x),
        axis(frac.y, num_bins.y),
        axis(frac.z, num_bins.z),
    )
}

fn linear_index(b: &Vector3<i32>, num_bins: &Vector3<usize>) -> usize {
    b.x as usize + num_bins.x * (b.y as usize + num_bins.y * b.z as usize)
}

/// Computes a 64-bit Morton (Z-order) index for fractional coordinates [0, 1).
fn compute_z_order(frac: &Vector3<f64>) -> u64 {
    let x = (frac.x.clamp(0.0, Z_ORDER_CLAMP_MAX) * (1u64 << Z_ORDER_BITS) as f64) as u64;
    let y = (frac.y.clamp(0.0, Z_ORDER_CLAMP_MAX) * (1u64 << Z_ORDER_BITS) as f64) as u64;
    let z = (frac.z.clamp(0.0, Z_ORDER_CLAMP_MAX) * (1u64 << Z_ORDER_BITS) as f64) as u64;

    interleave_3(x) | (interleave_3(y) << 1) | (interleave_3(z) << 2)
}

fn interleave_3(mut x: u64) -> u64 {
    x &= 0x1fffff;
    x = (x | x << 32) & 0x1f00000000ffffu64;
    x = (x | x << 16) & 0x1f0000ff0000ffu64;
    x = (x | x << 8) & 0x100f00f00f00f00fu64;
    x = (x | x << 4) & 0x10c30c30c30c30c3u64;
    x = (x | x << 2) & 0x1249249249249249u64;
    x
}

/// Minimum-image half-list search over all pairs.
///
/// Only exact while twice the largest pair cutoff stays below the smallest
/// perpendicular width of the cell.
pub fn brute_force_search(
    cell: &Cell,
    positions: &[Vector3<f64>],
    cutoffs: Cutoffs<'_>,
    self_interaction: bool,
) -> Vec<Pair> {
    let n = positions.len();
    let mut neighbors = Vec::with_capacity(n * BRUTE_FORCE_CAPACITY_FACTOR);

    for i in 0..n {
        if self_interaction && 0.0 < cutoffs.pair_sq(i, i) {
            neighbors.push((i, i, 0, 0, 0));
        }
        for j in (i + 1)..n {
            let (shift, disp) = cell.get_shift_and_displacement(&positions[i], &positions[j]);
            if disp.norm_squared() < cutoffs.pair_sq(i, j) {
                neighbors.push((i, j, shift.x, shift.y, shift.z));
            }
        }
    }
    neighbors
}

/// Flattens pairs into the edge-list layout.
pub fn pairs_to_edges(pairs: Vec<Pair>) -> EdgeResult {
    let n_edges = pairs.len();
    let mut edge_i = Vec::with_capacity(n_edges);
    let mut edge_j = Vec::with_capacity(n_edges);
    let mut shifts = Vec::with_capacity(n_edges * 3);
    for (i, j, sx, sy, sz) in pairs {
        edge_i.push(i as i64);
        edge_j.push(j as i64);
        shifts.push(sx);
        shifts.push(sy);
        shifts.push(sz);
    }
    (edge_i, edge_j, shifts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;

    fn cubic(l: f64) -> Cell {
        Cell::new(Matrix3::identity() * l, Vector3::new(true, true, true)).unwrap()
    }

    fn ij(pairs: &[Pair]) -> Vec<(usize, usize)> {
        let mut v: Vec<_> = pairs.iter().map(|&(i, j, _, _, _)| (i, j)).collect();
        v.sort();
        v
    }

    #[test]
    fn test_z_order_calculation() {
        let p1 = Vector3::new(0.1, 0.1, 0.1);
        let p2 = Vector3::new(0.1, 0.1, 0.11);
        let p3 = Vector3::new(0.9, 0.9, 0.9);

        let z1 = compute_z_order(&p1);
        let z2 = compute_z_order(&p2);
        let z3 = compute_z_order(&p3);

        assert!(z1 < z2);
        assert!(z2 < z3);

        // Test clamping
        let p_out = Vector3::new(1.1, -0.1, 0.5);
        let z_out = compute_z_order(&p_out);
        assert!(z_out > 0);
    }

    #[test]
    fn test_keep_half_pair() {
        assert!(keep_half_pair(0, 1, [0, 0, 0], false));
        assert!(!keep_half_pair(1, 0, [0, 0, 0], false));
        assert!(keep_half_pair(2, 2, [0, 1, -1], false));
        assert!(!keep_half_pair(2, 2, [0, -1, 1], false));
        assert!(!keep_half_pair(2, 2, [0, 0, 0], false));
        assert!(keep_half_pair(2, 2, [0, 0, 0], true));
    }

    #[test]
    fn test_spatial_reordering_correctness() {
        let cell = cubic(10.0);

        // Atoms that are far in original index but close in space
        let positions = vec![
            Vector3::new(1.0, 1.0, 1.0), // idx 0
            Vector3::new(9.0, 9.0, 9.0), // idx 1
            Vector3::new(1.1, 1.1, 1.1), // idx 2
        ];

        let cutoff = 2.0;
        let cl = CellList::build(&cell, &positions, cutoff);

        let bin0 = cl.get_atoms_in_bin(0, 0, 0);
        assert_eq!(bin0.len(), 2);

        let loc0 = cl.particles.iter().position(|&p| p == 0).unwrap();
        let loc2 = cl.particles.iter().position(|&p| p == 2).unwrap();

        // They should be adjacent in memory (in the same bin)
        assert_eq!((loc0 as isize - loc2 as isize).abs(), 1);

        let neighbors = cl.search(&cell, Cutoffs::Uniform(cutoff), false);
        assert!(neighbors.iter().any(|&(i, j, _, _, _)| i == 0 && j == 2));
    }

    #[test]
    fn test_brute_force_reference() {
        let cell = cubic(10.0);

        let positions = vec![
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(1.0, 3.5, 1.0),
            Vector3::new(8.5, 1.0, 1.0),
        ];

        let neighbors = brute_force_search(&cell, &positions, Cutoffs::Uniform(3.0), false);
        assert_eq!(neighbors.len(), 2);
        assert!(neighbors.contains(&(0, 1, 0, 0, 0)));
        assert!(neighbors.contains(&(0, 2, -1, 0, 0)));
    }

    #[test]
    fn test_cell_list_structure() {
        let cell = cubic(10.0);

        let positions = vec![
            Vector3::new(1.0, 1.0, 1.0), // Bin [0, 0, 0]
            Vector3::new(9.0, 9.0, 9.0), // Bin [2, 2, 2]
            Vector3::new(1.1, 1.1, 1.1), // Bin [0, 0, 0]
        ];

        let cl = CellList::build(&cell, &positions, 3.0);

        assert_eq!(cl.num_bins(), Vector3::new(3, 3, 3));

        let bin0 = cl.get_atoms_in_bin(0, 0, 0);
        assert_eq!(bin0.len(), 2);
        assert!(bin0.contains(&0));
        assert!(bin0.contains(&2));

        let bin2 = cl.get_atoms_in_bin(2, 2, 2);
        assert_eq!(bin2, &[1]);

        assert!(cl.get_atoms_in_bin(1, 1, 1).is_empty());
        assert!(cl.get_atoms_in_bin(5, 0, 0).is_empty());
    }

    #[test]
    fn test_cell_list_search_vs_brute_force() {
        let cell = cubic(10.0);

        let positions = vec![
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(1.2, 1.2, 1.2), // Neighbor to 0
            Vector3::new(9.8, 9.8, 9.8), // Neighbor to 0 via PBC
            Vector3::new(5.0, 5.0, 5.0), // Isolated
        ];

        let cutoffs = Cutoffs::Uniform(2.0);
        let mut expected = brute_force_search(&cell, &positions, cutoffs, false);
        let cl = CellList::build(&cell, &positions, 2.0);
        let mut result = cl.search(&cell, cutoffs, false);

        expected.sort();
        result.sort();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_unwrapped_positions_keep_raw_shifts() {
        let cell = cubic(10.0);
        // atom 1 sits one box to the right of its wrapped image
        let positions = vec![Vector3::new(1.0, 5.0, 5.0), Vector3::new(19.5, 5.0, 5.0)];
        let cl = CellList::build(&cell, &positions, 2.0);
        let pairs = cl.search(&cell, Cutoffs::Uniform(2.0), false);
        // 19.5 - 2 * 10 = -0.5, distance 1.5 from atom 0
        assert_eq!(pairs, vec![(0, 1, -2, 0, 0)]);
    }

    #[test]
    fn test_self_images_in_small_cell() {
        // One atom, cutoff longer than the box: images at +-a, +-b, +-c
        let cell = cubic(2.0);
        let positions = vec![Vector3::new(0.5, 0.5, 0.5)];
        let cl = CellList::build(&cell, &positions, 2.5);
        let mut pairs = cl.search(&cell, Cutoffs::Uniform(2.5), false);
        pairs.sort();
        assert_eq!(pairs, vec![(0, 0, 0, 0, 1), (0, 0, 0, 1, 0), (0, 0, 1, 0, 0)]);

        let with_self = cl.search(&cell, Cutoffs::Uniform(2.5), true);
        assert_eq!(with_self.len(), 4);
        assert!(with_self.contains(&(0, 0, 0, 0, 0)));
    }

    #[test]
    fn test_non_periodic_axis_is_not_folded() {
        let h = Matrix3::identity() * 10.0;
        let cell = Cell::new(h, Vector3::new(true, true, false)).unwrap();
        let positions = vec![Vector3::new(5.0, 5.0, 0.5), Vector3::new(5.0, 5.0, 9.5)];
        let cl = CellList::build(&cell, &positions, 2.0);
        assert!(cl.search(&cell, Cutoffs::Uniform(2.0), false).is_empty());

        // positions outside the cell along the open axis still pair up
        let positions = vec![Vector3::new(5.0, 5.0, -3.0), Vector3::new(5.0, 5.0, -4.0)];
        let cl = CellList::build(&cell, &positions, 2.0);
        assert_eq!(
            cl.search(&cell, Cutoffs::Uniform(2.0), false),
            vec![(0, 1, 0, 0, 0)]
        );
    }

    #[test]
    fn test_per_atom_cutoffs() {
        let cell = cubic(20.0);
        let positions = vec![
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(2.5, 1.0, 1.0),
            Vector3::new(4.5, 1.0, 1.0),
        ];
        let radii = [1.0, 0.6, 1.0];
        let cutoffs = Cutoffs::PerAtom {
            radii: &radii,
            skin: 0.0,
        };
        assert_eq!(cutoffs.max_pair(), 2.0);
        let cl = CellList::build(&cell, &positions, cutoffs.max_pair());
        // 0-1: 1.5 < 1.6; 1-2: 2.0 > 1.6; 0-2: 3.5 > 2.0
        assert_eq!(ij(&cl.search(&cell, cutoffs, false)), vec![(0, 1)]);

        let skinned = Cutoffs::PerAtom {
            radii: &radii,
            skin: 0.5,
        };
        let cl = CellList::build(&cell, &positions, skinned.max_pair());
        assert_eq!(ij(&cl.search(&cell, skinned, false)), vec![(0, 1), (1, 2)]);
    }

    #[cfg(feature = "dhat-heap")]
    #[test]
    fn test_memory_profile() {
        let _profiler = dhat::Profiler::new_heap();

        let cell = cubic(20.0);
        let mut positions = Vec::new();
        for i in 0..100 {
            for j in 0..100 {
                positions.push(Vector3::new(i as f64 * 0.2, j as f64 * 0.2, 0.0));
            }
        }

        let cutoff = 3.0;
        let cl = CellList::build(&cell, &positions, cutoff);
        let _ = cl.par_search(&cell, Cutoffs::Uniform(cutoff), false);
    }

    #[test]
    fn test_par_search_consistency() {
        let cell = cubic(10.0);

        let mut positions = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                for k in 0..5 {
                    positions.push(Vector3::new(i as f64, j as f64, k as f64));
                }
            }
        }

        let cutoffs = Cutoffs::Uniform(1.5);
        let cl = CellList::build(&cell, &positions, 1.5);

        let mut serial_results = cl.search(&cell, cutoffs, false);
        serial_results.sort();
        let mut par_results = cl.par_search(&cell, cutoffs, false);
        par_results.sort();

        assert_eq!(serial_results, par_results);
    }

    #[test]
    fn test_pairs_to_edges() {
        let (ei, ej, s) = pairs_to_edges(vec![(0, 1, 0, 0, 0), (1, 2, -1, 0, 1)]);
        assert_eq!(ei, vec![0, 1]);
        assert_eq!(ej, vec![1, 2]);
        assert_eq!(s, vec![0, 0, 0, -1, 0, 1]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_search_correctness(
                box_size in 10.0..20.0,
                cutoff in 1.0..3.0,
                positions_data in prop::collection::vec(prop::collection::vec(0.0..20.0, 3), 2..50)
            ) {
                let cell = cubic(box_size);

                let positions: Vec<_> = positions_data
                    .iter()
                    .map(|p| Vector3::new(p[0] % box_size, p[1] % box_size, p[2] % box_size))
                    .collect();

                let cutoffs = Cutoffs::Uniform(cutoff);
                let mut expected = brute_force_search(&cell, &positions, cutoffs, false);
                let cl = CellList::build(&cell, &positions, cutoff);
                let mut result = cl.search(&cell, cutoffs, false);

                expected.sort();
                result.sort();

                prop_assert_eq!(result, expected);
            }
        }
    }
}

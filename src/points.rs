//! Fixed-radius queries over a static point set, on a kiddo k-d tree.

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use tracing::debug_span;

pub type Point = [f64; 3];

#[derive(Debug, Clone)]
pub struct PointTree {
    tree: ImmutableKdTree<f64, 3>,
    len: usize,
}

impl PointTree {
    pub fn new(points: &[Point]) -> Self {
        let _span = debug_span!("PointTree::new", n_points = points.len()).entered();
        Self {
            tree: ImmutableKdTree::new_from_slice(points),
            len: points.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `(index, distance)` of every point within `radius` of `p`,
    /// boundary included.
    pub fn within(&self, p: &Point, radius: f64) -> Vec<(usize, f64)> {
        if self.is_empty() || radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        self.tree
            .within_unsorted::<SquaredEuclidean>(p, radius * radius)
            .into_iter()
            .map(|nn| (nn.item as usize, nn.distance.sqrt()))
            .collect()
    }
}

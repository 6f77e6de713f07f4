//! Keyed neighbor detector over a set of labelled points.

use crate::cell::Cell;
use crate::error::{NeighborError, Result, check_cutoff};
use crate::periodic::ImageTree;
use crate::points::{Point, PointTree};
use indexmap::IndexMap;
use nalgebra::Vector3;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

/// A point found near a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Key of the point.
    pub node: usize,
    pub distance: f64,
    /// Lattice image holding the neighbor, for periodic searches.
    pub image: Option<Vector3<i32>>,
}

/// Stores keyed points and answers fixed-radius queries, with or without a
/// periodic lattice.
#[derive(Debug, Default)]
pub struct Neighborhood {
    points: IndexMap<usize, Point>,
    tree: Option<PointTree>,
    lattice: Option<Cell>,
    /// Image tree for the largest periodic radius requested since the last
    /// mutation.
    images: RwLock<Option<Arc<ImageTree>>>,
}

impl Clone for Neighborhood {
    fn clone(&self) -> Self {
        let images = self
            .images
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Self {
            points: self.points.clone(),
            tree: self.tree.clone(),
            lattice: self.lattice.clone(),
            images: RwLock::new(images),
        }
    }
}

impl Neighborhood {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts new points or moves existing ones. Keys keep the order of
    /// their first insertion.
    pub fn update<I>(&mut self, points: I)
    where
        I: IntoIterator<Item = (usize, Point)>,
    {
        for (key, p) in points {
            self.points.insert(key, p);
        }
        let points: Vec<Point> = self.points.values().copied().collect();
        self.tree = Some(PointTree::new(&points));
        self.invalidate();
    }

    /// Enables periodic search. `rows` are the lattice vectors a, b, c.
    pub fn set_lattice(&mut self, rows: [[f64; 3]; 3]) -> Result<()> {
        self.lattice = Some(Cell::from_rows(rows, [true; 3])?);
        self.invalidate();
        Ok(())
    }

    pub fn lattice(&self) -> Option<&Cell> {
        self.lattice.as_ref()
    }

    pub fn npoints(&self) -> usize {
        self.points.len()
    }

    pub fn get_position(&self, key: usize) -> Option<Point> {
        self.points.get(&key).copied()
    }

    /// Removes every point and the lattice.
    pub fn clear(&mut self) {
        self.points.clear();
        self.tree = None;
        self.lattice = None;
        self.invalidate();
    }

    /// Neighbors of the stored point `key` within `radius`. The point itself
    /// is left out, its periodic images are not.
    pub fn neighbors(&self, key: usize, radius: f64) -> Result<Vec<Neighbor>> {
        let pt = self
            .get_position(key)
            .ok_or(NeighborError::UnknownNode(key))?;
        let found = self
            .search(pt, radius)?
            .into_iter()
            .filter(|n| !(n.node == key && n.image.is_none_or(|img| img == Vector3::zeros())))
            .collect();
        Ok(found)
    }

    /// Stored points within `radius` of an arbitrary location. `radius` must
    /// be positive and finite.
    pub fn search(&self, pt: Point, radius: f64) -> Result<Vec<Neighbor>> {
        check_cutoff(radius)?;
        match &self.lattice {
            Some(_) => self.search_periodic(pt, radius),
            None => Ok(self.search_aperiodic(pt, radius)),
        }
    }

    fn search_aperiodic(&self, pt: Point, radius: f64) -> Vec<Neighbor> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };
        tree.within(&pt, radius)
            .into_iter()
            .filter_map(|(index, distance)| {
                let (&node, _) = self.points.get_index(index)?;
                Some(Neighbor {
                    node,
                    distance,
                    image: None,
                })
            })
            .collect()
    }

    fn search_periodic(&self, pt: Point, radius: f64) -> Result<Vec<Neighbor>> {
        let Some(images) = self.image_tree(radius)? else {
            return Ok(Vec::new());
        };
        let found = images
            .search(&Vector3::from(pt), radius)
            .into_iter()
            .filter_map(|(index, distance, image)| {
                let (&node, _) = self.points.get_index(index)?;
                Some(Neighbor {
                    node,
                    distance,
                    image: Some(image),
                })
            })
            .collect();
        Ok(found)
    }

    /// Cached image tree able to answer `radius`, rebuilt when too small.
    fn image_tree(&self, radius: f64) -> Result<Option<Arc<ImageTree>>> {
        let Some(lattice) = self.lattice.as_ref() else {
            return Ok(None);
        };
        {
            let cached = self.images.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(tree) = cached.as_ref()
                && tree.radius() >= radius
            {
                return Ok(Some(Arc::clone(tree)));
            }
        }

        let mut cached = self.images.write().unwrap_or_else(PoisonError::into_inner);
        // another thread may have built a large enough tree meanwhile
        if let Some(tree) = cached.as_ref()
            && tree.radius() >= radius
        {
            return Ok(Some(Arc::clone(tree)));
        }
        trace!(radius, "rebuilding periodic image tree");
        let positions: Vec<Vector3<f64>> = self.points.values().map(|&p| Vector3::from(p)).collect();
        let tree = Arc::new(ImageTree::build(lattice, &positions, radius)?);
        *cached = Some(Arc::clone(&tree));
        Ok(Some(tree))
    }

    fn invalidate(&mut self) {
        *self.images.get_mut().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

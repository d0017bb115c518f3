use geo::{Geometry, Intersects};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;

use crate::{geometry_distance, Bounds};

/// A spatial index over arbitrary geometries, answering bounding-box, intersection, and distance
/// queries. Once built, every query is read-only, so one index can be shared across worker
/// threads.
pub struct FindClosest<K> {
    geometries: Vec<(K, Geometry)>,
    tree: RTree<GeomWithData<Rectangle<[f64; 2]>, usize>>,
}

impl<K> FindClosest<K>
where
    K: Clone,
{
    pub fn new() -> FindClosest<K> {
        FindClosest {
            geometries: Vec::new(),
            tree: RTree::new(),
        }
    }

    pub fn add(&mut self, key: K, geom: Geometry) {
        let bounds = Bounds::from_geometry(&geom);
        let idx = self.geometries.len();
        self.geometries.push((key, geom));
        // Empty geometries are remembered, but can never match a query
        if !bounds.is_empty() {
            self.tree.insert(GeomWithData::new(
                Rectangle::from_corners([bounds.min_x, bounds.min_y], [bounds.max_x, bounds.max_y]),
                idx,
            ));
        }
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// Indices of everything whose bounding box overlaps `bounds`, in insertion order.
    fn candidates(&self, bounds: &Bounds) -> Vec<usize> {
        if bounds.is_empty() {
            return Vec::new();
        }
        let mut result: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&bounds.as_aabb())
            .map(|obj| obj.data)
            .collect();
        result.sort_unstable();
        result
    }

    /// Everything whose bounding box overlaps `bounds`.
    pub fn query_bbox(&self, bounds: &Bounds) -> Vec<(&K, &Geometry)> {
        self.candidates(bounds)
            .into_iter()
            .map(|idx| (&self.geometries[idx].0, &self.geometries[idx].1))
            .collect()
    }

    /// Does anything in the index touch or overlap the query geometry?
    pub fn any_intersecting(&self, query: &Geometry) -> bool {
        self.candidates(&Bounds::from_geometry(query))
            .into_iter()
            .any(|idx| self.geometries[idx].1.intersects(query))
    }

    /// The keys of everything within `max_dist` of the query geometry, in insertion order.
    pub fn within_distance(&self, query: &Geometry, max_dist: f64) -> Vec<K> {
        self.candidates(&Bounds::from_geometry(query).expanded(max_dist))
            .into_iter()
            .filter(|idx| geometry_distance(&self.geometries[*idx].1, query) <= max_dist)
            .map(|idx| self.geometries[idx].0.clone())
            .collect()
    }

    pub fn any_within_distance(&self, query: &Geometry, max_dist: f64) -> bool {
        self.candidates(&Bounds::from_geometry(query).expanded(max_dist))
            .into_iter()
            .any(|idx| geometry_distance(&self.geometries[idx].1, query) <= max_dist)
    }

    /// The closest indexed geometry no further than `max_dist_away`, and its distance.
    pub fn closest(&self, query: &Geometry, max_dist_away: f64) -> Option<(K, f64)> {
        self.candidates(&Bounds::from_geometry(query).expanded(max_dist_away))
            .into_iter()
            .map(|idx| (idx, geometry_distance(&self.geometries[idx].1, query)))
            .filter(|(_, dist)| *dist <= max_dist_away)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(idx, dist)| (self.geometries[idx].0.clone(), dist))
    }
}

impl<K: Clone> Default for FindClosest<K> {
    fn default() -> Self {
        FindClosest::new()
    }
}

use geo::{Coord, CoordsIter, Geometry};
use rstar::AABB;
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box. A freshly constructed `Bounds` is inverted (min > max) until the
/// first point is added, and is considered empty until then.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new() -> Bounds {
        Bounds {
            min_x: f64::MAX,
            min_y: f64::MAX,
            max_x: f64::MIN,
            max_y: f64::MIN,
        }
    }

    pub fn from(pts: &[Coord]) -> Bounds {
        let mut b = Bounds::new();
        for pt in pts {
            b.update(*pt);
        }
        b
    }

    pub fn from_geometry(geom: &Geometry) -> Bounds {
        let mut b = Bounds::new();
        for pt in geom.coords_iter() {
            b.update(pt);
        }
        b
    }

    pub fn update(&mut self, pt: Coord) {
        self.min_x = self.min_x.min(pt.x);
        self.max_x = self.max_x.max(pt.x);
        self.min_y = self.min_y.min(pt.y);
        self.max_y = self.max_y.max(pt.y);
    }

    pub fn union(&mut self, other: &Bounds) {
        if other.is_empty() {
            return;
        }
        self.update(Coord {
            x: other.min_x,
            y: other.min_y,
        });
        self.update(Coord {
            x: other.max_x,
            y: other.max_y,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn contains(&self, pt: Coord) -> bool {
        pt.x >= self.min_x && pt.x <= self.max_x && pt.y >= self.min_y && pt.y <= self.max_y
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Grow the box by `dist` on every side.
    pub fn expanded(&self, dist: f64) -> Bounds {
        if self.is_empty() {
            return *self;
        }
        Bounds {
            min_x: self.min_x - dist,
            min_y: self.min_y - dist,
            max_x: self.max_x + dist,
            max_y: self.max_y + dist,
        }
    }

    pub fn as_aabb(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point};

    #[test]
    fn empty_until_updated() {
        let mut b = Bounds::new();
        assert!(b.is_empty());
        b.update(Coord { x: 1.0, y: 2.0 });
        assert!(!b.is_empty());
        assert!(b.contains(Coord { x: 1.0, y: 2.0 }));
    }

    #[test]
    fn geometry_bounds_and_overlap() {
        let line: Geometry = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 5.0)].into();
        let b = Bounds::from_geometry(&line);
        assert_eq!(b.min_x, 0.0);
        assert_eq!(b.max_y, 5.0);

        let pt: Geometry = point!(x: 12.0, y: 2.0).into();
        let other = Bounds::from_geometry(&pt);
        assert!(!b.intersects(&other));
        assert!(b.expanded(2.0).intersects(&other));
    }
}

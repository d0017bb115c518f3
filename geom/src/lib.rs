//! Geometry helpers layered on top of the `geo` crate: bounding boxes, an rstar-backed spatial
//! index, distances, splitting lines against other lines, coordinate reference systems, and
//! contouring raster grids.

mod bounds;
mod crs;
mod distance;
mod find_closest;
mod grid;
mod intersections;
mod split;

pub use crate::bounds::Bounds;
pub use crate::crs::{transform_geometry, Crs};
pub use crate::distance::{geometry_distance, point_segment_distance};
pub use crate::find_closest::FindClosest;
pub use crate::grid::{GeoTransform, Grid};
pub use crate::intersections::line_intersection_points;
pub use crate::split::{line_parts, split_line};

/// Coordinates closer than this are treated as the same position.
pub const EPSILON_DIST: f64 = 1e-9;

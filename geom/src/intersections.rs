use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, LineString};

use crate::{Bounds, EPSILON_DIST};

/// Every point where two line strings meet. Collinear overlaps contribute both ends of the shared
/// stretch. Results are deduplicated, in the order found walking along `a`.
pub fn line_intersection_points(a: &LineString, b: &LineString) -> Vec<Coord> {
    let mut result: Vec<Coord> = Vec::new();
    for seg_a in a.lines() {
        let bounds_a = Bounds::from(&[seg_a.start, seg_a.end]);
        for seg_b in b.lines() {
            if !bounds_a.intersects(&Bounds::from(&[seg_b.start, seg_b.end])) {
                continue;
            }
            match line_intersection(seg_a, seg_b) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    push_unique(&mut result, intersection);
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    push_unique(&mut result, intersection.start);
                    push_unique(&mut result, intersection.end);
                }
                None => {}
            }
        }
    }
    result
}

fn push_unique(pts: &mut Vec<Coord>, pt: Coord) {
    if !pts
        .iter()
        .any(|existing| (existing.x - pt.x).hypot(existing.y - pt.y) <= EPSILON_DIST)
    {
        pts.push(pt);
    }
}

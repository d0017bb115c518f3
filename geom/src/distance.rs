use geo::{Coord, Distance, Euclidean, Geometry, Intersects, Line, LineString, Point, Polygon};

/// The shortest distance from a point to a segment. Degenerate segments are treated as points.
pub fn point_segment_distance(pt: Coord, seg: Line) -> f64 {
    Euclidean.distance(&Point::from(pt), &seg)
}

/// Planar distance between two geometries: zero when they touch or overlap (including a line
/// inside a polygon), otherwise the closest approach of their boundaries. Infinite if either is
/// empty.
pub fn geometry_distance(a: &Geometry, b: &Geometry) -> f64 {
    let segs_a = segments(a);
    let segs_b = segments(b);
    if segs_a.is_empty() || segs_b.is_empty() {
        return f64::INFINITY;
    }
    if a.intersects(b) {
        return 0.0;
    }
    let mut best = f64::INFINITY;
    for sa in &segs_a {
        for sb in &segs_b {
            best = best.min(Euclidean.distance(sa, sb));
        }
    }
    best
}

// Points become zero-length segments.
fn segments(geom: &Geometry) -> Vec<Line> {
    let mut result = Vec::new();
    collect_segments(geom, &mut result);
    result
}

fn collect_segments(geom: &Geometry, result: &mut Vec<Line>) {
    match geom {
        Geometry::Point(pt) => result.push(Line::new(pt.0, pt.0)),
        Geometry::MultiPoint(pts) => {
            for pt in pts {
                result.push(Line::new(pt.0, pt.0));
            }
        }
        Geometry::Line(line) => result.push(*line),
        Geometry::LineString(ls) => linestring_segments(ls, result),
        Geometry::MultiLineString(mls) => {
            for ls in mls {
                linestring_segments(ls, result);
            }
        }
        Geometry::Polygon(poly) => polygon_segments(poly, result),
        Geometry::MultiPolygon(mp) => {
            for poly in mp {
                polygon_segments(poly, result);
            }
        }
        Geometry::Rect(rect) => polygon_segments(&rect.to_polygon(), result),
        Geometry::Triangle(tri) => polygon_segments(&tri.to_polygon(), result),
        Geometry::GeometryCollection(gc) => {
            for g in gc {
                collect_segments(g, result);
            }
        }
    }
}

fn linestring_segments(ls: &LineString, result: &mut Vec<Line>) {
    if ls.0.len() == 1 {
        result.push(Line::new(ls.0[0], ls.0[0]));
    }
    result.extend(ls.lines());
}

fn polygon_segments(poly: &Polygon, result: &mut Vec<Line>) {
    linestring_segments(poly.exterior(), result);
    for ring in poly.interiors() {
        linestring_segments(ring, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon};

    #[test]
    fn point_to_line() {
        let line: Geometry = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)].into();
        let pt: Geometry = point!(x: 5.0, y: 3.0).into();
        assert!((geometry_distance(&pt, &line) - 3.0).abs() < 1e-12);
        let past_end: Geometry = point!(x: 13.0, y: 4.0).into();
        assert!((geometry_distance(&past_end, &line) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn touching_and_inside() {
        let a: Geometry = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 10.0)].into();
        let b: Geometry = line_string![(x: 0.0, y: 10.0), (x: 10.0, y: 0.0)].into();
        assert_eq!(geometry_distance(&a, &b), 0.0);

        let square: Geometry = polygon![
            (x: 0.0, y: 0.0),
            (x: 100.0, y: 0.0),
            (x: 100.0, y: 100.0),
            (x: 0.0, y: 100.0),
        ]
        .into();
        let inside: Geometry = point!(x: 50.0, y: 50.0).into();
        assert_eq!(geometry_distance(&inside, &square), 0.0);
    }

    #[test]
    fn degenerate_segments() {
        let seg = Line::new(Coord { x: 3.0, y: 4.0 }, Coord { x: 3.0, y: 4.0 });
        assert!((point_segment_distance(Coord { x: 0.0, y: 0.0 }, seg) - 5.0).abs() < 1e-12);

        // A point and a parallel line, both stored as segments
        let pt: Geometry = point!(x: 2.0, y: 7.0).into();
        let line: Geometry = line_string![(x: 0.0, y: 1.0), (x: 10.0, y: 1.0)].into();
        assert!((geometry_distance(&pt, &line) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn empty_is_infinitely_far() {
        let empty: Geometry = LineString::new(Vec::new()).into();
        let pt: Geometry = point!(x: 1.0, y: 1.0).into();
        assert!(geometry_distance(&empty, &pt).is_infinite());
    }
}

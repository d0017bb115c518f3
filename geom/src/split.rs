use std::cmp::Ordering;

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, Geometry, Line, LineString};

use crate::{Bounds, EPSILON_DIST};

/// Every line string making up a line geometry. Polygon rings and points aren't lines, so they're
/// skipped.
pub fn line_parts(geom: &Geometry) -> Vec<LineString> {
    match geom {
        Geometry::Line(line) => vec![LineString::new(vec![line.start, line.end])],
        Geometry::LineString(ls) => vec![ls.clone()],
        Geometry::MultiLineString(mls) => mls.0.clone(),
        Geometry::GeometryCollection(gc) => gc.iter().flat_map(line_parts).collect(),
        _ => Vec::new(),
    }
}

// A position along the line being split
#[derive(Clone, Copy, Debug)]
struct Cut {
    segment: usize,
    // Fraction along that segment, [0, 1)
    fraction: f64,
    pt: Coord,
}

/// Cuts `line` everywhere a cutter crosses or touches its interior, returning the maximal pieces
/// in order along the line. Touching only at the line's own endpoints doesn't cut anything. With
/// nothing to cut, the line comes back unchanged.
pub fn split_line(line: &LineString, cutters: &[&LineString]) -> Vec<LineString> {
    let coords = &line.0;
    if coords.len() < 2 {
        return vec![line.clone()];
    }
    let num_segments = coords.len() - 1;

    let mut cuts = Vec::new();
    for (segment, seg) in line.lines().enumerate() {
        let seg_bounds = Bounds::from(&[seg.start, seg.end]);
        for cutter in cutters {
            for cutter_seg in cutter.lines() {
                if !seg_bounds.intersects(&Bounds::from(&[cutter_seg.start, cutter_seg.end])) {
                    continue;
                }
                match line_intersection(seg, cutter_seg) {
                    Some(LineIntersection::SinglePoint { intersection, .. }) => {
                        cuts.push(make_cut(segment, seg, intersection));
                    }
                    Some(LineIntersection::Collinear { intersection }) => {
                        cuts.push(make_cut(segment, seg, intersection.start));
                        cuts.push(make_cut(segment, seg, intersection.end));
                    }
                    None => {}
                }
            }
        }
    }

    // Cuts at the very end of a segment belong to the start of the next one
    let first = coords[0];
    let mut cuts: Vec<Cut> = cuts
        .into_iter()
        .filter_map(|mut cut| {
            if same_pt(cut.pt, coords[cut.segment + 1]) || cut.fraction >= 1.0 {
                if cut.segment + 1 == num_segments {
                    return None;
                }
                cut = Cut {
                    segment: cut.segment + 1,
                    fraction: 0.0,
                    pt: coords[cut.segment + 1],
                };
            }
            if cut.segment == 0 && (cut.fraction <= 0.0 || same_pt(cut.pt, first)) {
                return None;
            }
            Some(cut)
        })
        .collect();
    if cuts.is_empty() {
        return vec![line.clone()];
    }
    cuts.sort_by(|a, b| {
        a.segment
            .cmp(&b.segment)
            .then(a.fraction.partial_cmp(&b.fraction).unwrap_or(Ordering::Equal))
    });
    cuts.dedup_by(|b, a| a.segment == b.segment && same_pt(a.pt, b.pt));

    let mut pieces = Vec::new();
    let mut current = vec![coords[0]];
    let mut remaining_cuts = cuts.into_iter().peekable();
    for segment in 0..num_segments {
        while let Some(cut) = remaining_cuts.next_if(|cut| cut.segment == segment) {
            push_distinct(&mut current, cut.pt);
            finish_piece(&mut pieces, std::mem::replace(&mut current, vec![cut.pt]));
        }
        push_distinct(&mut current, coords[segment + 1]);
    }
    finish_piece(&mut pieces, current);
    pieces
}

fn make_cut(segment: usize, seg: Line, pt: Coord) -> Cut {
    let dx = seg.end.x - seg.start.x;
    let dy = seg.end.y - seg.start.y;
    let len_squared = dx * dx + dy * dy;
    let fraction = if len_squared == 0.0 {
        0.0
    } else {
        (((pt.x - seg.start.x) * dx + (pt.y - seg.start.y) * dy) / len_squared).clamp(0.0, 1.0)
    };
    Cut {
        segment,
        fraction,
        pt,
    }
}

fn same_pt(a: Coord, b: Coord) -> bool {
    (a.x - b.x).hypot(a.y - b.y) <= EPSILON_DIST
}

fn push_distinct(pts: &mut Vec<Coord>, pt: Coord) {
    if pts.last().map(|last| !same_pt(*last, pt)).unwrap_or(true) {
        pts.push(pt);
    }
}

fn finish_piece(pieces: &mut Vec<LineString>, pts: Vec<Coord>) {
    if pts.len() >= 2 {
        pieces.push(LineString::new(pts));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;

    #[test]
    fn single_crossing() {
        let road = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        let cutter = line_string![(x: 4.0, y: -1.0), (x: 4.0, y: 1.0)];
        let pieces = split_line(&road, &[&cutter]);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0], line_string![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0)]);
        assert_eq!(pieces[1], line_string![(x: 4.0, y: 0.0), (x: 10.0, y: 0.0)]);
    }

    #[test]
    fn cuts_are_ordered_along_the_line() {
        let road = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0)];
        let late = line_string![(x: 9.0, y: 5.0), (x: 11.0, y: 5.0)];
        let early = line_string![(x: 2.0, y: -1.0), (x: 2.0, y: 1.0)];
        let pieces = split_line(&road, &[&late, &early]);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0].0.last(), Some(&Coord { x: 2.0, y: 0.0 }));
        assert_eq!(
            pieces[1],
            line_string![(x: 2.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 5.0)]
        );
        assert_eq!(pieces[2].0[0], Coord { x: 10.0, y: 5.0 });
    }

    #[test]
    fn touching_endpoints_dont_cut() {
        let road = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        let at_start = line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 5.0)];
        let at_end = line_string![(x: 10.0, y: 0.0), (x: 10.0, y: 5.0)];
        assert_eq!(split_line(&road, &[&at_start, &at_end]), vec![road.clone()]);
    }

    #[test]
    fn cut_at_interior_vertex() {
        let road = line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0), (x: 10.0, y: 0.0)];
        let cutter = line_string![(x: 5.0, y: -1.0), (x: 5.0, y: 1.0)];
        let pieces = split_line(&road, &[&cutter]);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0], line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0)]);
        assert_eq!(pieces[1], line_string![(x: 5.0, y: 0.0), (x: 10.0, y: 0.0)]);
    }

    #[test]
    fn collinear_overlap_cuts_at_both_ends() {
        let road = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        let cutter = line_string![(x: 3.0, y: 0.0), (x: 6.0, y: 0.0)];
        let pieces = split_line(&road, &[&cutter]);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[1], line_string![(x: 3.0, y: 0.0), (x: 6.0, y: 0.0)]);
    }
}

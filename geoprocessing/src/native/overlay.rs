use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{bail, Result};
use geo::{Geometry, LineString, Point};

use geom::{line_intersection_points, line_parts, split_line, Bounds, FindClosest, EPSILON_DIST};
use vector_layer::{FeatureId, GeometryKind, Layer};

use super::attributes::combine_fields;
use super::{all_line_parts, open_in_crs, require_kind, same_layer};

/// Every output piece is a single line string carrying its parent's attributes. When a layer is
/// split by itself, a part is never cut by itself, but the other parts of the same feature (like
/// the pieces of a dissolved multi-line) do cut it.
pub fn split_with_lines(input: &Path, lines: &Path, output: &Path) -> Result<()> {
    let layer = Layer::open(input)?;
    require_kind(&layer, input, GeometryKind::Line)?;
    let self_split = same_layer(input, lines);
    let cutter_layer = if self_split {
        None
    } else {
        let cutters = open_in_crs(lines, layer.crs)?;
        require_kind(&cutters, lines, GeometryKind::Line)?;
        Some(cutters)
    };

    let mut cutters: FindClosest<(FeatureId, usize)> = FindClosest::new();
    for f in cutter_layer.as_ref().unwrap_or(&layer).features() {
        for (idx, part) in line_parts(&f.geometry).into_iter().enumerate() {
            cutters.add((f.id, idx), part.into());
        }
    }

    let mut result = layer.empty_like();
    for f in layer.features() {
        for (idx, part) in line_parts(&f.geometry).into_iter().enumerate() {
            let candidates: Vec<&LineString> = cutters
                .query_bbox(&Bounds::from(&part.0))
                .into_iter()
                .filter(|(key, _)| !(self_split && **key == (f.id, idx)))
                .filter_map(|(_, geom)| match geom {
                    Geometry::LineString(ls) => Some(ls),
                    _ => None,
                })
                .collect();
            for piece in split_line(&part, &candidates) {
                result.push(piece.into(), f.attributes.clone());
            }
        }
    }
    debug!(
        "Split {} lines into {} pieces",
        all_line_parts(&layer),
        result.len()
    );
    result.export(output)
}

/// Keeps features within `distance` of anything in the reference layer. Nothing nearby is a valid,
/// empty result.
pub fn extract_within_distance(
    input: &Path,
    reference: &Path,
    distance: f64,
    output: &Path,
) -> Result<()> {
    if distance.is_nan() || distance < 0.0 {
        bail!("distance must be non-negative, not {}", distance);
    }
    let layer = Layer::open(input)?;
    let reference = open_in_crs(reference, layer.crs)?;

    let mut index = FindClosest::new();
    for f in reference.features() {
        index.add(f.id, f.geometry.clone());
    }
    let keep: BTreeSet<FeatureId> = layer
        .features()
        .iter()
        .filter(|f| index.any_within_distance(&f.geometry, distance))
        .map(|f| f.id)
        .collect();
    layer.materialize(&keep).export(output)
}

/// One point per distinct place a line of `input` meets a line of `intersect`, carrying the
/// attributes of both features.
pub fn line_intersections(input: &Path, intersect: &Path, output: &Path) -> Result<()> {
    let layer = Layer::open(input)?;
    require_kind(&layer, input, GeometryKind::Line)?;
    let same = same_layer(input, intersect);
    let other = open_in_crs(intersect, layer.crs)?;
    require_kind(&other, intersect, GeometryKind::Line)?;

    let mut index = FindClosest::new();
    for f in other.features() {
        index.add(f.id, f.geometry.clone());
    }

    let mut result = Layer::new(
        layer.crs,
        GeometryKind::Point,
        combine_fields(layer.fields(), other.fields()),
    );
    for f in layer.features() {
        let parts = line_parts(&f.geometry);
        for (other_id, other_geom) in index.query_bbox(&Bounds::from_geometry(&f.geometry)) {
            if same && *other_id == f.id {
                continue;
            }
            let mut pts: Vec<geo::Coord> = Vec::new();
            for part in &parts {
                for other_part in line_parts(other_geom) {
                    for pt in line_intersection_points(part, &other_part) {
                        if !pts
                            .iter()
                            .any(|x| (x.x - pt.x).hypot(x.y - pt.y) <= EPSILON_DIST)
                        {
                            pts.push(pt);
                        }
                    }
                }
            }
            if pts.is_empty() {
                continue;
            }
            let mut attributes = f.attributes.clone();
            if let Some(other_feature) = other.get(*other_id) {
                attributes.extend(other_feature.attributes.iter().cloned());
            }
            for pt in pts {
                result.push(Point::from(pt).into(), attributes.clone());
            }
        }
    }
    result.export(output)
}

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use geo::{
    BooleanOps, Buffer, Centroid, CoordsIter, Geometry, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};

use geom::{line_parts, transform_geometry, Crs};
use lczutil::basename;
use vector_layer::{Field, FieldType, GeometryKind, Layer, Value};

use super::attributes::combine_fields;
use super::{open_in_crs, parts, polygon_parts, require_kind, rings};

pub fn reproject(input: &Path, target: Crs, output: &Path) -> Result<()> {
    let mut layer = Layer::open(input)?;
    let from = layer.crs;
    layer.map_geometries(|g| transform_geometry(g, from, target));
    layer.crs = target;
    layer.export(output)
}

pub fn centroids(input: &Path, all_parts: bool, output: &Path) -> Result<()> {
    let layer = Layer::open(input)?;
    let mut result = Layer::new(layer.crs, GeometryKind::Point, layer.fields().to_vec());
    for f in layer.features() {
        let pieces = if all_parts {
            parts(&f.geometry)
        } else {
            vec![f.geometry.clone()]
        };
        for piece in pieces {
            if let Some(pt) = piece.centroid() {
                result.push(pt.into(), f.attributes.clone());
            }
        }
    }
    result.export(output)
}

fn union_all(polygons: Vec<Polygon>) -> MultiPolygon {
    polygons
        .into_iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, p| acc.union(&p))
}

/// Collapses the whole layer into one feature with the first feature's attributes. Lines are
/// gathered into one multi-line, polygons are unioned.
pub fn dissolve(input: &Path, output: &Path) -> Result<()> {
    let layer = Layer::open(input)?;
    let mut result = layer.empty_like();
    let first = match layer.features().first() {
        Some(f) => f,
        None => return result.export(output),
    };

    let geometry: Geometry = match layer.kind {
        GeometryKind::Point => MultiPoint::new(
            layer
                .features()
                .iter()
                .flat_map(|f| f.geometry.coords_iter().map(Point::from))
                .collect(),
        )
        .into(),
        GeometryKind::Line => MultiLineString::new(
            layer
                .features()
                .iter()
                .flat_map(|f| line_parts(&f.geometry))
                .collect(),
        )
        .into(),
        GeometryKind::Polygon => union_all(
            layer
                .features()
                .iter()
                .flat_map(|f| polygon_parts(&f.geometry))
                .collect(),
        )
        .into(),
    };
    result.push(geometry, first.attributes.clone());
    result.export(output)
}

fn resolve_vertex(position: i64, num_vertices: usize) -> Option<usize> {
    let n = num_vertices as i64;
    let idx = if position < 0 { n + position } else { position };
    if idx >= 0 && idx < n {
        Some(idx as usize)
    } else {
        None
    }
}

/// Points at the requested vertex positions of every feature, recording the requested position
/// and the resolved index.
pub fn extract_specific_vertices(input: &Path, vertices: &[i64], output: &Path) -> Result<()> {
    let layer = Layer::open(input)?;
    let fields = combine_fields(
        layer.fields(),
        &[
            Field::new("vertex_pos", FieldType::Int),
            Field::new("vertex_index", FieldType::Int),
        ],
    );
    let mut result = Layer::new(layer.crs, GeometryKind::Point, fields);
    for f in layer.features() {
        let coords: Vec<geo::Coord> = f.geometry.coords_iter().collect();
        for position in vertices {
            if let Some(idx) = resolve_vertex(*position, coords.len()) {
                let mut attributes = f.attributes.clone();
                attributes.push(Value::Int(*position));
                attributes.push(Value::Int(idx as i64));
                result.push(Point::from(coords[idx]).into(), attributes);
            }
        }
    }
    result.export(output)
}

/// Everything from every layer, reprojected into `crs`. The schema is the union of all fields
/// (a name with conflicting types becomes text) plus `layer` and `path`, naming the source.
pub fn merge(layers: &[PathBuf], crs: Crs, output: &Path) -> Result<()> {
    if layers.is_empty() {
        bail!("nothing to merge");
    }
    let mut inputs = Vec::new();
    for path in layers {
        inputs.push((path, open_in_crs(path, crs)?));
    }

    let kind = inputs[0].1.kind;
    let mut fields: Vec<Field> = Vec::new();
    for (path, layer) in &inputs {
        if layer.kind != kind {
            bail!(
                "can't merge {:?} geometries from {} with {:?}",
                layer.kind,
                path.display(),
                kind
            );
        }
        for field in layer.fields() {
            match fields.iter_mut().find(|f| f.name == field.name) {
                Some(existing) => {
                    if existing.field_type != field.field_type {
                        existing.field_type = FieldType::Text;
                    }
                }
                None => fields.push(field.clone()),
            }
        }
    }
    for name in ["layer", "path"] {
        if !fields.iter().any(|f| f.name == name) {
            fields.push(Field::new(name, FieldType::Text));
        }
    }

    let mut result = Layer::new(crs, kind, fields.clone());
    for (path, layer) in &inputs {
        let layer_name = Value::Text(basename(path));
        let source = Value::Text(path.display().to_string());
        for f in layer.features() {
            let attributes = fields
                .iter()
                .map(|field| match field.name.as_str() {
                    "layer" => layer_name.clone(),
                    "path" => source.clone(),
                    name => layer
                        .index_of(name)
                        .map(|idx| f.attributes[idx].clone())
                        .unwrap_or(Value::Null),
                })
                .collect();
            result.push(f.geometry.clone(), attributes);
        }
    }
    result.export(output)
}

pub fn buffer(input: &Path, distance: f64, dissolve: bool, output: &Path) -> Result<()> {
    let layer = Layer::open(input)?;
    let mut result = Layer::new(layer.crs, GeometryKind::Polygon, layer.fields().to_vec());
    let buffered: Vec<(MultiPolygon, &Vec<Value>)> = layer
        .features()
        .iter()
        .map(|f| (f.geometry.buffer(distance), &f.attributes))
        .collect();
    if dissolve {
        if let Some((_, attributes)) = buffered.first() {
            let attributes = (*attributes).clone();
            let merged = union_all(buffered.into_iter().flat_map(|(mp, _)| mp.0).collect());
            result.push(merged.into(), attributes);
        }
    } else {
        for (mp, attributes) in buffered {
            result.push(mp.into(), attributes.clone());
        }
    }
    result.export(output)
}

/// Every polygon ring becomes a line; each feature becomes one multi-line.
pub fn polygons_to_lines(input: &Path, output: &Path) -> Result<()> {
    let layer = Layer::open(input)?;
    require_kind(&layer, input, GeometryKind::Polygon)?;
    let mut result = Layer::new(layer.crs, GeometryKind::Line, layer.fields().to_vec());
    for f in layer.features() {
        let lines: Vec<_> = polygon_parts(&f.geometry)
            .iter()
            .flat_map(rings)
            .collect();
        if !lines.is_empty() {
            result.push(MultiLineString::new(lines).into(), f.attributes.clone());
        }
    }
    result.export(output)
}

/// Every line with at least 3 vertices becomes a polygon ring, closed if needed. A feature with
/// nothing usable becomes an empty polygon, so output features still line up with input features.
pub fn lines_to_polygons(input: &Path, output: &Path) -> Result<()> {
    let layer = Layer::open(input)?;
    require_kind(&layer, input, GeometryKind::Line)?;
    let mut result = Layer::new(layer.crs, GeometryKind::Polygon, layer.fields().to_vec());
    let mut skipped = 0;
    for f in layer.features() {
        let mut polygons: Vec<Polygon> = line_parts(&f.geometry)
            .into_iter()
            .filter(|ls| {
                let mut pts = ls.0.clone();
                pts.dedup();
                if pts.len() > 1 && pts.first() == pts.last() {
                    pts.pop();
                }
                pts.len() >= 3
            })
            .map(|ls| Polygon::new(ls, Vec::new()))
            .collect();
        let geometry: Geometry = match polygons.len() {
            0 => {
                skipped += 1;
                MultiPolygon::new(Vec::new()).into()
            }
            1 => polygons.remove(0).into(),
            _ => MultiPolygon::new(polygons).into(),
        };
        result.push(geometry, f.attributes.clone());
    }
    if skipped > 0 {
        warn!(
            "{} features of {} have no closed ring",
            skipped,
            input.display()
        );
    }
    result.export(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_positions() {
        assert_eq!(resolve_vertex(0, 4), Some(0));
        assert_eq!(resolve_vertex(-1, 4), Some(3));
        assert_eq!(resolve_vertex(4, 4), None);
        assert_eq!(resolve_vertex(-5, 4), None);
        assert_eq!(resolve_vertex(0, 0), None);
    }
}

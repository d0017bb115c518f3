//! An in-process `GeometryService` built on `geo`, with `geom::FindClosest` standing in for the
//! spatial index wherever features are matched against each other.

mod attributes;
mod conversion;
mod overlay;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use geo::{Geometry, LineString, Polygon};

use geom::{line_parts, transform_geometry, Crs};
use vector_layer::{GeometryKind, Layer};

use crate::{GeometryService, Operation};

/// Runs every operation in-process. Stateless; all state lives in the layers on disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeService;

impl NativeService {
    pub fn new() -> NativeService {
        NativeService
    }

    fn dispatch(&self, op: Operation) -> Result<()> {
        match op {
            Operation::Reproject {
                input,
                target_crs,
                output,
            } => conversion::reproject(&input, target_crs, &output),
            Operation::SplitWithLines {
                input,
                lines,
                output,
            } => overlay::split_with_lines(&input, &lines, &output),
            Operation::Centroids {
                input,
                all_parts,
                output,
            } => conversion::centroids(&input, all_parts, &output),
            Operation::CreateSpatialIndex { input } => {
                vector_layer::write_spatial_index(&input, &Layer::open(&input)?)
            }
            Operation::JoinAttributesTable {
                input,
                field,
                input_2,
                field_2,
                fields_to_copy,
                discard_nonmatching,
                prefix,
                id_field,
                output,
            } => attributes::join(
                attributes::Join {
                    input: &input,
                    field: &field,
                    input_2: &input_2,
                    field_2: &field_2,
                    fields_to_copy: &fields_to_copy,
                    discard_nonmatching,
                    prefix: &prefix,
                    id_field: &id_field,
                },
                &output,
            ),
            Operation::ExtractByAttribute {
                input,
                field,
                operator,
                value,
                output,
            } => attributes::extract_by_attribute(&input, &field, operator, &value, &output),
            Operation::ExtractWithinDistance {
                input,
                reference,
                distance,
                output,
            } => overlay::extract_within_distance(&input, &reference, distance, &output),
            Operation::Dissolve { input, output } => conversion::dissolve(&input, &output),
            Operation::LineIntersections {
                input,
                intersect,
                output,
            } => overlay::line_intersections(&input, &intersect, &output),
            Operation::ExtractSpecificVertices {
                input,
                vertices,
                output,
            } => conversion::extract_specific_vertices(&input, &vertices, &output),
            Operation::MergeVectorLayers {
                layers,
                crs,
                output,
            } => conversion::merge(&layers, crs, &output),
            Operation::Buffer {
                input,
                distance,
                dissolve,
                output,
            } => conversion::buffer(&input, distance, dissolve, &output),
            Operation::PolygonsToLines { input, output } => {
                conversion::polygons_to_lines(&input, &output)
            }
            Operation::LinesToPolygons { input, output } => {
                conversion::lines_to_polygons(&input, &output)
            }
        }
    }
}

impl GeometryService for NativeService {
    fn run(&self, op: Operation) -> Result<PathBuf> {
        let description = op.to_string();
        let output = op.output().clone();
        self.dispatch(op)
            .with_context(|| format!("{} failed", description))?;
        debug!("{}", description);
        Ok(output)
    }
}

/// Opens a layer and reprojects it into `crs` if needed.
fn open_in_crs(path: &Path, crs: Crs) -> Result<Layer> {
    let mut layer = Layer::open(path)?;
    if layer.crs != crs {
        let from = layer.crs;
        layer.map_geometries(|g| transform_geometry(g, from, crs));
        layer.crs = crs;
    }
    Ok(layer)
}

fn same_layer(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn require_kind(layer: &Layer, path: &Path, kind: GeometryKind) -> Result<()> {
    if layer.kind != kind {
        bail!(
            "{} holds {:?} geometries, but {:?} is needed",
            path.display(),
            layer.kind,
            kind
        );
    }
    Ok(())
}

/// Every single-part geometry inside a possibly multi-part one.
fn parts(geom: &Geometry) -> Vec<Geometry> {
    match geom {
        Geometry::MultiPoint(x) => x.iter().map(|p| Geometry::Point(*p)).collect(),
        Geometry::MultiLineString(x) => x.iter().cloned().map(Geometry::LineString).collect(),
        Geometry::MultiPolygon(x) => x.iter().cloned().map(Geometry::Polygon).collect(),
        Geometry::GeometryCollection(x) => x.iter().flat_map(parts).collect(),
        other => vec![other.clone()],
    }
}

fn polygon_parts(geom: &Geometry) -> Vec<Polygon> {
    match geom {
        Geometry::Polygon(p) => vec![p.clone()],
        Geometry::MultiPolygon(mp) => mp.0.clone(),
        Geometry::Rect(r) => vec![r.to_polygon()],
        Geometry::Triangle(t) => vec![t.to_polygon()],
        Geometry::GeometryCollection(gc) => gc.iter().flat_map(polygon_parts).collect(),
        _ => Vec::new(),
    }
}

fn rings(polygon: &Polygon) -> Vec<LineString> {
    let mut result = vec![polygon.exterior().clone()];
    result.extend(polygon.interiors().iter().cloned());
    result
}

fn all_line_parts(layer: &Layer) -> usize {
    layer
        .features()
        .iter()
        .map(|f| line_parts(&f.geometry).len())
        .sum()
}

//! Boundary masks derived from LCZ rasters, and removing lines that fall inside mask polygons.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use geo::{Area, Geometry};

use geom::{transform_geometry, FindClosest};
use geoprocessing::{Comparison, GeometryService, Operation};
use lczutil::Timer;
use vector_layer::{
    delete_layer, generate_save_path, FeatureId, Field, FieldType, GeometryKind, Layer, Value,
};

use crate::raster::Raster;
use crate::PipelineConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitType {
    Natural,
    Water,
}

impl fmt::Display for SplitType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SplitType::Natural => write!(f, "natural"),
            SplitType::Water => write!(f, "water"),
        }
    }
}

/// Contour lines of the raster at the configured levels, minus small rings, in the target CRS.
/// The result is `<split_type>_contour_f_p` in the location directory.
pub fn create_contour_mask(
    service: &dyn GeometryService,
    cfg: &PipelineConfig,
    location_dir: &Path,
    raster: &Raster,
    split_type: SplitType,
    timer: &mut Timer,
) -> Result<PathBuf> {
    timer.start(format!("{} contour mask", split_type));
    let result = contour_mask(service, cfg, location_dir, raster, split_type);
    timer.stop(format!("{} contour mask", split_type));
    result
}

fn contour_mask(
    service: &dyn GeometryService,
    cfg: &PipelineConfig,
    location_dir: &Path,
    raster: &Raster,
    split_type: SplitType,
) -> Result<PathBuf> {
    let mut contours = Layer::new(
        raster.crs,
        GeometryKind::Line,
        vec![
            Field::new("ID", FieldType::Int),
            Field::new("elev", FieldType::Real),
        ],
    );
    for (idx, (level, line)) in raster
        .grid
        .contour_lines(cfg.levels(split_type))?
        .into_iter()
        .enumerate()
    {
        contours.push(line.into(), vec![Value::Int(idx as i64), Value::Real(level)]);
    }
    let contour_path = location_dir.join(format!(
        "{}_contour.{}",
        split_type,
        vector_layer::LAYER_EXTENSION
    ));
    contours.export(&contour_path)?;
    debug!(
        "{} contour lines: {}",
        contours.len(),
        contour_path.display()
    );

    let filtered = delete_small_features(service, cfg, &contour_path)?;
    debug!("Large contours: {}", filtered.display());
    let projected = service.run(Operation::Reproject {
        input: filtered.clone(),
        target_crs: cfg.target_crs()?,
        output: generate_save_path(&filtered, "p"),
    })?;
    debug!("Projected contours: {}", projected.display());
    delete_layer(&contour_path)?;
    delete_layer(&filtered)?;
    Ok(projected)
}

/// Outlines of the raster cells holding `class_value`, buffered, as lines in the target CRS with
/// small rings removed.
pub fn create_boundary_mask(
    service: &dyn GeometryService,
    cfg: &PipelineConfig,
    location_dir: &Path,
    raster: &Raster,
    class_value: i64,
    timer: &mut Timer,
) -> Result<PathBuf> {
    timer.start("boundary mask");
    let result = boundary_mask(service, cfg, location_dir, raster, class_value);
    timer.stop("boundary mask");
    result
}

fn boundary_mask(
    service: &dyn GeometryService,
    cfg: &PipelineConfig,
    location_dir: &Path,
    raster: &Raster,
    class_value: i64,
) -> Result<PathBuf> {
    // Polygonize the equality mask: regions of 1 and regions of 0, tagged in DN
    let mask = raster.grid.equals_mask(class_value as f64);
    let mut polygons = Layer::new(
        raster.crs,
        GeometryKind::Polygon,
        vec![Field::new("DN", FieldType::Int)],
    );
    for (dn, grid) in [(1, mask.clone()), (0, mask.equals_mask(0.0))] {
        for (_, multipolygon) in grid.contour_polygons(&[0.5])? {
            for polygon in multipolygon {
                polygons.push(polygon.into(), vec![Value::Int(dn)]);
            }
        }
    }
    let polygonized = location_dir.join(format!("water_mask_r2v.{}", vector_layer::LAYER_EXTENSION));
    polygons.export(&polygonized)?;
    debug!("Polygonized mask: {}", polygonized.display());

    let selected = service.run(Operation::ExtractByAttribute {
        input: polygonized.clone(),
        field: "DN".to_string(),
        operator: Comparison::Equal,
        value: Value::Int(1),
        output: generate_save_path(&polygonized, "flt"),
    })?;
    debug!("Class {} regions: {}", class_value, selected.display());
    let projected = service.run(Operation::Reproject {
        input: selected.clone(),
        target_crs: cfg.target_crs()?,
        output: generate_save_path(&selected, "p"),
    })?;
    debug!("Projected regions: {}", projected.display());
    let buffered = service.run(Operation::buffer(
        projected.clone(),
        cfg.mask_buffer,
        generate_save_path(&projected, "b"),
    ))?;
    debug!("Buffered regions: {}", buffered.display());
    let lines = service.run(Operation::PolygonsToLines {
        input: buffered.clone(),
        output: generate_save_path(&buffered, "p2l"),
    })?;
    debug!("Region outlines: {}", lines.display());
    let filtered = delete_small_features(service, cfg, &lines)?;
    debug!("Large outlines: {}", filtered.display());

    for path in [&polygonized, &selected, &projected, &buffered, &lines] {
        delete_layer(path)?;
    }
    Ok(filtered)
}

/// Keeps the lines enclosing more than `min_area`, measured in the target CRS. The line layer
/// gains a `remain` flag in place; the kept lines land in `<line>_f`.
pub fn delete_small_features(
    service: &dyn GeometryService,
    cfg: &PipelineConfig,
    line_path: &Path,
) -> Result<PathBuf> {
    let polygons = service.run(Operation::LinesToPolygons {
        input: line_path.to_path_buf(),
        output: generate_save_path(line_path, "poly"),
    })?;
    let projected = service.run(Operation::Reproject {
        input: polygons.clone(),
        target_crs: cfg.target_crs()?,
        output: generate_save_path(&polygons, "p"),
    })?;

    let areas = Layer::open(&projected)?;
    let mut lines = Layer::open(line_path)?;
    if areas.len() != lines.len() {
        bail!(
            "{} polygons for {} lines in {}",
            areas.len(),
            lines.len(),
            line_path.display()
        );
    }
    if lines.index_of("remain").is_none() {
        lines.add_attributes(vec![Field::new("remain", FieldType::Int)])?;
    }
    let remain = lines.field_index("remain")?;
    let changes = lines
        .features()
        .iter()
        .zip(areas.features())
        .map(|(line, polygon)| {
            let flag = if polygon.geometry.unsigned_area() > cfg.min_area {
                1
            } else {
                0
            };
            (line.id, BTreeMap::from([(remain, Value::Int(flag))]))
        })
        .collect();
    lines.change_attribute_values(changes)?;
    lines.export(line_path)?;

    let filtered = service.run(Operation::ExtractByAttribute {
        input: line_path.to_path_buf(),
        field: "remain".to_string(),
        operator: Comparison::Equal,
        value: Value::Int(1),
        output: generate_save_path(line_path, "f"),
    })?;
    delete_layer(&polygons)?;
    delete_layer(&projected)?;
    Ok(filtered)
}

/// Keeps only the lines touching no mask polygon. Lines are checked in parallel against a shared,
/// read-only index; the kept lines are written in their original order to `output`, or
/// `<input>_mask` by default.
pub fn exclude_by_mask(
    service: &dyn GeometryService,
    input: &Path,
    mask: &Path,
    output: Option<PathBuf>,
    timer: &mut Timer,
) -> Result<PathBuf> {
    let output = output.unwrap_or_else(|| generate_save_path(input, "mask"));
    delete_layer(&output)?;
    service.run(Operation::CreateSpatialIndex {
        input: input.to_path_buf(),
    })?;
    service.run(Operation::CreateSpatialIndex {
        input: mask.to_path_buf(),
    })?;

    let lines = Layer::open(input)?;
    let polygons = Layer::open(mask)?;
    let mut index = FindClosest::new();
    for f in polygons.features() {
        index.add(
            f.id,
            transform_geometry(&f.geometry, polygons.crs, lines.crs),
        );
    }

    let index = &index;
    let requests: Vec<(FeatureId, &Geometry)> = lines
        .features()
        .iter()
        .map(|f| (f.id, &f.geometry))
        .collect();
    let decisions = timer.parallelize("exclude by mask", requests, move |(id, geometry)| {
        if index.any_intersecting(geometry) {
            None
        } else {
            Some(id)
        }
    });
    let keep: BTreeSet<FeatureId> = decisions.into_iter().flatten().collect();
    info!(
        "{} of {} lines are outside the mask",
        keep.len(),
        lines.len()
    );
    lines.materialize(&keep).export(&output)?;
    Ok(output)
}

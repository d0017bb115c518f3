use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use geoprocessing::{GeometryService, Operation};
use lczutil::Timer;
use vector_layer::{delete_layer, generate_save_path, rename_layer};

use crate::{
    calc_remained_road, exclude_edges_in_layer, filter_lcz_vectors, split_line_with_line,
    split_lines, stamp_positional_fid, ExclusionRule, ExclusionSet, PipelineConfig, FID,
};

/// What `merge_shapefile` leaves behind.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeOutputs {
    /// Every processed road fragment and boundary line in one layer
    pub merged: PathBuf,
    /// The merged layer dissolved into one feature
    pub boundary: PathBuf,
}

/// Cleans the filtered road network against the boundary: re-splits it into maximal fragments,
/// finds fragments with both endpoints on a road/boundary intersection or with a dangling
/// endpoint, and drops them. Returns the surviving fragments.
pub fn post_process_road(
    service: &dyn GeometryService,
    cfg: &PipelineConfig,
    road: &Path,
    feature: &Path,
    intersections: &Path,
    timer: &mut Timer,
) -> Result<PathBuf> {
    timer.start("post-process road");
    let result = clean_up_fragments(service, cfg, road, feature, intersections);
    timer.stop("post-process road");
    result
}

fn clean_up_fragments(
    service: &dyn GeometryService,
    cfg: &PipelineConfig,
    road: &Path,
    feature: &Path,
    intersections: &Path,
) -> Result<PathBuf> {
    let dissolved = service.run(Operation::Dissolve {
        input: road.to_path_buf(),
        output: generate_save_path(road, "d"),
    })?;
    debug!("Dissolved: {}", dissolved.display());
    let self_split = split_line_with_line(service, &dissolved, &dissolved, None)?;
    debug!("Split by itself: {}", self_split.display());
    let split_with_feature = split_line_with_line(service, &self_split, feature, None)?;
    debug!("Split by the boundary: {}", split_with_feature.display());
    stamp_positional_fid(&split_with_feature)?;

    let endpoints = service.run(Operation::endpoints(
        split_with_feature.clone(),
        generate_save_path(&split_with_feature, "v"),
    ))?;
    debug!("Endpoints: {}", endpoints.display());
    service.run(Operation::CreateSpatialIndex {
        input: endpoints.clone(),
    })?;
    service.run(Operation::CreateSpatialIndex {
        input: intersections.to_path_buf(),
    })?;
    let endpoints_on_intersections = service.run(Operation::ExtractWithinDistance {
        input: endpoints.clone(),
        reference: intersections.to_path_buf(),
        distance: cfg.endpoint_tolerance,
        output: generate_save_path(&endpoints, "distance"),
    })?;
    debug!(
        "Endpoints on intersections: {}",
        endpoints_on_intersections.display()
    );

    let paired = exclude_edges_in_layer(&endpoints_on_intersections, ExclusionRule::Bial, FID)?;
    let dangling = exclude_edges_in_layer(&endpoints, ExclusionRule::Single, FID)?;
    let exclusions = ExclusionSet::union(&paired, &dangling);
    debug!(
        "{} fragments to exclude ({} paired, {} dangling)",
        exclusions.len(),
        paired.len(),
        dangling.len()
    );
    let remained = calc_remained_road(&split_with_feature, &exclusions)?;
    debug!("Remaining road: {}", remained.display());

    for path in [
        &dissolved,
        &self_split,
        &endpoints,
        &endpoints_on_intersections,
    ] {
        delete_layer(path)?;
    }
    if remained != split_with_feature {
        delete_layer(&split_with_feature)?;
    }
    Ok(remained)
}

/// Merges the layers into the target CRS, then dissolves the result into `boundary`, next to the
/// merged layer.
pub fn merge_vector(
    service: &dyn GeometryService,
    cfg: &PipelineConfig,
    layers: Vec<PathBuf>,
) -> Result<MergeOutputs> {
    let output = match layers.first() {
        Some(first) => generate_save_path(first, "m"),
        None => bail!("nothing to merge"),
    };
    let merged = service.run(Operation::MergeVectorLayers {
        layers,
        crs: cfg.target_crs()?,
        output,
    })?;
    debug!("Merged: {}", merged.display());
    let dissolved = service.run(Operation::Dissolve {
        input: merged.clone(),
        output: generate_save_path(&merged, "d"),
    })?;
    let boundary = rename_layer(&dissolved, "boundary")?;
    debug!("Boundary: {}", boundary.display());
    Ok(MergeOutputs { merged, boundary })
}

/// The whole road cleanup for one location: split the base road by the natural boundary, keep
/// fragments near it, clean up the fragments, and merge them with both boundaries.
pub fn merge_shapefile(
    service: &dyn GeometryService,
    cfg: &PipelineConfig,
    base_road: &Path,
    natural: &Path,
    water: &Path,
    timer: &mut Timer,
) -> Result<MergeOutputs> {
    timer.start("merge shapefile");
    let result = run_stages(service, cfg, base_road, natural, water, timer);
    timer.stop("merge shapefile");
    result
}

fn run_stages(
    service: &dyn GeometryService,
    cfg: &PipelineConfig,
    base_road: &Path,
    natural: &Path,
    water: &Path,
    timer: &mut Timer,
) -> Result<MergeOutputs> {
    let split = split_lines(service, base_road, natural, None)?;
    debug!("Split road: {}", split.display());
    let intersections = service.run(Operation::LineIntersections {
        input: split.clone(),
        intersect: natural.to_path_buf(),
        output: generate_save_path(&split, "int"),
    })?;
    debug!("Intersections: {}", intersections.display());
    let filtered = filter_lcz_vectors(service, &split, natural, cfg.proximity_distance)?;
    debug!("Filtered road: {}", filtered.display());

    let processed = post_process_road(service, cfg, &filtered, natural, &intersections, timer)?;
    delete_layer(&filtered)?;
    delete_layer(&intersections)?;

    timer.start("merge vector");
    let outputs = merge_vector(
        service,
        cfg,
        vec![processed, natural.to_path_buf(), water.to_path_buf()],
    );
    timer.stop("merge vector");
    outputs
}

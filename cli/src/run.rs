use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use geoprocessing::{GeometryService, Operation};
use lczutil::{basename, Timer};
use road_cleanup::raster::{find_location_raster, load_raster};
use road_cleanup::{
    create_boundary_mask, create_contour_mask, merge_shapefile, MergeOutputs, PipelineConfig,
    SplitType,
};

/// Where the reprojected base road lands, relative to the working directory
const BASE_ROAD: &str = "result1.geojson";

/// Reprojects the base road once, then processes every location directory under `lcz_dir` in
/// name order. A location that fails is logged and skipped.
pub fn run(
    service: &dyn GeometryService,
    cfg: &PipelineConfig,
    lcz_dir: &Path,
    osm_road: &Path,
    timer: &mut Timer,
) -> Result<()> {
    if !lcz_dir.is_dir() {
        bail!("{} isn't a directory", lcz_dir.display());
    }
    let base_road = service.run(Operation::Reproject {
        input: osm_road.to_path_buf(),
        target_crs: cfg.target_crs()?,
        output: PathBuf::from(BASE_ROAD),
    })?;
    info!("Base road reprojected to {}", base_road.display());

    let mut locations = Vec::new();
    for entry in fs_err::read_dir(lcz_dir)? {
        let path = entry?.path();
        if path.is_dir() {
            locations.push(path);
        }
    }
    locations.sort();

    let mut failures = 0;
    for location in &locations {
        info!("Processing {}", basename(location));
        timer.start(basename(location));
        let result = process_location(service, cfg, location, &base_road, timer);
        timer.stop(basename(location));
        match result {
            Ok(outputs) => info!(
                "{} done: {} and {}",
                basename(location),
                outputs.merged.display(),
                outputs.boundary.display()
            ),
            Err(err) => {
                error!("{} failed: {:#}", basename(location), err);
                failures += 1;
            }
        }
    }
    if failures > 0 {
        timer.warn(format!(
            "{} of {} locations failed",
            failures,
            locations.len()
        ));
    }
    Ok(())
}

fn process_location(
    service: &dyn GeometryService,
    cfg: &PipelineConfig,
    location: &Path,
    base_road: &Path,
    timer: &mut Timer,
) -> Result<MergeOutputs> {
    let raster = load_raster(&find_location_raster(location)?, cfg.raster_crs()?)?;
    let natural = create_contour_mask(
        service,
        cfg,
        location,
        &raster,
        SplitType::Natural,
        timer,
    )?;
    let water = create_boundary_mask(service, cfg, location, &raster, cfg.water_class, timer)?;
    merge_shapefile(service, cfg, base_road, &natural, &water, timer)
}

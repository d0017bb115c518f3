use std::path::{Path, PathBuf};

use anyhow::Result;

use geoprocessing::{Comparison, GeometryService, Operation};
use vector_layer::{delete_layer, generate_save_path, Value};

use crate::MONOID;

/// Keeps the split fragments whose centroid lies within `distance` of the boundary layer. The
/// split layer and every intermediate are deleted; only the filtered layer remains. No fragment
/// close enough is a valid, empty result.
pub fn filter_lcz_vectors(
    service: &dyn GeometryService,
    split_road: &Path,
    feature: &Path,
    distance: f64,
) -> Result<PathBuf> {
    let centroids = service.run(Operation::centroids(
        split_road.to_path_buf(),
        generate_save_path(split_road, "c"),
    ))?;
    debug!("Centroids: {}", centroids.display());

    service.run(Operation::CreateSpatialIndex {
        input: centroids.clone(),
    })?;
    service.run(Operation::CreateSpatialIndex {
        input: feature.to_path_buf(),
    })?;
    let near = service.run(Operation::ExtractWithinDistance {
        input: centroids.clone(),
        reference: feature.to_path_buf(),
        distance,
        output: generate_save_path(&centroids, "distance"),
    })?;
    debug!("Centroids near the boundary: {}", near.display());

    let joined = service.run(Operation::join(
        split_road.to_path_buf(),
        MONOID,
        near.clone(),
        MONOID,
        generate_save_path(split_road, "j"),
    ))?;
    debug!("Joined: {}", joined.display());

    let filtered = service.run(Operation::ExtractByAttribute {
        input: joined.clone(),
        field: "FID_2".to_string(),
        operator: Comparison::IsNotNull,
        value: Value::Null,
        output: generate_save_path(&joined, "uni"),
    })?;
    debug!("Filtered: {}", filtered.display());

    for path in [split_road, centroids.as_path(), near.as_path(), joined.as_path()] {
        delete_layer(path)?;
    }
    Ok(filtered)
}

//! A persisted layer is a group of files sharing a base name: `<base>.geojson` holds geometry and
//! attribute values, `<base>.schema` the geometry kind, CRS, and field list, and `<base>.qix` an
//! optional spatial index. Everything addressing a layer takes the path to its `.geojson` file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use geom::Bounds;
use lczutil::basename;

use crate::Layer;

pub const LAYER_EXTENSION: &str = "geojson";
const SCHEMA_EXTENSION: &str = "schema";
const INDEX_EXTENSION: &str = "qix";

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    parent_dir(path).join(format!("{}.{}", basename(path), extension))
}

pub(crate) fn schema_path(path: &Path) -> PathBuf {
    sibling(path, SCHEMA_EXTENSION)
}

pub(crate) fn index_path(path: &Path) -> PathBuf {
    sibling(path, INDEX_EXTENSION)
}

/// Builds `<dir>/<basename>_<suffix>.<ext>` next to the origin layer. The base name stops at the
/// first `.` of the file name.
pub fn generate_save_path<P: AsRef<Path>>(origin: P, suffix: &str) -> PathBuf {
    let origin = origin.as_ref();
    let ext = origin
        .extension()
        .and_then(|x| x.to_str())
        .unwrap_or(LAYER_EXTENSION);
    parent_dir(origin).join(format!("{}_{}.{}", basename(origin), suffix, ext))
}

/// Every file belonging to the layer group, meaning every file in the same directory whose name
/// starts with `<base>.`.
pub fn layer_files<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    let dir = parent_dir(path);
    let prefix = format!("{}.", basename(path));
    let mut results = Vec::new();
    if !dir.exists() {
        return Ok(results);
    }
    for entry in fs_err::read_dir(&dir)? {
        let entry = entry?;
        if entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with(&prefix))
            .unwrap_or(false)
        {
            results.push(entry.path());
        }
    }
    results.sort();
    Ok(results)
}

/// Removes the whole file group. Deleting a layer that doesn't exist is fine.
pub fn delete_layer<P: AsRef<Path>>(path: P) -> Result<()> {
    for file in layer_files(path)? {
        fs_err::remove_file(&file)?;
        debug!("Deleted {}", file.display());
    }
    Ok(())
}

/// Renames every file in the group to `new_name`, keeping each file's own extension, and returns
/// the new path of the layer. Any existing layer called `new_name` is replaced. The files are
/// renamed one at a time, so a failure partway leaves the group split across both names.
pub fn rename_layer<P: AsRef<Path>>(path: P, new_name: &str) -> Result<PathBuf> {
    let path = path.as_ref();
    let dir = parent_dir(path);
    let old_base = basename(path);
    let ext = path
        .extension()
        .and_then(|x| x.to_str())
        .unwrap_or(LAYER_EXTENSION);
    let new_path = dir.join(format!("{}.{}", new_name, ext));
    if new_name == old_base {
        return Ok(new_path);
    }
    delete_layer(&new_path)?;

    for file in layer_files(path)? {
        let file_name = file
            .file_name()
            .and_then(|x| x.to_str())
            .with_context(|| format!("non-UTF8 file name {}", file.display()))?
            .to_string();
        let suffix = &file_name[old_base.len()..];
        let renamed = dir.join(format!("{}{}", new_name, suffix));
        fs_err::rename(&file, &renamed)?;
    }
    Ok(new_path)
}

#[derive(Serialize, Deserialize)]
struct SpatialIndexFile {
    bounds: Bounds,
    features: Vec<Bounds>,
}

/// Writes the `.qix` sidecar: the overall extent and every feature's bounding box. Recreating an
/// existing index is harmless.
pub fn write_spatial_index<P: AsRef<Path>>(path: P, layer: &Layer) -> Result<()> {
    let mut bounds = Bounds::new();
    let features: Vec<Bounds> = layer
        .features()
        .iter()
        .map(|f| {
            let b = Bounds::from_geometry(&f.geometry);
            bounds.union(&b);
            b
        })
        .collect();
    let out = index_path(path.as_ref());
    fs_err::write(
        &out,
        serde_json::to_string(&SpatialIndexFile { bounds, features })?,
    )?;
    debug!("Wrote spatial index {}", out.display());
    Ok(())
}

pub fn has_spatial_index<P: AsRef<Path>>(path: P) -> bool {
    index_path(path.as_ref()).exists()
}

/// The per-feature bounding boxes from the `.qix` sidecar, in feature order.
pub fn read_spatial_index<P: AsRef<Path>>(path: P) -> Result<Vec<Bounds>> {
    let path = index_path(path.as_ref());
    let raw = fs_err::read_to_string(&path)?;
    let file: SpatialIndexFile = serde_json::from_str(&raw)
        .with_context(|| format!("corrupt spatial index {}", path.display()))?;
    Ok(file.features)
}

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use geoprocessing::{GeometryService, Operation};
use vector_layer::{delete_layer, generate_save_path, Field, FieldType, Layer, Value};

use crate::{FID, MONOID};

/// Splits the base road wherever the boundary crosses it, then tags every fragment with its own
/// feature id in `monoid`. The default output is `<feature>_roads`, next to the boundary layer.
pub fn split_lines(
    service: &dyn GeometryService,
    base_road: &Path,
    feature: &Path,
    output: Option<PathBuf>,
) -> Result<PathBuf> {
    let output = output.unwrap_or_else(|| generate_save_path(feature, "roads"));
    delete_layer(&output)?;
    let split = service.run(Operation::SplitWithLines {
        input: base_road.to_path_buf(),
        lines: feature.to_path_buf(),
        output,
    })?;
    reindex_feature(&split, MONOID)?;
    Ok(split)
}

/// A plain split without reindexing. The default output is `<line>_s`.
pub fn split_line_with_line(
    service: &dyn GeometryService,
    line: &Path,
    overlap: &Path,
    output: Option<PathBuf>,
) -> Result<PathBuf> {
    let output = output.unwrap_or_else(|| generate_save_path(line, "s"));
    delete_layer(&output)?;
    service.run(Operation::SplitWithLines {
        input: line.to_path_buf(),
        lines: overlap.to_path_buf(),
        output,
    })
}

// Adds the Int field if needed and writes each feature's own id into it
fn stamp_ids(layer: &mut Layer, field: &str) -> Result<()> {
    if layer.index_of(field).is_none() {
        layer.add_attributes(vec![Field::new(field, FieldType::Int)])?;
    }
    let idx = layer.field_index(field)?;
    let changes = layer
        .features()
        .iter()
        .map(|f| (f.id, BTreeMap::from([(idx, Value::Int(f.id.0 as i64))])))
        .collect();
    layer.change_attribute_values(changes)
}

/// Writes every feature's id in this load session into `field`, in place. Ids are fresh per load,
/// so this only lines up with a split's output if nothing reloaded and rewrote the layer between.
pub fn reindex_feature<P: AsRef<Path>>(path: P, field: &str) -> Result<()> {
    let path = path.as_ref();
    let mut layer = Layer::open(path)?;
    stamp_ids(&mut layer, field)?;
    layer.export(path)
}

/// Drops every attribute and stamps the positional `FID` 0..N-1, in place.
pub fn stamp_positional_fid<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    let mut layer = Layer::open(path)?;
    layer.delete_all_attributes();
    stamp_ids(&mut layer, FID)?;
    layer.export(path)
}

//! The feature store: layers of geometries with typed attributes, persisted as a group of files
//! sharing a base name.

#[macro_use]
extern crate log;

mod field;
mod files;
mod layer;

pub use crate::field::{Field, FieldType, Value};
pub use crate::files::{
    delete_layer, generate_save_path, has_spatial_index, layer_files,
    read_spatial_index, rename_layer, write_spatial_index, LAYER_EXTENSION,
};
pub use crate::layer::{Feature, FeatureId, GeometryKind, Layer};

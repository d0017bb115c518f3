//! The geometry processing service: everything the road cleanup pipeline asks of a GIS, behind a
//! trait taking one typed operation at a time.

#[macro_use]
extern crate log;

mod native;
mod operation;

use std::path::PathBuf;

use anyhow::Result;

pub use crate::native::NativeService;
pub use crate::operation::{default_crs, Comparison, Operation, DEFAULT_EPSG};

/// Runs one operation synchronously. Success means the declared output layer exists; failure
/// means nothing should be assumed about it.
pub trait GeometryService {
    fn run(&self, op: Operation) -> Result<PathBuf>;
}

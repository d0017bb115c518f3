//! Splits a road network against land-cover boundaries derived from LCZ rasters, drops the
//! fragments that don't belong, and merges what's left with the boundaries.
//!
//! The flow for one location, driven by `merge_shapefile`:
//!
//! 1. `split_lines` cuts the base road by the natural boundary and tags fragments in `monoid`.
//! 2. `filter_lcz_vectors` keeps fragments whose centroid is near the boundary.
//! 3. `post_process_road` re-splits the survivors into maximal fragments, stamps `FID`, and
//!    excludes fragments by scanning their endpoints (`exclude_edges`, `calc_remained_road`).
//! 4. `merge_vector` merges the cleaned road with both boundaries and dissolves a `boundary`.
//!
//! All geometry work goes through a `GeometryService`.

#[macro_use]
extern crate log;

mod config;
mod exclusion;
mod fragment;
mod mask;
mod pipeline;
mod proximity;
pub mod raster;
mod selector;
mod splitter;

pub use crate::config::PipelineConfig;
pub use crate::exclusion::{exclude_edges, exclude_edges_in_layer, ExclusionRule, ExclusionSet};
pub use crate::fragment::{Fid, Fragment, FragmentArena};
pub use crate::mask::{
    create_boundary_mask, create_contour_mask, delete_small_features, exclude_by_mask, SplitType,
};
pub use crate::pipeline::{merge_shapefile, merge_vector, post_process_road, MergeOutputs};
pub use crate::proximity::filter_lcz_vectors;
pub use crate::selector::{calc_remained_road, select_remaining};
pub use crate::splitter::{reindex_feature, split_line_with_line, split_lines, stamp_positional_fid};

/// Tags every fragment of a split with its own feature id
pub const MONOID: &str = "monoid";
/// Positional id stamped after the final split
pub const FID: &str = "FID";

//! Small things shared by every crate in the workspace: logging setup, a hierarchical timer that
//! can fan work out to a thread pool, and a few formatting and ordering helpers.

#[macro_use]
extern crate log;

mod collections;
pub mod logger;
mod time;
mod utils;

pub use crate::collections::{is_strictly_increasing, sorted_union};
pub use crate::time::{elapsed_seconds, prettyprint_time, Timer};
pub use crate::utils::{basename, prettyprint_usize};

const PROGRESS_FREQUENCY_SECONDS: f64 = 0.2;

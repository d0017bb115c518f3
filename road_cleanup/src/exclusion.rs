//! Finds fragments to drop by scanning FID sequences: fragments whose two endpoints both sit on a
//! road/boundary intersection, and fragments with a dangling endpoint.

use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Error, Result};

use lczutil::{is_strictly_increasing, sorted_union};
use vector_layer::Layer;

use crate::{Fid, FragmentArena};

// Also a legitimate FID. The scan can't tell a real FID 0 apart from "nothing seen yet".
const SENTINEL: Fid = Fid(0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExclusionRule {
    /// Record a FID whenever it repeats on consecutive rows. Run over the endpoints lying on
    /// intersections, this finds fragments with both ends on a boundary crossing.
    Bial,
    /// Consecutive equal FIDs cancel out on a stack. Run over all endpoints, this leaves the
    /// fragments whose endpoints didn't pair up.
    Single,
}

impl FromStr for ExclusionRule {
    type Err = Error;

    fn from_str(x: &str) -> Result<ExclusionRule> {
        match x {
            "bial" => Ok(ExclusionRule::Bial),
            "single" => Ok(ExclusionRule::Single),
            _ => {
                error!("Invalid exclusion rule {}", x);
                bail!("invalid exclusion rule {}, must be bial or single", x)
            }
        }
    }
}

/// Applies a rule to a FID sequence in layer order. The result may contain repeats.
pub fn exclude_edges(rule: ExclusionRule, fids: &[Fid]) -> Vec<Fid> {
    let mut result = Vec::new();
    let mut last_fid = SENTINEL;
    for fid in fids.iter().cloned() {
        match rule {
            ExclusionRule::Bial => {
                if fid == last_fid {
                    result.push(fid);
                }
            }
            ExclusionRule::Single => {
                if last_fid == SENTINEL {
                    result.push(fid);
                } else if fid == last_fid {
                    result.pop();
                } else {
                    result.push(fid);
                }
            }
        }
        last_fid = fid;
    }
    result
}

/// Reads the `field` sequence of a layer in layer order, then applies the rule.
pub fn exclude_edges_in_layer<P: AsRef<Path>>(
    path: P,
    rule: ExclusionRule,
    field: &str,
) -> Result<Vec<Fid>> {
    let layer = Layer::open(path)?;
    let arena = FragmentArena::from_layer(&layer, field)?;
    let result = exclude_edges(rule, &arena.fids());
    debug!(
        "{:?} over {} rows excludes {} fragments",
        rule,
        arena.len(),
        result.len()
    );
    Ok(result)
}

/// FIDs to drop, strictly increasing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExclusionSet(Vec<Fid>);

impl ExclusionSet {
    pub fn from_sorted(fids: Vec<Fid>) -> Result<ExclusionSet> {
        if !is_strictly_increasing(&fids) {
            bail!("exclusions must be strictly increasing: {:?}", fids);
        }
        Ok(ExclusionSet(fids))
    }

    /// Sorted, duplicate-free union of two exclusion lists.
    pub fn union(a: &[Fid], b: &[Fid]) -> ExclusionSet {
        ExclusionSet(sorted_union(a, b))
    }

    pub fn as_slice(&self) -> &[Fid] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

use std::collections::BTreeSet;
use std::fmt;

use anyhow::{bail, Result};
use geo::Geometry;
use serde::{Deserialize, Serialize};

use vector_layer::{FeatureId, Layer};

/// The positional identity stamped onto fragments after the final split.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fid(pub i64);

impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FID {}", self.0)
    }
}

/// One piece of a split road, tied to the feature it was read from.
#[derive(Clone, Debug)]
pub struct Fragment {
    pub id: FeatureId,
    pub fid: Fid,
    pub geometry: Geometry,
}

/// Fragments read in one pass from a layer, in layer order.
pub struct FragmentArena {
    fragments: Vec<Fragment>,
}

impl FragmentArena {
    /// Every feature needs an integer in `field`.
    pub fn from_layer(layer: &Layer, field: &str) -> Result<FragmentArena> {
        let idx = layer.field_index(field)?;
        let mut fragments = Vec::with_capacity(layer.len());
        for f in layer.features() {
            let fid = match f.attributes[idx].as_i64() {
                Some(x) => Fid(x),
                None => bail!(
                    "{} has a non-integer {}: {}",
                    f.id,
                    field,
                    f.attributes[idx]
                ),
            };
            fragments.push(Fragment {
                id: f.id,
                fid,
                geometry: f.geometry.clone(),
            });
        }
        Ok(FragmentArena { fragments })
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// The FID sequence in layer order.
    pub fn fids(&self) -> Vec<Fid> {
        self.fragments.iter().map(|f| f.fid).collect()
    }

    /// The features holding any of the given FIDs.
    pub fn ids_for(&self, fids: &[Fid]) -> BTreeSet<FeatureId> {
        let wanted: BTreeSet<Fid> = fids.iter().cloned().collect();
        self.fragments
            .iter()
            .filter(|f| wanted.contains(&f.fid))
            .map(|f| f.id)
            .collect()
    }
}

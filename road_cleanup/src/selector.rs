use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use lczutil::is_strictly_increasing;
use vector_layer::{delete_layer, generate_save_path, Layer};

use crate::{ExclusionSet, Fid, FragmentArena, FID};

/// Co-scans FIDs in layer order against the sorted exclusions. Rows below the current exclusion
/// are kept, a match is dropped and advances the cursor, and rows above it are kept without
/// advancing. The cursor stops at the last exclusion.
pub fn select_remaining(fids: &[Fid], exclusions: &ExclusionSet) -> Result<Vec<Fid>> {
    if !is_strictly_increasing(fids) {
        bail!("FIDs must be strictly increasing in layer order");
    }
    let exclusions = exclusions.as_slice();
    if exclusions.is_empty() {
        return Ok(fids.to_vec());
    }

    let mut kept = Vec::new();
    let mut cursor = 0;
    for fid in fids.iter().cloned() {
        if fid == exclusions[cursor] {
            cursor = (cursor + 1).min(exclusions.len() - 1);
        } else {
            kept.push(fid);
        }
    }
    Ok(kept)
}

/// Writes the fragments that survive the exclusions to `<path>_selected`, replacing whatever was
/// there. With nothing to exclude, the input layer is the answer.
pub fn calc_remained_road<P: AsRef<Path>>(path: P, exclusions: &ExclusionSet) -> Result<PathBuf> {
    let path = path.as_ref();
    if exclusions.is_empty() {
        warn!("Nothing to exclude from {}", path.display());
        return Ok(path.to_path_buf());
    }

    let layer = Layer::open(path)?;
    let arena = FragmentArena::from_layer(&layer, FID)?;
    let kept = select_remaining(&arena.fids(), exclusions)?;
    let output = generate_save_path(path, "selected");
    delete_layer(&output)?;
    layer.materialize(&arena.ids_for(&kept)).export(&output)?;
    info!(
        "Kept {} of {} road fragments",
        kept.len(),
        arena.len()
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fids(x: &[i64]) -> Vec<Fid> {
        x.iter().map(|x| Fid(*x)).collect()
    }

    #[test]
    fn drops_exclusions() {
        let exclusions = ExclusionSet::from_sorted(fids(&[2, 4])).unwrap();
        assert_eq!(
            select_remaining(&fids(&[0, 1, 2, 3, 4, 5]), &exclusions).unwrap(),
            fids(&[0, 1, 3, 5])
        );
    }

    #[test]
    fn empty_exclusions_keep_everything() {
        assert_eq!(
            select_remaining(&fids(&[0, 1, 2]), &ExclusionSet::default()).unwrap(),
            fids(&[0, 1, 2])
        );
    }

    #[test]
    fn unsorted_input() {
        let exclusions = ExclusionSet::from_sorted(fids(&[1])).unwrap();
        assert!(select_remaining(&fids(&[0, 2, 1]), &exclusions).is_err());
        assert!(select_remaining(&fids(&[0, 0, 1]), &exclusions).is_err());
    }

    #[test]
    fn cursor_stalls_on_missing_exclusion() {
        // 2 never shows up, so the cursor never reaches 3
        let exclusions = ExclusionSet::from_sorted(fids(&[2, 3])).unwrap();
        assert_eq!(
            select_remaining(&fids(&[0, 1, 3, 5]), &exclusions).unwrap(),
            fids(&[0, 1, 3, 5])
        );
    }
}

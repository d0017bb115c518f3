use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use geom::Crs;

use crate::SplitType;

/// Tunable constants of the pipeline. Every field has a default, so a config file only needs to
/// mention what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Everything is reprojected into this CRS before measuring
    pub target_epsg: u32,
    /// CRS of rasters that don't declare one, like ESRI ASCII grids
    pub raster_epsg: u32,
    /// How close a fragment's centroid must be to a boundary to keep the fragment
    pub proximity_distance: f64,
    /// How close a fragment endpoint must be to a road/boundary intersection to count as on it
    pub endpoint_tolerance: f64,
    /// Square meters. Mask rings enclosing less than this are dropped.
    pub min_area: f64,
    pub mask_buffer: f64,
    pub natural_levels: Vec<f64>,
    pub water_levels: Vec<f64>,
    /// The LCZ class extracted by the boundary mask
    pub water_class: i64,
}

impl Default for PipelineConfig {
    fn default() -> PipelineConfig {
        PipelineConfig {
            target_epsg: geoprocessing::DEFAULT_EPSG,
            raster_epsg: 4326,
            proximity_distance: 20.0,
            endpoint_tolerance: 2.0,
            min_area: 100_000.0,
            mask_buffer: 50.0,
            natural_levels: vec![10.0],
            water_levels: vec![16.1],
            water_class: 17,
        }
    }
}

impl PipelineConfig {
    /// Reads a TOML config. A missing file means defaults; a malformed one is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<PipelineConfig> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No {}, using the default config", path.display());
            return Ok(PipelineConfig::default());
        }
        let raw = fs_err::read_to_string(path)?;
        let config: PipelineConfig =
            toml::from_str(&raw).with_context(|| format!("malformed config {}", path.display()))?;
        config.target_crs()?;
        config.raster_crs()?;
        Ok(config)
    }

    pub fn target_crs(&self) -> Result<Crs> {
        Crs::from_epsg(self.target_epsg)
    }

    pub fn raster_crs(&self) -> Result<Crs> {
        Crs::from_epsg(self.raster_epsg)
    }

    pub fn levels(&self, split_type: SplitType) -> &[f64] {
        match split_type {
            SplitType::Natural => &self.natural_levels,
            SplitType::Water => &self.water_levels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config() {
        let config: PipelineConfig =
            toml::from_str("proximity_distance = 35\nwater_levels = [15.0, 16.5]").unwrap();
        assert_eq!(config.proximity_distance, 35.0);
        assert_eq!(config.levels(SplitType::Water), &[15.0, 16.5]);
        assert_eq!(config.levels(SplitType::Natural), &[10.0]);
        assert_eq!(config.target_epsg, 32650);
    }

    #[test]
    fn missing_and_malformed() {
        let dir = std::env::temp_dir().join(format!("road_cleanup_config_{}", std::process::id()));
        fs_err::create_dir_all(&dir).unwrap();
        assert_eq!(
            PipelineConfig::load(dir.join("lcz.toml")).unwrap(),
            PipelineConfig::default()
        );

        fs_err::write(dir.join("bad.toml"), "min_area = \"big\"").unwrap();
        assert!(PipelineConfig::load(dir.join("bad.toml")).is_err());
        fs_err::write(dir.join("crs.toml"), "target_epsg = 3857").unwrap();
        assert!(PipelineConfig::load(dir.join("crs.toml")).is_err());
        fs_err::remove_dir_all(&dir).unwrap();
    }
}

//! Loading LCZ classification rasters, either as ESRI ASCII grids or, with the `geotiff` feature,
//! as GeoTIFFs through GDAL.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use geom::{Crs, GeoTransform, Grid};
use lczutil::basename;

pub struct Raster {
    pub grid: Grid,
    pub crs: Crs,
}

/// Finds `<dir>/<name>.tif` (only with GeoTIFF support) or `<dir>/<name>.asc`, where `name` is the
/// directory's own name.
pub fn find_location_raster(location_dir: &Path) -> Result<PathBuf> {
    let name = basename(location_dir);
    let mut candidates = Vec::new();
    if cfg!(feature = "geotiff") {
        candidates.push(location_dir.join(format!("{}.tif", name)));
    }
    candidates.push(location_dir.join(format!("{}.asc", name)));
    for path in &candidates {
        if path.exists() {
            return Ok(path.clone());
        }
    }
    bail!(
        "no raster in {}; looked for {:?}",
        location_dir.display(),
        candidates
    )
}

/// `default_crs` applies to formats that don't record a CRS.
pub fn load_raster(path: &Path, default_crs: Crs) -> Result<Raster> {
    let ext = path
        .extension()
        .and_then(|x| x.to_str())
        .map(|x| x.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "asc" => Ok(Raster {
            grid: read_ascii_grid(path)?,
            crs: default_crs,
        }),
        "tif" | "tiff" => read_geotiff(path, default_crs),
        _ => bail!("don't know how to read raster {}", path.display()),
    }
}

#[cfg(feature = "geotiff")]
fn read_geotiff(path: &Path, default_crs: Crs) -> Result<Raster> {
    let dataset = gdal::Dataset::open(path)?;
    let (width, height) = dataset.raster_size();
    let transform = GeoTransform::from_gdal(dataset.geo_transform()?);
    let band = dataset.rasterband(1)?;
    let nodata = band.no_data_value();
    let buffer = band.read_as::<f64>((0, 0), (width, height), (width, height))?;
    let crs = dataset
        .spatial_ref()
        .ok()
        .and_then(|srs| srs.auth_code().ok())
        .and_then(|code| Crs::from_epsg(code as u32).ok())
        .unwrap_or(default_crs);
    Ok(Raster {
        grid: Grid::new(width, height, buffer.data, transform, nodata)?,
        crs,
    })
}

#[cfg(not(feature = "geotiff"))]
fn read_geotiff(path: &Path, _: Crs) -> Result<Raster> {
    bail!(
        "can't read {}; rebuild with the geotiff feature",
        path.display()
    )
}

/// Reads the ESRI ASCII grid format: a header of `key value` lines, then rows of values from the
/// top down.
pub fn read_ascii_grid(path: &Path) -> Result<Grid> {
    let raw = fs_err::read_to_string(path)?;
    parse_ascii_grid(&raw).with_context(|| format!("bad ASCII grid {}", path.display()))
}

fn parse_ascii_grid(raw: &str) -> Result<Grid> {
    let mut ncols = None;
    let mut nrows = None;
    let mut x = None;
    let mut y = None;
    let mut centered = false;
    let mut cellsize = None;
    let mut nodata = None;
    let mut data = Vec::new();

    for line in raw.lines() {
        let mut tokens = line.split_whitespace().peekable();
        let first = match tokens.peek() {
            Some(first) => first.to_lowercase(),
            None => continue,
        };
        if data.is_empty() && first.starts_with(|c: char| c.is_ascii_alphabetic()) {
            tokens.next();
            let value = match tokens.next() {
                Some(value) => value,
                None => bail!("header {} has no value", first),
            };
            match first.as_str() {
                "ncols" => ncols = Some(value.parse::<usize>()?),
                "nrows" => nrows = Some(value.parse::<usize>()?),
                "xllcorner" => x = Some(value.parse::<f64>()?),
                "yllcorner" => y = Some(value.parse::<f64>()?),
                "xllcenter" => {
                    x = Some(value.parse::<f64>()?);
                    centered = true;
                }
                "yllcenter" => {
                    y = Some(value.parse::<f64>()?);
                    centered = true;
                }
                "cellsize" => cellsize = Some(value.parse::<f64>()?),
                "nodata_value" => nodata = Some(value.parse::<f64>()?),
                _ => bail!("unknown header {}", first),
            }
            continue;
        }
        for token in tokens {
            data.push(token.parse::<f64>()?);
        }
    }

    let (ncols, nrows, mut x, mut y, cellsize) = match (ncols, nrows, x, y, cellsize) {
        (Some(a), Some(b), Some(c), Some(d), Some(e)) => (a, b, c, d, e),
        _ => bail!("missing ncols, nrows, xll, yll, or cellsize"),
    };
    if centered {
        x -= cellsize / 2.0;
        y -= cellsize / 2.0;
    }
    Grid::new(
        ncols,
        nrows,
        data,
        GeoTransform {
            origin_x: x,
            pixel_width: cellsize,
            origin_y: y + (nrows as f64) * cellsize,
            pixel_height: -cellsize,
        },
        nodata,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_grid() {
        let grid = parse_ascii_grid(
            "ncols 3\nnrows 2\nxllcorner 116.0\nyllcorner 39.0\ncellsize 0.5\nNODATA_value -9999\n1 2 3\n17 17 -9999\n",
        )
        .unwrap();
        assert_eq!(grid.width, 3);
        assert_eq!(grid.height, 2);
        assert_eq!(grid.data[grid.idx(1, 1)], 17.0);
        assert_eq!(grid.nodata, Some(-9999.0));
        assert_eq!(grid.transform.origin_y, 40.0);
        assert_eq!(grid.transform.pixel_height, -0.5);
    }

    #[test]
    fn ascii_grid_problems() {
        assert!(parse_ascii_grid("ncols 2\nnrows 2\ncellsize 1\n1 2 3 4\n").is_err());
        assert!(parse_ascii_grid(
            "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2 3\n"
        )
        .is_err());
    }
}

use anyhow::{anyhow, bail, Result};
use contour::ContourBuilder;
use geo::{Coord, LineString, MapCoords, MultiPolygon};

/// Maps pixel space to world space, following the GDAL affine convention without rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub origin_y: f64,
    /// Negative for north-up rasters
    pub pixel_height: f64,
}

impl GeoTransform {
    /// From GDAL's six-element geotransform. The rotation terms are ignored.
    pub fn from_gdal(gt: [f64; 6]) -> GeoTransform {
        GeoTransform {
            origin_x: gt[0],
            pixel_width: gt[1],
            origin_y: gt[3],
            pixel_height: gt[5],
        }
    }

    pub fn apply(&self, pixel: Coord) -> Coord {
        Coord {
            x: self.origin_x + pixel.x * self.pixel_width,
            y: self.origin_y + pixel.y * self.pixel_height,
        }
    }
}

/// A single-band raster, stored row-major from the top-left.
#[derive(Clone, Debug)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
    pub transform: GeoTransform,
    pub nodata: Option<f64>,
}

impl Grid {
    pub fn new(
        width: usize,
        height: usize,
        data: Vec<f64>,
        transform: GeoTransform,
        nodata: Option<f64>,
    ) -> Result<Grid> {
        if width == 0 || height == 0 {
            bail!("Empty {}x{} grid", width, height);
        }
        if data.len() != width * height {
            bail!(
                "A {}x{} grid needs {} values, but got {}",
                width,
                height,
                width * height,
                data.len()
            );
        }
        Ok(Grid {
            width,
            height,
            data,
            transform,
            nodata,
        })
    }

    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// 1 where the cell holds exactly `value`, 0 everywhere else (nodata included).
    pub fn equals_mask(&self, value: f64) -> Grid {
        Grid {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .map(|x| {
                    if self.is_nodata(*x) || (*x - value).abs() > 1e-9 {
                        0.0
                    } else {
                        1.0
                    }
                })
                .collect(),
            transform: self.transform,
            nodata: None,
        }
    }

    fn is_nodata(&self, value: f64) -> bool {
        value.is_nan() || self.nodata.map(|nd| nd == value).unwrap_or(false)
    }

    /// For each threshold, the area covered by values at or above it, in world coordinates.
    pub fn contour_polygons(&self, thresholds: &[f64]) -> Result<Vec<(f64, MultiPolygon)>> {
        if thresholds.is_empty() {
            return Ok(Vec::new());
        }
        let floor = thresholds.iter().cloned().fold(f64::INFINITY, f64::min) - 1.0;
        let values: Vec<f64> = self
            .data
            .iter()
            .map(|x| if self.is_nodata(*x) { floor } else { *x })
            .collect();

        let c = ContourBuilder::new(self.width as u32, self.height as u32, false);
        let contours = c
            .contours(&values, thresholds)
            .map_err(|err| anyhow!("contouring a {}x{} grid failed: {:?}", self.width, self.height, err))?;
        let transform = self.transform;
        Ok(contours
            .into_iter()
            .map(|contour| {
                let threshold = contour.threshold();
                let polygons = contour.geometry().map_coords(|c| transform.apply(c));
                (threshold, polygons)
            })
            .collect())
    }

    /// Isolines at each level, as the closed rings bounding the contour polygons.
    pub fn contour_lines(&self, levels: &[f64]) -> Result<Vec<(f64, LineString)>> {
        let mut result = Vec::new();
        for (level, polygons) in self.contour_polygons(levels)? {
            for polygon in polygons {
                result.push((level, polygon.exterior().clone()));
                for ring in polygon.interiors() {
                    result.push((level, ring.clone()));
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn grid() -> Grid {
        // A 3x3 block of class 17 in the middle of a 7x7 raster
        let mut data = vec![2.0; 49];
        for y in 2..5 {
            for x in 2..5 {
                data[y * 7 + x] = 17.0;
            }
        }
        Grid::new(
            7,
            7,
            data,
            GeoTransform {
                origin_x: 1000.0,
                pixel_width: 10.0,
                origin_y: 5000.0,
                pixel_height: -10.0,
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn size_mismatch() {
        assert!(Grid::new(2, 2, vec![1.0; 3], GeoTransform::from_gdal([0.0; 6]), None).is_err());
    }

    #[test]
    fn mask_and_contour() {
        let mask = grid().equals_mask(17.0);
        assert_eq!(mask.data.iter().filter(|x| **x == 1.0).count(), 9);

        let contours = mask.contour_polygons(&[0.5]).unwrap();
        assert_eq!(contours.len(), 1);
        let (threshold, polygons) = &contours[0];
        assert_eq!(*threshold, 0.5);
        assert!(!polygons.0.is_empty());
        // Somewhere around 3x3 cells of 10x10
        let area = polygons.unsigned_area();
        assert!(area > 400.0 && area < 1600.0, "area {}", area);
        for pt in polygons.0[0].exterior().coords() {
            assert!(pt.x >= 1000.0 && pt.x <= 1070.0);
            assert!(pt.y <= 5000.0 && pt.y >= 4930.0);
        }

        let lines = mask.contour_lines(&[0.5]).unwrap();
        assert!(!lines.is_empty());
        assert!(lines[0].1.is_closed());
    }
}

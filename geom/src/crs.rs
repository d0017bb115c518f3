use std::fmt;

use anyhow::{bail, Result};
use geo::{Coord, Geometry, MapCoords};

// WGS84 ellipsoid
const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
const FLATTENING: f64 = 1.0 / 298.257_223_563;
const UTM_SCALE_FACTOR: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// The coordinate reference systems the pipeline deals with: geographic WGS84 coordinates straight
/// out of the LCZ rasters and OSM extracts, and the projected UTM zones everything gets measured
/// in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Crs {
    /// EPSG:4326. x is longitude, y is latitude, both in degrees.
    Wgs84,
    /// EPSG:326zz (north) or EPSG:327zz (south). Units are meters.
    Utm { zone: u8, north: bool },
}

impl Crs {
    pub fn from_epsg(code: u32) -> Result<Crs> {
        match code {
            4326 => Ok(Crs::Wgs84),
            32601..=32660 => Ok(Crs::Utm {
                zone: (code - 32600) as u8,
                north: true,
            }),
            32701..=32760 => Ok(Crs::Utm {
                zone: (code - 32700) as u8,
                north: false,
            }),
            _ => bail!("Unsupported CRS EPSG:{}", code),
        }
    }

    pub fn epsg(self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::Utm { zone, north: true } => 32600 + u32::from(zone),
            Crs::Utm { zone, north: false } => 32700 + u32::from(zone),
        }
    }

    /// Transform one coordinate from this CRS into another.
    pub fn transform(self, to: Crs, pt: Coord) -> Coord {
        if self == to {
            return pt;
        }
        let lonlat = match self {
            Crs::Wgs84 => pt,
            Crs::Utm { zone, north } => utm_to_lonlat(zone, north, pt),
        };
        match to {
            Crs::Wgs84 => lonlat,
            Crs::Utm { zone, north } => lonlat_to_utm(zone, north, lonlat),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

pub fn transform_geometry(geom: &Geometry, from: Crs, to: Crs) -> Geometry {
    if from == to {
        return geom.clone();
    }
    geom.map_coords(|c| from.transform(to, c))
}

fn central_meridian(zone: u8) -> f64 {
    (f64::from(zone) * 6.0 - 183.0).to_radians()
}

fn eccentricity_squared() -> f64 {
    FLATTENING * (2.0 - FLATTENING)
}

// Transverse Mercator forward projection, series expansion from Snyder's "Map Projections: A
// Working Manual". Sub-millimeter within a zone.
fn lonlat_to_utm(zone: u8, north: bool, lonlat: Coord) -> Coord {
    let e2 = eccentricity_squared();
    let ep2 = e2 / (1.0 - e2);
    let phi = lonlat.y.to_radians();
    let lambda = lonlat.x.to_radians();

    let n = SEMI_MAJOR_AXIS / (1.0 - e2 * phi.sin().powi(2)).sqrt();
    let t = phi.tan().powi(2);
    let c = ep2 * phi.cos().powi(2);
    let a = phi.cos() * (lambda - central_meridian(zone));
    let m = meridian_arc(phi);

    let x = UTM_SCALE_FACTOR
        * n
        * (a + (1.0 - t + c) * a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
        + UTM_FALSE_EASTING;
    let mut y = UTM_SCALE_FACTOR
        * (m + n
            * phi.tan()
            * (a * a / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));
    if !north {
        y += UTM_FALSE_NORTHING_SOUTH;
    }
    Coord { x, y }
}

fn utm_to_lonlat(zone: u8, north: bool, pt: Coord) -> Coord {
    let e2 = eccentricity_squared();
    let ep2 = e2 / (1.0 - e2);
    let x = pt.x - UTM_FALSE_EASTING;
    let y = if north {
        pt.y
    } else {
        pt.y - UTM_FALSE_NORTHING_SOUTH
    };

    let m = y / UTM_SCALE_FACTOR;
    let mu = m
        / (SEMI_MAJOR_AXIS
            * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));
    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let sin1 = phi1.sin();
    let n1 = SEMI_MAJOR_AXIS / (1.0 - e2 * sin1 * sin1).sqrt();
    let t1 = phi1.tan().powi(2);
    let c1 = ep2 * phi1.cos().powi(2);
    let r1 = SEMI_MAJOR_AXIS * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
    let d = x / (n1 * UTM_SCALE_FACTOR);

    let phi = phi1
        - (n1 * phi1.tan() / r1)
            * (d * d / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);
    let lambda = central_meridian(zone)
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                * d.powi(5)
                / 120.0)
            / phi1.cos();

    Coord {
        x: lambda.to_degrees(),
        y: phi.to_degrees(),
    }
}

fn meridian_arc(phi: f64) -> f64 {
    let e2 = eccentricity_squared();
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    SEMI_MAJOR_AXIS
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

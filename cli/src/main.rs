//! The `lcz` tool: derives cleaned road and land-cover boundary layers from LCZ rasters and a
//! base road network. `run` processes every location under a directory; the other subcommands
//! run one step at a time.

#[macro_use]
extern crate log;

mod run;

use std::path::PathBuf;

use anyhow::Result;
use structopt::StructOpt;

use geom::Crs;
use geoprocessing::{GeometryService, NativeService, Operation};
use lczutil::Timer;
use road_cleanup::raster::{find_location_raster, load_raster};
use road_cleanup::{
    create_boundary_mask, create_contour_mask, exclude_by_mask, merge_shapefile, PipelineConfig,
    SplitType,
};

#[derive(StructOpt)]
#[structopt(name = "lcz", about = "Road and boundary layers from LCZ rasters")]
struct Args {
    /// A TOML file overriding pipeline settings. Missing means defaults.
    #[structopt(long, default_value = "lcz.toml")]
    config: PathBuf,
    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Reproject the base road, then build masks and clean up roads for every location directory
    Run {
        /// A directory holding one subdirectory per location, each with a `<location>.tif` or
        /// `<location>.asc` raster and the boundary layers
        #[structopt(long, env = "LCZ_DIR")]
        lcz_dir: PathBuf,
        /// The base road layer
        #[structopt(long, env = "OSM_ROAD")]
        osm_road: PathBuf,
    },
    /// Split, filter, and clean one base road against a natural boundary, then merge with both
    /// boundaries
    Merge {
        #[structopt(long)]
        base_road: PathBuf,
        #[structopt(long)]
        natural: PathBuf,
        #[structopt(long)]
        water: PathBuf,
    },
    /// Build the natural contour mask and the water class mask for one location directory
    Mask {
        #[structopt()]
        location_dir: PathBuf,
    },
    /// Keep only the lines that touch no mask polygon
    ExcludeByMask {
        #[structopt(long)]
        input: PathBuf,
        #[structopt(long)]
        mask: PathBuf,
        /// Defaults to `<input>_mask`
        #[structopt(long)]
        output: Option<PathBuf>,
    },
    /// Reproject a layer into another CRS
    Reproject {
        #[structopt(long)]
        input: PathBuf,
        #[structopt(long)]
        output: PathBuf,
        /// Defaults to the configured target CRS
        #[structopt(long)]
        epsg: Option<u32>,
    },
}

fn main() -> Result<()> {
    // Environment variables may come from a .env file
    dotenvy::dotenv().ok();
    let args = Args::from_args();
    lczutil::logger::setup();

    let cfg = PipelineConfig::load(&args.config)?;
    let service = NativeService::new();
    match args.cmd {
        Command::Run { lcz_dir, osm_road } => {
            run::run(&service, &cfg, &lcz_dir, &osm_road, &mut Timer::new("lcz run"))?
        }
        Command::Merge {
            base_road,
            natural,
            water,
        } => {
            let outputs = merge_shapefile(
                &service,
                &cfg,
                &base_road,
                &natural,
                &water,
                &mut Timer::new("merge shapefile"),
            )?;
            println!("Merged: {}", outputs.merged.display());
            println!("Boundary: {}", outputs.boundary.display());
        }
        Command::Mask { location_dir } => {
            let mut timer = Timer::new(format!("masks for {}", location_dir.display()));
            let raster = load_raster(&find_location_raster(&location_dir)?, cfg.raster_crs()?)?;
            let natural = create_contour_mask(
                &service,
                &cfg,
                &location_dir,
                &raster,
                SplitType::Natural,
                &mut timer,
            )?;
            println!("Natural mask: {}", natural.display());
            let water = create_boundary_mask(
                &service,
                &cfg,
                &location_dir,
                &raster,
                cfg.water_class,
                &mut timer,
            )?;
            println!("Water mask: {}", water.display());
        }
        Command::ExcludeByMask {
            input,
            mask,
            output,
        } => {
            let path = exclude_by_mask(
                &service,
                &input,
                &mask,
                output,
                &mut Timer::new("exclude by mask"),
            )?;
            println!("Wrote {}", path.display());
        }
        Command::Reproject {
            input,
            output,
            epsg,
        } => {
            let target_crs = match epsg {
                Some(code) => Crs::from_epsg(code)?,
                None => cfg.target_crs()?,
            };
            let path = service.run(Operation::Reproject {
                input,
                target_crs,
                output,
            })?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

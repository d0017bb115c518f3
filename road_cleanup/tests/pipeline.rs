use std::path::{Path, PathBuf};

use geo::{line_string, polygon, Geometry, LineString};

use geom::{Crs, GeoTransform, Grid};
use geoprocessing::NativeService;
use lczutil::Timer;
use road_cleanup::raster::Raster;
use road_cleanup::{
    create_boundary_mask, create_contour_mask, exclude_by_mask, filter_lcz_vectors,
    merge_shapefile, split_lines, PipelineConfig, SplitType, FID, MONOID,
};
use vector_layer::{Field, FieldType, GeometryKind, Layer, Value};

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("road_cleanup_{}_{}", name, std::process::id()));
    let _ = fs_err::remove_dir_all(&dir);
    fs_err::create_dir_all(&dir).unwrap();
    dir
}

fn utm() -> Crs {
    Crs::from_epsg(32650).unwrap()
}

fn write_lines(path: &Path, lines: Vec<LineString>) {
    let mut layer = Layer::new(
        utm(),
        GeometryKind::Line,
        vec![Field::new("name", FieldType::Text)],
    );
    for (idx, line) in lines.into_iter().enumerate() {
        layer.push(line.into(), vec![Value::Text(format!("line {}", idx))]);
    }
    layer.export(path).unwrap();
}

fn square(x1: f64, y1: f64, x2: f64, y2: f64) -> LineString {
    line_string![(x: x1, y: y1), (x: x2, y: y1), (x: x2, y: y2), (x: x1, y: y2), (x: x1, y: y1)]
}

// Two short roads poking through opposite sides of the natural boundary, and one far away
fn location(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let base_road = dir.join("result1.geojson");
    write_lines(
        &base_road,
        vec![
            line_string![(x: -10.0, y: 50.0), (x: 30.0, y: 50.0)],
            line_string![(x: 90.0, y: 50.0), (x: 130.0, y: 50.0)],
            line_string![(x: 500.0, y: 500.0), (x: 600.0, y: 500.0)],
        ],
    );
    let natural = dir.join("natural.geojson");
    write_lines(&natural, vec![square(0.0, 0.0, 100.0, 100.0)]);
    let water = dir.join("water.geojson");
    write_lines(&water, vec![square(200.0, 0.0, 300.0, 100.0)]);
    (base_road, natural, water)
}

#[test]
fn split_tags_fragments_with_their_own_ids() {
    let dir = scratch("split");
    let (base_road, natural, _) = location(&dir);

    let split = split_lines(&NativeService, &base_road, &natural, None).unwrap();
    assert_eq!(split, dir.join("natural_roads.geojson"));
    let layer = Layer::open(&split).unwrap();
    assert_eq!(layer.len(), 5);
    let monoid = layer.field_index(MONOID).unwrap();
    for f in layer.features() {
        assert_eq!(f.attributes[monoid], Value::Int(f.id.0 as i64));
    }
    fs_err::remove_dir_all(&dir).unwrap();
}

#[test]
fn proximity_filter_with_no_matches() {
    let dir = scratch("proximity");
    let (base_road, natural, _) = location(&dir);
    let split = split_lines(&NativeService, &base_road, &natural, None).unwrap();

    let filtered = filter_lcz_vectors(&NativeService, &split, &natural, 1.0).unwrap();
    let layer = Layer::open(&filtered).unwrap();
    assert!(layer.is_empty());
    assert!(layer.index_of("FID_2").is_some());
    // Intermediates are gone
    assert!(!split.exists());
    assert!(!dir.join("natural_roads_c.geojson").exists());
    fs_err::remove_dir_all(&dir).unwrap();
}

#[test]
fn proximity_filter_keeps_nearby_fragments() {
    let dir = scratch("proximity_near");
    let (base_road, natural, _) = location(&dir);
    let split = split_lines(&NativeService, &base_road, &natural, None).unwrap();

    let filtered = filter_lcz_vectors(&NativeService, &split, &natural, 20.0).unwrap();
    let layer = Layer::open(&filtered).unwrap();
    assert_eq!(layer.len(), 4);
    let monoid = layer.field_index(MONOID).unwrap();
    let monoids: Vec<Value> = layer
        .features()
        .iter()
        .map(|f| f.attributes[monoid].clone())
        .collect();
    assert_eq!(
        monoids,
        vec![Value::Int(0), Value::Int(1), Value::Int(2), Value::Int(3)]
    );
    fs_err::remove_dir_all(&dir).unwrap();
}

#[test]
fn merge_shapefile_end_to_end() {
    let dir = scratch("merge");
    let (base_road, natural, water) = location(&dir);
    let cfg = PipelineConfig::default();
    let mut timer = Timer::new("test merge_shapefile");

    let outputs =
        merge_shapefile(&NativeService, &cfg, &base_road, &natural, &water, &mut timer).unwrap();
    assert_eq!(outputs.boundary, dir.join("boundary.geojson"));

    // The four fragments touching the boundary survive the split and the proximity filter. FID
    // 0 sits first in the endpoint scans, so it's excluded.
    let selected = dir.join("natural_roads_j_uni_d_s_s_selected.geojson");
    let roads = Layer::open(&selected).unwrap();
    assert_eq!(roads.fields(), &[Field::new(FID, FieldType::Int)]);
    let fids: Vec<Value> = roads
        .features()
        .iter()
        .map(|f| f.attributes[0].clone())
        .collect();
    assert_eq!(fids, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);

    let merged = Layer::open(&outputs.merged).unwrap();
    assert_eq!(merged.len(), 5);
    assert_eq!(merged.crs, utm());
    let names: Vec<&str> = merged.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["FID", "name", "layer", "path"]);
    assert_eq!(Layer::open(&outputs.boundary).unwrap().len(), 1);

    // Intermediates are cleaned up
    for leftover in [
        "natural_roads.geojson",
        "natural_roads_int.geojson",
        "natural_roads_j_uni.geojson",
        "natural_roads_j_uni_d.geojson",
        "natural_roads_j_uni_d_s.geojson",
        "natural_roads_j_uni_d_s_s.geojson",
        "natural_roads_j_uni_d_s_s_v.geojson",
        "natural_roads_j_uni_d_s_s_selected_m_d.geojson",
    ] {
        assert!(!dir.join(leftover).exists(), "{} is still around", leftover);
    }
    fs_err::remove_dir_all(&dir).unwrap();
}

#[test]
fn merge_shapefile_is_idempotent() {
    let dir = scratch("idempotent");
    let (base_road, natural, water) = location(&dir);
    let cfg = PipelineConfig::default();
    let mut timer = Timer::new("test idempotence");

    let first =
        merge_shapefile(&NativeService, &cfg, &base_road, &natural, &water, &mut timer).unwrap();
    let first_merged = Layer::open(&first.merged).unwrap();
    let second =
        merge_shapefile(&NativeService, &cfg, &base_road, &natural, &water, &mut timer).unwrap();
    let second_merged = Layer::open(&second.merged).unwrap();

    assert_eq!(first, second);
    assert_eq!(first_merged.fields(), second_merged.fields());
    assert_eq!(first_merged.len(), second_merged.len());
    fs_err::remove_dir_all(&dir).unwrap();
}

#[test]
fn piece_between_two_crossings_is_excluded() {
    let dir = scratch("double_crossing");
    let base_road = dir.join("result1.geojson");
    // Cuts the corner of the natural boundary, crossing it at (0, 10) and (10, 0)
    write_lines(
        &base_road,
        vec![
            line_string![(x: -5.0, y: 15.0), (x: 15.0, y: -5.0)],
            line_string![(x: 500.0, y: 500.0), (x: 600.0, y: 500.0)],
        ],
    );
    let natural = dir.join("natural.geojson");
    write_lines(&natural, vec![square(0.0, 0.0, 100.0, 100.0)]);
    let water = dir.join("water.geojson");
    write_lines(&water, vec![square(200.0, 0.0, 300.0, 100.0)]);
    let mut timer = Timer::new("test double crossing");

    merge_shapefile(
        &NativeService,
        &PipelineConfig::default(),
        &base_road,
        &natural,
        &water,
        &mut timer,
    )
    .unwrap();

    // Pieces 0, 1, 2 run along the road. Both ends of piece 1 sit on a crossing, so the paired
    // scan drops it, and the dangling scan drops piece 0.
    let roads = Layer::open(dir.join("natural_roads_j_uni_d_s_s_selected.geojson")).unwrap();
    let fids: Vec<Value> = roads
        .features()
        .iter()
        .map(|f| f.attributes[0].clone())
        .collect();
    assert_eq!(fids, vec![Value::Int(2)]);
    fs_err::remove_dir_all(&dir).unwrap();
}

#[test]
fn exclude_lines_inside_mask() {
    let dir = scratch("mask");
    let lines = dir.join("lines.geojson");
    write_lines(
        &lines,
        vec![
            line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
            line_string![(x: 50.0, y: 50.0), (x: 60.0, y: 60.0)],
            line_string![(x: 0.0, y: 20.0), (x: 10.0, y: 20.0)],
            line_string![(x: 90.0, y: 0.0), (x: 120.0, y: 0.0)],
        ],
    );
    let mask = dir.join("mask.geojson");
    let mut layer = Layer::new(utm(), GeometryKind::Polygon, Vec::new());
    let poly: Geometry =
        polygon![(x: 40.0, y: -10.0), (x: 100.0, y: -10.0), (x: 100.0, y: 70.0), (x: 40.0, y: 70.0)]
            .into();
    layer.push(poly, Vec::new());
    layer.export(&mask).unwrap();

    let mut timer = Timer::new("test exclude_by_mask");
    let output = exclude_by_mask(&NativeService, &lines, &mask, None, &mut timer).unwrap();
    assert_eq!(output, dir.join("lines_mask.geojson"));
    let kept = Layer::open(&output).unwrap();
    let names: Vec<Value> = kept
        .features()
        .iter()
        .map(|f| f.attributes[0].clone())
        .collect();
    assert_eq!(names, vec![Value::from("line 0"), Value::from("line 2")]);
    fs_err::remove_dir_all(&dir).unwrap();
}

// A 9x9 raster near Beijing with a 5x5 block in the middle
fn raster(background: f64, block: f64) -> Raster {
    let mut data = vec![background; 81];
    for y in 2..7 {
        for x in 2..7 {
            data[y * 9 + x] = block;
        }
    }
    Raster {
        grid: Grid::new(
            9,
            9,
            data,
            GeoTransform {
                origin_x: 116.4,
                pixel_width: 0.001,
                origin_y: 39.9,
                pixel_height: -0.001,
            },
            None,
        )
        .unwrap(),
        crs: Crs::Wgs84,
    }
}

#[test]
fn boundary_mask_from_class() {
    let dir = scratch("boundary_mask");
    let cfg = PipelineConfig::default();
    let mut timer = Timer::new("test boundary mask");
    let path = create_boundary_mask(
        &NativeService,
        &cfg,
        &dir,
        &raster(2.0, 17.0),
        17,
        &mut timer,
    )
    .unwrap();
    let layer = Layer::open(&path).unwrap();
    assert_eq!(layer.kind, GeometryKind::Line);
    assert_eq!(layer.crs, utm());
    assert_eq!(layer.len(), 1);
    assert!(!dir.join("water_mask_r2v.geojson").exists());
    fs_err::remove_dir_all(&dir).unwrap();
}

#[test]
fn contour_mask_drops_small_rings() {
    let dir = scratch("contour_mask");
    let mut timer = Timer::new("test contour mask");

    let path = create_contour_mask(
        &NativeService,
        &PipelineConfig::default(),
        &dir,
        &raster(2.0, 12.0),
        SplitType::Natural,
        &mut timer,
    )
    .unwrap();
    assert_eq!(path, dir.join("natural_contour_f_p.geojson"));
    let layer = Layer::open(&path).unwrap();
    assert_eq!(layer.len(), 1);
    assert_eq!(layer.crs, utm());
    let elev = layer.field_index("elev").unwrap();
    assert_eq!(layer.features()[0].attributes[elev], Value::Real(10.0));

    // Nothing is big enough with a huge threshold
    let strict = PipelineConfig {
        min_area: 1e9,
        ..PipelineConfig::default()
    };
    let path = create_contour_mask(
        &NativeService,
        &strict,
        &dir,
        &raster(2.0, 12.0),
        SplitType::Natural,
        &mut timer,
    )
    .unwrap();
    assert!(Layer::open(&path).unwrap().is_empty());
    fs_err::remove_dir_all(&dir).unwrap();
}

use geo::line_string;

use geom::Crs;
use road_cleanup::{calc_remained_road, stamp_positional_fid, ExclusionSet, Fid, FID};
use vector_layer::{Field, FieldType, GeometryKind, Layer, Value};

#[test]
fn calc_remained_road_on_disk() {
    let dir = std::env::temp_dir().join(format!("road_cleanup_selection_{}", std::process::id()));
    let _ = fs_err::remove_dir_all(&dir);
    fs_err::create_dir_all(&dir).unwrap();

    let path = dir.join("s.geojson");
    let mut layer = Layer::new(
        Crs::from_epsg(32650).unwrap(),
        GeometryKind::Line,
        vec![Field::new("name", FieldType::Text)],
    );
    for i in 0..6 {
        let x = i as f64 * 10.0;
        layer.push(
            line_string![(x: x, y: 0.0), (x: x + 5.0, y: 0.0)].into(),
            vec![Value::Text(format!("road {}", i))],
        );
    }
    layer.export(&path).unwrap();
    stamp_positional_fid(&path).unwrap();

    // Nothing to exclude leaves the input alone
    assert_eq!(calc_remained_road(&path, &ExclusionSet::default()).unwrap(), path);
    assert!(!dir.join("s_selected.geojson").exists());

    let exclusions = ExclusionSet::from_sorted(vec![Fid(2), Fid(4)]).unwrap();
    let output = calc_remained_road(&path, &exclusions).unwrap();
    assert_eq!(output, dir.join("s_selected.geojson"));
    let selected = Layer::open(&output).unwrap();
    assert_eq!(selected.fields(), &[Field::new(FID, FieldType::Int)]);
    let fids: Vec<Value> = selected
        .features()
        .iter()
        .map(|f| f.attributes[0].clone())
        .collect();
    assert_eq!(
        fids,
        vec![Value::Int(0), Value::Int(1), Value::Int(3), Value::Int(5)]
    );

    // Running again replaces the earlier output
    let again = calc_remained_road(&path, &exclusions).unwrap();
    assert_eq!(Layer::open(&again).unwrap().len(), 4);
    fs_err::remove_dir_all(&dir).unwrap();
}

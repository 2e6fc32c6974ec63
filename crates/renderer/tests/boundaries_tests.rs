//! Boundary overlay loading and decimation.

use renderer::{BoundaryLayer, BoundaryResolution, RenderError};
use test_utils::fixtures::{write_temp_file, BOUNDARIES_GEOJSON};

#[test]
fn test_load_feature_collection() {
    let file = write_temp_file(BOUNDARIES_GEOJSON.as_bytes(), ".geojson");
    let layer = BoundaryLayer::load(file.path()).unwrap();

    // LineString, one MultiLineString member and one Polygon ring
    assert_eq!(layer.lines.len(), 3);
    assert_eq!(layer.vertex_count(), 11);
    assert_eq!(layer.lines[0][0], (-109.05, 41.0));
}

#[test]
fn test_decimation_by_resolution() {
    let layer = BoundaryLayer::from_geojson(BOUNDARIES_GEOJSON).unwrap();

    let fine = layer.decimated(BoundaryResolution::Fine);
    assert_eq!(fine, layer);

    // The straight border collapses to its endpoints; the square keeps its corners.
    let medium = layer.decimated(BoundaryResolution::Medium);
    assert_eq!(medium.lines[0], vec![(-109.05, 41.0), (-102.05, 41.0)]);
    assert_eq!(medium.lines[2].len(), 5);
    assert_eq!(medium.vertex_count(), 9);

    let coarse = layer.decimated(BoundaryResolution::Coarse);
    assert!(coarse.vertex_count() <= medium.vertex_count());
}

#[test]
fn test_missing_file_names_path() {
    let err = BoundaryLayer::load(std::path::Path::new("/nonexistent/borders.geojson")).unwrap_err();
    match err {
        RenderError::Boundaries { path, .. } => assert!(path.contains("borders.geojson")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_malformed_json() {
    let file = write_temp_file(b"{ not json", ".geojson");
    assert!(matches!(
        BoundaryLayer::load(file.path()),
        Err(RenderError::Boundaries { .. })
    ));
}

#[test]
fn test_null_geometry_and_points_ignored() {
    let text = r#"{
      "type": "FeatureCollection",
      "features": [
        { "type": "Feature", "geometry": null, "properties": {} },
        { "type": "Feature", "geometry": { "type": "Point", "coordinates": [-105.0, 40.0] } },
        { "type": "Feature", "geometry": {
            "type": "MultiPolygon",
            "coordinates": [[[[-105.0, 39.0], [-104.0, 39.0], [-104.0, 40.0], [-105.0, 39.0]]]]
        } }
      ]
    }"#;
    let layer = BoundaryLayer::from_geojson(text).unwrap();
    assert_eq!(layer.lines.len(), 1);
    assert_eq!(layer.vertex_count(), 4);
}

#[test]
fn test_bundled_outlines_cover_colorado() {
    let layer = BoundaryLayer::bundled().unwrap();
    assert!(layer.lines.len() >= 10);

    // Colorado/Wyoming border runs along 41N
    let on_border = |&(lon, lat): &(f64, f64)| lat == 41.0 && (-109.05..=-102.05).contains(&lon);
    assert!(layer
        .lines
        .iter()
        .any(|line| line.iter().filter(|p| on_border(p)).count() >= 2));

    // Every ring is closed
    assert!(layer.lines.iter().all(|line| line.first() == line.last()));
}

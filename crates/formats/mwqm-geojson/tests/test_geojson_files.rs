//! Integration tests for `GeoJSON` files on disk

use std::fs::{self, File};

use geo_types::{Geometry, polygon};
use mwqm_core_common::{AttributeValue, Crs, VectorFeatureSet};
use mwqm_formats_shared::FormatReadError;
use mwqm_geojson::{GeoJsonWriterOptions, parse_geojson_bytes, write_geojson};
use tempfile::TempDir;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Test writing a projected boundary and reading it back with its CRS
#[test]
fn test_written_boundary_parses_back() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("basin.geojson");

    let mut set = VectorFeatureSet::new(Crs::epsg(26918), ["huc", "areasqkm"])?;
    let poly = polygon![
        (x: 500_000.0, y: 4_800_000.0),
        (x: 510_000.0, y: 4_800_000.0),
        (x: 510_000.0, y: 4_810_000.0),
    ];
    set.push_row(Some(poly.into()), vec!["01020003".into(), 100.0.into()])?;

    let mut file = File::create(&path)?;
    write_geojson(&mut file, &set, &GeoJsonWriterOptions::default())?;
    drop(file);

    let bytes = fs::read(&path)?;
    let parsed = parse_geojson_bytes(&bytes, path.display().to_string())?;

    assert_eq!(parsed.crs(), Some(Crs::epsg(26918)));
    // document order, not alphabetical
    assert_eq!(parsed.columns(), ["huc", "areasqkm"]);
    assert_eq!(
        parsed.rows()[0].values[0],
        AttributeValue::Text("01020003".to_string())
    );
    assert_eq!(parsed.rows()[0].values[1], AttributeValue::Float(100.0));
    assert!(matches!(parsed.rows()[0].geometry, Some(Geometry::Polygon(_))));

    Ok(())
}

/// Test that property columns keep the order they first appear in
#[test]
fn test_columns_follow_document_order() -> Result<()> {
    let data = br#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "geometry": null, "properties": {"zeta": 1, "alpha": 2}},
        {"type": "Feature", "geometry": null, "properties": {"mid": 3, "zeta": 4}}
    ]}"#;

    let parsed = parse_geojson_bytes(data, "order")?;
    assert_eq!(parsed.columns(), ["zeta", "alpha", "mid"]);
    assert_eq!(parsed.rows()[1].values[1], AttributeValue::Null);

    Ok(())
}

/// Test that a file declaring a non-EPSG CRS is refused
#[test]
fn test_esri_crs_file_is_refused() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("albers.geojson");
    fs::write(
        &path,
        r#"{"type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "ESRI:102003"}},
            "features": [{"type": "Feature", "properties": {},
                          "geometry": {"type": "Point", "coordinates": [1500000.0, 2000000.0]}}]}"#,
    )?;

    let bytes = fs::read(&path)?;
    let err = parse_geojson_bytes(&bytes, path.display().to_string()).unwrap_err();
    assert!(matches!(err, FormatReadError::Parse { .. }));

    Ok(())
}

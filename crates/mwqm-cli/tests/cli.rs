use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn mwqm() -> Command {
    Command::cargo_bin("mwqm").unwrap()
}

/// Test that the help text lists every subcommand
#[test]
fn test_help_lists_commands() {
    mwqm()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("watershed"))
        .stdout(predicate::str::contains("zonal"))
        .stdout(predicate::str::contains("to-fc"));
}

/// Test that a HUC of the wrong length fails before any request
#[test]
fn test_watershed_rejects_short_huc() {
    mwqm()
        .args(["watershed", "0102"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("HUC '0102' has length 4"))
        .stderr(predicate::str::contains("Hint:"));
}

/// Test that zonal requires a project
#[test]
fn test_zonal_requires_project() {
    mwqm()
        .args(["zonal", "-i", "features.geojson", "-t", "task.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--project"));
}

/// Test converting a local dataset into a feature collection expression
#[test]
fn test_to_fc_reports_dropped_rows() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let input = dir.path().join("sites.geojson");
    let output = dir.path().join("sites.json");
    fs::write(
        &input,
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"site": "A"},
             "geometry": {"type": "Point", "coordinates": [-70.25, 43.66]}},
            {"type": "Feature", "properties": {"site": "B"}, "geometry": null}
        ]}"#,
    )?;

    mwqm()
        .arg("to-fc")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Converted 1 feature(s)"))
        .stdout(predicate::str::contains("Dropped Features (1)"));

    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output)?)?;
    assert_eq!(written["result"], "0");
    assert!(written.to_string().contains("\"site\""));
    Ok(())
}

/// Test that a missing input file is reported with a hint
#[test]
fn test_to_fc_missing_input() {
    mwqm()
        .args(["to-fc", "no-such-file.geojson"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read GeoJSON file"));
}

//! Display utilities for formatting CLI output.
//!
//! This module provides table row structures and formatting functions
//! for presenting watershed lookups, conversion diagnostics and zonal
//! statistics tables in a human-readable format.

use tabled::builder::Builder;
use tabled::{Table, Tabled};

use mwqm_core::{FeatureConversionError, WatershedLookup};
use mwqm_core_common::AttributeTable;

/// Table row representation for one watershed lookup.
#[derive(Tabled)]
pub struct WatershedRow {
    /// The hydrologic unit code that was requested.
    #[tabled(rename = "HUC")]
    pub huc: String,
    /// Short outcome of the lookup.
    #[tabled(rename = "Outcome")]
    pub outcome: String,
    /// Number of boundary features returned.
    #[tabled(rename = "Features")]
    pub features: usize,
    /// Coordinate Reference System of the boundary.
    #[tabled(rename = "CRS")]
    pub crs: String,
    /// Failure detail, if any.
    #[tabled(rename = "Detail")]
    pub detail: String,
}

impl WatershedRow {
    pub fn new(huc: &str, lookup: &WatershedLookup) -> Self {
        let (outcome, detail) = match lookup {
            WatershedLookup::Found(_) => ("found", String::new()),
            WatershedLookup::BasinUnavailable { reason } => ("basin unavailable", reason.clone()),
            WatershedLookup::NotFound { status, .. } => {
                ("not found", format!("probe returned HTTP {status}"))
            },
            WatershedLookup::ProbeFailed { error, .. } => ("probe failed", error.clone()),
            WatershedLookup::ParseFailed { error } => ("unparsable response", error.clone()),
        };
        let (features, crs) = match lookup {
            WatershedLookup::Found(set) => (
                set.len(),
                set.crs().map_or_else(|| "N/A".to_string(), |crs| crs.to_string()),
            ),
            _ => (0, "N/A".to_string()),
        };

        Self {
            huc: huc.to_string(),
            outcome: outcome.to_string(),
            features,
            crs,
            detail,
        }
    }
}

/// Table row representation for one dropped feature.
#[derive(Tabled)]
pub struct DiagnosticRow {
    /// Position of the feature in the input.
    #[tabled(rename = "Row")]
    pub index: usize,
    /// Why the feature was dropped.
    #[tabled(rename = "Problem")]
    pub message: String,
}

impl From<&FeatureConversionError> for DiagnosticRow {
    fn from(error: &FeatureConversionError) -> Self {
        Self {
            index: error.index,
            message: error.message.clone(),
        }
    }
}

/// Display the outcome of a watershed lookup.
pub fn display_watershed(huc: &str, lookup: &WatershedLookup) {
    let table = Table::new([WatershedRow::new(huc, lookup)]).to_string();
    println!("{table}");
}

/// Display the result of a feature conversion.
pub fn display_conversion(converted: usize, diagnostics: &[FeatureConversionError]) {
    println!("\nConverted {converted} feature(s) to EPSG:4326");

    if !diagnostics.is_empty() {
        println!("\n=== Dropped Features ({}) ===", diagnostics.len());
        let rows: Vec<DiagnosticRow> = diagnostics.iter().map(DiagnosticRow::from).collect();
        let table = Table::new(rows).to_string();
        println!("{table}");
    }
}

/// Render at most `max_rows` rows of an attribute table.
#[must_use]
pub fn table_preview(table: &AttributeTable, max_rows: usize) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.columns().iter().cloned());
    for row in table.rows().iter().take(max_rows) {
        builder.push_record(row.iter().map(ToString::to_string));
    }
    builder.build().to_string()
}

/// Display a zonal statistics table.
pub fn display_table(table: &AttributeTable, max_rows: usize) {
    println!(
        "\nZonal statistics ({} rows, {} columns):\n",
        table.num_rows(),
        table.num_columns()
    );
    println!("{}", table_preview(table, max_rows));
    if table.num_rows() > max_rows {
        println!("... {} more row(s)", table.num_rows() - max_rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mwqm_core_common::{AttributeValue, Crs, VectorFeatureSet};

    #[test]
    fn test_found_row() {
        let set = VectorFeatureSet::new(Crs::WGS84, ["id"]).unwrap();
        let row = WatershedRow::new("01020003", &WatershedLookup::Found(set));
        assert_eq!(row.outcome, "found");
        assert_eq!(row.features, 0);
        assert_eq!(row.crs, "EPSG:4326");
        assert!(row.detail.is_empty());
    }

    #[test]
    fn test_not_found_row() {
        let lookup = WatershedLookup::NotFound {
            reason: "HTTP 404".to_string(),
            status: 404,
        };
        let row = WatershedRow::new("01020003", &lookup);
        assert_eq!(row.outcome, "not found");
        assert_eq!(row.crs, "N/A");
        assert_eq!(row.detail, "probe returned HTTP 404");
    }

    #[test]
    fn test_diagnostic_row_creation() {
        let error = FeatureConversionError {
            index: 3,
            message: "missing geometry".to_string(),
        };
        let row = DiagnosticRow::from(&error);
        assert_eq!(row.index, 3);
        assert_eq!(row.message, "missing geometry");
    }

    #[test]
    fn test_table_preview_truncates() {
        let mut table = AttributeTable::new(["id", "water_mean"]).unwrap();
        for id in 0..5 {
            table
                .push_row(vec![AttributeValue::Int(id), AttributeValue::Float(0.5)])
                .unwrap();
        }
        let preview = table_preview(&table, 2);
        assert!(preview.contains("water_mean"));
        assert!(preview.contains('1'));
        assert!(!preview.contains('4'));
    }

    #[test]
    fn test_display_conversion_without_diagnostics() {
        // This test just ensures the function runs without panicking
        display_conversion(2, &[]);
    }
}

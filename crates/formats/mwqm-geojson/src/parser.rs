//! `GeoJSON` parsing helpers shared by the watershed fetcher and the CLI.

use std::convert::TryInto;
use std::fmt;

use geo_types::Geometry;
use geojson::{
    Feature, FeatureCollection, GeoJson, Geometry as GeoJsonGeometry, JsonObject, JsonValue,
};
use mwqm_core_common::{AttributeValue, Crs, VectorFeatureSet};
use mwqm_formats_shared::{FormatReadError, FormatResult, SourcePosition};

/// Parsed `GeoJSON` feature with materialized properties and geometry.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub properties: JsonObject,
    pub geometry: Option<Geometry<f64>>,
}

/// Parse raw bytes holding any `GeoJSON` object or a newline-delimited
/// sequence of them.
///
/// The CRS is read from a legacy `crs` member on a `FeatureCollection` when
/// present, otherwise it is EPSG:4326 as RFC 7946 prescribes.
///
/// # Errors
///
/// Returns a parse error if the bytes are neither a `GeoJSON` document nor a
/// `GeoJSON` sequence, or if a `crs` member names anything but an EPSG code.
pub fn parse_geojson_bytes(
    bytes: &[u8],
    context: impl Into<String>,
) -> FormatResult<VectorFeatureSet> {
    let context = context.into();
    let reader = std::io::Cursor::new(bytes);

    match GeoJson::from_reader(reader) {
        Ok(geojson) => {
            let crs = declared_crs(&geojson, &context)?;
            let records = geojson_to_records(geojson, &context)?;
            records_to_feature_set(records, crs)
        },
        Err(primary_err) => {
            let primary_err_message = primary_err.to_string();
            match parse_geojson_sequence(bytes, &context) {
                Ok(records) => records_to_feature_set(records, Crs::WGS84),
                Err(sequence_err) => {
                    Err(combine_errors(&primary_err_message, &sequence_err, context))
                },
            }
        },
    }
}

/// Parse raw bytes that must hold a single `FeatureCollection`.
///
/// # Errors
///
/// Returns a parse error for malformed JSON, for any other `GeoJSON` object
/// type, or for a feature whose geometry cannot be converted.
pub fn parse_feature_collection(
    bytes: &[u8],
    context: impl Into<String>,
) -> FormatResult<VectorFeatureSet> {
    let context = context.into();
    let geojson = GeoJson::from_reader(std::io::Cursor::new(bytes))
        .map_err(|err| FormatReadError::parse(format!("Invalid GeoJSON: {err}"), &context))?;

    match geojson {
        GeoJson::FeatureCollection(collection) => {
            let crs = collection_crs(&collection, &context)?.unwrap_or(Crs::WGS84);
            let records = feature_collection_to_records(collection, &context)?;
            records_to_feature_set(records, crs)
        },
        GeoJson::Feature(_) => Err(FormatReadError::parse(
            "Expected a FeatureCollection, found a Feature",
            context,
        )),
        GeoJson::Geometry(_) => Err(FormatReadError::parse(
            "Expected a FeatureCollection, found a Geometry",
            context,
        )),
    }
}

/// Turn parsed records into a feature set. Columns are the union of all
/// property names in first-seen order; absent properties become nulls.
///
/// # Errors
///
/// Returns a shape error if a property is named like the geometry column.
pub fn records_to_feature_set(
    records: Vec<FeatureRecord>,
    crs: Crs,
) -> FormatResult<VectorFeatureSet> {
    let mut columns: Vec<String> = Vec::new();
    for record in &records {
        for key in record.properties.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut set = VectorFeatureSet::new(crs, columns.iter().cloned())
        .map_err(|source| FormatReadError::Shape {
            source,
            position: None,
        })?;

    for (idx, record) in records.into_iter().enumerate() {
        let values = columns
            .iter()
            .map(|column| {
                record
                    .properties
                    .get(column)
                    .map_or(AttributeValue::Null, AttributeValue::from_json)
            })
            .collect();
        set.push_row(record.geometry, values)
            .map_err(|source| FormatReadError::Shape {
                source,
                position: Some(SourcePosition::feature(idx)),
            })?;
    }
    Ok(set)
}

fn declared_crs(geojson: &GeoJson, context: &str) -> FormatResult<Crs> {
    match geojson {
        GeoJson::FeatureCollection(collection) => {
            Ok(collection_crs(collection, context)?.unwrap_or(Crs::WGS84))
        },
        _ => Ok(Crs::WGS84),
    }
}

/// Legacy (pre RFC 7946) named CRS: `{"type":"name","properties":{"name":...}}`.
///
/// `None` when the member is absent; a member naming anything other than an
/// EPSG code is a parse error, never a silent EPSG:4326.
fn collection_crs(collection: &FeatureCollection, context: &str) -> FormatResult<Option<Crs>> {
    let Some(crs) = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("crs"))
    else {
        return Ok(None);
    };
    let name = crs
        .get("properties")
        .and_then(|properties| properties.get("name"))
        .and_then(JsonValue::as_str);
    match name.and_then(Crs::parse) {
        Some(parsed) => Ok(Some(parsed)),
        None => Err(FormatReadError::parse(
            format!("Unsupported crs member: {crs}"),
            context,
        )),
    }
}

fn geojson_to_records(geojson: GeoJson, context: &str) -> FormatResult<Vec<FeatureRecord>> {
    match geojson {
        GeoJson::FeatureCollection(collection) => feature_collection_to_records(collection, context),
        GeoJson::Feature(feature) => Ok(vec![feature_to_record(feature, 0, context)?]),
        GeoJson::Geometry(geometry) => {
            let geometry = convert_geometry(geometry, None, context)?;
            Ok(vec![FeatureRecord {
                properties: JsonObject::new(),
                geometry: Some(geometry),
            }])
        },
    }
}

fn feature_collection_to_records(
    collection: FeatureCollection,
    context: &str,
) -> FormatResult<Vec<FeatureRecord>> {
    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(idx, feature)| feature_to_record(feature, idx, context))
        .collect()
}

fn feature_to_record(feature: Feature, idx: usize, context: &str) -> FormatResult<FeatureRecord> {
    let geometry = match feature.geometry {
        Some(geometry) => Some(convert_geometry(geometry, Some(idx), context)?),
        None => None,
    };

    let properties = feature.properties.unwrap_or_default();

    Ok(FeatureRecord {
        properties,
        geometry,
    })
}

fn convert_geometry(
    geometry: GeoJsonGeometry,
    feature: Option<usize>,
    context: &str,
) -> FormatResult<Geometry<f64>> {
    geometry.try_into().map_err(|err| FormatReadError::Parse {
        message: format!("Failed to convert GeoJSON geometry: {err}"),
        position: feature.map(SourcePosition::feature),
        context: Some(context.to_string()),
    })
}

fn parse_geojson_sequence(bytes: &[u8], context: &str) -> FormatResult<Vec<FeatureRecord>> {
    let mut records = Vec::new();
    for (line_idx, raw_line) in bytes.split(|b| *b == b'\n').enumerate() {
        let line_number = (line_idx + 1) as u64;
        let line = match std::str::from_utf8(raw_line) {
            Ok(line) => line.trim(),
            Err(err) => {
                return Err(FormatReadError::Parse {
                    message: format!("GeoJSON line is not valid UTF-8: {err}"),
                    position: Some(SourcePosition {
                        line: Some(line_number),
                        ..SourcePosition::default()
                    }),
                    context: Some(context.to_string()),
                });
            },
        };

        if line.is_empty() {
            continue;
        }

        let geojson = line
            .parse::<GeoJson>()
            .map_err(|err| FormatReadError::Parse {
                message: format!("Failed to parse GeoJSON feature: {err}"),
                position: Some(SourcePosition {
                    line: Some(line_number),
                    ..SourcePosition::default()
                }),
                context: Some(context.to_string()),
            })?;

        let mut parsed = geojson_to_records(geojson, context)?;
        records.append(&mut parsed);
    }

    if records.is_empty() {
        Err(FormatReadError::Parse {
            message: "No GeoJSON features found".to_string(),
            position: None,
            context: Some(context.to_string()),
        })
    } else {
        Ok(records)
    }
}

fn combine_errors(
    collection_err: &str,
    sequence_err: &FormatReadError,
    context: String,
) -> FormatReadError {
    let message = format!(
        "Failed to parse GeoJSON as FeatureCollection ({collection_err}); \
         also failed to parse as GeoJSON sequence: {sequence_err}"
    );
    FormatReadError::Parse {
        message,
        position: None,
        context: Some(context),
    }
}

/// Helper to describe JSON value kinds for error messages.
#[must_use]
pub fn describe_value(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

impl fmt::Display for FeatureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let geom = if self.geometry.is_some() {
            "Some(Geometry)"
        } else {
            "None"
        };
        write!(
            f,
            "FeatureRecord(properties={} keys, geometry={geom})",
            self.properties.len()
        )
    }
}

//! `GeoJSON` writer for vector feature sets.

use std::io::Write as IoWrite;

use geo_types::Geometry;
use geojson::{Feature, FeatureCollection, Geometry as GeoJsonGeometry, JsonObject};
use mwqm_core_common::{AttributeError, AttributeValue, Crs, VectorFeatureSet};
use mwqm_formats_shared::{FormatReadError, FormatResult, SourcePosition};
use serde_json::json;

/// Options for `GeoJSON` writing
#[derive(Debug, Clone, Default)]
pub struct GeoJsonWriterOptions {
    /// Pretty-print the output (default: false)
    pub pretty_print: bool,
}

impl GeoJsonWriterOptions {
    /// Create new writer options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable pretty printing
    #[must_use]
    pub fn with_pretty_print(mut self, pretty_print: bool) -> Self {
        self.pretty_print = pretty_print;
        self
    }
}

/// Build one `GeoJSON` feature from a geometry and its attributes.
///
/// # Errors
///
/// Returns [`AttributeError`] if an attribute has no JSON representation.
pub fn feature_from_row<'a, I>(
    geometry: Option<&Geometry<f64>>,
    attributes: I,
) -> Result<Feature, AttributeError>
where
    I: IntoIterator<Item = (&'a str, &'a AttributeValue)>,
{
    let mut properties = JsonObject::new();
    for (name, value) in attributes {
        properties.insert(name.to_string(), value.to_json(name)?);
    }

    Ok(Feature {
        bbox: None,
        geometry: geometry.map(|g| GeoJsonGeometry::new(geojson::Value::from(g))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

/// Convert a whole feature set into a `FeatureCollection`.
///
/// Sets in a CRS other than EPSG:4326 carry a legacy named `crs` member so
/// that [`parse_geojson_bytes`](crate::parse_geojson_bytes) restores it.
///
/// # Errors
///
/// Returns an encode error naming the first row with a non-encodable value.
pub fn to_feature_collection(set: &VectorFeatureSet) -> FormatResult<FeatureCollection> {
    let features = set
        .rows()
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            feature_from_row(row.geometry.as_ref(), set.attributes(row)).map_err(|source| {
                FormatReadError::Encode {
                    source,
                    position: Some(SourcePosition::feature(idx)),
                }
            })
        })
        .collect::<FormatResult<Vec<_>>>()?;

    let foreign_members = match set.crs() {
        Some(crs) if crs != Crs::WGS84 => {
            let mut members = JsonObject::new();
            members.insert(
                "crs".to_string(),
                json!({
                    "type": "name",
                    "properties": {"name": format!("urn:ogc:def:crs:EPSG::{}", crs.code())}
                }),
            );
            Some(members)
        },
        _ => None,
    };

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    })
}

/// Write a feature set as a `GeoJSON` `FeatureCollection`
///
/// # Errors
///
/// Returns an error if a value cannot be encoded or writing fails
pub fn write_geojson<W: IoWrite>(
    writer: &mut W,
    set: &VectorFeatureSet,
    options: &GeoJsonWriterOptions,
) -> FormatResult<()> {
    let collection = to_feature_collection(set)?;
    let result = if options.pretty_print {
        serde_json::to_writer_pretty(&mut *writer, &collection)
    } else {
        serde_json::to_writer(&mut *writer, &collection)
    };
    result.map_err(|err| FormatReadError::Io {
        source: err.into(),
        context: Some("GeoJSON output".to_string()),
    })?;
    writer.flush()?;
    Ok(())
}

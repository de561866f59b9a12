//! Feature Converter: local vector feature sets to remote feature collections.
//!
//! Every row is reprojected to the target geographic CRS and turned into a
//! [`RemoteFeature`]. Rows that fail are dropped and reported as
//! [`FeatureConversionError`]s; the conversion as a whole only fails when no
//! transformer can be built for the source CRS.

use geo::CoordsIter;
use geo_types::{Geometry, LineString, Polygon};
use geojson::JsonObject;
use log::{debug, info, warn};
use mwqm_core_common::{Crs, FeatureRow, VectorFeatureSet};

use crate::config::ConverterConfig;
use crate::error::{FeatureConversionError, Result};
use crate::projection::CoordTransformer;
use crate::remote::{RemoteFeature, RemoteFeatureCollection};

/// Outcome of a conversion: surviving features plus one diagnostic per
/// dropped row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionReport {
    /// Converted features, in input order
    pub features: Vec<RemoteFeature>,
    /// Dropped rows
    pub diagnostics: Vec<FeatureConversionError>,
}

impl ConversionReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }

    #[must_use]
    pub fn into_collection(self) -> RemoteFeatureCollection {
        RemoteFeatureCollection::Inline(self.features)
    }
}

/// Converts [`VectorFeatureSet`]s into inline remote collections.
#[derive(Debug, Clone, Default)]
pub struct FeatureConverter {
    config: ConverterConfig,
}

impl FeatureConverter {
    #[must_use]
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn target_crs(&self) -> Crs {
        Crs::epsg(self.config.target_epsg)
    }

    /// Convert every row, collecting per-row failures.
    ///
    /// A set without a CRS is taken to be in the target CRS already.
    ///
    /// # Errors
    ///
    /// Returns a projection error if the source CRS cannot be transformed to
    /// the target CRS at all.
    pub fn convert(&self, features: &VectorFeatureSet) -> Result<ConversionReport> {
        let target = self.config.target_epsg;
        let source = features.crs().map_or(target, |crs| crs.code());
        let transformer = CoordTransformer::new(source, target)?;
        debug!(
            "Converting {} feature(s) from EPSG:{source} to EPSG:{target}",
            features.len()
        );

        let mut report = ConversionReport::default();
        for (index, row) in features.rows().iter().enumerate() {
            match convert_row(features, row, &transformer) {
                Ok(feature) => report.features.push(feature),
                Err(message) => {
                    let error = FeatureConversionError { index, message };
                    warn!("{error}");
                    report.diagnostics.push(error);
                },
            }
        }

        info!(
            "Converted {} of {} feature(s)",
            report.features.len(),
            features.len()
        );
        Ok(report)
    }
}

fn convert_row(
    set: &VectorFeatureSet,
    row: &FeatureRow,
    transformer: &CoordTransformer,
) -> std::result::Result<RemoteFeature, String> {
    let geometry = row
        .geometry
        .as_ref()
        .ok_or_else(|| "feature has no geometry".to_string())?;
    check_geometry(geometry)?;
    let geometry = transformer
        .transform_geometry(geometry)
        .map_err(|err| err.to_string())?;

    let mut properties = JsonObject::new();
    for (name, value) in set.attributes(row) {
        let json = value.to_json(name).map_err(|err| err.to_string())?;
        properties.insert(name.to_string(), json);
    }

    Ok(RemoteFeature {
        geometry,
        properties,
    })
}

/// Reject geometries the platform cannot construct.
fn check_geometry(geometry: &Geometry<f64>) -> std::result::Result<(), String> {
    if geometry.coords_count() == 0 {
        return Err("geometry is empty".to_string());
    }
    if geometry
        .coords_iter()
        .any(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return Err("geometry has a non-finite coordinate".to_string());
    }

    match geometry {
        Geometry::LineString(line) => check_line(line),
        Geometry::MultiLineString(lines) => lines.iter().try_for_each(check_line),
        Geometry::Polygon(polygon) => check_polygon(polygon),
        Geometry::MultiPolygon(polygons) => polygons.iter().try_for_each(check_polygon),
        Geometry::GeometryCollection(parts) => parts.iter().try_for_each(check_geometry),
        _ => Ok(()),
    }
}

fn check_line(line: &LineString<f64>) -> std::result::Result<(), String> {
    if line.0.len() < 2 {
        return Err(format!(
            "line string has {} position(s); at least 2 required",
            line.0.len()
        ));
    }
    Ok(())
}

fn check_polygon(polygon: &Polygon<f64>) -> std::result::Result<(), String> {
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        let positions = ring.0.len();
        if positions < 4 || !ring.is_closed() {
            return Err(format!(
                "polygon ring has {positions} position(s); a closed ring needs at least 4"
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Coord, Point, polygon};
    use mwqm_core_common::AttributeValue;

    fn square(x: f64, y: f64, size: f64) -> Geometry<f64> {
        polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
        ]
        .into()
    }

    fn degenerate() -> Geometry<f64> {
        Polygon::new(
            LineString::from(vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }]),
            vec![],
        )
        .into()
    }

    #[test]
    fn converts_all_valid_rows() {
        let mut set = VectorFeatureSet::new(Crs::WGS84, ["id", "name"]).unwrap();
        for id in 0..3 {
            set.push_row(
                Some(square(f64::from(id), 0.0, 1.0)),
                vec![AttributeValue::Int(i64::from(id)), "lake".into()],
            )
            .unwrap();
        }

        let report = FeatureConverter::default().convert(&set).unwrap();
        assert_eq!(report.features.len(), 3);
        assert!(report.is_complete());
        assert_eq!(report.features[2].properties["id"], serde_json::json!(2));
        assert!(!report.features[0].properties.contains_key("geometry"));
    }

    #[test]
    fn one_bad_row_is_dropped_with_one_diagnostic() {
        let mut set = VectorFeatureSet::new(Crs::WGS84, ["id"]).unwrap();
        set.push_row(Some(square(0.0, 0.0, 1.0)), vec![1_i64.into()]).unwrap();
        set.push_row(Some(degenerate()), vec![2_i64.into()]).unwrap();
        set.push_row(Some(square(5.0, 5.0, 1.0)), vec![3_i64.into()]).unwrap();

        let report = FeatureConverter::default().convert(&set).unwrap();
        assert_eq!(report.features.len(), 2);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].index, 1);
        assert!(report.diagnostics[0].message.contains("ring"));
        assert_eq!(report.features[1].properties["id"], serde_json::json!(3));
    }

    #[test]
    fn missing_geometry_and_nan_attribute_are_dropped() {
        let mut set = VectorFeatureSet::new(Crs::WGS84, ["area"]).unwrap();
        set.push_row(None, vec![1.0.into()]).unwrap();
        set.push_row(Some(square(0.0, 0.0, 1.0)), vec![f64::NAN.into()]).unwrap();
        set.push_row(Some(Point::new(f64::INFINITY, 0.0).into()), vec![1.0.into()])
            .unwrap();

        let report = FeatureConverter::default().convert(&set).unwrap();
        assert!(report.features.is_empty());
        let indices: Vec<usize> = report.diagnostics.iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(report.diagnostics[1].message.contains("area"));
    }

    #[test]
    fn projected_input_lands_in_geographic_range() {
        // Web Mercator square around (1000 km, 5000 km)
        let mut set = VectorFeatureSet::new(Crs::epsg(3857), ["id"]).unwrap();
        set.push_row(
            Some(square(1_000_000.0, 5_000_000.0, 10_000.0)),
            vec![1_i64.into()],
        )
        .unwrap();

        let report = FeatureConverter::default().convert(&set).unwrap();
        assert_eq!(report.features.len(), 1);
        for coord in report.features[0].geometry.coords_iter() {
            assert!((-180.0..=180.0).contains(&coord.x));
            assert!((-90.0..=90.0).contains(&coord.y));
            assert!((coord.x - 9.0).abs() < 0.2, "lon = {}", coord.x);
        }
    }

    #[test]
    fn set_without_crs_is_not_reprojected() {
        let mut set = VectorFeatureSet::empty();
        set.push_row(Some(square(10.0, 10.0, 1.0)), vec![]).unwrap();
        assert!(set.crs().is_none());

        let report = FeatureConverter::default().convert(&set).unwrap();
        assert_eq!(report.features[0].geometry, square(10.0, 10.0, 1.0));
    }

    #[test]
    fn unknown_source_crs_fails_whole_call() {
        let mut set = VectorFeatureSet::new(Crs::epsg(1), ["id"]).unwrap();
        set.push_row(Some(square(0.0, 0.0, 1.0)), vec![1_i64.into()]).unwrap();
        assert!(FeatureConverter::default().convert(&set).is_err());
    }

    #[test]
    fn empty_set_converts_to_empty_collection() {
        let report = FeatureConverter::default()
            .convert(&VectorFeatureSet::empty())
            .unwrap();
        assert_eq!(report.into_collection().local_len(), Some(0));
    }
}

//! Client-side handles for server-side Earth Engine objects.

use std::collections::BTreeMap;

use geo_types::Geometry;
use geojson::{JsonObject, JsonValue};
use serde::Deserialize;
use serde_json::json;

use crate::error::RemoteError;
use crate::expression::{Expression, ValueNode};

/// One feature ready to be shipped to the imagery platform.
///
/// The geometry is already in the platform's geographic CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFeature {
    pub geometry: Geometry<f64>,
    pub properties: JsonObject,
}

impl RemoteFeature {
    /// `Feature(geometry, metadata)` invocation.
    #[must_use]
    pub fn to_node(&self) -> ValueNode {
        let metadata = self
            .properties
            .iter()
            .map(|(key, value)| (key.clone(), ValueNode::constant(value.clone())))
            .collect();
        ValueNode::invoke(
            "Feature",
            [
                ("geometry", geometry_node(&self.geometry)),
                ("metadata", ValueNode::dictionary(metadata)),
            ],
        )
    }
}

/// A feature collection the imagery platform can evaluate.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteFeatureCollection {
    /// Features built locally and sent inline
    Inline(Vec<RemoteFeature>),
    /// A table asset stored on the platform
    Asset(String),
    /// An arbitrary serialized expression evaluating to a collection
    Computed(Expression),
}

impl RemoteFeatureCollection {
    #[must_use]
    pub fn asset(id: impl Into<String>) -> Self {
        Self::Asset(id.into())
    }

    /// Number of features, when known without a remote call.
    #[must_use]
    pub fn local_len(&self) -> Option<usize> {
        match self {
            Self::Inline(features) => Some(features.len()),
            Self::Asset(_) | Self::Computed(_) => None,
        }
    }

    /// The collection as a self-contained expression tree.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Expression`] if a computed collection holds a
    /// dangling or cyclic reference.
    pub fn to_node(&self) -> Result<ValueNode, RemoteError> {
        match self {
            Self::Inline(features) => Ok(ValueNode::invoke(
                "Collection",
                [(
                    "features",
                    ValueNode::array(features.iter().map(RemoteFeature::to_node).collect()),
                )],
            )),
            Self::Asset(id) => Ok(ValueNode::invoke(
                "Collection.loadTable",
                [("tableId", ValueNode::constant(id.as_str()))],
            )),
            Self::Computed(expression) => expression.resolve(),
        }
    }
}

/// A server-side image, built up from `Image.load` and chained operations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Expression")]
pub struct RemoteImage {
    node: ValueNode,
}

impl RemoteImage {
    /// `Image.load(id)`.
    #[must_use]
    pub fn load(id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self {
            node: ValueNode::invoke("Image.load", [("id", ValueNode::constant(id))]),
        }
    }

    /// Restrict the image to the footprint of a collection.
    #[must_use]
    pub fn clip(&self, collection: ValueNode) -> Self {
        Self {
            node: ValueNode::invoke(
                "Image.clip",
                [("input", self.node.clone()), ("geometry", collection)],
            ),
        }
    }

    /// Keep only the named band.
    #[must_use]
    pub fn select(&self, band: &str) -> Self {
        Self {
            node: ValueNode::invoke(
                "Image.select",
                [
                    ("input", self.node.clone()),
                    ("bandSelectors", ValueNode::array(vec![ValueNode::constant(band)])),
                ],
            ),
        }
    }

    #[must_use]
    pub fn node(&self) -> &ValueNode {
        &self.node
    }

    #[must_use]
    pub fn into_node(self) -> ValueNode {
        self.node
    }
}

impl TryFrom<Expression> for RemoteImage {
    type Error = RemoteError;

    fn try_from(expression: Expression) -> Result<Self, Self::Error> {
        Ok(Self {
            node: expression.resolve()?,
        })
    }
}

/// Translate a geometry into `GeometryConstructors.*` invocations.
///
/// Polygons use even-odd filling, which matches how GeoJSON rings are read.
#[must_use]
pub fn geometry_node(geometry: &Geometry<f64>) -> ValueNode {
    let coordinates = |value: &geojson::Value| -> JsonValue {
        match value {
            geojson::Value::Point(c) => json!(c),
            geojson::Value::MultiPoint(c) | geojson::Value::LineString(c) => json!(c),
            geojson::Value::MultiLineString(c) | geojson::Value::Polygon(c) => json!(c),
            geojson::Value::MultiPolygon(c) => json!(c),
            geojson::Value::GeometryCollection(_) => JsonValue::Null,
        }
    };

    let value = geojson::Value::from(geometry);
    let (constructor, even_odd) = match &value {
        geojson::Value::Point(_) => ("GeometryConstructors.Point", false),
        geojson::Value::MultiPoint(_) => ("GeometryConstructors.MultiPoint", false),
        geojson::Value::LineString(_) => ("GeometryConstructors.LineString", false),
        geojson::Value::MultiLineString(_) => ("GeometryConstructors.MultiLineString", false),
        geojson::Value::Polygon(_) => ("GeometryConstructors.Polygon", true),
        geojson::Value::MultiPolygon(_) => ("GeometryConstructors.MultiPolygon", true),
        geojson::Value::GeometryCollection(_) => {
            let Geometry::GeometryCollection(collection) = geometry else {
                return ValueNode::constant(JsonValue::Null);
            };
            let parts = collection.iter().map(geometry_node).collect();
            return ValueNode::invoke(
                "GeometryConstructors.MultiGeometry",
                [("geometries", ValueNode::array(parts))],
            );
        },
    };

    let mut arguments = BTreeMap::new();
    arguments.insert("coordinates".to_string(), ValueNode::constant(coordinates(&value)));
    if even_odd {
        arguments.insert("evenOdd".to_string(), ValueNode::constant(true));
    }
    ValueNode::invoke(constructor, arguments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Point, polygon};
    use serde_json::json;

    fn sample_feature() -> RemoteFeature {
        let mut properties = JsonObject::new();
        properties.insert("id".to_string(), json!(1));
        RemoteFeature {
            geometry: polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)].into(),
            properties,
        }
    }

    #[test]
    fn polygon_node_is_even_odd() {
        let node = geometry_node(&sample_feature().geometry);
        let value = serde_json::to_value(&node).unwrap();
        let call = &value["functionInvocationValue"];
        assert_eq!(call["functionName"], json!("GeometryConstructors.Polygon"));
        assert_eq!(call["arguments"]["evenOdd"], json!({"constantValue": true}));
        assert_eq!(
            call["arguments"]["coordinates"]["constantValue"][0][0],
            json!([0.0, 0.0])
        );
    }

    #[test]
    fn point_node_has_no_even_odd() {
        let node = geometry_node(&Point::new(3.0, 4.0).into());
        let value = serde_json::to_value(&node).unwrap();
        let call = &value["functionInvocationValue"];
        assert_eq!(call["functionName"], json!("GeometryConstructors.Point"));
        assert!(call["arguments"].get("evenOdd").is_none());
    }

    #[test]
    fn inline_collection_wraps_features() {
        let collection = RemoteFeatureCollection::Inline(vec![sample_feature(), sample_feature()]);
        assert_eq!(collection.local_len(), Some(2));

        let node = collection.to_node().unwrap();
        assert_eq!(node.function_name(), Some("Collection"));
        let value = serde_json::to_value(&node).unwrap();
        let features = &value["functionInvocationValue"]["arguments"]["features"]["arrayValue"]["values"];
        assert_eq!(features.as_array().unwrap().len(), 2);
        assert_eq!(
            features[0]["functionInvocationValue"]["arguments"]["metadata"]["dictionaryValue"]["values"]["id"],
            json!({"constantValue": 1})
        );
    }

    #[test]
    fn asset_collection_loads_table() {
        let node = RemoteFeatureCollection::asset("users/me/hucs").to_node().unwrap();
        assert_eq!(node.function_name(), Some("Collection.loadTable"));
    }

    #[test]
    fn image_chain() {
        let collection = RemoteFeatureCollection::asset("users/me/hucs").to_node().unwrap();
        let image = RemoteImage::load("JRC/GSW1_4/GlobalSurfaceWater")
            .clip(collection)
            .select("occurrence");
        assert_eq!(image.node().function_name(), Some("Image.select"));

        let value = serde_json::to_value(image.node()).unwrap();
        let clip = &value["functionInvocationValue"]["arguments"]["input"];
        assert_eq!(clip["functionInvocationValue"]["functionName"], json!("Image.clip"));
    }

    #[test]
    fn image_deserializes_from_expression() {
        let image: RemoteImage = serde_json::from_value(json!({
            "result": "0",
            "values": {"0": {"functionInvocationValue": {
                "functionName": "Image.load",
                "arguments": {"id": {"constantValue": "USGS/SRTMGL1_003"}}
            }}}
        }))
        .unwrap();
        assert_eq!(image, RemoteImage::load("USGS/SRTMGL1_003"));
    }
}

//! Earth Engine REST client implementing [`ImageryPlatform`] and
//! [`StatisticsEngine`].
//!
//! Collections and reductions are sent as expression graphs to
//! `projects/{project}/table:computeFeatures`, which answers with GeoJSON
//! features, paged by `nextPageToken`.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use geojson::{JsonObject, JsonValue};
use log::{debug, info};
use mwqm_core_common::{AttributeTable, AttributeValue};
use mwqm_csv::{CsvWriterOptions, write_table};
use serde_json::json;

use crate::config::EarthEngineConfig;
use crate::error::{IoErrorExt, RemoteError, Result};
use crate::expression::{Expression, ValueNode};
use crate::remote::RemoteFeatureCollection;
use crate::task::{Aggregation, GroupStatistic};
use crate::transport::HttpTransport;
use crate::zonal::{ImageryPlatform, SYSTEM_INDEX_COLUMN, StatisticsEngine, ZonalRequest};

/// Features requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Output property of `Reducer.frequencyHistogram` on a single band.
const HISTOGRAM_PROPERTY: &str = "histogram";

/// Prefix of the per-class columns in grouped results.
pub const CLASS_PREFIX: &str = "Class_";

/// One feature returned by `computeFeatures`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedFeature {
    /// Platform feature id, exported as `system:index`
    pub id: Option<String>,
    pub properties: JsonObject,
}

/// Earth Engine over an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct EarthEngine<T> {
    config: EarthEngineConfig,
    transport: T,
    page_size: usize,
}

impl<T: HttpTransport> EarthEngine<T> {
    pub fn new(config: EarthEngineConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn config(&self) -> &EarthEngineConfig {
        &self.config
    }

    /// Evaluate a collection expression, following page tokens until
    /// `limit` features (or all of them) have been read.
    ///
    /// # Errors
    ///
    /// Returns a remote error for transport failures, non-2xx statuses and
    /// bodies that are not GeoJSON feature collections.
    pub fn compute_features(
        &self,
        collection: ValueNode,
        limit: Option<usize>,
    ) -> Result<Vec<ComputedFeature>> {
        let url = self.config.compute_features_url();
        let expression = Expression::from_node(collection);
        let mut features = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page_size = limit.map_or(self.page_size, |l| {
                l.saturating_sub(features.len()).min(self.page_size)
            });
            let mut body = json!({"expression": expression, "pageSize": page_size});
            if let Some(token) = &page_token {
                body["pageToken"] = json!(token);
            }

            debug!("POST {url} (page size {page_size})");
            let response = self
                .transport
                .post_json(&url, &body, self.config.access_token.as_deref())
                .map_err(|source| RemoteError::Request {
                    url: url.clone(),
                    source,
                })?;
            if !response.is_success() {
                debug!("Error body: {}", response.body_snippet(500));
                return Err(RemoteError::Status {
                    url,
                    status: response.status,
                }
                .into());
            }

            let (page, next) = parse_page(&response.body).map_err(|message| {
                RemoteError::Parse {
                    url: url.clone(),
                    message,
                }
            })?;
            features.extend(page);

            let done = limit.is_some_and(|l| features.len() >= l);
            match next {
                Some(token) if !done => page_token = Some(token),
                _ => break,
            }
        }

        if let Some(limit) = limit {
            features.truncate(limit);
        }
        Ok(features)
    }
}

impl<T: HttpTransport> ImageryPlatform for EarthEngine<T> {
    fn collection_info(
        &self,
        collection: &RemoteFeatureCollection,
        limit: usize,
    ) -> Result<Vec<JsonObject>> {
        let node = ValueNode::invoke(
            "Collection.limit",
            [
                ("collection", collection.to_node()?),
                ("limit", ValueNode::constant(limit)),
            ],
        );
        Ok(self
            .compute_features(node, Some(limit))?
            .into_iter()
            .map(|f| f.properties)
            .collect())
    }
}

impl<T: HttpTransport> StatisticsEngine for EarthEngine<T> {
    fn export_zonal_csv(&self, request: &ZonalRequest, out_path: &Path) -> Result<()> {
        let features = self.compute_features(reduce_regions(request), None)?;
        info!(
            "Earth Engine returned {} feature(s) for '{}'",
            features.len(),
            request.label
        );
        let table = features_to_table(&features, request.aggregation)?;

        let mut file = File::create(out_path).with_write_context("CSV", out_path)?;
        write_table(&mut file, &table, &CsvWriterOptions::default())?;
        Ok(())
    }
}

/// `Image.reduceRegions` over the request's collection.
#[must_use]
pub fn reduce_regions(request: &ZonalRequest) -> ValueNode {
    let reducer = match request.aggregation {
        Aggregation::Ungrouped(stat) => stat.reducer_function(),
        Aggregation::Grouped(_) => "Reducer.frequencyHistogram",
    };
    let mut arguments = BTreeMap::new();
    arguments.insert("image".to_string(), request.image.node().clone());
    arguments.insert("collection".to_string(), request.collection.clone());
    arguments.insert(
        "reducer".to_string(),
        ValueNode::invoke(reducer, BTreeMap::<String, ValueNode>::new()),
    );
    if let Some(scale) = request.scale {
        arguments.insert("scale".to_string(), ValueNode::constant(scale));
    }
    ValueNode::invoke("Image.reduceRegions", arguments)
}

/// Lay computed features out as the export table: `system:index` first,
/// then every property in first-seen order.
///
/// In grouped mode the class histogram becomes one `Class_{value}` column
/// per class plus `Class_sum`.
///
/// # Errors
///
/// Returns a table error if two properties map to the same column.
pub fn features_to_table(
    features: &[ComputedFeature],
    aggregation: Aggregation,
) -> Result<AttributeTable> {
    let grouped = match aggregation {
        Aggregation::Grouped(stat) => Some(stat),
        Aggregation::Ungrouped(_) => None,
    };

    let mut properties: Vec<String> = Vec::new();
    let mut classes: Vec<String> = Vec::new();
    for feature in features {
        for key in feature.properties.keys() {
            if grouped.is_some() && key == HISTOGRAM_PROPERTY {
                continue;
            }
            if !properties.contains(key) {
                properties.push(key.clone());
            }
        }
        if grouped.is_some() {
            for class in histogram(feature).keys() {
                if !classes.contains(class) {
                    classes.push(class.clone());
                }
            }
        }
    }
    classes.sort_by(|a, b| match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        _ => a.cmp(b),
    });

    let mut columns = vec![SYSTEM_INDEX_COLUMN.to_string()];
    columns.extend(properties.iter().cloned());
    if grouped.is_some() {
        columns.extend(classes.iter().map(|c| format!("{CLASS_PREFIX}{c}")));
        columns.push(format!("{CLASS_PREFIX}sum"));
    }
    let mut table = AttributeTable::new(columns)?;

    for (idx, feature) in features.iter().enumerate() {
        let mut row = Vec::with_capacity(table.num_columns());
        row.push(AttributeValue::Text(
            feature.id.clone().unwrap_or_else(|| idx.to_string()),
        ));
        row.extend(properties.iter().map(|key| {
            feature
                .properties
                .get(key)
                .map_or(AttributeValue::Null, AttributeValue::from_json)
        }));

        if let Some(stat) = grouped {
            let counts = histogram(feature);
            let total: f64 = counts.values().sum();
            for class in &classes {
                let count = counts.get(class).copied().unwrap_or(0.0);
                let value = match stat {
                    GroupStatistic::Sum => count,
                    GroupStatistic::Percentage if total > 0.0 => count / total,
                    GroupStatistic::Percentage => 0.0,
                };
                row.push(AttributeValue::Float(value));
            }
            row.push(AttributeValue::Float(total));
        }
        table.push_row(row)?;
    }
    Ok(table)
}

fn histogram(feature: &ComputedFeature) -> BTreeMap<String, f64> {
    feature
        .properties
        .get(HISTOGRAM_PROPERTY)
        .and_then(JsonValue::as_object)
        .map(|counts| {
            counts
                .iter()
                .filter_map(|(class, count)| count.as_f64().map(|c| (class.clone(), c)))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_page(body: &[u8]) -> std::result::Result<(Vec<ComputedFeature>, Option<String>), String> {
    let value: JsonValue =
        serde_json::from_slice(body).map_err(|err| format!("invalid JSON: {err}"))?;
    let features = value
        .get("features")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| "missing 'features' array".to_string())?;

    let page = features
        .iter()
        .map(|feature| {
            let properties = match feature.get("properties") {
                Some(JsonValue::Object(map)) => map.clone(),
                None | Some(JsonValue::Null) => JsonObject::new(),
                Some(_) => return Err("feature 'properties' is not an object".to_string()),
            };
            let id = feature.get("id").and_then(|id| match id {
                JsonValue::String(s) => Some(s.clone()),
                JsonValue::Number(n) => Some(n.to_string()),
                _ => None,
            });
            Ok(ComputedFeature { id, properties })
        })
        .collect::<std::result::Result<Vec<_>, String>>()?;

    let next = value
        .get("nextPageToken")
        .and_then(JsonValue::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string);
    Ok((page, next))
}

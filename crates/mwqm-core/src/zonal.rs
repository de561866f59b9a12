//! Zonal Statistics Retriever.
//!
//! A retrieval validates the task, records which columns the input already
//! has, converts local features, clips and band-selects the image, then asks
//! a [`ZonalTableSource`] for the per-feature table. The platform's row
//! index column is dropped and every column the input did not already have
//! is prefixed with the task label.
//!
//! The default source is [`CsvRoundTrip`], which has a [`StatisticsEngine`]
//! write `{tmp_dir}/{label}.csv`, loads it and deletes it again.

use std::fs;
use std::path::{Path, PathBuf};

use geojson::{JsonObject, JsonValue};
use log::{debug, info, warn};
use mwqm_core_common::{AttributeTable, VectorFeatureSet};
use mwqm_csv::{CsvReadOptions, read_table};
use mwqm_geojson::{describe_value, parse_feature_collection};

use crate::convert::FeatureConverter;
use crate::error::{InputError, IoError, MwqmError, Result};
use crate::expression::{Expression, ValueNode};
use crate::remote::{RemoteFeatureCollection, RemoteImage};
use crate::task::{Aggregation, ZonalTask};

/// Row index column injected by the platform's table export.
pub const SYSTEM_INDEX_COLUMN: &str = "system:index";

/// Features to aggregate over.
#[derive(Debug, Clone, PartialEq)]
pub enum ZonalInput {
    /// In-memory features, converted before use
    Local(VectorFeatureSet),
    /// A collection that already lives on the platform
    Remote(RemoteFeatureCollection),
}

impl From<VectorFeatureSet> for ZonalInput {
    fn from(set: VectorFeatureSet) -> Self {
        Self::Local(set)
    }
}

impl From<RemoteFeatureCollection> for ZonalInput {
    fn from(collection: RemoteFeatureCollection) -> Self {
        Self::Remote(collection)
    }
}

/// Accepts a GeoJSON `FeatureCollection`, a serialized expression graph
/// (`{"result": .., "values": ..}`) or a table asset reference
/// (`{"asset": "users/me/hucs"}`).
impl TryFrom<JsonValue> for ZonalInput {
    type Error = MwqmError;

    fn try_from(value: JsonValue) -> Result<Self> {
        let invalid =
            |found: String| -> MwqmError { InputError::InvalidInputKind { found }.into() };

        let JsonValue::Object(object) = &value else {
            return Err(invalid(format!("a JSON {}", describe_value(&value))));
        };

        if let Some(kind) = object.get("type").and_then(JsonValue::as_str) {
            if kind != "FeatureCollection" {
                return Err(invalid(format!("a GeoJSON {kind}")));
            }
            let bytes = serde_json::to_vec(&value).map_err(|err| InputError::InvalidInputKind {
                found: format!("an unserializable object ({err})"),
            })?;
            let set = parse_feature_collection(&bytes, "zonal input")?;
            return Ok(Self::Local(set));
        }

        if let Some(asset) = object.get("asset") {
            return match asset.as_str() {
                Some(id) => Ok(Self::Remote(RemoteFeatureCollection::asset(id))),
                None => Err(invalid(format!("an asset id of type {}", describe_value(asset)))),
            };
        }

        if object.contains_key("result") && object.contains_key("values") {
            let expression: Expression =
                serde_json::from_value(value.clone()).map_err(|err| InputError::InvalidInputKind {
                    found: format!("a malformed expression ({err})"),
                })?;
            return Ok(Self::Remote(RemoteFeatureCollection::Computed(expression)));
        }

        Err(invalid("a JSON object that is neither GeoJSON nor an expression".to_string()))
    }
}

/// Everything the statistics engine needs for one task.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalRequest {
    /// Task label
    pub label: String,
    /// Clipped, band-selected image
    pub image: RemoteImage,
    /// The features, as an expression tree
    pub collection: ValueNode,
    /// Requested aggregation
    pub aggregation: Aggregation,
    /// Nominal scale in metres
    pub scale: Option<f64>,
}

/// Read access to remote collections.
pub trait ImageryPlatform {
    /// Properties of the first `limit` features of a collection.
    ///
    /// # Errors
    ///
    /// Returns a remote error if the platform cannot evaluate the collection.
    fn collection_info(
        &self,
        collection: &RemoteFeatureCollection,
        limit: usize,
    ) -> Result<Vec<JsonObject>>;
}

/// An engine that writes zonal statistics to a CSV file.
pub trait StatisticsEngine {
    /// Compute `request` and write the per-feature table to `out_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the computation or the write fails.
    fn export_zonal_csv(&self, request: &ZonalRequest, out_path: &Path) -> Result<()>;
}

/// Anything that yields the raw per-feature table for a request.
pub trait ZonalTableSource {
    /// # Errors
    ///
    /// Returns an error if the table cannot be produced.
    fn zonal_table(&self, request: &ZonalRequest) -> Result<AttributeTable>;
}

impl<T: ImageryPlatform + ?Sized> ImageryPlatform for &T {
    fn collection_info(
        &self,
        collection: &RemoteFeatureCollection,
        limit: usize,
    ) -> Result<Vec<JsonObject>> {
        (**self).collection_info(collection, limit)
    }
}

impl<T: StatisticsEngine + ?Sized> StatisticsEngine for &T {
    fn export_zonal_csv(&self, request: &ZonalRequest, out_path: &Path) -> Result<()> {
        (**self).export_zonal_csv(request, out_path)
    }
}

/// [`ZonalTableSource`] that stages the engine output in a CSV file.
#[derive(Debug, Clone)]
pub struct CsvRoundTrip<E> {
    engine: E,
    tmp_dir: PathBuf,
}

impl<E: StatisticsEngine> CsvRoundTrip<E> {
    /// An empty `tmp_dir` stages files in the working directory.
    pub fn new(engine: E, tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            tmp_dir: tmp_dir.into(),
        }
    }

    /// `{tmp_dir}/{label}.csv`
    #[must_use]
    pub fn csv_path(&self, label: &str) -> PathBuf {
        self.tmp_dir.join(format!("{label}.csv"))
    }
}

impl<E: StatisticsEngine> ZonalTableSource for CsvRoundTrip<E> {
    fn zonal_table(&self, request: &ZonalRequest) -> Result<AttributeTable> {
        let path = self.csv_path(&request.label);
        debug!("Staging zonal statistics in {}", path.display());
        self.engine.export_zonal_csv(request, &path)?;

        // The file goes whether or not it parsed.
        let loaded = read_table(&path, &CsvReadOptions::default());
        let removed = fs::remove_file(&path);
        let table = loaded?;
        removed.map_err(|source| IoError::Remove {
            path: path.clone(),
            source,
        })?;
        Ok(table)
    }
}

/// Computes labelled zonal statistics tables.
#[derive(Debug, Clone)]
pub struct ZonalRetriever<P, E> {
    platform: P,
    engine: E,
    converter: FeatureConverter,
}

impl<P: ImageryPlatform, E: StatisticsEngine> ZonalRetriever<P, E> {
    pub fn new(platform: P, engine: E) -> Self {
        Self {
            platform,
            engine,
            converter: FeatureConverter::default(),
        }
    }

    #[must_use]
    pub fn with_converter(mut self, converter: FeatureConverter) -> Self {
        self.converter = converter;
        self
    }

    /// Run `task` over `features`, staging the engine output under `tmp_dir`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid task before any remote call or file is made;
    /// afterwards on remote, CSV or filesystem errors.
    pub fn retrieve(
        &self,
        features: impl Into<ZonalInput>,
        task: &ZonalTask,
        tmp_dir: impl AsRef<Path>,
    ) -> Result<AttributeTable> {
        let source = CsvRoundTrip::new(&self.engine, tmp_dir.as_ref());
        self.retrieve_from(&source, features, task)
    }

    /// Like [`ZonalRetriever::retrieve`] with a caller-chosen table source.
    ///
    /// # Errors
    ///
    /// See [`ZonalRetriever::retrieve`].
    pub fn retrieve_from<S: ZonalTableSource + ?Sized>(
        &self,
        source: &S,
        features: impl Into<ZonalInput>,
        task: &ZonalTask,
    ) -> Result<AttributeTable> {
        let image = task.image_reference()?;
        let aggregation = task.aggregation()?;

        let (pre_existing, collection) = match features.into() {
            ZonalInput::Local(set) => {
                let mut columns = set.columns().to_vec();
                columns.push(set.geometry_column().to_string());
                let report = self.converter.convert(&set)?;
                (columns, report.into_collection())
            },
            ZonalInput::Remote(collection) => {
                (self.remote_columns(&collection)?, collection)
            },
        };

        info!(
            "Computing {aggregation} of band '{}' for task '{}'",
            task.band, task.label
        );
        let collection = collection.to_node()?;
        let request = ZonalRequest {
            label: task.label.clone(),
            image: image.clip(collection.clone()).select(&task.band),
            collection,
            aggregation,
            scale: task.scale,
        };

        let mut table = source.zonal_table(&request)?;
        label_columns(&mut table, &task.label, &pre_existing)?;
        info!(
            "Task '{}' returned {} row(s): {}",
            task.label,
            table.num_rows(),
            table.columns().join(", ")
        );
        Ok(table)
    }

    fn remote_columns(&self, collection: &RemoteFeatureCollection) -> Result<Vec<String>> {
        if let RemoteFeatureCollection::Inline(features) = collection {
            return Ok(features
                .first()
                .map(|f| f.properties.keys().cloned().collect())
                .unwrap_or_default());
        }
        let first = self.platform.collection_info(collection, 1)?;
        match first.into_iter().next() {
            Some(properties) => Ok(properties.keys().cloned().collect()),
            None => {
                warn!("Remote collection is empty; no columns are protected from prefixing");
                Ok(Vec::new())
            },
        }
    }
}

/// Drop the platform row index and prefix new columns with `label`.
///
/// # Errors
///
/// Returns a table error if prefixing makes two column names collide.
pub fn label_columns(
    table: &mut AttributeTable,
    label: &str,
    pre_existing: &[String],
) -> Result<()> {
    table.drop_column(SYSTEM_INDEX_COLUMN);
    table.rename_columns(|column| {
        if pre_existing.iter().any(|c| c == column) {
            column.to_string()
        } else {
            format!("{label}_{column}")
        }
    })?;
    Ok(())
}

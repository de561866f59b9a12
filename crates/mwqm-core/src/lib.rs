//! `mwqm-core` is the core library for the `mwqm` project, a thin layer over Google Earth Engine
//! and the USGS Network Linked Data Index for watershed-scale water quality modelling.
//!
//! This crate includes:
//! - **Feature Converter** ([`convert`]): reprojects local vector features to EPSG:4326 and turns
//!   each row into a remote feature, dropping bad rows with a diagnostic.
//! - **Zonal Statistics Retriever** ([`zonal`]): clips and band-selects an image, delegates the
//!   aggregation to a statistics engine through a CSV round trip and prefixes the computed
//!   columns with the task label.
//! - **Watershed Boundary Fetcher** ([`watershed`]): requests basin polygons for a HUC and
//!   diagnoses failures with an existence probe.
//!
//! Remote services are reached through the [`transport::HttpTransport`] seam; [`earthengine`]
//! provides the Earth Engine REST implementation of the imagery platform and statistics engine.

pub mod config;
pub mod convert;
pub mod earthengine;
pub mod error;
pub mod expression;
pub mod projection;
pub mod remote;
pub mod task;
pub mod transport;
pub mod watershed;
pub mod zonal;

pub use config::{ConverterConfig, EarthEngineConfig, NldiConfig};
pub use convert::{ConversionReport, FeatureConverter};
pub use earthengine::EarthEngine;
pub use error::{FeatureConversionError, MwqmError, Result};
pub use remote::{RemoteFeature, RemoteFeatureCollection, RemoteImage};
pub use task::{Aggregation, GroupStatistic, Statistic, ZonalTask};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
pub use watershed::{WatershedFetcher, WatershedLookup};
pub use zonal::{
    CsvRoundTrip, ImageryPlatform, StatisticsEngine, ZonalInput, ZonalRequest, ZonalRetriever,
    ZonalTableSource,
};

//! `GeoJSON` support for `mwqm` vector feature sets.
//!
//! Parsing turns `GeoJSON` text (a `FeatureCollection`, a single `Feature`, a
//! bare geometry or a newline-delimited sequence) into a
//! [`VectorFeatureSet`](mwqm_core_common::VectorFeatureSet). Writing goes the
//! other way, one [`geojson::Feature`] per row.

pub mod parser;
pub mod writer;

pub use parser::{
    FeatureRecord, describe_value, parse_feature_collection, parse_geojson_bytes,
    records_to_feature_set,
};
pub use writer::{GeoJsonWriterOptions, feature_from_row, to_feature_collection, write_geojson};

//! Common types shared across `mwqm` crates.
//!
//! This crate provides the data model that is shared between `mwqm-core`
//! and the format crates, preventing circular dependencies.

pub mod attribute;
pub mod features;
pub mod table;

// Re-export commonly used types
pub use attribute::{AttributeError, AttributeValue};
pub use features::{Crs, FeatureRow, VectorFeatureSet};
pub use table::{AttributeTable, TableError};

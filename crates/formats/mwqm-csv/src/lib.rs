//! CSV support for `mwqm` attribute tables.
//!
//! Zonal statistics engines hand their results over as CSV files. This crate
//! loads such a file into an [`AttributeTable`](mwqm_core_common::AttributeTable),
//! inferring a scalar type per cell, and writes tables back out.

pub mod reader;
pub mod writer;

pub use reader::{CsvReadOptions, read_table, read_table_from_reader};
pub use writer::{CsvWriterOptions, write_table, write_table_to_bytes};

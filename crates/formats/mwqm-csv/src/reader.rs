//! CSV reader producing [`AttributeTable`]s.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use log::debug;
use mwqm_core_common::{AttributeTable, AttributeValue};
use mwqm_formats_shared::{FormatReadError, FormatResult, SourcePosition};

/// Options for CSV reading
#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    /// Column delimiter (default: b',')
    pub delimiter: u8,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvReadOptions {
    /// Set column delimiter
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// Read a CSV file with a header row into a table.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, a record is malformed or
/// has a different width than the header, or the header repeats a name.
pub fn read_table(path: impl AsRef<Path>, options: &CsvReadOptions) -> FormatResult<AttributeTable> {
    let path = path.as_ref();
    let context = path.display().to_string();
    let file = File::open(path).map_err(|source| FormatReadError::Io {
        source,
        context: Some(context.clone()),
    })?;
    read_table_from_reader(file, options, context)
}

/// Read CSV from any reader into a table.
///
/// # Errors
///
/// See [`read_table`].
pub fn read_table_from_reader<R: Read>(
    reader: R,
    options: &CsvReadOptions,
    context: impl Into<String>,
) -> FormatResult<AttributeTable> {
    let context = context.into();
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|err| csv_error(&err, &context))?
        .clone();

    let mut table = AttributeTable::new(headers.iter()).map_err(|source| FormatReadError::Shape {
        source,
        position: Some(SourcePosition {
            line: Some(1),
            ..SourcePosition::default()
        }),
    })?;

    for record in csv_reader.records() {
        let record = record.map_err(|err| csv_error(&err, &context))?;
        let values = record.iter().map(AttributeValue::parse_cell).collect();
        table
            .push_row(values)
            .map_err(|source| FormatReadError::Shape {
                source,
                position: record.position().map(|pos| SourcePosition {
                    line: Some(pos.line()),
                    record: Some(pos.record()),
                    ..SourcePosition::default()
                }),
            })?;
    }

    debug!(
        "Read {} row(s) x {} column(s) from {context}",
        table.num_rows(),
        table.num_columns()
    );
    Ok(table)
}

fn csv_error(err: &csv::Error, context: &str) -> FormatReadError {
    let position = err.position().map(|pos| SourcePosition {
        line: Some(pos.line()),
        byte_offset: Some(pos.byte()),
        record: Some(pos.record()),
        ..SourcePosition::default()
    });
    FormatReadError::Parse {
        message: err.to_string(),
        position,
        context: Some(context.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_engine_output() {
        let data = "system:index,id,mean\n0,1,0.25\n1,2,\n";
        let table =
            read_table_from_reader(data.as_bytes(), &CsvReadOptions::default(), "test").unwrap();

        assert_eq!(table.columns(), ["system:index", "id", "mean"]);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.value(0, "mean"), Some(&AttributeValue::Float(0.25)));
        assert_eq!(table.value(1, "mean"), Some(&AttributeValue::Null));
    }

    #[test]
    fn header_only_is_empty_table() {
        let table =
            read_table_from_reader("id,mean\n".as_bytes(), &CsvReadOptions::default(), "test")
                .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.num_columns(), 2);
    }

    #[test]
    fn ragged_record_is_parse_error() {
        let data = "id,mean\n1,0.5\n2\n";
        let err = read_table_from_reader(data.as_bytes(), &CsvReadOptions::default(), "ragged")
            .unwrap_err();
        match err {
            FormatReadError::Parse { context, .. } => {
                assert_eq!(context.as_deref(), Some("ragged"));
            },
            other => panic!("Expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_header_is_shape_error() {
        let err = read_table_from_reader("a,a\n1,2\n".as_bytes(), &CsvReadOptions::default(), "dup")
            .unwrap_err();
        assert!(matches!(err, FormatReadError::Shape { .. }));
    }

    #[test]
    fn custom_delimiter() {
        let options = CsvReadOptions::default().with_delimiter(b';');
        let table = read_table_from_reader("a;b\n1;x\n".as_bytes(), &options, "semi").unwrap();
        assert_eq!(table.value(0, "b"), Some(&AttributeValue::Text("x".to_string())));
    }
}

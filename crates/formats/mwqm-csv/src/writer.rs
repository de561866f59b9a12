//! CSV writer for [`AttributeTable`]s.

use std::io::Write as IoWrite;

use csv::WriterBuilder;
use mwqm_core_common::{AttributeTable, AttributeValue};
use mwqm_formats_shared::{FormatReadError, FormatResult};

/// Options for CSV writing
#[derive(Debug, Clone)]
pub struct CsvWriterOptions {
    /// Column delimiter (default: b',')
    pub delimiter: u8,
    /// Whether to write header row (default: true)
    pub has_header: bool,
    /// Null value representation (default: empty string)
    pub null_value: String,
}

impl Default for CsvWriterOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            null_value: String::new(),
        }
    }
}

impl CsvWriterOptions {
    /// Create new writer options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set column delimiter
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set whether to write header row
    #[must_use]
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Set null value representation
    #[must_use]
    pub fn with_null_value(mut self, null_value: impl Into<String>) -> Self {
        self.null_value = null_value.into();
        self
    }
}

/// Write a table as CSV
///
/// # Errors
///
/// Returns an error if writing to the output fails
pub fn write_table<W: IoWrite>(
    writer: &mut W,
    table: &AttributeTable,
    options: &CsvWriterOptions,
) -> FormatResult<()> {
    let mut csv_writer = WriterBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(false)
        .from_writer(writer);

    if options.has_header {
        csv_writer
            .write_record(table.columns())
            .map_err(write_error)?;
    }

    for row in table.rows() {
        let cells = row.iter().map(|value| match value {
            AttributeValue::Null => options.null_value.clone(),
            other => other.to_string(),
        });
        csv_writer.write_record(cells).map_err(write_error)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Write a table to an in-memory CSV buffer
///
/// # Errors
///
/// Returns an error if CSV serialization fails
pub fn write_table_to_bytes(
    table: &AttributeTable,
    options: &CsvWriterOptions,
) -> FormatResult<Vec<u8>> {
    let mut buffer = Vec::new();
    write_table(&mut buffer, table, options)?;
    Ok(buffer)
}

fn write_error(err: csv::Error) -> FormatReadError {
    match err.into_kind() {
        csv::ErrorKind::Io(source) => FormatReadError::Io {
            source,
            context: Some("CSV output".to_string()),
        },
        other => FormatReadError::Parse {
            message: format!("{other:?}"),
            position: None,
            context: Some("CSV output".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AttributeTable {
        let mut table = AttributeTable::new(["id", "mean"]).unwrap();
        table
            .push_row(vec![AttributeValue::Int(1), AttributeValue::Float(0.5)])
            .unwrap();
        table
            .push_row(vec![AttributeValue::Int(2), AttributeValue::Null])
            .unwrap();
        table
    }

    #[test]
    fn writes_header_and_rows() {
        let bytes = write_table_to_bytes(&sample(), &CsvWriterOptions::default()).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "id,mean\n1,0.5\n2,\n");
    }

    #[test]
    fn custom_null_and_delimiter() {
        let options = CsvWriterOptions::new()
            .with_delimiter(b';')
            .with_null_value("NA")
            .with_header(false);
        let bytes = write_table_to_bytes(&sample(), &options).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "1;0.5\n2;NA\n");
    }

    #[test]
    fn whole_float_keeps_decimal_point() {
        let mut table = AttributeTable::new(["sum"]).unwrap();
        table.push_row(vec![AttributeValue::Float(40.0)]).unwrap();
        let bytes = write_table_to_bytes(&table, &CsvWriterOptions::default()).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "sum\n40.0\n");
    }

    #[test]
    fn quotes_text_with_delimiters() {
        let mut table = AttributeTable::new(["name"]).unwrap();
        table
            .push_row(vec![AttributeValue::Text("Lake, North".to_string())])
            .unwrap();
        let bytes = write_table_to_bytes(&table, &CsvWriterOptions::default()).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "name\n\"Lake, North\"\n");
    }
}

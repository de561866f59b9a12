//! In-memory attribute tables.
//!
//! An [`AttributeTable`] is a rectangular set of named columns with no
//! geometry, used for zonal statistics results loaded from the engine's CSV.

use std::collections::HashSet;

use thiserror::Error;

use crate::attribute::AttributeValue;

/// Errors raised when a table would lose its rectangular shape or its
/// unique column names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// A row does not have one value per column
    #[error("row has {found} values but the table has {expected} columns")]
    ColumnCountMismatch {
        /// Number of columns in the table
        expected: usize,
        /// Number of values supplied
        found: usize,
    },

    /// Two columns share a name
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
}

/// A table of scalar values with uniquely named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeTable {
    columns: Vec<String>,
    rows: Vec<Vec<AttributeValue>>,
}

impl AttributeTable {
    /// Creates an empty table with the given columns.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::DuplicateColumn`] if a name repeats.
    pub fn new<I, S>(columns: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        ensure_unique(&columns)?;
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ColumnCountMismatch`] if the row is not as wide
    /// as the table.
    pub fn push_row(&mut self, values: Vec<AttributeValue>) -> Result<(), TableError> {
        if values.len() != self.columns.len() {
            return Err(TableError::ColumnCountMismatch {
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        self.rows.push(values);
        Ok(())
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in insertion order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<AttributeValue>] {
        &self.rows
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, top to bottom.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&AttributeValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// A single cell.
    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> Option<&AttributeValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Removes a column if present. Returns whether anything was removed.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        true
    }

    /// Renames every column through `rename`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::DuplicateColumn`] if two columns end up with the
    /// same name; the table is left unchanged in that case.
    pub fn rename_columns<F>(&mut self, mut rename: F) -> Result<(), TableError>
    where
        F: FnMut(&str) -> String,
    {
        let renamed: Vec<String> = self.columns.iter().map(|c| rename(c)).collect();
        ensure_unique(&renamed)?;
        self.columns = renamed;
        Ok(())
    }
}

fn ensure_unique(columns: &[String]) -> Result<(), TableError> {
    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        if !seen.insert(column.as_str()) {
            return Err(TableError::DuplicateColumn(column.clone()));
        }
    }
    Ok(())
}

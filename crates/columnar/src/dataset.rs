//! Ordered collection of named columns with a fixed row count

use thiserror::Error;

use crate::column::Column;

/// Errors constructing a dataset
#[derive(Debug, Clone, Error)]
pub enum DatasetError {
    /// A column's row count differs from the first column's
    #[error("column {name} has {actual} rows, expected {expected}")]
    RowCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Two columns share a name
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),
}

/// An ordered sequence of named columns; row count is fixed for the
/// lifetime of a pipeline run
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<Column>,
    nrows: usize,
}

impl Dataset {
    /// Build a dataset, verifying row alignment and name uniqueness
    pub fn new(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let nrows = columns.first().map_or(0, Column::len);
        for col in &columns {
            if col.len() != nrows {
                return Err(DatasetError::RowCountMismatch {
                    name: col.name.clone(),
                    expected: nrows,
                    actual: col.len(),
                });
            }
        }
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(DatasetError::DuplicateColumn(col.name.clone()));
            }
        }
        Ok(Self { columns, nrows })
    }

    /// Number of rows
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// Columns in schema order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Remove the named columns before the pipeline runs; names that do
    /// not exist are ignored
    pub fn drop_columns(&mut self, names: &[&str]) {
        self.columns.retain(|c| !names.contains(&c.name.as_str()));
    }
}

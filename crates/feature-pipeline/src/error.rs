//! Pipeline error types

use thiserror::Error;

use crate::config::ConfigError;

/// Fatal pipeline failures
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A transform produced a block whose row count differs from the
    /// dataset's
    #[error("block from {producer} has {actual} rows, dataset has {expected}")]
    RowCountMismatch {
        producer: String,
        expected: usize,
        actual: usize,
    },

    /// Training labels do not cover the training partition
    #[error("labels cover {actual} rows, training partition has {expected}")]
    LabelMismatch { expected: usize, actual: usize },

    /// The split index exceeds the dataset's row count
    #[error("split point {split} exceeds dataset row count {nrows}")]
    SplitOutOfRange { split: usize, nrows: usize },

    /// A treatment was applied to a column of the wrong storage type
    #[error("treatment {treatment} cannot process column {column}: {reason}")]
    TreatmentType {
        treatment: String,
        column: String,
        reason: &'static str,
    },

    /// Invalid configuration, caught before the pipeline runs
    #[error(transparent)]
    Config(#[from] ConfigError),
}

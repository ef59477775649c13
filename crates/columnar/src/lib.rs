//! Columnar Dataset Model
//!
//! Typed columns, cardinality, and train/test splits for the feature pipeline.

mod column;
mod dataset;
mod split;

pub use column::{Column, ColumnData, ColumnRole};
pub use dataset::{Dataset, DatasetError};
pub use split::{Labels, TaskKind, TrainTestSplit};

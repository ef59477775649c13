//! Train/test split and task-typed training labels

use serde::{Deserialize, Serialize};

/// Single split index partitioning dataset rows into a training prefix
/// and a test suffix; computed once and reused by every label-aware stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainTestSplit {
    split: usize,
}

impl TrainTestSplit {
    /// Split at `split`: rows `[0, split)` train, `[split, nrows)` test
    pub fn at(split: usize) -> Self {
        Self { split }
    }

    /// Number of training rows
    pub fn train_len(&self) -> usize {
        self.split
    }

    /// Row index where the test partition begins
    pub fn point(&self) -> usize {
        self.split
    }
}

/// Kind of modeling task the labels belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Classification,
    Regression,
}

/// Training-partition labels; length must equal the split's train length
#[derive(Debug, Clone)]
pub struct Labels {
    /// Task kind, gating target-rate augmentation and F-test choice
    pub task: TaskKind,
    /// One label per training row
    pub values: Vec<f64>,
}

impl Labels {
    /// Classification labels
    pub fn classification(values: Vec<f64>) -> Self {
        Self {
            task: TaskKind::Classification,
            values,
        }
    }

    /// Regression labels
    pub fn regression(values: Vec<f64>) -> Self {
        Self {
            task: TaskKind::Regression,
            values,
        }
    }
}

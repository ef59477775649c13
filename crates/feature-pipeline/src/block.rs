//! Feature blocks and their ordered concatenation
//!
//! Every transform produces a `FeatureBlock`; a stage collects blocks in
//! an explicit ordered list and concatenates once, so column provenance
//! stays traceable and composition is associative.

use ndarray::{s, Array2};

use columnar::TrainTestSplit;

use crate::error::PipelineError;

/// A fixed-row-count numeric sub-matrix produced by one transform
#[derive(Debug, Clone)]
pub struct FeatureBlock {
    /// Which transform produced the block, for error reporting
    pub source: String,
    /// Row-aligned numeric data
    pub data: Array2<f64>,
}

impl FeatureBlock {
    /// Tag a matrix with its producing transform
    pub fn new(source: impl Into<String>, data: Array2<f64>) -> Self {
        Self {
            source: source.into(),
            data,
        }
    }

    /// Build a single-column block from a vector
    pub fn from_column(source: impl Into<String>, values: Vec<f64>) -> Self {
        let n = values.len();
        let data = Array2::from_shape_vec((n, 1), values)
            .unwrap_or_else(|_| Array2::zeros((n, 1)));
        Self::new(source, data)
    }
}

/// Ordered list of row-aligned blocks for one stage
#[derive(Debug)]
pub struct BlockList {
    nrows: usize,
    blocks: Vec<FeatureBlock>,
}

impl BlockList {
    /// Empty list for a stage producing matrices with `nrows` rows
    pub fn new(nrows: usize) -> Self {
        Self {
            nrows,
            blocks: Vec::new(),
        }
    }

    /// Append a block, rejecting any row-count mismatch
    pub fn push(&mut self, block: FeatureBlock) -> Result<(), PipelineError> {
        if block.data.nrows() != self.nrows {
            return Err(PipelineError::RowCountMismatch {
                producer: block.source,
                expected: self.nrows,
                actual: block.data.nrows(),
            });
        }
        self.blocks.push(block);
        Ok(())
    }

    /// Total column count across all blocks
    pub fn ncols(&self) -> usize {
        self.blocks.iter().map(|b| b.data.ncols()).sum()
    }

    /// Concatenate all blocks horizontally, in insertion order
    pub fn concat(&self) -> Array2<f64> {
        let mut matrix = Array2::zeros((self.nrows, self.ncols()));
        let mut offset = 0;
        for block in &self.blocks {
            let width = block.data.ncols();
            matrix
                .slice_mut(s![.., offset..offset + width])
                .assign(&block.data);
            offset += width;
        }
        matrix
    }
}

/// Divide a matrix into training and test partitions at the split index
pub fn split_matrix(matrix: &Array2<f64>, split: TrainTestSplit) -> (Array2<f64>, Array2<f64>) {
    let point = split.point().min(matrix.nrows());
    let train = matrix.slice(s![..point, ..]).to_owned();
    let test = matrix.slice(s![point.., ..]).to_owned();
    (train, test)
}

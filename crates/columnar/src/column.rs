//! Typed columns and column classification

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Cell storage for one column; every cell is optional to model missing data
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// 64-bit floating point values
    Float(Vec<Option<f64>>),
    /// Signed integer values
    Integer(Vec<Option<i64>>),
    /// Boolean values
    Boolean(Vec<Option<bool>>),
    /// Opaque text values
    Text(Vec<Option<String>>),
}

impl ColumnData {
    /// Number of rows in the column
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(v) => v.len(),
            ColumnData::Integer(v) => v.len(),
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    /// True if the column has no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How the pipeline treats a column, decided once from storage type,
/// cardinality, and the configured dummy limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Low-cardinality column routed to the encoding strategy set
    Categorical,
    /// Floating point column routed to the numerical transform
    Continuous,
    /// Integer or boolean column routed to the numerical transform
    Discrete,
    /// Opaque text column routed to the text transform
    Text,
}

/// A named, typed column of a dataset
#[derive(Debug, Clone)]
pub struct Column {
    /// Column name, unique within a dataset
    pub name: String,
    /// Cell storage
    pub data: ColumnData,
}

impl Column {
    /// Create a named column
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the column has no rows
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if any cell is missing
    pub fn has_missing(&self) -> bool {
        match &self.data {
            ColumnData::Float(v) => v.iter().any(|c| c.is_none()),
            ColumnData::Integer(v) => v.iter().any(|c| c.is_none()),
            ColumnData::Boolean(v) => v.iter().any(|c| c.is_none()),
            ColumnData::Text(v) => v.iter().any(|c| c.is_none()),
        }
    }

    /// Count of distinct values; a missing cell counts as one extra
    /// distinct value when present
    pub fn cardinality(&self) -> usize {
        let missing = usize::from(self.has_missing());
        let observed = match &self.data {
            ColumnData::Float(v) => {
                // distinct by bit pattern, with -0.0 folded into 0.0
                let set: HashSet<u64> = v
                    .iter()
                    .flatten()
                    .map(|&x| if x == 0.0 { 0.0f64 } else { x }.to_bits())
                    .collect();
                set.len()
            }
            ColumnData::Integer(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
            ColumnData::Boolean(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
            ColumnData::Text(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
        };
        observed + missing
    }

    /// Classify the column for dispatch; computed once per column and
    /// matched exhaustively downstream
    pub fn role(&self, dummy_limit: usize) -> ColumnRole {
        if self.cardinality() <= dummy_limit {
            return ColumnRole::Categorical;
        }
        match &self.data {
            ColumnData::Float(_) => ColumnRole::Continuous,
            ColumnData::Integer(_) | ColumnData::Boolean(_) => ColumnRole::Discrete,
            ColumnData::Text(_) => ColumnRole::Text,
        }
    }

    /// Cells widened to f64, or `None` for text columns
    pub fn numeric_cells(&self) -> Option<Vec<Option<f64>>> {
        match &self.data {
            ColumnData::Float(v) => Some(v.clone()),
            ColumnData::Integer(v) => Some(v.iter().map(|c| c.map(|x| x as f64)).collect()),
            ColumnData::Boolean(v) => {
                Some(v.iter().map(|c| c.map(|b| if b { 1.0 } else { 0.0 })).collect())
            }
            ColumnData::Text(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cardinality_counts_missing_once() {
        let col = Column::new(
            "x",
            ColumnData::Integer(vec![Some(1), Some(2), None, Some(2), None]),
        );
        assert_eq!(col.cardinality(), 3);
    }

    #[test]
    fn test_cardinality_float_negative_zero() {
        let col = Column::new("x", ColumnData::Float(vec![Some(0.0), Some(-0.0), Some(1.5)]));
        assert_eq!(col.cardinality(), 2);
    }

    #[test]
    fn test_role_dummy_limit() {
        let col = Column::new(
            "x",
            ColumnData::Integer((0..50).map(Some).collect()),
        );
        assert_eq!(col.role(100), ColumnRole::Categorical);
        assert_eq!(col.role(10), ColumnRole::Discrete);
    }

    #[test]
    fn test_role_text() {
        let cells: Vec<Option<String>> = (0..20).map(|i| Some(format!("doc {i}"))).collect();
        let col = Column::new("t", ColumnData::Text(cells));
        assert_eq!(col.role(5), ColumnRole::Text);
    }

    #[test]
    fn test_numeric_cells_boolean() {
        let col = Column::new("b", ColumnData::Boolean(vec![Some(true), None, Some(false)]));
        assert_eq!(
            col.numeric_cells(),
            Some(vec![Some(1.0), None, Some(0.0)])
        );
    }

    proptest! {
        #[test]
        fn prop_cardinality_never_exceeds_cell_count(
            cells in proptest::collection::vec(proptest::option::of(-20i64..20), 1..60)
        ) {
            let col = Column::new("x", ColumnData::Integer(cells.clone()));
            prop_assert!(col.cardinality() <= cells.len());
        }
    }
}

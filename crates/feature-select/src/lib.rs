//! Univariate feature selection
//!
//! Reduces a feature matrix to its most informative columns. Support
//! masks are always fit on the training partition alone and applied
//! identically to both partitions, so train and test stay aligned.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use columnar::Labels;
use tab_stats::{
    chi2_scores, f_classif, f_regression, top_percent_indices, variance_pop, NegativeValue,
};

/// Univariate scoring function for percentile selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFunc {
    /// One-way ANOVA F, for classification labels
    FClassif,
    /// Univariate regression F, for regression labels
    FRegression,
    /// chi-squared statistic, for non-negative features and class labels
    Chi2,
}

/// Selector options, deserialized alongside the pipeline configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Percent of columns kept by `select_percentile`
    pub fs_percentage: f64,
    /// Univariate scoring function
    pub fs_score_func: ScoreFunc,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            fs_percentage: 10.0,
            fs_score_func: ScoreFunc::FClassif,
        }
    }
}

/// Selection failures; all fatal
#[derive(Debug, Error)]
pub enum SelectError {
    /// Train and test matrices disagree on column count
    #[error("train matrix has {train} columns, test matrix has {test}")]
    ShapeMismatch { train: usize, test: usize },

    /// Labels do not cover the training matrix rows
    #[error("training matrix has {rows} rows, labels cover {labels}")]
    LabelMismatch { rows: usize, labels: usize },

    /// The requested percentile is outside (0, 100]
    #[error("percentile {0} is outside (0, 100]")]
    InvalidPercentile(f64),

    /// chi-squared scoring saw a negative feature value
    #[error(transparent)]
    NegativeFeature(#[from] NegativeValue),
}

fn take_columns(matrix: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
    let mut out = Array2::zeros((matrix.nrows(), indices.len()));
    for (j, &col) in indices.iter().enumerate() {
        out.column_mut(j).assign(&matrix.column(col));
    }
    out
}

fn check_shapes(
    train: &Array2<f64>,
    test: &Array2<f64>,
    labels: usize,
) -> Result<(), SelectError> {
    if train.ncols() != test.ncols() {
        return Err(SelectError::ShapeMismatch {
            train: train.ncols(),
            test: test.ncols(),
        });
    }
    if labels != train.nrows() {
        return Err(SelectError::LabelMismatch {
            rows: train.nrows(),
            labels,
        });
    }
    Ok(())
}

/// Keep the top `percentile` percent of columns by univariate score.
/// Scores are fit on the training matrix alone; the resulting support
/// mask is applied to both matrices.
pub fn select_percentile(
    train: &Array2<f64>,
    test: &Array2<f64>,
    labels: &Labels,
    score: ScoreFunc,
    percentile: f64,
) -> Result<(Array2<f64>, Array2<f64>), SelectError> {
    check_shapes(train, test, labels.values.len())?;
    if !(percentile > 0.0 && percentile <= 100.0) {
        return Err(SelectError::InvalidPercentile(percentile));
    }

    let scores = match score {
        ScoreFunc::FClassif => f_classif(train, &labels.values),
        ScoreFunc::FRegression => f_regression(train, &labels.values),
        ScoreFunc::Chi2 => chi2_scores(train, &labels.values)?,
    };
    let support = top_percent_indices(&scores, percentile);
    debug!(?score, percentile, kept = support.len(), "support mask fit");
    info!(
        before = train.ncols(),
        after = support.len(),
        "feature selection complete"
    );
    Ok((take_columns(train, &support), take_columns(test, &support)))
}

/// Configured form of [`select_percentile`]
pub fn select_features(
    train: &Array2<f64>,
    test: &Array2<f64>,
    labels: &Labels,
    config: &SelectorConfig,
) -> Result<(Array2<f64>, Array2<f64>), SelectError> {
    select_percentile(train, test, labels, config.fs_score_func, config.fs_percentage)
}

/// Drop columns whose training-partition population variance is at or
/// below the threshold, applying the identical mask to both matrices
pub fn variance_threshold(
    train: &Array2<f64>,
    test: &Array2<f64>,
    threshold: f64,
) -> Result<(Array2<f64>, Array2<f64>), SelectError> {
    if train.ncols() != test.ncols() {
        return Err(SelectError::ShapeMismatch {
            train: train.ncols(),
            test: test.ncols(),
        });
    }
    let support: Vec<usize> = (0..train.ncols())
        .filter(|&j| variance_pop(&train.column(j).to_vec()) > threshold)
        .collect();
    info!(
        before = train.ncols(),
        after = support.len(),
        threshold,
        "low-variance pruning complete"
    );
    Ok((take_columns(train, &support), take_columns(test, &support)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use proptest::prelude::*;

    fn classification_data() -> (Array2<f64>, Array2<f64>, Labels) {
        // column 1 separates the classes, columns 0 and 2 are noise
        let train = array![
            [5.0, 1.0, 3.0],
            [5.1, 1.1, 1.0],
            [4.9, 0.9, 4.0],
            [5.0, 9.0, 1.5],
            [5.2, 9.1, 3.5],
            [4.8, 8.9, 2.0]
        ];
        let test = array![[5.0, 1.2, 2.0], [5.1, 8.8, 3.0]];
        let labels = Labels::classification(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        (train, test, labels)
    }

    #[test]
    fn test_percentile_keeps_discriminative_column() {
        let (train, test, labels) = classification_data();
        let (rtrain, rtest) =
            select_percentile(&train, &test, &labels, ScoreFunc::FClassif, 34.0).unwrap();
        assert_eq!(rtrain.ncols(), 1);
        assert_eq!(rtest.ncols(), 1);
        // the surviving column is the separating one
        assert_eq!(rtrain[[0, 0]], 1.0);
        assert_eq!(rtest[[1, 0]], 8.8);
    }

    #[test]
    fn test_mask_is_identical_for_both_partitions() {
        let (train, test, labels) = classification_data();
        let (rtrain, rtest) =
            select_percentile(&train, &test, &labels, ScoreFunc::FClassif, 67.0).unwrap();
        assert_eq!(rtrain.ncols(), rtest.ncols());
        assert_eq!(rtrain.nrows(), 6);
        assert_eq!(rtest.nrows(), 2);
    }

    #[test]
    fn test_at_least_one_column_survives() {
        let (train, test, labels) = classification_data();
        let (rtrain, _) =
            select_percentile(&train, &test, &labels, ScoreFunc::FClassif, 0.001).unwrap();
        assert_eq!(rtrain.ncols(), 1);
    }

    #[test]
    fn test_chi2_negative_feature_is_fatal() {
        let train = array![[1.0, -1.0], [2.0, 3.0]];
        let test = array![[1.0, 1.0]];
        let labels = Labels::classification(vec![0.0, 1.0]);
        let err =
            select_percentile(&train, &test, &labels, ScoreFunc::Chi2, 50.0).unwrap_err();
        assert!(matches!(err, SelectError::NegativeFeature(_)));
    }

    #[test]
    fn test_shape_and_label_mismatches_rejected() {
        let train = array![[1.0, 2.0], [3.0, 4.0]];
        let narrow = array![[1.0]];
        let labels = Labels::regression(vec![1.0, 2.0]);
        assert!(matches!(
            select_percentile(&train, &narrow, &labels, ScoreFunc::FRegression, 50.0),
            Err(SelectError::ShapeMismatch { .. })
        ));
        let short = Labels::regression(vec![1.0]);
        let test = array![[1.0, 2.0]];
        assert!(matches!(
            select_percentile(&train, &test, &short, ScoreFunc::FRegression, 50.0),
            Err(SelectError::LabelMismatch { .. })
        ));
    }

    #[test]
    fn test_selector_config_spellings() {
        let config: SelectorConfig =
            serde_json::from_str(r#"{"fs_percentage": 25.0, "fs_score_func": "f_regression"}"#)
                .unwrap();
        assert_eq!(config.fs_score_func, ScoreFunc::FRegression);
        assert_eq!(config.fs_percentage, 25.0);
        let defaulted: SelectorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(defaulted.fs_score_func, ScoreFunc::FClassif);
    }

    #[test]
    fn test_select_features_uses_configured_options() {
        let (train, test, labels) = classification_data();
        let config = SelectorConfig {
            fs_percentage: 34.0,
            fs_score_func: ScoreFunc::FClassif,
        };
        let (rtrain, _) = select_features(&train, &test, &labels, &config).unwrap();
        assert_eq!(rtrain.ncols(), 1);
    }

    #[test]
    fn test_variance_threshold_drops_constant_columns() {
        let train = array![[1.0, 7.0, 2.0], [2.0, 7.0, 2.0], [3.0, 7.0, 2.0]];
        let test = array![[9.0, 7.0, 2.0]];
        let (rtrain, rtest) = variance_threshold(&train, &test, 0.0).unwrap();
        assert_eq!(rtrain.ncols(), 1);
        assert_eq!(rtest[[0, 0]], 9.0);
    }

    #[test]
    fn test_variance_threshold_keeps_test_only_variation_out() {
        // a column constant in train but varying in test is still dropped
        let train = array![[4.0, 1.0], [4.0, 2.0]];
        let test = array![[5.0, 3.0], [6.0, 4.0]];
        let (rtrain, rtest) = variance_threshold(&train, &test, 0.0).unwrap();
        assert_eq!(rtrain.ncols(), 1);
        assert_eq!(rtest.column(0).to_vec(), vec![3.0, 4.0]);
    }

    proptest! {
        #[test]
        fn prop_selection_never_widens(percentile in 0.5..100.0f64) {
            let (train, test, labels) = classification_data();
            let (rtrain, rtest) =
                select_percentile(&train, &test, &labels, ScoreFunc::FClassif, percentile)
                    .unwrap();
            prop_assert!(rtrain.ncols() >= 1);
            prop_assert!(rtrain.ncols() <= train.ncols());
            prop_assert_eq!(rtrain.ncols(), rtest.ncols());
        }
    }
}

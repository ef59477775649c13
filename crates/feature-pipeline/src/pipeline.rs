//! Feature pipeline orchestrator
//!
//! Iterates dataset columns in schema order, dispatches each to its
//! transform, concatenates the resulting blocks into the base matrix,
//! optionally scales it, then appends every enabled derived-feature
//! generator in fixed order.

use ndarray::Array2;
use tracing::{debug, info};

use columnar::{ColumnData, ColumnRole, Dataset, Labels, TrainTestSplit};

use crate::block::{BlockList, FeatureBlock};
use crate::config::{Config, ConfigError};
use crate::derived;
use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::encode::encode_column;
use crate::error::PipelineError;
use crate::numeric::transform_numeric;
use crate::text::transform_text;
use crate::treat::Treatment;

/// The whole feature-engineering pipeline for one configuration
pub struct FeaturePipeline {
    config: Config,
}

impl FeaturePipeline {
    /// Validate the configuration eagerly and build the pipeline
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The validated configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Produce the full feature matrix covering every dataset row.
    /// Training-partition statistics never leak into label-aware fits;
    /// the same split index is used by every stage.
    pub fn run(
        &self,
        dataset: &Dataset,
        split: TrainTestSplit,
        labels: &Labels,
        diag: &mut Diagnostics,
    ) -> Result<Array2<f64>, PipelineError> {
        let nrows = dataset.nrows();
        if split.point() > nrows {
            return Err(PipelineError::SplitOutOfRange {
                split: split.point(),
                nrows,
            });
        }
        if labels.values.len() != split.train_len() {
            return Err(PipelineError::LabelMismatch {
                expected: split.train_len(),
                actual: labels.values.len(),
            });
        }

        info!(
            columns = dataset.ncols(),
            rows = nrows,
            "creating base features"
        );
        let mut blocks = BlockList::new(nrows);

        if self.config.counts {
            blocks.push(FeatureBlock::new("counts", count_features(dataset)))?;
        }

        for (index, column) in dataset.columns().iter().enumerate() {
            // treatments are additive; the default transform still runs
            if let Some(spec) = self.config.treatments.get(&column.name) {
                let treatment = Treatment::resolve(&column.name, spec)?;
                let block = treatment.apply(column, diag)?;
                blocks.push(FeatureBlock::new(
                    format!("treatment {} on {}", spec.name, column.name),
                    block,
                ))?;
            }

            let role = column.role(self.config.dummy_limit);
            debug!(
                index,
                column = %column.name,
                cardinality = column.cardinality(),
                ?role,
                "dispatching column"
            );
            let block = match role {
                ColumnRole::Categorical => FeatureBlock::new(
                    column.name.clone(),
                    encode_column(column, &self.config, split, labels),
                ),
                ColumnRole::Continuous | ColumnRole::Discrete => FeatureBlock::from_column(
                    &column.name,
                    transform_numeric(column, role, &self.config, diag),
                ),
                ColumnRole::Text => FeatureBlock::new(
                    column.name.clone(),
                    transform_text(column, &self.config, diag),
                ),
            };
            blocks.push(block)?;
        }

        let mut base = blocks.concat();
        info!(ncols = base.ncols(), "base feature matrix assembled");

        if self.config.scaler_option {
            base = crate::scale::scale_matrix(&base, self.config.scaler_type);
        }

        // derived generators all consume the (possibly scaled) base
        // matrix, in fixed order
        let mut all = BlockList::new(nrows);
        all.push(FeatureBlock::new("base", base.clone()))?;

        let base_usable = base.ncols() > 0;
        let gated = [
            ("numpy", self.config.numpy),
            ("scipy", self.config.scipy),
            ("clustering", self.config.clustering),
            ("pca", self.config.pca),
            ("isomap", self.config.isomap),
            ("tsne", self.config.tsne),
            ("interactions", self.config.interactions),
            ("genetic", self.config.genetic),
        ];

        for (name, enabled) in gated {
            if !enabled {
                continue;
            }
            if !base_usable {
                diag.record(DiagnosticEvent::GeneratorSkipped {
                    generator: name,
                    reason: "base matrix has no columns".into(),
                });
                continue;
            }
            let block = match name {
                "numpy" => derived::aggregate_features(&base),
                "scipy" => derived::distribution_features(&base),
                "clustering" => derived::cluster_sweep(&base, &self.config, diag),
                "pca" => derived::pca_sweep(&base, &self.config, diag),
                "isomap" => derived::isomap_embedding(&base, &self.config, diag),
                "tsne" => derived::tsne_embedding(&base, &self.config, diag),
                "interactions" => derived::interaction_features(&base, split, labels, &self.config),
                _ => derived::genetic_features(&base, split, labels, &self.config, diag),
            };
            info!(generator = name, ncols = block.ncols(), "derived features");
            all.push(FeatureBlock::new(name, block))?;
        }

        let matrix = all.concat();
        info!(ncols = matrix.ncols(), "feature matrix complete");
        Ok(matrix)
    }
}

/// Count features: per row, the number of missing cells, then the
/// number of numeric cells equal to each integer 0 through 9
fn count_features(dataset: &Dataset) -> Array2<f64> {
    let nrows = dataset.nrows();
    let mut out = Array2::zeros((nrows, 11));
    for column in dataset.columns() {
        match &column.data {
            ColumnData::Text(values) => {
                for (i, cell) in values.iter().enumerate() {
                    if cell.is_none() {
                        out[[i, 0]] += 1.0;
                    }
                }
            }
            _ => {
                if let Some(cells) = column.numeric_cells() {
                    for (i, cell) in cells.iter().enumerate() {
                        match cell {
                            None => out[[i, 0]] += 1.0,
                            Some(v) => {
                                for digit in 0..10 {
                                    if *v == digit as f64 {
                                        out[[i, 1 + digit]] += 1.0;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::split_matrix;
    use crate::config::{EncoderSpec, ScalerSpec, TreatmentSpec};
    use columnar::Column;
    use proptest::prelude::*;

    fn float_col(name: &str, values: Vec<f64>) -> Column {
        Column::new(name, ColumnData::Float(values.into_iter().map(Some).collect()))
    }

    fn dataset_one_categorical() -> Dataset {
        let cells: Vec<Option<String>> = (0..9)
            .map(|i| Some(["low", "mid", "high"][i % 3].to_string()))
            .collect();
        Dataset::new(vec![Column::new("level", ColumnData::Text(cells))]).unwrap()
    }

    #[test]
    fn test_factorize_end_to_end() {
        let dataset = dataset_one_categorical();
        let config = Config {
            dummy_limit: 10,
            encoder: EncoderSpec::Factorize,
            ..Config::default()
        };
        let pipeline = FeaturePipeline::new(config).unwrap();
        let labels = Labels::regression(vec![0.0; 9]);
        let mut diag = Diagnostics::new();
        let matrix = pipeline
            .run(&dataset, TrainTestSplit::at(9), &labels, &mut diag)
            .unwrap();
        assert_eq!(matrix.dim(), (9, 1));
        for v in matrix.column(0) {
            assert!([0.0, 1.0, 2.0].contains(v));
        }
    }

    #[test]
    fn test_log_transform_end_to_end() {
        // 1000 positive, heavily skewed values, high cardinality
        let raw: Vec<f64> = (1..=1000).map(|i| -(1.0 - i as f64 / 1001.0).ln()).collect();
        let dataset = Dataset::new(vec![float_col("amount", raw.clone())]).unwrap();
        let config = Config {
            dummy_limit: 10,
            logtransform: true,
            pvalue_level: 0.05,
            ..Config::default()
        };
        let pipeline = FeaturePipeline::new(config).unwrap();
        let labels = Labels::regression(vec![0.0; 1000]);
        let mut diag = Diagnostics::new();
        let matrix = pipeline
            .run(&dataset, TrainTestSplit::at(1000), &labels, &mut diag)
            .unwrap();
        for (i, &raw_v) in raw.iter().enumerate() {
            assert!((matrix[[i, 0]] - raw_v.ln()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_treatment_is_additive() {
        let mut config = Config {
            dummy_limit: 1,
            ..Config::default()
        };
        config.treatments.insert(
            "flips".into(),
            TreatmentSpec {
                name: "runs_test".into(),
                args: vec!["2".into(), "runs".into()],
            },
        );
        let values: Vec<f64> = (0..12).map(|i| (i % 2) as f64).collect();
        let dataset = Dataset::new(vec![Column::new(
            "flips",
            ColumnData::Float(values.into_iter().map(Some).collect()),
        )])
        .unwrap();
        let pipeline = FeaturePipeline::new(config).unwrap();
        let labels = Labels::regression(vec![0.0; 12]);
        let mut diag = Diagnostics::new();
        let matrix = pipeline
            .run(&dataset, TrainTestSplit::at(12), &labels, &mut diag)
            .unwrap();
        // one treatment column plus the default numeric column
        assert_eq!(matrix.ncols(), 2);
    }

    #[test]
    fn test_count_features_prepended() {
        let dataset = Dataset::new(vec![
            Column::new(
                "a",
                ColumnData::Integer(vec![Some(3), None, Some(0)]),
            ),
            Column::new(
                "b",
                ColumnData::Float(vec![Some(3.0), Some(1.5), None]),
            ),
        ])
        .unwrap();
        let config = Config {
            counts: true,
            dummy_limit: 0,
            ..Config::default()
        };
        let pipeline = FeaturePipeline::new(config).unwrap();
        let labels = Labels::regression(vec![0.0; 3]);
        let mut diag = Diagnostics::new();
        let matrix = pipeline
            .run(&dataset, TrainTestSplit::at(3), &labels, &mut diag)
            .unwrap();
        // 11 count columns + 2 numeric columns
        assert_eq!(matrix.ncols(), 13);
        // row 0 has no missing cells and two cells equal to 3
        assert_eq!(matrix[[0, 0]], 0.0);
        assert_eq!(matrix[[0, 4]], 2.0);
        // rows 1 and 2 each miss one cell
        assert_eq!(matrix[[1, 0]], 1.0);
        assert_eq!(matrix[[2, 0]], 1.0);
    }

    #[test]
    fn test_scaling_and_generators_extend_columns() {
        let dataset = Dataset::new(vec![
            float_col("x", (0..40).map(|i| i as f64).collect()),
            float_col("y", (0..40).map(|i| (i * i) as f64).collect()),
            float_col("z", (0..40).map(|i| (40 - i) as f64).collect()),
        ])
        .unwrap();
        let config = Config {
            dummy_limit: 5,
            scaler_option: true,
            scaler_type: ScalerSpec::Standard,
            numpy: true,
            scipy: true,
            clustering: true,
            cluster_min: 2,
            cluster_max: 4,
            cluster_inc: 2,
            pca: true,
            pca_min: 1,
            pca_max: 2,
            pca_inc: 1,
            ..Config::default()
        };
        let pipeline = FeaturePipeline::new(config).unwrap();
        let labels = Labels::regression((0..30).map(|i| i as f64).collect());
        let mut diag = Diagnostics::new();
        let matrix = pipeline
            .run(&dataset, TrainTestSplit::at(30), &labels, &mut diag)
            .unwrap();
        assert_eq!(matrix.nrows(), 40);
        // base 3 + aggregates 4 + distribution 9 + clustering 2 + pca 3
        assert_eq!(matrix.ncols(), 21);
        let (train, test) = split_matrix(&matrix, TrainTestSplit::at(30));
        assert_eq!(train.nrows(), 30);
        assert_eq!(test.nrows(), 10);
        assert_eq!(train.ncols(), test.ncols());
    }

    #[test]
    fn test_label_mismatch_is_fatal() {
        let dataset = dataset_one_categorical();
        let pipeline = FeaturePipeline::new(Config::default()).unwrap();
        let labels = Labels::classification(vec![1.0; 4]);
        let mut diag = Diagnostics::new();
        let err = pipeline
            .run(&dataset, TrainTestSplit::at(6), &labels, &mut diag)
            .unwrap_err();
        assert!(matches!(err, PipelineError::LabelMismatch { .. }));
    }

    #[test]
    fn test_column_order_is_deterministic() {
        let dataset = Dataset::new(vec![
            float_col("x", (0..20).map(|i| i as f64 + 0.5).collect()),
            float_col("y", (0..20).map(|i| (i * 3) as f64 + 0.25).collect()),
        ])
        .unwrap();
        let config = Config {
            dummy_limit: 5,
            ..Config::default()
        };
        let pipeline = FeaturePipeline::new(config).unwrap();
        let labels = Labels::regression(vec![0.0; 20]);
        let mut diag = Diagnostics::new();
        let a = pipeline
            .run(&dataset, TrainTestSplit::at(20), &labels, &mut diag)
            .unwrap();
        let b = pipeline
            .run(&dataset, TrainTestSplit::at(20), &labels, &mut diag)
            .unwrap();
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_row_count_preserved(values in proptest::collection::vec(-100.0..100.0f64, 1..60)) {
            let n = values.len();
            let dataset = Dataset::new(vec![float_col("v", values)]).unwrap();
            let pipeline = FeaturePipeline::new(Config::default()).unwrap();
            let labels = Labels::regression(vec![0.0; n]);
            let mut diag = Diagnostics::new();
            let matrix = pipeline
                .run(&dataset, TrainTestSplit::at(n), &labels, &mut diag)
                .unwrap();
            prop_assert_eq!(matrix.nrows(), n);
        }
    }
}

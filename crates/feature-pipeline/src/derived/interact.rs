//! Polynomial interaction terms over the most significant base columns

use ndarray::{s, Array2};
use tracing::debug;

use columnar::{Labels, TaskKind, TrainTestSplit};
use tab_stats::{f_classif, f_regression, top_percent_indices};

use crate::config::Config;

/// All index combinations of the given size, in lexicographic order
fn combinations(n: usize, size: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    let mut current = Vec::with_capacity(size);
    fn recurse(start: usize, n: usize, size: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == size {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            recurse(i + 1, n, size, current, out);
            current.pop();
        }
    }
    recurse(0, n, size, &mut current, &mut out);
    out
}

/// Interaction-only polynomial terms: degree-1 terms plus products of
/// distinct selected columns up to the configured degree, no bias
fn interaction_terms(sub: &Array2<f64>, degree: usize) -> Array2<f64> {
    let n = sub.nrows();
    let d = sub.ncols();
    let mut columns: Vec<Vec<f64>> = Vec::new();
    for size in 1..=degree.min(d) {
        for combo in combinations(d, size) {
            let mut col = vec![1.0; n];
            for &j in &combo {
                for (i, v) in col.iter_mut().enumerate() {
                    *v *= sub[[i, j]];
                }
            }
            columns.push(col);
        }
    }
    let mut out = Array2::zeros((n, columns.len()));
    for (j, col) in columns.iter().enumerate() {
        for (i, &v) in col.iter().enumerate() {
            out[[i, j]] = v;
        }
    }
    out
}

/// Select the top percentile of base columns by univariate F
/// significance on the training partition, expand them into
/// interaction-only polynomial terms, and standardize
pub(crate) fn interaction_features(
    base: &Array2<f64>,
    split: TrainTestSplit,
    labels: &Labels,
    config: &Config,
) -> Array2<f64> {
    let n = base.nrows();
    if base.ncols() == 0 {
        return Array2::zeros((n, 0));
    }
    let train = base.slice(s![..split.point().min(n), ..]).to_owned();
    let scores = match labels.task {
        TaskKind::Classification => f_classif(&train, &labels.values),
        TaskKind::Regression => f_regression(&train, &labels.values),
    };
    let selected = top_percent_indices(&scores, config.isample_pct);
    debug!(
        selected = selected.len(),
        degree = config.poly_degree,
        "generating interaction terms"
    );

    let mut sub = Array2::zeros((n, selected.len()));
    for (j, &col) in selected.iter().enumerate() {
        sub.column_mut(j).assign(&base.column(col));
    }
    let terms = interaction_terms(&sub, config.poly_degree);
    crate::scale::standardize(&terms)
}

//! Univariate scores against training labels

use ndarray::Array2;
use thiserror::Error;

use crate::moments::mean;

/// chi-squared scoring rejects negative feature values
#[derive(Debug, Clone, Error)]
#[error("chi2 requires non-negative features: column {column} row {row} is {value}")]
pub struct NegativeValue {
    pub column: usize,
    pub row: usize,
    pub value: f64,
}

/// One-way ANOVA F statistic per column for classification labels.
/// Columns with zero within-group variance score infinity when the
/// between-group variance is positive, otherwise zero.
pub fn f_classif(x: &Array2<f64>, y: &[f64]) -> Vec<f64> {
    let n = x.nrows();
    let mut classes: Vec<f64> = Vec::new();
    for &label in y {
        if !classes.contains(&label) {
            classes.push(label);
        }
    }
    let k = classes.len();
    let mut scores = Vec::with_capacity(x.ncols());
    for col in x.columns() {
        if k < 2 || n <= k {
            scores.push(f64::NAN);
            continue;
        }
        let values = col.to_vec();
        let grand = mean(&values);
        let mut ssb = 0.0;
        let mut ssw = 0.0;
        for class in &classes {
            let group: Vec<f64> = col
                .iter()
                .zip(y)
                .filter(|(_, &label)| label == *class)
                .map(|(&v, _)| v)
                .collect();
            let gm = mean(&group);
            ssb += group.len() as f64 * (gm - grand) * (gm - grand);
            ssw += group.iter().map(|&v| (v - gm) * (v - gm)).sum::<f64>();
        }
        let msb = ssb / (k - 1) as f64;
        let msw = ssw / (n - k) as f64;
        let f = if msw > 0.0 {
            msb / msw
        } else if msb > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
        scores.push(f);
    }
    scores
}

/// Univariate regression F statistic per column: F = r^2/(1-r^2)*(n-2)
/// from the Pearson correlation with the labels
pub fn f_regression(x: &Array2<f64>, y: &[f64]) -> Vec<f64> {
    let n = x.nrows() as f64;
    let ym = mean(y);
    let y_dev: Vec<f64> = y.iter().map(|&v| v - ym).collect();
    let y_ss = y_dev.iter().map(|&d| d * d).sum::<f64>();
    let mut scores = Vec::with_capacity(x.ncols());
    for col in x.columns() {
        if n < 3.0 {
            scores.push(f64::NAN);
            continue;
        }
        let cm = col.mean().unwrap_or(f64::NAN);
        let mut cov = 0.0;
        let mut c_ss = 0.0;
        for (i, &v) in col.iter().enumerate() {
            let d = v - cm;
            cov += d * y_dev[i];
            c_ss += d * d;
        }
        if c_ss <= 0.0 || y_ss <= 0.0 {
            scores.push(0.0);
            continue;
        }
        let r2 = (cov * cov) / (c_ss * y_ss);
        let f = if r2 >= 1.0 {
            f64::INFINITY
        } else {
            r2 / (1.0 - r2) * (n - 2.0)
        };
        scores.push(f);
    }
    scores
}

/// Indices of the top `pct` percent of scores (at least one); NaN
/// scores rank last, ties keep the lower index. The result is sorted so
/// downstream column order stays positional.
pub fn top_percent_indices(scores: &[f64], pct: f64) -> Vec<usize> {
    if scores.is_empty() {
        return Vec::new();
    }
    let keep = ((pct / 100.0) * scores.len() as f64).ceil() as usize;
    let keep = keep.clamp(1, scores.len());
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| match (scores[a].is_nan(), scores[b].is_nan()) {
        (true, true) => a.cmp(&b),
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b)),
    });
    let mut selected = order[..keep].to_vec();
    selected.sort_unstable();
    selected
}

/// chi-squared statistic per column between non-negative features and
/// class labels, from the class-wise column sums
pub fn chi2_scores(x: &Array2<f64>, y: &[f64]) -> Result<Vec<f64>, NegativeValue> {
    for ((row, column), &value) in x.indexed_iter() {
        if value < 0.0 {
            return Err(NegativeValue { column, row, value });
        }
    }
    let n = x.nrows() as f64;
    let mut classes: Vec<f64> = Vec::new();
    for &label in y {
        if !classes.contains(&label) {
            classes.push(label);
        }
    }
    let mut scores = Vec::with_capacity(x.ncols());
    for col in x.columns() {
        let total: f64 = col.sum();
        let mut stat = 0.0;
        for class in &classes {
            let count = y.iter().filter(|&&label| label == *class).count() as f64;
            let observed: f64 = col
                .iter()
                .zip(y)
                .filter(|(_, &label)| label == *class)
                .map(|(&v, _)| v)
                .sum();
            let expected = total * count / n;
            if expected > 0.0 {
                stat += (observed - expected) * (observed - expected) / expected;
            }
        }
        scores.push(stat);
    }
    Ok(scores)
}

//! Derived-feature generators over the (possibly scaled) base matrix
//!
//! Each generator is independently gated by configuration. Generators
//! whose row statistics can be undefined impute with the continuous
//! policy and standardize before appending.

mod cluster;
mod genetic;
mod interact;
mod project;

pub(crate) use cluster::cluster_sweep;
pub(crate) use genetic::genetic_features;
pub(crate) use interact::interaction_features;
pub(crate) use project::{isomap_embedding, pca_sweep, tsne_embedding};

use ndarray::Array2;

use tab_stats::{
    coefficient_of_variation, geometric_mean, kurtosis, kurtosis_test, mean, median, normal_test,
    signal_to_noise, skew_test, skewness, std_error_of_mean, std_pop, variance_pop,
};

/// Replace non-finite cells with their column's median of finite values,
/// then standardize every column
pub(crate) fn clean_standardize(block: Array2<f64>) -> Array2<f64> {
    let mut out = block;
    for mut col in out.columns_mut() {
        let finite: Vec<f64> = col.iter().copied().filter(|v| v.is_finite()).collect();
        let fill = if finite.is_empty() { 0.0 } else { median(&finite) };
        col.mapv_inplace(|v| if v.is_finite() { v } else { fill });
    }
    crate::scale::standardize(&out)
}

/// Row-wise sum, mean, population standard deviation, and variance
pub(crate) fn aggregate_features(base: &Array2<f64>) -> Array2<f64> {
    let n = base.nrows();
    let mut out = Array2::zeros((n, 4));
    for (i, row) in base.rows().into_iter().enumerate() {
        let values = row.to_vec();
        out[[i, 0]] = values.iter().sum::<f64>();
        out[[i, 1]] = mean(&values);
        out[[i, 2]] = std_pop(&values);
        out[[i, 3]] = variance_pop(&values);
    }
    clean_standardize(out)
}

/// Row-wise distributional statistics: geometric mean, excess kurtosis,
/// kurtosis-test Z, normality K^2, skew, skew-test Z, coefficient of
/// variation, signal-to-noise ratio, and standard error of the mean.
/// Statistics undefined at the row's width come out NaN and are cleaned
/// by the imputation pass.
pub(crate) fn distribution_features(base: &Array2<f64>) -> Array2<f64> {
    let n = base.nrows();
    let mut out = Array2::zeros((n, 9));
    for (i, row) in base.rows().into_iter().enumerate() {
        let values = row.to_vec();
        out[[i, 0]] = geometric_mean(&values);
        out[[i, 1]] = kurtosis(&values);
        out[[i, 2]] = kurtosis_test(&values);
        out[[i, 3]] = normal_test(&values).0;
        out[[i, 4]] = skewness(&values);
        out[[i, 5]] = skew_test(&values);
        out[[i, 6]] = coefficient_of_variation(&values);
        out[[i, 7]] = signal_to_noise(&values);
        out[[i, 8]] = std_error_of_mean(&values);
    }
    clean_standardize(out)
}

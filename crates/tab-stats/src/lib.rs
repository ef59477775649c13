//! Tabular Statistics
//!
//! Descriptive statistics, D'Agostino normality machinery, and the
//! univariate scores used for feature selection.

mod moments;
mod normality;
mod scores;

pub use moments::{
    coefficient_of_variation, geometric_mean, kurtosis, mean, median, most_frequent,
    sample_std, signal_to_noise, skewness, std_error_of_mean, std_pop, variance_pop,
};
pub use normality::{chi2_sf, kurtosis_test, normal_test, skew_test};
pub use scores::{chi2_scores, f_classif, f_regression, top_percent_indices, NegativeValue};

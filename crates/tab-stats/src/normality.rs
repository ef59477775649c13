//! D'Agostino-Pearson normality machinery

use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::moments::{kurtosis, skewness};

/// Survival function of the chi-squared distribution
pub fn chi2_sf(x: f64, df: f64) -> f64 {
    if !x.is_finite() {
        return f64::NAN;
    }
    ChiSquared::new(df).map(|d| d.sf(x)).unwrap_or(f64::NAN)
}

/// D'Agostino skewness test statistic Z; NaN when n < 8 or the sample
/// variance is degenerate
pub fn skew_test(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 8 {
        return f64::NAN;
    }
    let g1 = skewness(values);
    if !g1.is_finite() {
        return f64::NAN;
    }
    let nf = n as f64;
    let mut y = g1 * (((nf + 1.0) * (nf + 3.0)) / (6.0 * (nf - 2.0))).sqrt();
    let beta2 = 3.0 * (nf * nf + 27.0 * nf - 70.0) * (nf + 1.0) * (nf + 3.0)
        / ((nf - 2.0) * (nf + 5.0) * (nf + 7.0) * (nf + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    let delta = 1.0 / (0.5 * w2.ln()).sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    if y == 0.0 {
        y = 1.0;
    }
    delta * (y / alpha + ((y / alpha) * (y / alpha) + 1.0).sqrt()).ln()
}

/// Anscombe-Glynn kurtosis test statistic Z; NaN when n < 5 or the
/// sample variance is degenerate
pub fn kurtosis_test(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 5 {
        return f64::NAN;
    }
    let g2 = kurtosis(values);
    if !g2.is_finite() {
        return f64::NAN;
    }
    let nf = n as f64;
    let b2 = g2 + 3.0;
    let e = 3.0 * (nf - 1.0) / (nf + 1.0);
    let var_b2 = 24.0 * nf * (nf - 2.0) * (nf - 3.0)
        / ((nf + 1.0) * (nf + 1.0) * (nf + 3.0) * (nf + 5.0));
    let x = (b2 - e) / var_b2.sqrt();
    let sqrt_beta1 = 6.0 * (nf * nf - 5.0 * nf + 2.0) / ((nf + 7.0) * (nf + 9.0))
        * ((6.0 * (nf + 3.0) * (nf + 5.0)) / (nf * (nf - 2.0) * (nf - 3.0))).sqrt();
    let a = 6.0
        + 8.0 / sqrt_beta1
            * (2.0 / sqrt_beta1 + (1.0 + 4.0 / (sqrt_beta1 * sqrt_beta1)).sqrt());
    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + x * (2.0 / (a - 4.0)).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    let term2 = denom.signum() * ((1.0 - 2.0 / a) / denom.abs()).cbrt();
    (term1 - term2) / (2.0 / (9.0 * a)).sqrt()
}

/// D'Agostino-Pearson omnibus test: K^2 statistic and its p-value
/// against a chi-squared distribution with two degrees of freedom.
/// Both are NaN when either component test is undefined.
pub fn normal_test(values: &[f64]) -> (f64, f64) {
    let zs = skew_test(values);
    let zk = kurtosis_test(values);
    let k2 = zs * zs + zk * zk;
    (k2, chi2_sf(k2, 2.0))
}

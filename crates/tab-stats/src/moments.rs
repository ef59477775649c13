//! Descriptive statistics over slices of f64

/// Arithmetic mean; NaN for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (ddof = 0); NaN for an empty slice
pub fn variance_pop(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation (ddof = 0)
pub fn std_pop(values: &[f64]) -> f64 {
    variance_pop(values).sqrt()
}

/// Sample standard deviation (ddof = 1); NaN when fewer than two values
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    (values.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / (n - 1) as f64).sqrt()
}

/// Geometric mean; NaN when any value is non-positive
pub fn geometric_mean(values: &[f64]) -> f64 {
    if values.is_empty() || values.iter().any(|&v| v <= 0.0) {
        return f64::NAN;
    }
    (values.iter().map(|&v| v.ln()).sum::<f64>() / values.len() as f64).exp()
}

/// Biased skewness g1 = m3 / m2^(3/2); NaN when variance is zero
pub fn skewness(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let m2 = values.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / n;
    let m3 = values.iter().map(|&v| (v - m).powi(3)).sum::<f64>() / n;
    if m2 <= 0.0 {
        return f64::NAN;
    }
    m3 / m2.powf(1.5)
}

/// Biased excess kurtosis g2 = m4 / m2^2 - 3; NaN when variance is zero
pub fn kurtosis(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let m2 = values.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / n;
    let m4 = values.iter().map(|&v| (v - m).powi(4)).sum::<f64>() / n;
    if m2 <= 0.0 {
        return f64::NAN;
    }
    m4 / (m2 * m2) - 3.0
}

/// Coefficient of variation: population std over mean
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    std_pop(values) / mean(values)
}

/// Mean over population std
pub fn signal_to_noise(values: &[f64]) -> f64 {
    let s = std_pop(values);
    if s == 0.0 {
        return f64::NAN;
    }
    mean(values) / s
}

/// Standard error of the mean (sample std / sqrt(n))
pub fn std_error_of_mean(values: &[f64]) -> f64 {
    sample_std(values) / (values.len() as f64).sqrt()
}

/// Median of the values; NaN for an empty slice. Even counts average the
/// two middle order statistics.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Most frequent value, ties broken by the smallest value; NaN for an
/// empty slice
pub fn most_frequent(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut best = sorted[0];
    let mut best_count = 0usize;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        if j - i > best_count {
            best_count = j - i;
            best = sorted[i];
        }
        i = j;
    }
    best
}

//! Column-wise matrix scaling

use ndarray::Array2;

use crate::config::ScalerSpec;

/// Rescale every column with the chosen scaler
pub(crate) fn scale_matrix(matrix: &Array2<f64>, spec: ScalerSpec) -> Array2<f64> {
    match spec {
        ScalerSpec::Standard => standardize(matrix),
        ScalerSpec::Minmax => minmax(matrix),
    }
}

/// Zero mean, unit variance per column; constant columns stay centered
pub(crate) fn standardize(matrix: &Array2<f64>) -> Array2<f64> {
    let mut out = matrix.clone();
    for mut col in out.columns_mut() {
        let n = col.len() as f64;
        if n == 0.0 {
            continue;
        }
        let mean = col.sum() / n;
        let var = col.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let std = var.sqrt();
        let denom = if std > 0.0 { std } else { 1.0 };
        col.mapv_inplace(|v| (v - mean) / denom);
    }
    out
}

/// Rescale each column to [0, 1]; constant columns become zero
fn minmax(matrix: &Array2<f64>) -> Array2<f64> {
    let mut out = matrix.clone();
    for mut col in out.columns_mut() {
        let min = col.iter().copied().fold(f64::INFINITY, f64::min);
        let max = col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        if range > 0.0 {
            col.mapv_inplace(|v| (v - min) / range);
        } else {
            col.mapv_inplace(|_| 0.0);
        }
    }
    out
}

//! Encoding strategy set for categorical columns
//!
//! Float columns are first quantized to integer factors by a lossy
//! digit-extraction step, then exactly one of eight encodings runs. For
//! classification tasks the per-category training target rate is
//! appended as one extra column.

use std::collections::HashMap;

use ndarray::Array2;
use tracing::debug;

use columnar::{Column, ColumnData, Labels, TaskKind, TrainTestSplit};

use crate::config::{Config, EncoderSpec};
use crate::text::NULLTEXT;

/// Quantize a float to an integer factor: format to `rounding` decimals,
/// strip everything but digits, parse the digit string (empty parses to
/// zero). Sign and decimal point vanish by design; near-equal floats
/// sharing a digit pattern collapse into one category. The digit string
/// is capped at 18 characters so the parse cannot overflow; huge floats
/// stay distinguishable by their leading digits.
pub fn float_factor(x: f64, rounding: usize) -> i64 {
    let formatted = format!("{x:.rounding$}");
    let digits: String = formatted
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(18)
        .collect();
    if digits.is_empty() {
        0
    } else {
        digits.parse().unwrap_or(0)
    }
}

/// Category key per row; missing cells become their own category
pub(crate) fn category_keys(column: &Column, rounding: usize) -> Vec<String> {
    match &column.data {
        ColumnData::Float(v) => v
            .iter()
            .map(|c| match c {
                Some(x) => float_factor(*x, rounding).to_string(),
                None => NULLTEXT.to_string(),
            })
            .collect(),
        ColumnData::Integer(v) => v
            .iter()
            .map(|c| match c {
                Some(x) => x.to_string(),
                None => NULLTEXT.to_string(),
            })
            .collect(),
        ColumnData::Boolean(v) => v
            .iter()
            .map(|c| match c {
                Some(true) => "1".to_string(),
                Some(false) => "0".to_string(),
                None => NULLTEXT.to_string(),
            })
            .collect(),
        ColumnData::Text(v) => v
            .iter()
            .map(|c| c.clone().unwrap_or_else(|| NULLTEXT.to_string()))
            .collect(),
    }
}

/// Zero-based integer code per distinct key, first-seen order
pub(crate) fn first_seen_codes(keys: &[String]) -> (Vec<usize>, usize) {
    let mut table: HashMap<&str, usize> = HashMap::new();
    let mut codes = Vec::with_capacity(keys.len());
    for key in keys {
        let next = table.len();
        let code = *table.entry(key.as_str()).or_insert(next);
        codes.push(code);
    }
    (codes, table.len())
}

/// Factorize keys into f64 codes
pub(crate) fn factorize(keys: &[String]) -> Vec<f64> {
    first_seen_codes(keys).0.into_iter().map(|c| c as f64).collect()
}

/// Distinct keys sorted for indicator columns. Numeric keys come first
/// and compare as numbers so category order does not depend on digit
/// count; non-numeric keys follow lexicographically. The two groups
/// never interleave, keeping the order total.
fn sorted_categories(keys: &[String]) -> Vec<String> {
    let mut distinct: Vec<String> = Vec::new();
    for key in keys {
        if !distinct.contains(key) {
            distinct.push(key.clone());
        }
    }
    distinct.sort_by(|a, b| match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });
    distinct
}

/// Helmert contrast matrix: k rows, k-1 contrast columns
fn helmert_matrix(k: usize) -> Array2<f64> {
    let mut m = Array2::zeros((k, k.saturating_sub(1)));
    for j in 0..k.saturating_sub(1) {
        for i in 0..k {
            m[[i, j]] = if i <= j {
                -1.0
            } else if i == j + 1 {
                (j + 1) as f64
            } else {
                0.0
            };
        }
    }
    m
}

/// Sum (deviation) contrast matrix: k rows, k-1 contrast columns
fn sum_matrix(k: usize) -> Array2<f64> {
    let mut m = Array2::zeros((k, k.saturating_sub(1)));
    for j in 0..k.saturating_sub(1) {
        m[[j, j]] = 1.0;
        m[[k - 1, j]] = -1.0;
    }
    m
}

/// Backward difference contrast matrix: k rows, k-1 contrast columns
fn backdiff_matrix(k: usize) -> Array2<f64> {
    let mut m = Array2::zeros((k, k.saturating_sub(1)));
    for j in 0..k.saturating_sub(1) {
        for i in 0..k {
            m[[i, j]] = if i <= j {
                -((k - 1 - j) as f64) / k as f64
            } else {
                (j + 1) as f64 / k as f64
            };
        }
    }
    m
}

/// Orthonormal polynomial contrast matrix via Gram-Schmidt over the
/// integer points 0..k: k rows, k-1 columns of degrees 1..k
fn polynomial_matrix(k: usize) -> Array2<f64> {
    let mut basis: Vec<Vec<f64>> = Vec::with_capacity(k);
    for degree in 0..k {
        let mut v: Vec<f64> = (0..k).map(|i| (i as f64).powi(degree as i32)).collect();
        for prev in &basis {
            let dot: f64 = v.iter().zip(prev).map(|(a, b)| a * b).sum();
            for (x, p) in v.iter_mut().zip(prev) {
                *x -= dot * p;
            }
        }
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 1e-12 {
            for x in &mut v {
                *x /= norm;
            }
        }
        basis.push(v);
    }
    let mut m = Array2::zeros((k, k.saturating_sub(1)));
    for j in 1..k {
        for i in 0..k {
            m[[i, j - 1]] = basis[j][i];
        }
    }
    m
}

/// Map category codes through a contrast matrix, with an intercept
/// column of ones first
fn contrast_encode(codes: &[usize], contrasts: &Array2<f64>) -> Array2<f64> {
    let n = codes.len();
    let width = contrasts.ncols() + 1;
    let mut out = Array2::zeros((n, width));
    for (row, &code) in codes.iter().enumerate() {
        out[[row, 0]] = 1.0;
        for j in 0..contrasts.ncols() {
            out[[row, j + 1]] = contrasts[[code, j]];
        }
    }
    out
}

/// Per-category empirical rate of the target label among training rows,
/// broadcast across the entire column; categories unseen in training
/// receive the sentinel
fn target_rates(
    keys: &[String],
    split: TrainTestSplit,
    labels: &Labels,
    target_value: f64,
    sentinel: f64,
) -> Vec<f64> {
    let train_len = split.train_len().min(keys.len());
    let mut hits: HashMap<&str, (usize, usize)> = HashMap::new();
    for (key, &label) in keys[..train_len].iter().zip(&labels.values) {
        let entry = hits.entry(key.as_str()).or_insert((0, 0));
        entry.1 += 1;
        if label == target_value {
            entry.0 += 1;
        }
    }
    keys.iter()
        .map(|key| match hits.get(key.as_str()) {
            Some(&(positive, total)) if total > 0 => positive as f64 / total as f64,
            _ => sentinel,
        })
        .collect()
}

/// Encode one categorical column into a feature block
pub(crate) fn encode_column(
    column: &Column,
    config: &Config,
    split: TrainTestSplit,
    labels: &Labels,
) -> Array2<f64> {
    let keys = category_keys(column, config.rounding);
    let n = keys.len();
    let (codes, k) = first_seen_codes(&keys);
    debug!(
        column = %column.name,
        cardinality = k,
        encoder = ?config.encoder,
        "encoding categorical column"
    );

    let encoded = match config.encoder {
        EncoderSpec::Factorize => {
            let mut out = Array2::zeros((n, 1));
            for (row, &code) in codes.iter().enumerate() {
                out[[row, 0]] = code as f64;
            }
            out
        }
        EncoderSpec::Onehot => {
            let categories = sorted_categories(&keys);
            let mut out = Array2::zeros((n, categories.len()));
            for (row, key) in keys.iter().enumerate() {
                if let Some(j) = categories.iter().position(|c| c == key) {
                    out[[row, j]] = 1.0;
                }
            }
            out
        }
        EncoderSpec::Ordinal => {
            let mut out = Array2::zeros((n, 1));
            for (row, &code) in codes.iter().enumerate() {
                out[[row, 0]] = (code + 1) as f64;
            }
            out
        }
        EncoderSpec::Binary => {
            // 1-based ordinal codes written MSB-first in minimal width
            let bits = (usize::BITS - k.leading_zeros()) as usize;
            let mut out = Array2::zeros((n, bits.max(1)));
            for (row, &code) in codes.iter().enumerate() {
                let value = code + 1;
                for bit in 0..bits {
                    out[[row, bit]] = ((value >> (bits - 1 - bit)) & 1) as f64;
                }
            }
            out
        }
        EncoderSpec::Helmert => contrast_encode(&codes, &helmert_matrix(k)),
        EncoderSpec::Sumcont => contrast_encode(&codes, &sum_matrix(k)),
        EncoderSpec::Polynomial => contrast_encode(&codes, &polynomial_matrix(k)),
        EncoderSpec::Backdiff => contrast_encode(&codes, &backdiff_matrix(k)),
    };

    if labels.task != TaskKind::Classification {
        return encoded;
    }

    // classification only: append the per-category training target rate
    let rates = target_rates(&keys, split, labels, config.target_value, config.sentinel);
    let mut out = Array2::zeros((n, encoded.ncols() + 1));
    for row in 0..n {
        for j in 0..encoded.ncols() {
            out[[row, j]] = encoded[[row, j]];
        }
        out[[row, encoded.ncols()]] = rates[row];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use columnar::ColumnData;
    use proptest::prelude::*;

    fn text_column(values: &[&str]) -> Column {
        Column::new(
            "cat",
            ColumnData::Text(values.iter().map(|s| Some(s.to_string())).collect()),
        )
    }

    fn regression_labels(n: usize) -> Labels {
        Labels::regression(vec![0.0; n])
    }

    #[test]
    fn test_float_factor_digit_extraction() {
        assert_eq!(float_factor(3.14159, 2), 314);
        assert_eq!(float_factor(-3.14159, 2), 314);
        assert_eq!(float_factor(0.0, 0), 0);
        // same rounded digit pattern collapses
        assert_eq!(float_factor(1.2344, 3), float_factor(1.23441, 3));
    }

    #[test]
    fn test_float_factor_huge_magnitudes_stay_distinct() {
        // digit strings longer than 18 characters truncate instead of
        // collapsing every huge float into one factor
        let a = float_factor(1.0e30, 4);
        let b = float_factor(2.0e30, 4);
        assert!(a > 0 && b > 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_factorize_first_seen_order() {
        let keys: Vec<String> = ["b", "a", "b", "c", "a"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(factorize(&keys), vec![0.0, 1.0, 0.0, 2.0, 1.0]);
    }

    #[test]
    fn test_factorize_is_idempotent() {
        let keys: Vec<String> = ["x", "y", "x", "z"].iter().map(|s| s.to_string()).collect();
        assert_eq!(factorize(&keys), factorize(&keys));
    }

    #[test]
    fn test_onehot_column_count_equals_cardinality() {
        let column = text_column(&["red", "green", "blue", "red"]);
        let config = Config {
            encoder: EncoderSpec::Onehot,
            ..Config::default()
        };
        let block = encode_column(&column, &config, TrainTestSplit::at(4), &regression_labels(4));
        assert_eq!(block.ncols(), 3);
        // each row is a single indicator
        for row in block.rows() {
            assert_eq!(row.sum(), 1.0);
        }
    }

    #[test]
    fn test_onehot_mixed_numeric_and_text_keys() {
        // many interleaved numeric and non-numeric keys must sort
        // without violating the comparator's total-order contract
        let values: Vec<String> = (1..=40)
            .flat_map(|i| [i.to_string(), format!("{i}a")])
            .collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let column = text_column(&refs);
        let config = Config {
            encoder: EncoderSpec::Onehot,
            ..Config::default()
        };
        let block = encode_column(&column, &config, TrainTestSplit::at(80), &regression_labels(80));
        assert_eq!(block.ncols(), 80);
        for row in block.rows() {
            assert_eq!(row.sum(), 1.0);
        }
    }

    #[test]
    fn test_sorted_categories_numerics_precede_text() {
        let keys: Vec<String> = ["10", "5a", "9", "2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(sorted_categories(&keys), vec!["2", "9", "10", "5a"]);
    }

    #[test]
    fn test_binary_encoder_width() {
        let column = text_column(&["a", "b", "c", "d", "e"]);
        let config = Config {
            encoder: EncoderSpec::Binary,
            ..Config::default()
        };
        let block = encode_column(&column, &config, TrainTestSplit::at(5), &regression_labels(5));
        // five categories need ceil(log2(6)) = 3 digits
        assert_eq!(block.ncols(), 3);
        // first category has ordinal 1 = 001
        assert_eq!(block[[0, 0]], 0.0);
        assert_eq!(block[[0, 1]], 0.0);
        assert_eq!(block[[0, 2]], 1.0);
    }

    #[test]
    fn test_helmert_contrast_values() {
        let m = helmert_matrix(3);
        assert_eq!(m.column(0).to_vec(), vec![-1.0, 1.0, 0.0]);
        assert_eq!(m.column(1).to_vec(), vec![-1.0, -1.0, 2.0]);
    }

    #[test]
    fn test_backdiff_contrast_values() {
        let m = backdiff_matrix(4);
        let c0 = m.column(0).to_vec();
        assert!((c0[0] + 0.75).abs() < 1e-12);
        assert!((c0[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_polynomial_contrasts_orthonormal() {
        let m = polynomial_matrix(4);
        for j in 0..3 {
            let col = m.column(j);
            assert!((col.dot(&col) - 1.0).abs() < 1e-9);
            for j2 in j + 1..3 {
                assert!(col.dot(&m.column(j2)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_target_rate_unseen_category_gets_sentinel() {
        let column = text_column(&["a", "b", "a", "b", "zz"]);
        let config = Config::default();
        let labels = Labels::classification(vec![1.0, 0.0, 1.0, 1.0]);
        let block = encode_column(&column, &config, TrainTestSplit::at(4), &labels);
        let rate_col = block.ncols() - 1;
        assert_eq!(block[[0, rate_col]], 1.0); // a: 2/2 positive
        assert_eq!(block[[1, rate_col]], 0.5); // b: 1/2 positive
        assert_eq!(block[[4, rate_col]], config.sentinel); // unseen in train
        assert!(!block[[4, rate_col]].is_nan());
    }

    proptest! {
        #[test]
        fn prop_factorize_codes_cover_prefix(values in proptest::collection::vec("[a-d]{1,2}", 1..40)) {
            let keys: Vec<String> = values.clone();
            let codes = factorize(&keys);
            let distinct = sorted_categories(&keys).len();
            // codes form exactly {0 .. distinct-1}
            for code in 0..distinct {
                prop_assert!(codes.contains(&(code as f64)));
            }
            prop_assert!(codes.iter().all(|&c| (c as usize) < distinct));
        }
    }
}

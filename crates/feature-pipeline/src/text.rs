//! Text transform: n-gram TF-IDF vectorization with factorize fallback

use ndarray::Array2;
use thiserror::Error;
use tracing::debug;

use columnar::{Column, ColumnData};

use crate::config::Config;
use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::encode::factorize;

/// Placeholder substituted for missing text before any processing
pub const NULLTEXT: &str = "nulltext";

/// Token unit for count vectorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Analyzer {
    /// Word n-grams over alphanumeric tokens of length two or more
    Word,
    /// Character n-grams over the raw text
    Char,
}

/// Vectorization is fallible by contract; the caller decides fallback
#[derive(Debug, Clone, Error)]
pub(crate) enum VectorizeError {
    #[error("empty vocabulary: no terms survived tokenization")]
    EmptyVocabulary,
}

fn word_tokens(doc: &str) -> Vec<String> {
    doc.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

fn terms(doc: &str, ngram_max: usize, analyzer: Analyzer) -> Vec<String> {
    let mut out = Vec::new();
    match analyzer {
        Analyzer::Word => {
            let tokens = word_tokens(doc);
            for n in 1..=ngram_max {
                if n > tokens.len() {
                    break;
                }
                for window in tokens.windows(n) {
                    out.push(window.join(" "));
                }
            }
        }
        Analyzer::Char => {
            let chars: Vec<char> = doc.to_lowercase().chars().collect();
            for n in 1..=ngram_max {
                if n > chars.len() {
                    break;
                }
                for window in chars.windows(n) {
                    out.push(window.iter().collect());
                }
            }
        }
    }
    out
}

/// Count-vectorize documents and reweight with smoothed TF-IDF,
/// L2-normalizing each row. Vocabulary order is sorted, so output
/// columns are deterministic.
pub(crate) fn vectorize_tfidf(
    docs: &[String],
    ngram_max: usize,
    analyzer: Analyzer,
) -> Result<Array2<f64>, VectorizeError> {
    let doc_terms: Vec<Vec<String>> = docs.iter().map(|d| terms(d, ngram_max, analyzer)).collect();
    let mut vocabulary: Vec<&String> = doc_terms.iter().flatten().collect();
    vocabulary.sort();
    vocabulary.dedup();
    if vocabulary.is_empty() {
        return Err(VectorizeError::EmptyVocabulary);
    }

    let n_docs = docs.len();
    let mut counts = Array2::zeros((n_docs, vocabulary.len()));
    for (row, terms) in doc_terms.iter().enumerate() {
        for term in terms {
            if let Ok(j) = vocabulary.binary_search(&term) {
                counts[[row, j]] += 1.0;
            }
        }
    }

    // smoothed idf, then L2 row normalization
    let nf = n_docs as f64;
    for j in 0..vocabulary.len() {
        let df = counts.column(j).iter().filter(|&&c| c > 0.0).count() as f64;
        let idf = ((1.0 + nf) / (1.0 + df)).ln() + 1.0;
        for row in 0..n_docs {
            counts[[row, j]] *= idf;
        }
    }
    for mut row in counts.rows_mut() {
        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|v| v / norm);
        }
    }
    Ok(counts)
}

/// Fill missing cells with the null-text placeholder
pub(crate) fn filled_text(column: &Column) -> Vec<String> {
    match &column.data {
        ColumnData::Text(v) => v
            .iter()
            .map(|c| c.clone().unwrap_or_else(|| NULLTEXT.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Transform a text column: attempt vectorization when enabled, falling
/// back deterministically to factorization on failure. Never fails and
/// never produces missing values.
pub(crate) fn transform_text(
    column: &Column,
    config: &Config,
    diag: &mut Diagnostics,
) -> Array2<f64> {
    let docs = filled_text(column);
    if config.vectorize {
        match vectorize_tfidf(&docs, config.ngrams_max, Analyzer::Word) {
            Ok(block) => {
                debug!(column = %column.name, ncols = block.ncols(), "vectorization succeeded");
                return block;
            }
            Err(err) => {
                diag.record(DiagnosticEvent::VectorizationFallback {
                    column: column.name.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    let codes = factorize(&docs);
    let n = codes.len();
    Array2::from_shape_vec((n, 1), codes).unwrap_or_else(|_| Array2::zeros((n, 1)))
}

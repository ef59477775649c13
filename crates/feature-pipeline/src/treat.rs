//! Treatment registry: named custom transforms bound to columns
//!
//! Names resolve against this static registry at configuration
//! validation time, so an unknown treatment never reaches the pipeline.
//! A treatment's output is additive; the column's default transform
//! still runs.

use ndarray::Array2;
use tracing::debug;

use columnar::{Column, ColumnData};

use crate::config::{ConfigError, TreatmentSpec};
use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::encode::factorize;
use crate::error::PipelineError;
use crate::runs::{rolling_runs, RunsStat};
use crate::text::{vectorize_tfidf, Analyzer, NULLTEXT};

/// A resolved, statically-typed treatment
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Treatment {
    /// Rolling run statistics over a binarized numeric column
    RunsTest { window: usize, stats: Vec<String> },
    /// Re-key text values by their letters joined with spaces, then
    /// factorize
    SplitToLetters,
    /// Left-pad text values and one-hot each character position
    Texplode,
    /// Character n-gram TF-IDF vectorization
    Cvectorize { ngrams: usize },
}

impl Treatment {
    /// Resolve a configured treatment name and parse its arguments;
    /// every failure is a configuration error naming the column
    pub(crate) fn resolve(column: &str, spec: &TreatmentSpec) -> Result<Self, ConfigError> {
        let args_err = |reason: String| ConfigError::TreatmentArgs {
            column: column.to_string(),
            name: spec.name.clone(),
            reason,
        };
        match spec.name.as_str() {
            "runs_test" => {
                let window: usize = spec
                    .args
                    .first()
                    .ok_or_else(|| args_err("missing window argument".into()))?
                    .parse()
                    .map_err(|_| args_err(format!("window {:?} is not an integer", spec.args[0])))?;
                if window == 0 {
                    return Err(args_err("window must be positive".into()));
                }
                Ok(Treatment::RunsTest {
                    window,
                    stats: spec.args[1..].to_vec(),
                })
            }
            "split_to_letters" => Ok(Treatment::SplitToLetters),
            "texplode" => Ok(Treatment::Texplode),
            "cvectorize" => {
                let ngrams: usize = spec
                    .args
                    .first()
                    .ok_or_else(|| args_err("missing n-gram argument".into()))?
                    .parse()
                    .map_err(|_| args_err(format!("n-gram size {:?} is not an integer", spec.args[0])))?;
                if ngrams == 0 {
                    return Err(args_err("n-gram size must be positive".into()));
                }
                Ok(Treatment::Cvectorize { ngrams })
            }
            _ => Err(ConfigError::UnknownTreatment {
                column: column.to_string(),
                name: spec.name.clone(),
            }),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Treatment::RunsTest { .. } => "runs_test",
            Treatment::SplitToLetters => "split_to_letters",
            Treatment::Texplode => "texplode",
            Treatment::Cvectorize { .. } => "cvectorize",
        }
    }

    /// Apply the treatment to its column
    pub(crate) fn apply(
        &self,
        column: &Column,
        diag: &mut Diagnostics,
    ) -> Result<Array2<f64>, PipelineError> {
        debug!(treatment = self.label(), column = %column.name, "applying treatment");
        match self {
            Treatment::RunsTest { window, stats } => {
                let cells = column.numeric_cells().ok_or(PipelineError::TreatmentType {
                    treatment: self.label().to_string(),
                    column: column.name.clone(),
                    reason: "requires a numeric column",
                })?;
                let values: Vec<f64> = cells.iter().map(|c| c.unwrap_or(0.0)).collect();
                let mut resolved: Vec<RunsStat> = Vec::new();
                if stats.iter().any(|s| s == "all") {
                    resolved.extend(RunsStat::ALL);
                } else {
                    for name in stats {
                        match RunsStat::parse(name) {
                            Some(stat) => resolved.push(stat),
                            None => diag.record(DiagnosticEvent::UnknownRunsStatistic {
                                column: column.name.clone(),
                                name: name.clone(),
                            }),
                        }
                    }
                }
                Ok(rolling_runs(&values, *window, &resolved))
            }
            Treatment::SplitToLetters => {
                let docs = text_cells(column, self.label())?;
                let maxlen = docs.iter().map(|d| d.chars().count()).max().unwrap_or(0);
                if maxlen <= 1 {
                    // single-character values carry no letter structure
                    return Ok(Array2::zeros((docs.len(), 0)));
                }
                let spaced: Vec<String> = docs
                    .iter()
                    .map(|d| {
                        d.chars()
                            .map(String::from)
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect();
                let codes = factorize(&spaced);
                let n = codes.len();
                Ok(Array2::from_shape_vec((n, 1), codes)
                    .unwrap_or_else(|_| Array2::zeros((n, 1))))
            }
            Treatment::Texplode => {
                let docs = text_cells_with(column, self.label(), " ")?;
                let maxlen = docs.iter().map(|d| d.chars().count()).max().unwrap_or(0);
                let padded: Vec<Vec<char>> = docs
                    .iter()
                    .map(|d| {
                        let chars: Vec<char> = d.chars().collect();
                        let mut row = vec![' '; maxlen - chars.len()];
                        row.extend(chars);
                        row
                    })
                    .collect();
                // one indicator column per (position, character) pair
                let mut columns: Vec<Vec<f64>> = Vec::new();
                for pos in 0..maxlen {
                    let mut alphabet: Vec<char> = padded.iter().map(|row| row[pos]).collect();
                    alphabet.sort_unstable();
                    alphabet.dedup();
                    for ch in alphabet {
                        columns.push(
                            padded
                                .iter()
                                .map(|row| if row[pos] == ch { 1.0 } else { 0.0 })
                                .collect(),
                        );
                    }
                }
                let n = docs.len();
                let mut out = Array2::zeros((n, columns.len()));
                for (j, col) in columns.iter().enumerate() {
                    for (i, &v) in col.iter().enumerate() {
                        out[[i, j]] = v;
                    }
                }
                Ok(out)
            }
            Treatment::Cvectorize { ngrams } => {
                let docs = text_cells_with(column, self.label(), " ")?;
                match vectorize_tfidf(&docs, *ngrams, Analyzer::Char) {
                    Ok(block) => Ok(block),
                    Err(err) => {
                        diag.record(DiagnosticEvent::VectorizationFallback {
                            column: column.name.clone(),
                            reason: err.to_string(),
                        });
                        let codes = factorize(&docs);
                        let n = codes.len();
                        Ok(Array2::from_shape_vec((n, 1), codes)
                            .unwrap_or_else(|_| Array2::zeros((n, 1))))
                    }
                }
            }
        }
    }
}

fn text_cells(column: &Column, treatment: &'static str) -> Result<Vec<String>, PipelineError> {
    text_cells_with(column, treatment, NULLTEXT)
}

fn text_cells_with(
    column: &Column,
    treatment: &'static str,
    fill: &str,
) -> Result<Vec<String>, PipelineError> {
    match &column.data {
        ColumnData::Text(v) => Ok(v
            .iter()
            .map(|c| c.clone().unwrap_or_else(|| fill.to_string()))
            .collect()),
        _ => Err(PipelineError::TreatmentType {
            treatment: treatment.to_string(),
            column: column.name.clone(),
            reason: "requires a text column",
        }),
    }
}

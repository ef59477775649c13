//! Pipeline configuration
//!
//! One immutable struct for a whole pipeline invocation, validated
//! eagerly so every unrecognized or inconsistent option fails before any
//! column is transformed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::treat::Treatment;

/// Categorical encoding strategy, applied per categorical column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderSpec {
    /// Integer id per distinct value, first-seen order
    Factorize,
    /// One indicator column per distinct value
    Onehot,
    /// 1-based first-seen integer code
    Ordinal,
    /// Ordinal code in binary, most significant bit first
    Binary,
    /// Helmert contrast coding
    Helmert,
    /// Sum (deviation) contrast coding
    Sumcont,
    /// Orthogonal polynomial contrast coding
    Polynomial,
    /// Backward difference contrast coding
    Backdiff,
}

/// Base-matrix scaler choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerSpec {
    /// Zero mean, unit variance per column
    Standard,
    /// Rescale each column to [0, 1]
    Minmax,
}

/// A named custom transform bound to one column, with positional
/// arguments as written in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentSpec {
    /// Registry name of the transform
    pub name: String,
    /// Positional arguments, parsed by the treatment itself
    #[serde(default)]
    pub args: Vec<String>,
}

/// Configuration validation failures; all fatal before the pipeline runs
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// An option holds a value outside its accepted range
    #[error("option {option} has invalid value {value}: {reason}")]
    InvalidOption {
        option: &'static str,
        value: String,
        reason: &'static str,
    },

    /// A sweep's minimum exceeds its maximum
    #[error("empty sweep for {option}: min {min} exceeds max {max}")]
    EmptySweep {
        option: &'static str,
        min: usize,
        max: usize,
    },

    /// A treatment name does not resolve against the registry
    #[error("column {column}: unknown treatment {name}")]
    UnknownTreatment { column: String, name: String },

    /// A treatment's positional arguments failed to parse
    #[error("column {column}: treatment {name}: {reason}")]
    TreatmentArgs {
        column: String,
        name: String,
        reason: String,
    },
}

/// Immutable options for one pipeline invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prepend per-row missing and digit-occurrence counts
    pub counts: bool,
    /// Cardinality threshold at or below which a column is categorical
    pub dummy_limit: usize,
    /// Encoding strategy for categorical columns
    pub encoder: EncoderSpec,
    /// Decimal precision for float-to-factor quantization
    pub rounding: usize,
    /// Placeholder for target rates of categories unseen in training
    pub sentinel: f64,
    /// Label whose per-category rate is computed for classification
    pub target_value: f64,

    /// Gate for the numerical log transform
    pub logtransform: bool,
    /// Normality rejection threshold for the log transform
    pub pvalue_level: f64,

    /// Gate for text n-gram vectorization
    pub vectorize: bool,
    /// Largest n-gram size attempted during vectorization
    pub ngrams_max: usize,

    /// Gate for base-matrix scaling
    pub scaler_option: bool,
    /// Scaler applied when scaling is enabled
    pub scaler_type: ScalerSpec,

    /// Gate for row-wise aggregate features
    pub numpy: bool,
    /// Gate for row-wise statistical-test features
    pub scipy: bool,
    /// Gate for the clustering sweep
    pub clustering: bool,
    /// Gate for the PCA sweep
    pub pca: bool,
    /// Gate for the neighbor-graph manifold embedding
    pub isomap: bool,
    /// Gate for the stochastic-neighbor embedding
    pub tsne: bool,
    /// Gate for polynomial interaction terms
    pub interactions: bool,
    /// Gate for symbolic-regression feature synthesis
    pub genetic: bool,

    /// Clustering sweep: smallest cluster count
    pub cluster_min: usize,
    /// Clustering sweep: largest cluster count
    pub cluster_max: usize,
    /// Clustering sweep: cluster count step
    pub cluster_inc: usize,

    /// PCA sweep: smallest component count
    pub pca_min: usize,
    /// PCA sweep: largest component count
    pub pca_max: usize,
    /// PCA sweep: component count step
    pub pca_inc: usize,
    /// Scale PCA components to unit variance
    pub pca_whiten: bool,

    /// Manifold embedding dimension
    pub iso_components: usize,
    /// Neighbor count for the manifold's k-NN graph
    pub iso_neighbors: usize,

    /// Stochastic embedding dimension
    pub tsne_components: usize,
    /// Perplexity target for affinity calibration
    pub tsne_perplexity: f64,
    /// Gradient-descent learning rate
    pub tsne_learn_rate: f64,

    /// Highest interaction degree
    pub poly_degree: usize,
    /// Percent of base columns entering interaction generation
    pub isample_pct: f64,

    /// Number of synthesized symbolic features
    pub gfeatures: usize,

    /// Seed for every stochastic sub-transform
    pub seed: u64,

    /// Column name to custom transform bindings
    pub treatments: BTreeMap<String, TreatmentSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            counts: false,
            dummy_limit: 100,
            encoder: EncoderSpec::Factorize,
            rounding: 4,
            sentinel: -1.0,
            target_value: 1.0,
            logtransform: false,
            pvalue_level: 0.01,
            vectorize: false,
            ngrams_max: 2,
            scaler_option: false,
            scaler_type: ScalerSpec::Standard,
            numpy: false,
            scipy: false,
            clustering: false,
            pca: false,
            isomap: false,
            tsne: false,
            interactions: false,
            genetic: false,
            cluster_min: 3,
            cluster_max: 30,
            cluster_inc: 3,
            pca_min: 2,
            pca_max: 10,
            pca_inc: 1,
            pca_whiten: false,
            iso_components: 2,
            iso_neighbors: 5,
            tsne_components: 2,
            tsne_perplexity: 30.0,
            tsne_learn_rate: 200.0,
            poly_degree: 2,
            isample_pct: 5.0,
            gfeatures: 10,
            seed: 42,
            treatments: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Validate every option eagerly, before any data is touched
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster_min < 2 {
            return Err(ConfigError::InvalidOption {
                option: "cluster_min",
                value: self.cluster_min.to_string(),
                reason: "clustering needs at least two clusters",
            });
        }
        if self.cluster_min > self.cluster_max {
            return Err(ConfigError::EmptySweep {
                option: "cluster_min/cluster_max",
                min: self.cluster_min,
                max: self.cluster_max,
            });
        }
        if self.cluster_inc == 0 {
            return Err(ConfigError::InvalidOption {
                option: "cluster_inc",
                value: "0".into(),
                reason: "sweep increment must be positive",
            });
        }
        if self.pca_min == 0 {
            return Err(ConfigError::InvalidOption {
                option: "pca_min",
                value: "0".into(),
                reason: "component counts start at one",
            });
        }
        if self.pca_min > self.pca_max {
            return Err(ConfigError::EmptySweep {
                option: "pca_min/pca_max",
                min: self.pca_min,
                max: self.pca_max,
            });
        }
        if self.pca_inc == 0 {
            return Err(ConfigError::InvalidOption {
                option: "pca_inc",
                value: "0".into(),
                reason: "sweep increment must be positive",
            });
        }
        if self.iso_components == 0 || self.iso_neighbors == 0 {
            return Err(ConfigError::InvalidOption {
                option: "iso_components/iso_neighbors",
                value: format!("{}/{}", self.iso_components, self.iso_neighbors),
                reason: "manifold shape parameters must be positive",
            });
        }
        if self.tsne_components == 0 {
            return Err(ConfigError::InvalidOption {
                option: "tsne_components",
                value: "0".into(),
                reason: "component counts start at one",
            });
        }
        if !(self.tsne_perplexity > 0.0) || !(self.tsne_learn_rate > 0.0) {
            return Err(ConfigError::InvalidOption {
                option: "tsne_perplexity/tsne_learn_rate",
                value: format!("{}/{}", self.tsne_perplexity, self.tsne_learn_rate),
                reason: "embedding parameters must be positive",
            });
        }
        if self.poly_degree < 2 {
            return Err(ConfigError::InvalidOption {
                option: "poly_degree",
                value: self.poly_degree.to_string(),
                reason: "interactions need degree two or higher",
            });
        }
        if !(self.isample_pct > 0.0 && self.isample_pct <= 100.0) {
            return Err(ConfigError::InvalidOption {
                option: "isample_pct",
                value: self.isample_pct.to_string(),
                reason: "percentile must be in (0, 100]",
            });
        }
        if !(self.pvalue_level > 0.0 && self.pvalue_level < 1.0) {
            return Err(ConfigError::InvalidOption {
                option: "pvalue_level",
                value: self.pvalue_level.to_string(),
                reason: "significance level must be in (0, 1)",
            });
        }
        if self.ngrams_max == 0 {
            return Err(ConfigError::InvalidOption {
                option: "ngrams_max",
                value: "0".into(),
                reason: "n-gram sizes start at one",
            });
        }
        if self.gfeatures == 0 {
            return Err(ConfigError::InvalidOption {
                option: "gfeatures",
                value: "0".into(),
                reason: "synthesized feature count must be positive",
            });
        }
        // unknown treatment names die here, not at call time
        for (column, spec) in &self.treatments {
            Treatment::resolve(column, spec)?;
        }
        Ok(())
    }
}

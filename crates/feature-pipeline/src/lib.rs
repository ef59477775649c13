//! Feature Engineering Pipeline
//!
//! Converts a typed columnar dataset into a single numeric feature matrix:
//! per-column dispatch to categorical encoding, numerical imputation, or
//! text vectorization, followed by a family of independently gated
//! derived-feature generators.

mod block;
mod config;
mod derived;
mod diagnostics;
mod encode;
mod error;
mod numeric;
mod pipeline;
mod runs;
mod scale;
mod text;
mod treat;

pub use block::{split_matrix, BlockList, FeatureBlock};
pub use config::{Config, ConfigError, EncoderSpec, ScalerSpec, TreatmentSpec};
pub use diagnostics::{DiagnosticEvent, Diagnostics};
pub use encode::float_factor;
pub use error::PipelineError;
pub use pipeline::FeaturePipeline;
pub use runs::RunsStat;
pub use text::NULLTEXT;

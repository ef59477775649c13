//! Structured diagnostics for non-fatal pipeline decisions
//!
//! Skips and fallbacks are never silent: each one is recorded as an
//! event in an explicit sink threaded through the pipeline, and mirrored
//! to the tracing subscriber.

use tracing::warn;

/// One non-fatal decision made during a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    /// Text vectorization failed and factorization ran instead
    VectorizationFallback { column: String, reason: String },
    /// A runs-statistic name in a treatment was not recognized
    UnknownRunsStatistic { column: String, name: String },
    /// A generator requested more components than features are available
    ComponentsClamped {
        generator: &'static str,
        requested: usize,
        available: usize,
    },
    /// A generator was enabled but the base matrix had no usable columns
    GeneratorSkipped {
        generator: &'static str,
        reason: String,
    },
    /// A column had no observed values, so its imputation statistic fell
    /// back to zero
    EmptyColumnImputed { column: String },
}

/// Ordered sink of diagnostic events for one pipeline run
#[derive(Debug, Default)]
pub struct Diagnostics {
    events: Vec<DiagnosticEvent>,
}

impl Diagnostics {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event and mirror it to the tracing subscriber
    pub fn record(&mut self, event: DiagnosticEvent) {
        warn!(?event, "pipeline diagnostic");
        self.events.push(event);
    }

    /// Events recorded so far, in order
    pub fn events(&self) -> &[DiagnosticEvent] {
        &self.events
    }

    /// True if nothing was skipped or recovered
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

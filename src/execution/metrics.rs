use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

/// Metrics for the [`ExecutionSequencer`](super::ExecutionSequencer).
#[derive(Metrics)]
#[metrics(scope = "sequencer")]
pub struct SequencerMetrics {
    /// Number of submitted user operations.
    pub submitted: Counter,
    /// Number of confirmed user operations.
    pub confirmed: Counter,
    /// Number of failed steps.
    pub failed: Counter,
    /// Number of skipped steps.
    pub skipped: Counter,
    /// Number of steps answered from the journal instead of being resubmitted.
    pub resumed: Counter,
    /// Time from submission to receipt, in milliseconds.
    pub confirmation_time: Histogram,
    /// Time spent settling, in milliseconds.
    pub settling_time: Histogram,
}


use super::ArrivalProbe;
use crate::{
    error::{SkipReason, StepFailure},
    types::{SignedOperation, UserOpReceipt},
};
use alloy::primitives::B256;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

/// What a step does within a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepKind {
    /// Allow the bridge to pull the source tokens.
    Approve,
    /// Hand the source tokens to the bridge.
    SendToBridge,
    /// Pay the receiver on the destination chain.
    Deliver,
}

/// One signed operation in an execution plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStep {
    /// The operation to submit.
    pub op: SignedOperation,
    /// Position in the plan. Unique within a plan; lower runs first.
    pub order: u32,
    /// What the step does.
    pub kind: StepKind,
    /// Minimum wait after this step before the next one is submitted.
    #[serde(with = "crate::serde::duration")]
    pub settling_delay: Duration,
    /// Order of a step that must confirm before this one is submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<u32>,
    /// Arrival probe consulted by the settling policy.
    #[serde(skip)]
    pub probe: Option<Arc<dyn ArrivalProbe>>,
}

impl ExecutionStep {
    /// Creates a step without settling delay or dependency.
    pub fn new(op: SignedOperation, order: u32, kind: StepKind) -> Self {
        Self { op, order, kind, settling_delay: Duration::ZERO, depends_on: None, probe: None }
    }

    /// Sets the settling delay.
    pub fn with_settling_delay(mut self, delay: Duration) -> Self {
        self.settling_delay = delay;
        self
    }

    /// Requires the step with `order` to confirm first.
    pub fn depends_on(mut self, order: u32) -> Self {
        self.depends_on = Some(order);
        self
    }

    /// Sets the arrival probe for the settling policy.
    pub fn with_probe(mut self, probe: Option<Arc<dyn ArrivalProbe>>) -> Self {
        self.probe = probe;
        self
    }
}

/// Final result of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "details", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The operation was included and succeeded.
    Confirmed(UserOpReceipt),
    /// The operation was rejected, reverted or never confirmed.
    Failed(StepFailure),
    /// The operation was never submitted.
    Skipped(SkipReason),
}

impl StepOutcome {
    /// Whether the step confirmed.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    /// Whether the step failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Whether the step was skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Journaled status of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "user_op_hash", rename_all = "snake_case")]
pub enum StepStatus {
    /// Not submitted yet.
    ///
    /// Next: [`Self::Submitted`] OR [`Self::Failed`] OR [`Self::Skipped`]
    Pending,
    /// Accepted by the bundler, waiting for inclusion.
    ///
    /// Next: [`Self::Confirmed`] OR [`Self::Failed`]
    Submitted(B256),
    /// Terminal state
    Confirmed,
    /// Terminal state
    Failed,
    /// Terminal state
    Skipped,
}

impl StepStatus {
    /// Whether the step reached a terminal state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed | Self::Skipped)
    }

    /// Validates if a transition from the current status to the next status is allowed.
    pub fn can_transition_to(&self, next: &Self) -> bool {
        use StepStatus::*;
        matches!(
            (self, next),
            (Pending, Submitted(_))
                | (Pending, Failed)
                | (Pending, Skipped)
                | (Submitted(_), Confirmed)
                | (Submitted(_), Failed)
        )
    }
}

impl From<&StepOutcome> for StepStatus {
    fn from(outcome: &StepOutcome) -> Self {
        match outcome {
            StepOutcome::Confirmed(_) => Self::Confirmed,
            StepOutcome::Failed(_) => Self::Failed,
            StepOutcome::Skipped(_) => Self::Skipped,
        }
    }
}

/// Journal entry of a step: its status and, once final, its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Current status.
    pub status: StepStatus,
    /// Outcome, set together with a final status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<StepOutcome>,
}

impl StepRecord {
    /// A submitted, unconfirmed step.
    pub fn submitted(user_op_hash: B256) -> Self {
        Self { status: StepStatus::Submitted(user_op_hash), outcome: None }
    }

    /// A step with its final outcome.
    pub fn finished(outcome: StepOutcome) -> Self {
        Self { status: StepStatus::from(&outcome), outcome: Some(outcome) }
    }
}

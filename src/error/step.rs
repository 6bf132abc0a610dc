use alloy::primitives::{B256, ChainId};
use serde::{Deserialize, Serialize};

/// Why a step ended in [`StepOutcome::Failed`](crate::execution::StepOutcome::Failed).
///
/// Serializable so it can be journaled next to the step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepFailure {
    /// No bundler could be resolved for the step's chain.
    #[error("no account available on chain {chain_id}: {reason}")]
    AccountUnavailable {
        /// Chain of the step.
        chain_id: ChainId,
        /// Resolver error.
        reason: String,
    },
    /// The bundler did not accept the operation.
    #[error("submission failed after {attempts} attempt(s): {reason}")]
    Submission {
        /// Number of submission attempts.
        attempts: u32,
        /// Last error returned by the bundler.
        reason: String,
    },
    /// The operation was included but its execution reverted.
    #[error("user operation {user_op_hash} reverted: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Reverted {
        /// Hash of the operation.
        user_op_hash: B256,
        /// Revert reason, when the bundler provides one.
        reason: Option<String>,
    },
    /// No receipt appeared before the confirmation timeout.
    #[error("user operation {user_op_hash} not confirmed after {waited_secs}s")]
    Timeout {
        /// Hash of the operation.
        user_op_hash: B256,
        /// How long we waited.
        waited_secs: u64,
    },
}

/// Why a step ended in [`StepOutcome::Skipped`](crate::execution::StepOutcome::Skipped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The step it depends on did not confirm.
    #[error("dependency {order} not confirmed")]
    DependencyNotConfirmed {
        /// Order of the dependency.
        order: u32,
    },
    /// The transfer was cancelled before the step was submitted.
    #[error("cancelled before submission")]
    Cancelled,
}

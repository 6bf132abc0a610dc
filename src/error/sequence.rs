use crate::types::TransferId;

/// Errors returned by the [`ExecutionSequencer`](crate::execution::ExecutionSequencer) for plans
/// it refuses to run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    /// Two steps share the same order.
    #[error("duplicate step order {0}")]
    DuplicateOrder(u32),
    /// A step depends on an order that is not part of the plan, or does not run before it.
    #[error("step {order} depends on {depends_on}, which does not run before it")]
    InvalidDependency {
        /// Order of the dependent step.
        order: u32,
        /// The referenced order.
        depends_on: u32,
    },
    /// The journal could not be read, so it is unknown which steps already ran.
    #[error("journal of transfer {transfer_id} unavailable: {reason}")]
    JournalUnavailable {
        /// The transfer.
        transfer_id: TransferId,
        /// Why reading failed.
        reason: String,
    },
}

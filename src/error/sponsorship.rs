use alloy::primitives::ChainId;

/// Errors returned while obtaining fee sponsorship.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SponsorshipError {
    /// The sponsor refused to pay for the operation.
    #[error("sponsorship declined on chain {chain_id}: {reason}")]
    Declined {
        /// Chain of the operation.
        chain_id: ChainId,
        /// Reason given by the sponsor.
        reason: String,
    },
    /// The sponsor could not be reached or returned garbage.
    #[error("sponsor on chain {chain_id} unavailable: {reason}")]
    Unavailable {
        /// Chain of the operation.
        chain_id: ChainId,
        /// Transport level failure.
        reason: String,
    },
    /// The operation was routed to a sponsor of another chain.
    #[error("operation for chain {operation} routed to sponsor of chain {sponsor}")]
    ChainMismatch {
        /// Chain of the operation.
        operation: ChainId,
        /// Chain of the sponsor.
        sponsor: ChainId,
    },
}

impl SponsorshipError {
    /// Whether the sponsor explicitly refused.
    pub fn is_declined(&self) -> bool {
        matches!(self, Self::Declined { .. })
    }
}

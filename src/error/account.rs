use alloy::primitives::ChainId;

/// Errors returned by an [`AccountResolver`](crate::accounts::AccountResolver).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountResolutionError {
    /// No smart account is configured for the chain.
    #[error("no smart account available on chain {0}")]
    UnsupportedChain(ChainId),
    /// The account handle exists but is not usable.
    #[error("smart account on chain {chain_id} is unavailable: {reason}")]
    Unavailable {
        /// Chain of the account.
        chain_id: ChainId,
        /// Why the account could not be used.
        reason: String,
    },
}

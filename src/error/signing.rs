use super::MerkleError;
use alloy::primitives::ChainId;

/// Errors returned by the [`MultiChainSigner`](crate::signers::MultiChainSigner).
///
/// Signing is all-or-nothing: any of these means no operation of the batch was signed.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// The batch has no operations.
    #[error("cannot sign an empty batch")]
    EmptyBatch,
    /// The chain tag of a batch entry does not match its operation.
    #[error("operation {index} is tagged for chain {expected} but built for chain {actual}")]
    ChainMismatch {
        /// Position in the batch.
        index: usize,
        /// The tag given alongside the operation.
        expected: ChainId,
        /// The chain the operation was built for.
        actual: ChainId,
    },
    /// An operation has no sponsorship attached.
    #[error("operation {index} on chain {chain_id} is not sponsored")]
    Unsponsored {
        /// Position in the batch.
        index: usize,
        /// Chain of the operation.
        chain_id: ChainId,
    },
    /// The merkle tree over the batch could not be built.
    #[error(transparent)]
    Merkle(#[from] MerkleError),
    /// The signer was unavailable or the user declined.
    #[error("signer rejected the batch: {0}")]
    Rejected(eyre::Error),
}

//! Transfer error types.
use crate::types::TransferId;
use alloy::primitives::{Address, ChainId, U256};
use thiserror::Error;

mod account;
pub use account::AccountResolutionError;

mod bundler;
pub use bundler::BundlerError;

mod merkle;
pub use merkle::MerkleError;

mod record;
pub use record::RecordError;

mod sequence;
pub use sequence::SequenceError;

mod signing;
pub use signing::SigningError;

mod sponsorship;
pub use sponsorship::SponsorshipError;

mod step;
pub use step::{SkipReason, StepFailure};

mod storage;
pub use storage::StorageError;

/// The overarching error type returned by
/// [`TransferOrchestrator::send`](crate::orchestrator::TransferOrchestrator::send).
///
/// Every variant is raised before anything is submitted on-chain, except [`Self::Sequence`] which
/// can only come from a malformed plan or an unreadable journal. Failures of individual steps
/// are reported through [`StepOutcome`](crate::execution::StepOutcome) instead.
#[derive(Debug, Error)]
pub enum TransferError {
    /// No smart account could be resolved for a chain.
    #[error(transparent)]
    AccountResolution(#[from] AccountResolutionError),
    /// A sponsor declined or could not be reached.
    #[error(transparent)]
    SponsorshipDeclined(#[from] SponsorshipError),
    /// The batch could not be signed.
    #[error(transparent)]
    SigningRejected(#[from] SigningError),
    /// The execution plan was malformed.
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    /// The transfer journal could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// An operation was requested with empty calldata.
    #[error("empty calldata for call to {target} on chain {chain_id}")]
    EmptyCalldata {
        /// Chain of the rejected operation.
        chain_id: ChainId,
        /// Contract the operation was meant to call.
        target: Address,
    },
    /// A transfer amount was zero.
    #[error("transfer amount must be non-zero")]
    InvalidAmount,
    /// Source and destination amounts differ while the route requires them to match.
    #[error("source amount {source_amount} does not match destination amount {destination_amount}")]
    AmountMismatch {
        /// Amount leaving the source chain.
        source_amount: U256,
        /// Amount delivered on the destination chain.
        destination_amount: U256,
    },
    /// The transfer was cancelled before anything was submitted.
    #[error("transfer {0} cancelled before submission")]
    Cancelled(TransferId),
    /// An internal error occurred.
    #[error(transparent)]
    InternalError(#[from] eyre::Error),
}

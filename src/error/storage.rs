use crate::types::TransferId;

/// Errors returned by [`TransferStorage`](crate::storage::TransferStorage).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No journal exists for the transfer.
    #[error("no journal for transfer {0}")]
    UnknownTransfer(TransferId),
    /// A (de)serialization error occurred.
    #[error("a serialization error occurred")]
    SerdeError(#[from] serde_json::Error),
    /// Reading or writing the journal file failed.
    #[error("journal i/o failed")]
    Io(#[from] std::io::Error),
    /// An internal error occurred.
    #[error("an internal error occurred")]
    InternalError(#[from] eyre::Error),
}

/// Errors returned by a [`RecordKeeper`](crate::records::RecordKeeper).
///
/// These never fail a transfer; they surface as warnings on the
/// [`TransferReport`](crate::orchestrator::TransferReport).
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The request could not be sent or the response could not be decoded.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// The record service answered with a non-success status.
    #[error("record service returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        body: String,
    },
    /// The endpoint URL could not be built.
    #[error(transparent)]
    Url(#[from] url::ParseError),
    /// An internal error occurred.
    #[error(transparent)]
    InternalError(#[from] eyre::Error),
}

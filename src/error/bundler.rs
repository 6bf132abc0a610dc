use alloy::transports::{RpcError, TransportErrorKind};

/// Errors returned by a [`Bundler`](crate::accounts::Bundler).
#[derive(Debug, thiserror::Error)]
pub enum BundlerError {
    /// The bundler answered with a JSON-RPC error, e.g. a failed validation.
    #[error("bundler rejected user operation: {0}")]
    Rejected(String),
    /// The bundler could not be reached.
    #[error("bundler unreachable: {0}")]
    Transport(String),
}

impl BundlerError {
    /// Whether the request may succeed if sent again.
    ///
    /// Rejections are deterministic for the same operation, transport failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<RpcError<TransportErrorKind>> for BundlerError {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        match err {
            RpcError::ErrorResp(payload) => Self::Rejected(payload.message.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

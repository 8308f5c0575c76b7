//! Error types for the sync engine.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur during a sync cycle.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Network or transport failure.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the cycle can be retried from the same watermarks.
        retryable: bool,
    },

    /// The server rejected the bearer token; the caller must
    /// re-authenticate before the next cycle.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The server rejected the request shape (400); nothing was
    /// committed and resending the same batch will fail again.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The server failed internally (5xx); the transaction rolled back
    /// and the same batch can be retried.
    #[error("server error: {0}")]
    Server(String),

    /// A response could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Local store failure.
    #[error("store error: {0}")]
    Store(#[from] parley_store::StoreError),

    /// The in-flight cycle was cancelled.
    #[error("sync cancelled")]
    Cancelled,
}

impl EngineError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the coordinator may retry the cycle.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Transport { retryable, .. } => *retryable,
            EngineError::Server(_) => true,
            _ => false,
        }
    }
}

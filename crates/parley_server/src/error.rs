//! Error types for the sync server.

use parley_store::StoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while serving sync requests.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Missing, malformed, or expired bearer token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed request body or batch shape; nothing was committed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Store failure; the surrounding transaction rolled back.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns true for errors the client caused (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::Unauthorized(_) | ServerError::InvalidRequest(_)
        )
    }
}

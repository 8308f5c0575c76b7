//! Error types for store operations.

use parley_model::ModelError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in an entity store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An incoming record failed validation against its table schema.
    #[error("invalid record: {0}")]
    InvalidRecord(#[from] ModelError),

    /// A stored row could not be decoded back into its typed shape.
    #[error("corrupt row {id} in {kind}: {message}")]
    CorruptRow {
        /// Entity kind of the row.
        kind: String,
        /// Row identity.
        id: String,
        /// Underlying decode message.
        message: String,
    },

    /// Backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns true when the error concerns a single record rather than
    /// the store itself. Per-record errors are skipped with a warning
    /// during batch application; store-level errors abort the batch.
    pub fn is_record_error(&self) -> bool {
        matches!(self, StoreError::InvalidRecord(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_error_classification() {
        let err = StoreError::InvalidRecord(ModelError::MissingIdentity {
            table: "groups".into(),
        });
        assert!(err.is_record_error());
        assert!(!StoreError::Backend("down".into()).is_record_error());
    }
}

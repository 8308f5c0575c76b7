//! Error types for schema validation.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while validating records at the wire boundary.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The record is not a JSON object.
    #[error("record for table {table} is not an object")]
    NotAnObject {
        /// Wire table name.
        table: String,
    },

    /// The record lacks its identity field.
    #[error("record for table {table} is missing its identity")]
    MissingIdentity {
        /// Wire table name.
        table: String,
    },

    /// The record carries a non-positive version clock.
    #[error("record {id} in table {table} has invalid version {version}")]
    InvalidVersion {
        /// Wire table name.
        table: String,
        /// Record identity.
        id: String,
        /// Offending version value.
        version: i64,
    },

    /// The push batch exceeds the size bound.
    #[error("push batch of {len} changes exceeds the limit of {max}")]
    BatchTooLarge {
        /// Number of changes in the batch.
        len: usize,
        /// Maximum permitted batch size.
        max: usize,
    },

    /// A record failed to deserialize into its typed shape.
    #[error("malformed record in table {table}: {message}")]
    MalformedRecord {
        /// Wire table name.
        table: String,
        /// Underlying serde message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ModelError::BatchTooLarge { len: 2001, max: 2000 };
        let msg = err.to_string();
        assert!(msg.contains("2001"));
        assert!(msg.contains("2000"));
    }
}

//! Error types and result types for repository operations.
//!
//! Every fallible operation in the crate returns [`RecordStoreResult<T>`].
//! Backends map their driver-specific failures onto the variants below so callers
//! can match on the kind of failure without knowing which backend produced it.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when working with records.
#[derive(Error, Debug)]
pub enum RecordStoreError {
    /// The caller passed something the operation cannot work with, such as a record
    /// that does not serialize to a document or an identifier that was never assigned.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// An identifier field holds a value of the wrong form.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    /// The driver could not reach or talk to the configured servers.
    #[error("Connection error: {0}")]
    Connection(String),
    /// The underlying storage rejected an insert, find, replace, delete or count.
    #[error("Storage error: {0}")]
    Storage(String),
    /// No record matched. The first argument describes what was looked up,
    /// the second is the collection name.
    #[error("Record {0} not found in collection {1}")]
    NotFound(String, String),
    /// Serialization/deserialization error when converting between BSON and JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The connection configuration is incomplete or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RecordStoreError {
    /// Returns `true` when this error means the requested record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RecordStoreError::NotFound(..))
    }
}

/// A specialized `Result` type for repository operations.
pub type RecordStoreResult<T> = Result<T, RecordStoreError>;

impl From<BsonError> for RecordStoreError {
    fn from(err: BsonError) -> Self {
        RecordStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for RecordStoreError {
    fn from(err: SerdeJsonError) -> Self {
        RecordStoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_collection() {
        let err = RecordStoreError::NotFound("6553f1c2a1b2c3d4e5f60718".into(), "User".into());

        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Record 6553f1c2a1b2c3d4e5f60718 not found in collection User"
        );
    }

    #[test]
    fn json_errors_become_serialization_errors() {
        let err: RecordStoreError = serde_json::from_str::<u32>("\"nope\"")
            .unwrap_err()
            .into();

        assert!(matches!(err, RecordStoreError::Serialization(_)));
        assert!(!err.is_not_found());
    }
}

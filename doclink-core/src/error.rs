//! Error types and result types for collection client operations.
//!
//! Every fallible operation in this crate returns [`DocumentStoreResult<T>`]. Failures are
//! always handed back to the immediate caller; nothing is retried internally.

use bson::error::Error as BsonError;
use std::error::Error as StdError;
use thiserror::Error;

/// Boxed driver error carried by [`DocumentStoreError::Store`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Represents all possible errors that can occur when talking to a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// The destination handed to a find operation is not a growable sequence of the
    /// requested element type. This is a programming error and is never retried.
    #[error("Invalid result container: {0}")]
    InvalidContainer(String),
    /// A textual document identifier is malformed.
    #[error("Invalid document identifier: {0}")]
    InvalidIdentifier(String),
    /// A store item could not be mapped onto the destination type.
    /// `index` is the zero-based position of the item in the cursor.
    #[error("Failed to decode document {index}: {message}")]
    Decode { index: usize, message: String },
    /// A single-document lookup matched nothing in the named collection.
    #[error("No matching document in collection {0}")]
    NotFound(String),
    /// The underlying driver or network failed. The driver's own error is kept as the source.
    #[error("Store error: {0}")]
    Store(#[source] BoxError),
    /// A record could not be encoded into a BSON document.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A record or update payload does not encode to a BSON document.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// A filter expression cannot be expressed by the driver.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    /// Error during driver construction or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The operation's context was cancelled.
    #[error("Operation cancelled")]
    Cancelled,
    /// The operation's context deadline elapsed.
    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

impl DocumentStoreError {
    /// Wraps a driver-level error as [`DocumentStoreError::Store`].
    pub fn store(err: impl Into<BoxError>) -> Self {
        DocumentStoreError::Store(err.into())
    }

    pub(crate) fn decode(index: usize, err: impl std::fmt::Display) -> Self {
        DocumentStoreError::Decode { index, message: err.to_string() }
    }
}

/// A specialized `Result` type for collection client operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("connection reset")]
    struct ResetError;

    #[test]
    fn test_store_error_keeps_source() {
        let err = DocumentStoreError::store(ResetError);
        assert_eq!(err.to_string(), "Store error: connection reset");

        let source = err.source().expect("source should be preserved");
        assert!(source.downcast_ref::<ResetError>().is_some());
    }

    #[test]
    fn test_store_error_from_str() {
        let err = DocumentStoreError::store("cursor exhausted");
        assert!(matches!(err, DocumentStoreError::Store(_)));
        assert_eq!(err.to_string(), "Store error: cursor exhausted");
    }

    #[test]
    fn test_decode_message() {
        let err = DocumentStoreError::decode(3, "missing field `name`");
        assert_eq!(err.to_string(), "Failed to decode document 3: missing field `name`");
    }
}

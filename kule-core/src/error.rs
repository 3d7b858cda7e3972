//! Error types and result types for gateway store operations.
//!
//! Every fallible store operation returns [`DocumentStoreResult<T>`]. The HTTP layer
//! maps each variant onto a status code, so variants are split by who is at fault:
//! the caller (malformed ids, documents, filters, forbidden collections) or the store.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when talking to a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The identifier is not well-formed for the store's primary key type.
    #[error("Invalid document id: {0}")]
    InvalidId(String),
    /// The payload is not a JSON object or cannot be stored as a document.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The raw filter could not be parsed into a filter document.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    /// The collection is not part of the configured whitelist.
    #[error("Access to collection {0} is forbidden")]
    CollectionForbidden(String),
    /// The requested document was not found in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Returns `true` when the error was caused by the request rather than the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DocumentStoreError::Serialization(_)
                | DocumentStoreError::InvalidId(_)
                | DocumentStoreError::InvalidDocument(_)
                | DocumentStoreError::InvalidFilter(_)
                | DocumentStoreError::CollectionForbidden(_)
                | DocumentStoreError::DocumentNotFound(_, _)
                | DocumentStoreError::DocumentAlreadyExists(_, _)
        )
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

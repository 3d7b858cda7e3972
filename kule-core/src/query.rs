//! Raw filters and list queries.
//!
//! The gateway never interprets filters: a [`RawFilter`] is whatever JSON object the caller
//! supplied, converted to BSON and handed to the backend verbatim. A [`Query`] pairs a
//! filter with the pagination window of a list request.
//!
//! # Example
//!
//! ```ignore
//! use kule_core::query::{Query, RawFilter};
//!
//! let query = Query::builder()
//!     .filter(RawFilter::from_json_str(r#"{"status": "active"}"#)?)
//!     .limit(10)
//!     .offset(20)
//!     .build();
//! ```

use bson::Bson;
use serde_json::Value;

use crate::{
    document::{RawDocument, json_to_bson},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// A filter document passed through to the store unmodified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFilter(RawDocument);

impl RawFilter {
    /// Creates a filter matching every document.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wraps an existing filter document.
    pub fn new(document: RawDocument) -> Self {
        Self(document)
    }

    /// Parses a JSON-encoded filter.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidFilter`] if `raw` is not valid JSON or does not
    /// encode an object.
    pub fn from_json_str(raw: &str) -> DocumentStoreResult<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| DocumentStoreError::InvalidFilter(e.to_string()))?;

        Self::from_json(value)
    }

    /// Converts a JSON value into a filter.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidFilter`] if `value` is not an object.
    pub fn from_json(value: Value) -> DocumentStoreResult<Self> {
        match json_to_bson(value) {
            Bson::Document(document) => Ok(Self(document)),
            _ => Err(DocumentStoreError::InvalidFilter(
                "filter must be a JSON object".to_string(),
            )),
        }
    }

    /// Returns `true` if the filter matches every document.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the underlying filter document.
    pub fn as_document(&self) -> &RawDocument {
        &self.0
    }

    /// Consumes the filter, returning the underlying document.
    pub fn into_document(self) -> RawDocument {
        self.0
    }
}

impl From<RawDocument> for RawFilter {
    fn from(document: RawDocument) -> Self {
        Self(document)
    }
}

/// A list query: a raw filter plus an optional window.
///
/// A missing `limit` returns every matching document after `offset`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Filter selecting documents.
    pub filter: RawFilter,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of documents to skip.
    pub offset: Option<usize>,
}

impl Query {
    /// Creates a query matching every document in the collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

/// Fluent builder for [`Query`].
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter for this query.
    pub fn filter(mut self, filter: RawFilter) -> Self {
        self.query.filter = filter;
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip.
    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

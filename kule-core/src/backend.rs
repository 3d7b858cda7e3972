//! Storage backend abstraction for the gateway.
//!
//! This module defines the traits that abstract over concrete document stores, so the
//! HTTP layer can run against an in-memory store in tests and MongoDB in production.
//!
//! # Overview
//!
//! The [`StoreBackend`] trait is the primary-key oriented contract the gateway relies on:
//! find by id, find and count by raw filter, insert, full replace, partial field update,
//! and idempotent removal. Implementations must be thread-safe (`Send + Sync`) because a
//! single backend instance is shared by every in-flight request.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: An object-safe twin used behind `Box<dyn _>`
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use kule_core::{backend::StoreBackend, document::DocumentId};
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//! let id = DocumentId::new();
//! backend.insert_document(id, doc! { "_id": id, "name": "Alice" }, "users").await?;
//! assert!(backend.find_document(id, "users").await?.is_some());
//! ```

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    document::{DocumentId, RawDocument},
    error::DocumentStoreResult,
    query::{Query, RawFilter},
};

/// Abstract interface for document storage backends.
///
/// # Concurrency
///
/// Consistency of concurrent writes to the same document is whatever the underlying
/// store provides; the gateway adds no locking or versioning on top.
///
/// # Error Handling
///
/// Missing documents are reported through return values (`Option`, `bool`), not errors.
/// Errors are reserved for malformed input and store failures.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Checks that the store is reachable.
    async fn ping(&self) -> DocumentStoreResult<()>;

    /// Inserts a new document under `id`.
    ///
    /// The document already carries `id` in its `_id` field. The collection is created
    /// implicitly if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentAlreadyExists`](crate::error::DocumentStoreError::DocumentAlreadyExists)
    /// if a document with the same id is already stored.
    async fn insert_document(
        &self,
        id: DocumentId,
        document: RawDocument,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Retrieves a document by primary key.
    ///
    /// Returns `Ok(None)` if the document (or the collection) does not exist.
    async fn find_document(
        &self,
        id: DocumentId,
        collection: &str,
    ) -> DocumentStoreResult<Option<RawDocument>>;

    /// Retrieves the documents matching `query.filter`, honoring `offset` then `limit`.
    ///
    /// Documents come back in the store's natural order.
    async fn find_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<RawDocument>>;

    /// Counts every document matching `filter`, ignoring any pagination.
    async fn count_documents(&self, filter: &RawFilter, collection: &str) -> DocumentStoreResult<u64>;

    /// Replaces the whole document stored under `id`.
    ///
    /// Returns `Ok(false)` when no document matched.
    async fn replace_document(
        &self,
        id: DocumentId,
        document: RawDocument,
        collection: &str,
    ) -> DocumentStoreResult<bool>;

    /// Sets the given fields on the document stored under `id`, leaving all other
    /// fields untouched. Dotted keys address embedded documents, as with `$set`.
    ///
    /// Returns `Ok(false)` when no document matched.
    async fn update_fields(
        &self,
        id: DocumentId,
        fields: RawDocument,
        collection: &str,
    ) -> DocumentStoreResult<bool>;

    /// Removes the document stored under `id`. Removing a missing document succeeds.
    async fn remove_document(&self, id: DocumentId, collection: &str) -> DocumentStoreResult<()>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op; backends holding connections override it.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Object-safe counterpart of [`StoreBackend`].
///
/// Implemented for every `StoreBackend`, it lets the gateway hold a
/// `Box<dyn DynStoreBackend>` chosen at runtime from configuration.
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn ping(&self) -> DocumentStoreResult<()>;
    async fn insert_document(
        &self,
        id: DocumentId,
        document: RawDocument,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn find_document(
        &self,
        id: DocumentId,
        collection: &str,
    ) -> DocumentStoreResult<Option<RawDocument>>;
    async fn find_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<RawDocument>>;
    async fn count_documents(&self, filter: &RawFilter, collection: &str) -> DocumentStoreResult<u64>;
    async fn replace_document(
        &self,
        id: DocumentId,
        document: RawDocument,
        collection: &str,
    ) -> DocumentStoreResult<bool>;
    async fn update_fields(
        &self,
        id: DocumentId,
        fields: RawDocument,
        collection: &str,
    ) -> DocumentStoreResult<bool>;
    async fn remove_document(&self, id: DocumentId, collection: &str) -> DocumentStoreResult<()>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;
}

#[async_trait]
impl<B: StoreBackend + Send + Sync + 'static> DynStoreBackend for B {
    async fn ping(&self) -> DocumentStoreResult<()> {
        StoreBackend::ping(self).await
    }

    async fn insert_document(
        &self,
        id: DocumentId,
        document: RawDocument,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::insert_document(self, id, document, collection).await
    }

    async fn find_document(
        &self,
        id: DocumentId,
        collection: &str,
    ) -> DocumentStoreResult<Option<RawDocument>> {
        StoreBackend::find_document(self, id, collection).await
    }

    async fn find_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<RawDocument>> {
        StoreBackend::find_documents(self, query, collection).await
    }

    async fn count_documents(&self, filter: &RawFilter, collection: &str) -> DocumentStoreResult<u64> {
        StoreBackend::count_documents(self, filter, collection).await
    }

    async fn replace_document(
        &self,
        id: DocumentId,
        document: RawDocument,
        collection: &str,
    ) -> DocumentStoreResult<bool> {
        StoreBackend::replace_document(self, id, document, collection).await
    }

    async fn update_fields(
        &self,
        id: DocumentId,
        fields: RawDocument,
        collection: &str,
    ) -> DocumentStoreResult<bool> {
        StoreBackend::update_fields(self, id, fields, collection).await
    }

    async fn remove_document(&self, id: DocumentId, collection: &str) -> DocumentStoreResult<()> {
        StoreBackend::remove_document(self, id, collection).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }
}

/// Factory for backends whose construction is asynchronous or fallible.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}

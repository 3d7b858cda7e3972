//! Collection handles for gateway store operations.
//!
//! A [`Collection`] binds a collection name to the backend shared by the
//! [`StoreGateway`](crate::store::StoreGateway). Handles are cheap, borrow the backend, and
//! are only handed out after the whitelist check, so holding one means the collection is
//! accessible.
//!
//! # Example
//!
//! ```ignore
//! let widgets = gateway.collection("widgets")?;
//! let id = widgets.insert(doc! { "name": "sprocket" }).await?;
//! let stored = widgets.find_one(id).await?;
//! ```

use bson::Bson;

use crate::{
    backend::DynStoreBackend,
    document::{DocumentId, ID_FIELD, RawDocument},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Query, RawFilter},
};

/// A named collection with a reference to the store backend.
#[derive(Debug, Clone, Copy)]
pub struct Collection<'a> {
    name: &'a str,
    backend: &'a dyn DynStoreBackend,
}

impl<'a> Collection<'a> {
    /// Creates a new collection reference (internal use).
    pub(crate) fn new(name: &'a str, backend: &'a dyn DynStoreBackend) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Fetches a single document by primary key.
    pub async fn find_one(&self, id: DocumentId) -> DocumentStoreResult<Option<RawDocument>> {
        self.backend
            .find_document(id, self.name)
            .await
    }

    /// Fetches a single document, failing with
    /// [`DocumentStoreError::DocumentNotFound`] when it doesn't exist.
    pub async fn get(&self, id: DocumentId) -> DocumentStoreResult<RawDocument> {
        self.find_one(id)
            .await?
            .ok_or_else(|| DocumentStoreError::DocumentNotFound(id.to_string(), self.name.to_string()))
    }

    /// Returns the documents selected by `query`.
    pub async fn find(&self, query: Query) -> DocumentStoreResult<Vec<RawDocument>> {
        self.backend
            .find_documents(query, self.name)
            .await
    }

    /// Counts all documents matching `filter`.
    pub async fn count(&self, filter: &RawFilter) -> DocumentStoreResult<u64> {
        self.backend
            .count_documents(filter, self.name)
            .await
    }

    /// Inserts `document` as-is and returns its primary key.
    ///
    /// A document without `_id` gets a freshly generated one. An `_id` given as an ObjectId
    /// or as its hex string is used as the new key.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidId`] if `_id` is present but not a valid key.
    pub async fn insert(&self, mut document: RawDocument) -> DocumentStoreResult<DocumentId> {
        let id = match document.remove(ID_FIELD) {
            None => DocumentId::new(),
            Some(Bson::ObjectId(oid)) => oid.into(),
            Some(Bson::String(token)) => DocumentId::parse(&token)?,
            Some(other) => return Err(DocumentStoreError::InvalidId(other.to_string())),
        };

        self.backend
            .insert_document(id, with_id(id, document), self.name)
            .await?;

        Ok(id)
    }

    /// Replaces the whole document stored under `id`.
    ///
    /// Any `_id` in `document` is ignored; the stored document keeps `id`.
    /// Returns `Ok(false)` when nothing was stored under `id`.
    pub async fn replace(&self, id: DocumentId, mut document: RawDocument) -> DocumentStoreResult<bool> {
        document.remove(ID_FIELD);

        self.backend
            .replace_document(id, with_id(id, document), self.name)
            .await
    }

    /// Merges `fields` into the document stored under `id`.
    ///
    /// The primary key cannot be changed, so `_id` is dropped from `fields`.
    /// Returns `Ok(false)` when nothing was stored under `id`.
    pub async fn patch(&self, id: DocumentId, mut fields: RawDocument) -> DocumentStoreResult<bool> {
        fields.remove(ID_FIELD);

        self.backend
            .update_fields(id, fields, self.name)
            .await
    }

    /// Removes the document stored under `id`, if any.
    pub async fn remove(&self, id: DocumentId) -> DocumentStoreResult<()> {
        self.backend
            .remove_document(id, self.name)
            .await
    }
}

fn with_id(id: DocumentId, document: RawDocument) -> RawDocument {
    let mut stored = RawDocument::new();
    stored.insert(ID_FIELD, Bson::from(id));

    for (key, value) in document {
        stored.insert(key, value);
    }

    stored
}

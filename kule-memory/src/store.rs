//! In-memory storage implementation for the gateway.
//!
//! This module provides a simple in-memory backend that keeps each collection as a
//! vector of documents in insertion order, guarded by async-safe read-write locks.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use bson::Bson;
use mea::rwlock::RwLock;

use kule_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    document::{DocumentId, RawDocument},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Query, RawFilter},
};

use crate::evaluator::DocumentEvaluator;

/// The most null slots a single positional update may append to an array.
const MAX_ARRAY_PADDING: usize = 1_500_000;

type CollectionMap = Vec<(DocumentId, RawDocument)>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document storage backend.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Ordering
///
/// List results come back in insertion order, like a store's natural order. Lookups by
/// primary key scan the collection, which is fine for development and test data sets.
///
/// # Example
///
/// ```ignore
/// use kule_memory::InMemoryStore;
/// use kule_core::{backend::StoreBackend, document::DocumentId};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let id = DocumentId::new();
/// store.insert_document(id, doc! { "_id": id, "name": "Alice" }, "users").await?;
/// assert!(store.find_document(id, "users").await?.is_some());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// The main storage map: collection_name -> [(document_id, document)] in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn ping(&self) -> DocumentStoreResult<()> {
        Ok(())
    }

    async fn insert_document(&self, id: DocumentId, document: RawDocument, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        if position(collection_map, id).is_some() {
            return Err(DocumentStoreError::DocumentAlreadyExists(id.to_string(), collection.to_string()));
        }

        collection_map.push((id, document));

        Ok(())
    }

    async fn find_document(&self, id: DocumentId, collection: &str) -> DocumentStoreResult<Option<RawDocument>> {
        Ok(
            self.store
                .read()
                .await
                .get(collection)
                .and_then(|collection_map| {
                    position(collection_map, id).map(|index| collection_map[index].1.clone())
                })
        )
    }

    async fn find_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<RawDocument>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        Ok(
            DocumentEvaluator::filter_documents(documents(collection_map), &query.filter)?
                .into_iter()
                .skip(query.offset.unwrap_or(0))
                .take(query.limit.unwrap_or(usize::MAX))
                .cloned()
                .collect()
        )
    }

    async fn count_documents(&self, filter: &RawFilter, collection: &str) -> DocumentStoreResult<u64> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(0),
        };

        Ok(DocumentEvaluator::filter_documents(documents(collection_map), filter)?.len() as u64)
    }

    async fn replace_document(&self, id: DocumentId, document: RawDocument, collection: &str) -> DocumentStoreResult<bool> {
        let mut store = self.store.write().await;

        match store
            .get_mut(collection)
            .and_then(|collection_map| slot(collection_map, id))
        {
            Some(existing) => {
                *existing = document;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_fields(&self, id: DocumentId, fields: RawDocument, collection: &str) -> DocumentStoreResult<bool> {
        let mut store = self.store.write().await;

        match store
            .get_mut(collection)
            .and_then(|collection_map| slot(collection_map, id))
        {
            Some(existing) => {
                let mut updated = existing.clone();
                for (field, value) in fields {
                    set_path(&mut updated, &field, value)?;
                }

                *existing = updated;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_document(&self, id: DocumentId, collection: &str) -> DocumentStoreResult<()> {
        if let Some(collection_map) = self.store.write().await.get_mut(collection) {
            collection_map.retain(|(existing, _)| *existing != id);
        }

        Ok(())
    }
}

fn position(collection_map: &CollectionMap, id: DocumentId) -> Option<usize> {
    collection_map
        .iter()
        .position(|(existing, _)| *existing == id)
}

fn slot(collection_map: &mut CollectionMap, id: DocumentId) -> Option<&mut RawDocument> {
    collection_map
        .iter_mut()
        .find(|(existing, _)| *existing == id)
        .map(|(_, document)| document)
}

/// Sets `path` in `document`. Dotted segments descend into embedded documents and
/// array positions, creating missing documents along the way.
fn set_path(document: &mut RawDocument, path: &str, value: Bson) -> DocumentStoreResult<()> {
    if path.split('.').any(str::is_empty) {
        return Err(DocumentStoreError::InvalidDocument(format!("empty segment in field path {path:?}")));
    }

    set_field(document, path, value)
}

fn set_field(document: &mut RawDocument, path: &str, value: Bson) -> DocumentStoreResult<()> {
    let Some((head, rest)) = path.split_once('.') else {
        document.insert(path, value);
        return Ok(());
    };

    if !document.contains_key(head) {
        document.insert(head, RawDocument::new());
    }

    match document.get_mut(head) {
        Some(child) => set_nested(child, rest, value),
        None => Err(DocumentStoreError::InvalidDocument(format!("cannot create field {head:?}"))),
    }
}

fn set_nested(target: &mut Bson, path: &str, value: Bson) -> DocumentStoreResult<()> {
    match target {
        Bson::Document(document) => set_field(document, path, value),
        Bson::Array(items) => {
            let (head, rest) = match path.split_once('.') {
                Some((head, rest)) => (head, Some(rest)),
                None => (path, None),
            };
            let index: usize = head
                .parse()
                .map_err(|_| DocumentStoreError::InvalidDocument(format!("cannot create field {head:?} in an array")))?;

            if index >= items.len() {
                if index - items.len() > MAX_ARRAY_PADDING {
                    return Err(DocumentStoreError::InvalidDocument(format!("array index {index} is too far past the end")));
                }

                items.resize(index + 1, Bson::Null);
                if rest.is_some() {
                    items[index] = Bson::Document(RawDocument::new());
                }
            }

            match rest {
                Some(rest) => set_nested(&mut items[index], rest, value),
                None => {
                    items[index] = value;
                    Ok(())
                }
            }
        }
        other => Err(DocumentStoreError::InvalidDocument(format!("cannot create field {path:?} in {other}"))),
    }
}

fn documents(collection_map: &CollectionMap) -> impl Iterator<Item = &RawDocument> {
    collection_map.iter().map(|(_, document)| document)
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    async fn seeded(values: &[i32]) -> (InMemoryStore, Vec<DocumentId>) {
        let store = InMemoryStore::new();
        let mut ids = Vec::new();

        for value in values {
            let id = DocumentId::new();
            store
                .insert_document(id, doc! { "_id": id, "n": *value }, "numbers")
                .await
                .unwrap();
            ids.push(id);
        }

        (store, ids)
    }

    #[tokio::test]
    async fn test_find_documents_applies_offset_then_limit() {
        let (store, _) = seeded(&[1, 2, 3, 4, 5]).await;
        let page = store
            .find_documents(Query::builder().offset(1).limit(2).build(), "numbers")
            .await
            .unwrap();

        let values: Vec<i32> = page.iter().map(|d| d.get_i32("n").unwrap()).collect();
        assert_eq!(values, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_count_ignores_window() {
        let (store, _) = seeded(&[1, 2, 3, 4, 5]).await;
        let filter = RawFilter::new(doc! { "n": { "$gt": 2 } });
        assert_eq!(store.count_documents(&filter, "numbers").await.unwrap(), 3);
        assert_eq!(store.count_documents(&RawFilter::empty(), "missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let (store, ids) = seeded(&[1]).await;
        let result = store
            .insert_document(ids[0], doc! { "_id": ids[0] }, "numbers")
            .await;
        assert!(matches!(result, Err(DocumentStoreError::DocumentAlreadyExists(_, _))));
    }

    #[tokio::test]
    async fn test_update_fields_merges() {
        let store = InMemoryStore::new();
        let id = DocumentId::new();
        store
            .insert_document(id, doc! { "_id": id, "a": 1, "b": 3 }, "things")
            .await
            .unwrap();

        assert!(store.update_fields(id, doc! { "a": 2 }, "things").await.unwrap());
        assert_eq!(
            store.find_document(id, "things").await.unwrap(),
            Some(doc! { "_id": id, "a": 2, "b": 3 })
        );
        assert!(!store.update_fields(DocumentId::new(), doc! { "a": 2 }, "things").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_fields_follows_dotted_paths() {
        let store = InMemoryStore::new();
        let id = DocumentId::new();
        store
            .insert_document(id, doc! { "_id": id, "a": { "c": 0 }, "tags": ["x"] }, "things")
            .await
            .unwrap();

        let fields = doc! { "a.b": 1, "d.e.f": true, "tags.2": "z", "tags.0": "w" };
        assert!(store.update_fields(id, fields, "things").await.unwrap());
        assert_eq!(
            store.find_document(id, "things").await.unwrap(),
            Some(doc! {
                "_id": id,
                "a": { "c": 0, "b": 1 },
                "tags": ["w", Bson::Null, "z"],
                "d": { "e": { "f": true } },
            })
        );
    }

    #[tokio::test]
    async fn test_update_fields_rejects_unreachable_paths() {
        let store = InMemoryStore::new();
        let id = DocumentId::new();
        let original = doc! { "_id": id, "a": 1, "tags": ["x"] };
        store.insert_document(id, original.clone(), "things").await.unwrap();

        for fields in [doc! { "z": 1, "a.b": 2 }, doc! { "tags.first": 1 }, doc! { "a..b": 1 }] {
            let result = store.update_fields(id, fields, "things").await;
            assert!(matches!(result, Err(DocumentStoreError::InvalidDocument(_))));
        }

        assert_eq!(store.find_document(id, "things").await.unwrap(), Some(original));
    }

    #[tokio::test]
    async fn test_replace_reports_missing_documents() {
        let (store, ids) = seeded(&[1]).await;
        assert!(store.replace_document(ids[0], doc! { "_id": ids[0], "x": true }, "numbers").await.unwrap());
        assert!(!store.replace_document(DocumentId::new(), doc! { "x": true }, "numbers").await.unwrap());
        assert_eq!(
            store.find_document(ids[0], "numbers").await.unwrap(),
            Some(doc! { "_id": ids[0], "x": true })
        );
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (store, ids) = seeded(&[1]).await;
        store.remove_document(ids[0], "numbers").await.unwrap();
        store.remove_document(ids[0], "numbers").await.unwrap();
        store.remove_document(ids[0], "never-created").await.unwrap();
        assert_eq!(store.find_document(ids[0], "numbers").await.unwrap(), None);
    }
}

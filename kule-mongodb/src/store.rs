use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, doc};
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions},
};
use kule_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    document::{DocumentId, RawDocument},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Query, RawFilter},
};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    /// Returns the name of the database this store reads and writes.
    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

fn by_id(id: DocumentId) -> Document {
    doc! { "_id": id }
}

fn backend_error(err: MongoError) -> DocumentStoreError {
    DocumentStoreError::Backend(err.to_string())
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn ping(&self) -> DocumentStoreResult<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        Ok(())
    }

    async fn insert_document(&self, id: DocumentId, document: RawDocument, collection: &str) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .insert_one(document)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    DocumentStoreError::DocumentAlreadyExists(id.to_string(), collection.to_string())
                } else {
                    backend_error(e)
                }
            })?;

        Ok(())
    }

    async fn find_document(&self, id: DocumentId, collection: &str) -> DocumentStoreResult<Option<RawDocument>> {
        self.get_collection(collection)
            .find_one(by_id(id))
            .await
            .map_err(backend_error)
    }

    async fn find_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<RawDocument>> {
        let options = find_options(&query);

        // A zero limit means "no limit" to the server, so short-circuit it here.
        if query.limit == Some(0) {
            return Ok(vec![]);
        }

        self.get_collection(collection)
            .find(query.filter.into_document())
            .with_options(options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn count_documents(&self, filter: &RawFilter, collection: &str) -> DocumentStoreResult<u64> {
        self.get_collection(collection)
            .count_documents(filter.as_document().clone())
            .await
            .map_err(backend_error)
    }

    async fn replace_document(&self, id: DocumentId, document: RawDocument, collection: &str) -> DocumentStoreResult<bool> {
        let result = self.get_collection(collection)
            .replace_one(by_id(id), document)
            .await
            .map_err(backend_error)?;

        Ok(result.matched_count > 0)
    }

    async fn update_fields(&self, id: DocumentId, fields: RawDocument, collection: &str) -> DocumentStoreResult<bool> {
        // `$set` with an empty document is rejected by the server.
        if fields.is_empty() {
            return Ok(self.find_document(id, collection).await?.is_some());
        }

        let result = self.get_collection(collection)
            .update_one(by_id(id), doc! { "$set": fields })
            .await
            .map_err(backend_error)?;

        Ok(result.matched_count > 0)
    }

    async fn remove_document(&self, id: DocumentId, collection: &str) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .delete_one(by_id(id))
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.shutdown().await
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }

    /// Creates a builder connecting to a single `host:port` server.
    pub fn from_host(host: &str, port: u16, database: &str) -> Self {
        Self::new(&format!("mongodb://{host}:{port}"), database)
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}

/// Window options for `find`. Values beyond the driver's integer range saturate.
fn find_options(query: &Query) -> FindOptions {
    let mut options = FindOptions::default();

    options.limit = query
        .limit
        .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));
    options.skip = query
        .offset
        .map(|skip| u64::try_from(skip).unwrap_or(u64::MAX));

    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_host_builds_uri() {
        let builder = MongoDbStoreBuilder::from_host("db.internal", 27018, "kule");
        assert_eq!(builder.dsn, "mongodb://db.internal:27018");
        assert_eq!(builder.database, "kule");
    }

    #[test]
    fn test_find_options_saturate_huge_windows() {
        let query = Query {
            limit: Some(usize::MAX),
            offset: Some(usize::MAX),
            ..Query::default()
        };

        let options = find_options(&query);
        assert_eq!(options.limit, Some(i64::MAX));
        assert_eq!(options.skip, Some(usize::MAX as u64));

        let options = find_options(&Query {
            limit: Some(20),
            offset: None,
            ..Query::default()
        });
        assert_eq!(options.limit, Some(20));
        assert_eq!(options.skip, None);
    }

    #[test]
    fn test_by_id_filter() {
        let id = DocumentId::new();
        assert_eq!(by_id(id), doc! { "_id": *id.as_object_id() });
    }
}

//! Startup and serving.

use std::sync::Arc;

use kule_core::{backend::StoreBackendBuilder, store::StoreGateway};
use kule_memory::InMemoryStore;
use tokio::net::TcpListener;

use crate::{
    config::{GatewayConfig, StoreConfig, StoreKind},
    dispatch::Resources,
    error::ServerError,
};

/// Builds the gateway described by `config` and checks the store is reachable.
pub async fn connect(config: &GatewayConfig) -> Result<StoreGateway, ServerError> {
    let gateway = match config.store.backend {
        StoreKind::Memory => StoreGateway::builder(InMemoryStore::builder().build().await?),
        StoreKind::Mongodb => StoreGateway::builder(mongodb(&config.store).await?),
    }
    .collections(&config.collections)
    .build();

    let gateway = open(gateway).await?;

    tracing::info!(
        backend = %config.store.backend,
        database = %config.store.database,
        collections = ?config.collections,
        "store reachable"
    );

    Ok(gateway)
}

/// Pings the store behind `gateway`, handing the gateway back once it answers.
pub async fn open(gateway: StoreGateway) -> Result<StoreGateway, ServerError> {
    if let Err(e) = gateway.ping().await {
        tracing::error!(error = %e, "store unreachable");
        return Err(e.into());
    }

    Ok(gateway)
}

#[cfg(feature = "mongodb")]
async fn mongodb(config: &StoreConfig) -> Result<kule_mongodb::MongoDbStore, ServerError> {
    let builder = match &config.uri {
        Some(uri) => kule_mongodb::MongoDbStoreBuilder::new(uri, &config.database),
        None => kule_mongodb::MongoDbStoreBuilder::from_host(&config.host, config.port, &config.database),
    };

    Ok(builder.build().await?)
}

#[cfg(not(feature = "mongodb"))]
async fn mongodb(_config: &StoreConfig) -> Result<InMemoryStore, ServerError> {
    Err(ServerError::Config("built without the mongodb backend, use --store memory".to_string()))
}

/// Serves `resources` until Ctrl-C, then shuts the store down.
pub async fn run(config: GatewayConfig, resources: Resources) -> Result<(), ServerError> {
    let gateway = Arc::new(connect(&config).await?);
    let router = resources.into_router(gateway.clone());

    let (host, port) = config.server.bind_addr()?;
    let listener = TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down");

    match Arc::try_unwrap(gateway) {
        Ok(gateway) => gateway.shutdown().await?,
        Err(_) => tracing::warn!("store still in use, skipping shutdown"),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kule_core::{
        backend::StoreBackend,
        document::{DocumentId, RawDocument},
        error::{DocumentStoreError, DocumentStoreResult},
        query::{Query, RawFilter},
    };

    /// A store that never answers.
    #[derive(Debug)]
    struct Unreachable;

    fn down<T>() -> DocumentStoreResult<T> {
        Err(DocumentStoreError::Initialization("connection refused".to_string()))
    }

    #[async_trait]
    impl StoreBackend for Unreachable {
        async fn ping(&self) -> DocumentStoreResult<()> {
            down()
        }

        async fn insert_document(&self, _: DocumentId, _: RawDocument, _: &str) -> DocumentStoreResult<()> {
            down()
        }

        async fn find_document(&self, _: DocumentId, _: &str) -> DocumentStoreResult<Option<RawDocument>> {
            down()
        }

        async fn find_documents(&self, _: Query, _: &str) -> DocumentStoreResult<Vec<RawDocument>> {
            down()
        }

        async fn count_documents(&self, _: &RawFilter, _: &str) -> DocumentStoreResult<u64> {
            down()
        }

        async fn replace_document(&self, _: DocumentId, _: RawDocument, _: &str) -> DocumentStoreResult<bool> {
            down()
        }

        async fn update_fields(&self, _: DocumentId, _: RawDocument, _: &str) -> DocumentStoreResult<bool> {
            down()
        }

        async fn remove_document(&self, _: DocumentId, _: &str) -> DocumentStoreResult<()> {
            down()
        }
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_startup() {
        let gateway = StoreGateway::builder(Unreachable).build();

        let result = open(gateway).await;
        assert!(matches!(
            result,
            Err(ServerError::Store(DocumentStoreError::Initialization(_)))
        ));
    }

    #[tokio::test]
    async fn test_open_returns_reachable_gateway() {
        let gateway = StoreGateway::builder(InMemoryStore::new()).build();
        let gateway = open(gateway).await.unwrap();
        gateway.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_memory_store_with_whitelist() {
        let config = GatewayConfig {
            store: StoreConfig {
                backend: StoreKind::Memory,
                ..Default::default()
            },
            collections: vec!["widgets".to_string()],
            ..Default::default()
        };

        let gateway = connect(&config).await.unwrap();
        assert!(gateway.is_permitted("widgets"));
        assert!(!gateway.is_permitted("gadgets"));
        gateway.shutdown().await.unwrap();
    }
}

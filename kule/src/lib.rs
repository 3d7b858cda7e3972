//! Main kule crate: a REST gateway over schemaless document collections.
//!
//! This crate is the primary entry point for embedding the gateway. It re-exports the
//! store contract, the backends and the HTTP surface from the sub-crates.
//!
//! # Features
//!
//! - **Generic CRUD** - Every collection is a REST resource with paginated, filtered listing
//! - **Overrides** - Replace the view for one verb on one collection, keep the rest generic
//! - **Bundlers** - Transform documents of a collection before they are rendered
//! - **Whitelist** - Restrict the gateway to a fixed set of collections
//! - **Multiple backends** - In-memory and MongoDB (`mongodb` feature) stores
//!
//! # Quick Start
//!
//! ```ignore
//! use kule::{prelude::*, memory::InMemoryStore};
//! use serde_json::json;
//!
//! async fn widget_totals(ctx: ViewContext, request: ResourceRequest) -> ViewResult {
//!     let widgets = ctx.collection(&request.collection)?;
//!     let total = widgets.count(&RawFilter::empty()).await?;
//!
//!     Ok(ResourceResponse::ok(json!({ "total": total })))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = StoreGateway::builder(InMemoryStore::new())
//!         .collections(["widgets", "gadgets"])
//!         .build();
//!
//!     let router = Resources::new()
//!         .view(Verb::Get, "widgets", Cardinality::List, widget_totals)
//!         .bundler("gadgets", |mut gadget: bson::Document| {
//!             gadget.insert("computed", true);
//!             gadget
//!         })
//!         .into_router(gateway);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, router).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB storage (requires the `mongodb` feature)

pub mod prelude;

pub use kule_core::{backend, collection, document, error, page, query, store};
pub use kule_server::{bundle, config, dispatch, params, resource, server, telemetry, views};

// Re-export BSON types for convenience
pub use bson;

/// Builds the router serving `resources` over `gateway`.
pub fn router(gateway: store::StoreGateway, resources: dispatch::Resources) -> axum::Router {
    resources.into_router(gateway)
}

/// In-memory storage backend implementations.
pub mod memory {
    pub use kule_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use kule_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}

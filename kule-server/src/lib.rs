//! HTTP surface of the kule document gateway.
//!
//! Every collection of a document store is exposed as a REST resource:
//!
//! | method | path                 | answer                          |
//! |--------|----------------------|---------------------------------|
//! | GET    | `/{collection}`      | `{meta, objects}` page, 200     |
//! | POST   | `/{collection}`      | `{_id}` of the new document, 201 |
//! | GET    | `/{collection}/{id}` | the document, 200               |
//! | PUT    | `/{collection}/{id}` | the submitted body, 202         |
//! | PATCH  | `/{collection}/{id}` | the merged document, 202        |
//! | DELETE | `/{collection}/{id}` | empty, 204                      |
//!
//! Per-collection views and bundlers are registered on [`Resources`](dispatch::Resources)
//! before the router is built.
//!
//! # Example
//!
//! ```ignore
//! use kule_core::store::StoreGateway;
//! use kule_memory::InMemoryStore;
//! use kule_server::dispatch::Resources;
//!
//! let gateway = StoreGateway::builder(InMemoryStore::new())
//!     .collections(["widgets"])
//!     .build();
//!
//! let router = Resources::new()
//!     .bundler("widgets", |mut widget: bson::Document| {
//!         widget.insert("computed", true);
//!         widget
//!     })
//!     .into_router(gateway);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//! axum::serve(listener, router).await?;
//! ```

pub mod bundle;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod params;
pub mod resource;
pub mod server;
pub mod telemetry;
pub mod views;

pub use dispatch::Resources;
pub use error::{ApiError, ServerError};
pub use resource::{Cardinality, ResourceRequest, ResourceResponse, Verb, View, ViewContext, ViewResult};

//! Store contract for the kule document gateway.
//!
//! This crate is the core of the kule project and provides:
//!
//! - **Documents and identifiers** ([`document`]) - Schemaless ordered documents, primary keys and JSON conversion
//! - **Store backend abstraction** ([`backend`]) - Traits implemented by concrete stores
//! - **Raw filters and queries** ([`query`]) - Caller supplied filters passed through verbatim
//! - **Pagination** ([`page`]) - The list window and the paginated envelope
//! - **Collections** ([`collection`]) - Handles performing CRUD against one collection
//! - **Store gateway** ([`store`]) - Backend plus collection whitelist
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use kule_core::{store::StoreGateway, query::Query};
//! use kule_memory::InMemoryStore;
//! use bson::doc;
//!
//! let gateway = StoreGateway::builder(InMemoryStore::new())
//!     .collections(["widgets"])
//!     .build();
//!
//! let widgets = gateway.collection("widgets")?;
//! let id = widgets.insert(doc! { "name": "sprocket" }).await?;
//! let all = widgets.find(Query::new()).await?;
//! ```

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod page;
pub mod query;
pub mod store;

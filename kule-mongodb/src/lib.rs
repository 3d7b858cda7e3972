//! MongoDB backend implementation for kule.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Raw filters received by the gateway are handed to the server unmodified, so callers
//! get MongoDB's full query language.
//!
//! To use this backend through the facade crate, enable the `mongodb` feature:
//!
//! ```toml
//! [dependencies]
//! kule = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! The client is created lazily: building the store never touches the network, and the
//! first operation (typically the startup [`ping`](kule_core::backend::StoreBackend::ping))
//! establishes the connection.
//!
//! # Example
//!
//! ```ignore
//! use kule_core::backend::{StoreBackend, StoreBackendBuilder};
//! use kule_mongodb::MongoDbStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "my_database")
//!         .build()
//!         .await?;
//!     store.ping().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};

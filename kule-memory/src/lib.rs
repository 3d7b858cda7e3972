//! In-memory document storage backend for kule.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is ideal for development
//! and testing the gateway without a running database.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Raw filter support** - Evaluates MongoDB-style filter documents in process
//! - **Natural ordering** - Lists documents in insertion order
//!
//! # Quick Start
//!
//! ```ignore
//! use kule_core::store::StoreGateway;
//! use kule_memory::InMemoryStore;
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = StoreGateway::new(InMemoryStore::new());
//!     let users = gateway.collection("users")?;
//!
//!     let id = users.insert(doc! { "name": "Alice" }).await?;
//!     println!("inserted {id}");
//!
//!     Ok(())
//! }
//! ```

pub mod store;
pub mod evaluator;

pub use store::{InMemoryStore, InMemoryStoreBuilder};

//! The store gateway: a backend plus the collection whitelist.
//!
//! [`StoreGateway`] is the single handle the HTTP layer holds on the document store.
//! It resolves collection names to [`Collection`] handles, refusing names outside a
//! non-empty whitelist. The gateway is immutable once built and is shared by reference
//! across concurrent requests.
//!
//! # Example
//!
//! ```ignore
//! use kule_core::store::StoreGateway;
//!
//! let gateway = StoreGateway::builder(backend)
//!     .collections(["widgets", "gadgets"])
//!     .build();
//!
//! assert!(gateway.collection("widgets").is_ok());
//! assert!(gateway.collection("secrets").is_err());
//! ```

use std::collections::BTreeSet;

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::Collection,
    error::{DocumentStoreError, DocumentStoreResult},
};

/// A document store behind an optional collection whitelist.
#[derive(Debug)]
pub struct StoreGateway {
    backend: Box<dyn DynStoreBackend>,
    whitelist: BTreeSet<String>,
}

impl StoreGateway {
    /// Creates a gateway permitting every collection.
    pub fn new<B: StoreBackend + 'static>(backend: B) -> Self {
        Self::builder(backend).build()
    }

    /// Creates a builder for a gateway over `backend`.
    pub fn builder<B: StoreBackend + 'static>(backend: B) -> StoreGatewayBuilder {
        StoreGatewayBuilder {
            backend: Box::new(backend),
            whitelist: BTreeSet::new(),
        }
    }

    /// Returns the whitelisted collection names, in sorted order.
    ///
    /// An empty iterator means every collection is permitted.
    pub fn whitelist(&self) -> impl Iterator<Item = &str> {
        self.whitelist.iter().map(String::as_str)
    }

    /// Returns `true` if `name` may be accessed through this gateway.
    pub fn is_permitted(&self, name: &str) -> bool {
        self.whitelist.is_empty() || self.whitelist.contains(name)
    }

    /// Resolves `name` to a collection handle.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::CollectionForbidden`] when a whitelist is configured
    /// and does not contain `name`.
    pub fn collection<'a>(&'a self, name: &'a str) -> DocumentStoreResult<Collection<'a>> {
        if !self.is_permitted(name) {
            return Err(DocumentStoreError::CollectionForbidden(name.to_string()));
        }

        Ok(Collection::new(name, self.backend.as_ref()))
    }

    /// Checks that the underlying store is reachable.
    pub async fn ping(&self) -> DocumentStoreResult<()> {
        self.backend.ping().await
    }

    /// Shuts down the backend.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown_boxed().await
    }
}

/// Builder for [`StoreGateway`].
#[derive(Debug)]
pub struct StoreGatewayBuilder {
    backend: Box<dyn DynStoreBackend>,
    whitelist: BTreeSet<String>,
}

impl StoreGatewayBuilder {
    /// Restricts the gateway to the given collections.
    ///
    /// Blank names are ignored, so an empty or blank list leaves every collection permitted.
    pub fn collections<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.whitelist.extend(
            names
                .into_iter()
                .map(|name| name.as_ref().trim().to_string())
                .filter(|name| !name.is_empty()),
        );
        self
    }

    /// Builds the gateway.
    pub fn build(self) -> StoreGateway {
        StoreGateway {
            backend: self.backend,
            whitelist: self.whitelist,
        }
    }
}

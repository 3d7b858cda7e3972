//! Per-collection document transforms applied before a document is rendered.
//!
//! A [`Bundler`] turns a stored document into its response representation. Collections
//! without a registered bundler use [`IdentityBundler`], which returns the document
//! untouched.
//!
//! # Example
//!
//! ```ignore
//! use kule_server::bundle::BundlerRegistry;
//!
//! let mut bundlers = BundlerRegistry::new();
//! bundlers.register("widgets", |mut document: bson::Document| {
//!     document.insert("computed", true);
//!     document
//! });
//! ```

use std::{collections::HashMap, fmt, sync::Arc};

use kule_core::document::RawDocument;

/// A transform from a stored document to its response representation.
pub trait Bundler: Send + Sync {
    fn bundle(&self, document: RawDocument) -> RawDocument;
}

impl<F> Bundler for F
where
    F: Fn(RawDocument) -> RawDocument + Send + Sync,
{
    fn bundle(&self, document: RawDocument) -> RawDocument {
        (self)(document)
    }
}

/// The bundler used for collections without an override.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityBundler;

impl Bundler for IdentityBundler {
    fn bundle(&self, document: RawDocument) -> RawDocument {
        document
    }
}

/// Bundlers keyed by collection name.
#[derive(Clone)]
pub struct BundlerRegistry {
    overrides: HashMap<String, Arc<dyn Bundler>>,
    identity: Arc<dyn Bundler>,
}

impl BundlerRegistry {
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
            identity: Arc::new(IdentityBundler),
        }
    }

    /// Registers `bundler` for `collection`, replacing any previous one.
    pub fn register<B: Bundler + 'static>(&mut self, collection: impl Into<String>, bundler: B) {
        self.overrides.insert(collection.into(), Arc::new(bundler));
    }

    /// Returns the bundler for `collection`, or the identity bundler.
    pub fn resolve(&self, collection: &str) -> Arc<dyn Bundler> {
        self.overrides
            .get(collection)
            .unwrap_or(&self.identity)
            .clone()
    }

    pub fn contains(&self, collection: &str) -> bool {
        self.overrides.contains_key(collection)
    }
}

impl Default for BundlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BundlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut collections: Vec<&str> = self.overrides.keys().map(String::as_str).collect();
        collections.sort_unstable();

        f.debug_struct("BundlerRegistry")
            .field("overrides", &collections)
            .finish()
    }
}

//! Convenient re-exports of commonly used types from kule.
//!
//! ```ignore
//! use kule::prelude::*;
//! ```
//!
//! This provides access to:
//! - The store gateway, collections and backends
//! - Documents, ids, filters and pages
//! - Views, resources and bundlers
//! - Error types

pub use kule_core::{
    backend::{DynStoreBackend, StoreBackend, StoreBackendBuilder},
    collection::Collection,
    document::{DocumentId, RawDocument, document_to_json, json_to_document},
    error::{DocumentStoreError, DocumentStoreResult},
    page::{Page, PageMeta, PaginationWindow},
    query::{Query, QueryBuilder, RawFilter},
    store::{StoreGateway, StoreGatewayBuilder},
};
pub use kule_server::{
    bundle::{Bundler, BundlerRegistry, IdentityBundler},
    dispatch::Resources,
    error::{ApiError, ServerError},
    resource::{Cardinality, ResourceRequest, ResourceResponse, Verb, View, ViewContext, ViewResult},
};

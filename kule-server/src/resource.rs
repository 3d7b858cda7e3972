//! Views and the values flowing through them.
//!
//! A [`View`] handles one verb on one cardinality of a resource. It receives a
//! [`ViewContext`] holding the shared gateway and bundlers, plus the
//! [`ResourceRequest`] extracted from HTTP, and returns a [`ResourceResponse`] or an
//! [`ApiError`].
//!
//! Any `async fn(ViewContext, ResourceRequest) -> ViewResult` is a view:
//!
//! ```ignore
//! async fn get_widgets_list(ctx: ViewContext, request: ResourceRequest) -> ViewResult {
//!     let widgets = ctx.collection(&request.collection)?;
//!     let total = widgets.count(&RawFilter::empty()).await?;
//!     Ok(ResourceResponse::ok(serde_json::json!({ "total": total })))
//! }
//! ```

use std::{collections::HashMap, fmt, future::Future, sync::Arc};

use async_trait::async_trait;
use axum::{
    Json,
    body::Bytes,
    response::{IntoResponse, Response},
    routing::MethodFilter,
};
use http::StatusCode;
use serde_json::Value;

use kule_core::{
    collection::Collection,
    document::{DocumentId, RawDocument, document_to_json, json_to_document},
    store::StoreGateway,
};

use crate::{bundle::{Bundler, BundlerRegistry}, error::ApiError};

pub type ViewResult = Result<ResourceResponse, ApiError>;

/// The HTTP verbs a resource answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 5] = [Verb::Get, Verb::Post, Verb::Put, Verb::Patch, Verb::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }

    pub(crate) fn method_filter(&self) -> MethodFilter {
        match self {
            Verb::Get => MethodFilter::GET,
            Verb::Post => MethodFilter::POST,
            Verb::Put => MethodFilter::PUT,
            Verb::Patch => MethodFilter::PATCH,
            Verb::Delete => MethodFilter::DELETE,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a route addresses a whole collection or a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cardinality {
    List,
    Detail,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::List => f.write_str("list"),
            Cardinality::Detail => f.write_str("detail"),
        }
    }
}

/// Shared state handed to every view.
#[derive(Debug, Clone)]
pub struct ViewContext {
    gateway: Arc<StoreGateway>,
    bundlers: Arc<BundlerRegistry>,
}

impl ViewContext {
    pub fn new(gateway: Arc<StoreGateway>, bundlers: Arc<BundlerRegistry>) -> Self {
        Self { gateway, bundlers }
    }

    pub fn gateway(&self) -> &StoreGateway {
        &self.gateway
    }

    /// Resolves a collection through the whitelist.
    pub fn collection<'a>(&'a self, name: &'a str) -> Result<Collection<'a>, ApiError> {
        Ok(self.gateway.collection(name)?)
    }

    /// Resolves the bundler for `collection`.
    pub fn bundler(&self, collection: &str) -> Arc<dyn Bundler> {
        self.bundlers.resolve(collection)
    }

    /// Bundles `document` for `collection` and renders it as JSON.
    pub fn render(&self, collection: &str, document: RawDocument) -> Value {
        document_to_json(&self.bundler(collection).bundle(document))
    }
}

/// The parts of an HTTP request a view needs.
#[derive(Debug, Clone, Default)]
pub struct ResourceRequest {
    pub collection: String,
    pub pk: Option<String>,
    pub params: HashMap<String, String>,
    pub body: Bytes,
}

impl ResourceRequest {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Default::default()
        }
    }

    pub fn with_pk(mut self, pk: impl Into<String>) -> Self {
        self.pk = Some(pk.into());
        self
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Parses the path id.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::BadRequest`] when the id is missing or malformed.
    pub fn document_id(&self) -> Result<DocumentId, ApiError> {
        let pk = self
            .pk
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("missing document id".to_string()))?;

        Ok(DocumentId::parse(pk)?)
    }

    /// Parses the body as JSON.
    pub fn json(&self) -> Result<Value, ApiError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::BadRequest(format!("unparsable body: {e}")))
    }

    /// Parses the body as a JSON object document.
    pub fn document(&self) -> Result<RawDocument, ApiError> {
        Ok(json_to_document(self.json()?)?)
    }
}

/// A successful view result: a status and an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl ResourceResponse {
    pub fn new(status: StatusCode, body: Option<Value>) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, Some(body))
    }

    pub fn created(body: Value) -> Self {
        Self::new(StatusCode::CREATED, Some(body))
    }

    pub fn accepted(body: Value) -> Self {
        Self::new(StatusCode::ACCEPTED, Some(body))
    }

    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT, None)
    }
}

impl IntoResponse for ResourceResponse {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

/// A handler for one verb and cardinality.
#[async_trait]
pub trait View: Send + Sync {
    async fn call(&self, ctx: ViewContext, request: ResourceRequest) -> ViewResult;
}

#[async_trait]
impl<F, Fut> View for F
where
    F: Fn(ViewContext, ResourceRequest) -> Fut + Send + Sync,
    Fut: Future<Output = ViewResult> + Send + 'static,
{
    async fn call(&self, ctx: ViewContext, request: ResourceRequest) -> ViewResult {
        (self)(ctx, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_requires_valid_pk() {
        let request = ResourceRequest::new("widgets");
        assert!(matches!(request.document_id(), Err(ApiError::BadRequest(_))));

        let request = ResourceRequest::new("widgets").with_pk("not-an-id");
        assert!(matches!(request.document_id(), Err(ApiError::BadRequest(_))));

        let id = DocumentId::new();
        let request = ResourceRequest::new("widgets").with_pk(id.to_string());
        assert_eq!(request.document_id().unwrap(), id);
    }

    #[test]
    fn test_document_body() {
        let request = ResourceRequest::new("widgets").with_body(r#"{"a": 1}"#);
        assert_eq!(request.document().unwrap(), bson::doc! { "a": 1 });

        let request = ResourceRequest::new("widgets").with_body("{");
        assert!(matches!(request.document(), Err(ApiError::BadRequest(_))));

        let request = ResourceRequest::new("widgets").with_body("[1]");
        assert!(matches!(request.document(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_no_content_has_empty_body() {
        let response = ResourceResponse::no_content().into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}

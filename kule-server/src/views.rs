//! The generic views answering every collection without an override.
//!
//! | verb   | list        | detail          |
//! |--------|-------------|-----------------|
//! | GET    | [`get_list`]  | [`get_detail`]    |
//! | POST   | [`post_list`] | not implemented |
//! | PUT    | not implemented | [`put_detail`]    |
//! | PATCH  | not implemented | [`patch_detail`]  |
//! | DELETE | not implemented | [`delete_detail`] |
//!
//! Override views may call these directly and post-process the result.

use serde_json::json;

use kule_core::{
    document::{ID_FIELD, document_to_json, json_to_document},
    page::Page,
};

use crate::{
    error::ApiError,
    params::ListParams,
    resource::{ResourceRequest, ResourceResponse, ViewContext, ViewResult},
};

/// Lists a page of documents matching the `query` filter.
pub async fn get_list(ctx: ViewContext, request: ResourceRequest) -> ViewResult {
    let collection = ctx.collection(&request.collection)?;
    let ListParams { window, filter } = ListParams::from_query(&request.params)?;

    let total_count = collection.count(&filter).await?;
    let documents = collection.find(window.query(filter)).await?;

    let bundler = ctx.bundler(collection.name());
    let page = Page::new(window, total_count, documents)
        .map(|document| document_to_json(&bundler.bundle(document)));

    Ok(ResourceResponse::ok(serde_json::to_value(page)?))
}

/// Inserts the body and answers with the new id.
pub async fn post_list(ctx: ViewContext, request: ResourceRequest) -> ViewResult {
    let collection = ctx.collection(&request.collection)?;
    let document = request.document()?;

    let id = collection.insert(document).await?;
    tracing::debug!(collection = collection.name(), id = %id, "document created");

    Ok(ResourceResponse::created(json!({ ID_FIELD: id.to_string() })))
}

/// Fetches and bundles a single document.
pub async fn get_detail(ctx: ViewContext, request: ResourceRequest) -> ViewResult {
    let collection = ctx.collection(&request.collection)?;
    let id = request.document_id()?;

    let document = collection.get(id).await?;

    Ok(ResourceResponse::ok(ctx.render(collection.name(), document)))
}

/// Replaces a document and echoes the submitted body.
pub async fn put_detail(ctx: ViewContext, request: ResourceRequest) -> ViewResult {
    let collection = ctx.collection(&request.collection)?;
    let id = request.document_id()?;
    let body = request.json()?;

    let document = json_to_document(body.clone())?;
    if !collection.replace(id, document).await? {
        return Err(ApiError::NotFound(format!("{id} in {}", collection.name())));
    }

    Ok(ResourceResponse::accepted(body))
}

/// Merges the body's fields into a document, then answers with the bundled result.
pub async fn patch_detail(ctx: ViewContext, request: ResourceRequest) -> ViewResult {
    let collection = ctx.collection(&request.collection)?;
    let id = request.document_id()?;
    let fields = request.document()?;

    if !collection.patch(id, fields).await? {
        return Err(ApiError::NotFound(format!("{id} in {}", collection.name())));
    }

    let document = collection.get(id).await?;

    Ok(ResourceResponse::accepted(ctx.render(collection.name(), document)))
}

/// Removes a document. Removing a missing document succeeds.
pub async fn delete_detail(ctx: ViewContext, request: ResourceRequest) -> ViewResult {
    let collection = ctx.collection(&request.collection)?;
    let id = request.document_id()?;

    collection.remove(id).await?;

    Ok(ResourceResponse::no_content())
}

/// Answers with 501, or 403 for a collection outside the whitelist.
pub async fn not_implemented(ctx: ViewContext, request: ResourceRequest) -> ViewResult {
    ctx.collection(&request.collection)?;

    let target = match &request.pk {
        Some(pk) => format!("{}/{pk}", request.collection),
        None => request.collection,
    };

    Err(ApiError::NotImplemented(target))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use bson::doc;
    use http::StatusCode;
    use kule_core::{document::DocumentId, store::StoreGateway};
    use kule_memory::InMemoryStore;

    use crate::bundle::BundlerRegistry;

    fn context(collections: &[&str]) -> ViewContext {
        let gateway = StoreGateway::builder(InMemoryStore::new())
            .collections(collections)
            .build();

        ViewContext::new(Arc::new(gateway), Arc::new(BundlerRegistry::new()))
    }

    #[tokio::test]
    async fn test_create_then_detail() {
        let ctx = context(&[]);
        let created = post_list(ctx.clone(), ResourceRequest::new("things").with_body(r#"{"a": 1}"#))
            .await
            .unwrap();
        assert_eq!(created.status, StatusCode::CREATED);

        let id = created.body.unwrap()[ID_FIELD].as_str().unwrap().to_string();
        let detail = get_detail(ctx, ResourceRequest::new("things").with_pk(id.clone()))
            .await
            .unwrap();

        assert_eq!(detail.body, Some(json!({ "_id": id, "a": 1 })));
    }

    #[tokio::test]
    async fn test_put_missing_document_is_not_found() {
        let ctx = context(&[]);
        let result = put_detail(
            ctx,
            ResourceRequest::new("things")
                .with_pk(DocumentId::new().to_string())
                .with_body(r#"{"a": 1}"#),
        )
        .await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_patch_refetches_same_collection() {
        let ctx = context(&[]);
        let id = ctx
            .collection("things")
            .unwrap()
            .insert(doc! { "a": 1, "b": 3 })
            .await
            .unwrap();

        let patched = patch_detail(
            ctx,
            ResourceRequest::new("things")
                .with_pk(id.to_string())
                .with_body(r#"{"a": 2}"#),
        )
        .await
        .unwrap();

        assert_eq!(patched.status, StatusCode::ACCEPTED);
        assert_eq!(patched.body, Some(json!({ "_id": id.to_string(), "a": 2, "b": 3 })));
    }

    #[tokio::test]
    async fn test_forbidden_before_parsing() {
        let ctx = context(&["widgets"]);
        let result = get_list(
            ctx,
            ResourceRequest::new("secrets").with_params([("query".to_string(), "not-json".to_string())].into()),
        )
        .await;

        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_not_implemented() {
        let result = not_implemented(context(&[]), ResourceRequest::new("things")).await;
        assert!(matches!(result, Err(ApiError::NotImplemented(_))));

        let result = not_implemented(context(&["widgets"]), ResourceRequest::new("things")).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }
}

use axum::{Router, body::{Body, Bytes, to_bytes}};
use bson::doc;
use http::{Method, Request, StatusCode, header::CONTENT_TYPE};
use serde_json::{Value, json};
use tower::ServiceExt;

use kule_core::{document::DocumentId, store::StoreGateway};
use kule_memory::InMemoryStore;
use kule_server::{
    Cardinality, ResourceRequest, ResourceResponse, Resources, Verb, ViewContext, ViewResult,
};

struct Reply {
    status: StatusCode,
    content_type: Option<String>,
    body: Option<Value>,
    raw: Bytes,
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> Reply {
    let body = match body {
        Some(body) => Body::from(body.to_string()),
        None => Body::empty(),
    };

    send_raw(router, method, uri, body).await
}

async fn send_raw(router: &Router, method: Method, uri: &str, body: Body) -> Reply {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .map(|value| value.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    Reply {
        status,
        content_type,
        body: (!bytes.is_empty()).then(|| serde_json::from_slice(&bytes).unwrap()),
        raw: bytes,
    }
}

fn gateway(collections: &[&str]) -> StoreGateway {
    StoreGateway::builder(InMemoryStore::new())
        .collections(collections)
        .build()
}

fn router(collections: &[&str]) -> Router {
    Resources::new().into_router(gateway(collections))
}

fn error(status: u16, message: &str) -> Option<Value> {
    Some(json!({ "error": status, "message": message }))
}

async fn create(router: &Router, collection: &str, document: Value) -> String {
    let reply = send(router, Method::POST, &format!("/{collection}"), Some(document)).await;
    assert_eq!(reply.status, StatusCode::CREATED);

    reply.body.unwrap()["_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_forbidden_collection_for_every_verb_and_cardinality() {
    let router = router(&["widgets"]);
    let id = DocumentId::new();

    for method in [Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
        for uri in ["/secrets".to_string(), format!("/secrets/{id}")] {
            let reply = send(&router, method.clone(), &uri, Some(json!({ "a": 1 }))).await;
            assert_eq!(reply.status, StatusCode::FORBIDDEN, "{method} {uri}");
            assert_eq!(reply.body, error(403, "Forbidden."), "{method} {uri}");
        }
    }

    let reply = send(&router, Method::GET, "/widgets", None).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn test_empty_list_envelope() {
    let router = router(&[]);
    let reply = send(&router, Method::GET, "/widgets", None).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.body,
        Some(json!({ "meta": { "limit": 20, "offset": 0, "total_count": 0 }, "objects": [] }))
    );
}

#[tokio::test]
async fn test_create_then_detail() {
    let router = router(&[]);
    let id = create(&router, "things", json!({ "a": 1 })).await;

    let reply = send(&router, Method::GET, &format!("/things/{id}"), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, Some(json!({ "_id": id, "a": 1 })));
}

#[tokio::test]
async fn test_patch_keeps_other_fields() {
    let router = router(&[]);
    let id = create(&router, "things", json!({ "a": 1, "b": 3 })).await;

    let reply = send(&router, Method::PATCH, &format!("/things/{id}"), Some(json!({ "a": 2 }))).await;
    assert_eq!(reply.status, StatusCode::ACCEPTED);
    assert_eq!(reply.body, Some(json!({ "_id": id, "a": 2, "b": 3 })));

    let reply = send(&router, Method::GET, &format!("/things/{id}"), None).await;
    assert_eq!(reply.body, Some(json!({ "_id": id, "a": 2, "b": 3 })));
}

#[tokio::test]
async fn test_put_replaces_and_echoes_body() {
    let router = router(&[]);
    let id = create(&router, "things", json!({ "a": 1, "b": 3 })).await;

    let reply = send(&router, Method::PUT, &format!("/things/{id}"), Some(json!({ "c": [1, 2] }))).await;
    assert_eq!(reply.status, StatusCode::ACCEPTED);
    assert_eq!(reply.body, Some(json!({ "c": [1, 2] })));

    let reply = send(&router, Method::GET, &format!("/things/{id}"), None).await;
    assert_eq!(reply.body, Some(json!({ "_id": id, "c": [1, 2] })));

    let missing = DocumentId::new();
    let reply = send(&router, Method::PUT, &format!("/things/{missing}"), Some(json!({ "c": 1 }))).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let router = router(&[]);
    let id = create(&router, "things", json!({ "a": 1 })).await;

    for _ in 0..2 {
        let reply = send(&router, Method::DELETE, &format!("/things/{id}"), None).await;
        assert_eq!(reply.status, StatusCode::NO_CONTENT);
        assert_eq!(reply.body, None);
    }

    let reply = send(&router, Method::GET, &format!("/things/{id}"), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, error(404, "Document Not Found."));
}

#[tokio::test]
async fn test_bundler_applies_to_its_collection_only() {
    let router = Resources::new()
        .bundler("widgets", |mut widget: bson::Document| {
            widget.insert("computed", true);
            widget
        })
        .into_router(gateway(&[]));

    let widget = create(&router, "widgets", json!({ "name": "sprocket" })).await;
    let gadget = create(&router, "gadgets", json!({ "name": "cog" })).await;

    let reply = send(&router, Method::GET, "/widgets", None).await;
    assert_eq!(reply.body.unwrap()["objects"][0]["computed"], json!(true));

    let reply = send(&router, Method::GET, &format!("/widgets/{widget}"), None).await;
    assert_eq!(reply.body, Some(json!({ "_id": widget, "name": "sprocket", "computed": true })));

    let reply = send(&router, Method::PATCH, &format!("/widgets/{widget}"), Some(json!({ "name": "gear" }))).await;
    assert_eq!(reply.body.unwrap()["computed"], json!(true));

    let reply = send(&router, Method::GET, "/gadgets", None).await;
    assert_eq!(reply.body.unwrap()["objects"][0].get("computed"), None);

    let reply = send(&router, Method::GET, &format!("/gadgets/{gadget}"), None).await;
    assert_eq!(reply.body, Some(json!({ "_id": gadget, "name": "cog" })));
}

#[tokio::test]
async fn test_malformed_query_is_bad_request() {
    let router = router(&[]);
    let reply = send(&router, Method::GET, "/things?query=not-json", None).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body, error(400, "Bad request."));
}

#[tokio::test]
async fn test_non_numeric_window_falls_back() {
    let router = router(&[]);
    let reply = send(&router, Method::GET, "/things?limit=many&offset=-4", None).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.unwrap()["meta"], json!({ "limit": 20, "offset": 0, "total_count": 0 }));
}

#[tokio::test]
async fn test_total_count_ignores_window() {
    let router = router(&[]);
    for n in 1..=5 {
        create(&router, "numbers", json!({ "n": n })).await;
    }

    let reply = send(&router, Method::GET, "/numbers?limit=2&offset=1", None).await;
    let body = reply.body.unwrap();
    assert_eq!(body["meta"], json!({ "limit": 2, "offset": 1, "total_count": 5 }));
    let values: Vec<&Value> = body["objects"].as_array().unwrap().iter().map(|o| &o["n"]).collect();
    assert_eq!(values, vec![&json!(2), &json!(3)]);

    // query={"n":{"$gt":3}}
    let reply = send(&router, Method::GET, "/numbers?query=%7B%22n%22%3A%7B%22%24gt%22%3A3%7D%7D", None).await;
    let body = reply.body.unwrap();
    assert_eq!(body["meta"]["total_count"], json!(2));
    assert_eq!(body["objects"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_bad_ids_and_bodies_are_bad_requests() {
    let router = router(&[]);

    let reply = send(&router, Method::GET, "/things/not-an-id", None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = send(&router, Method::POST, "/things", Some(json!([1, 2]))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = send(&router, Method::POST, "/things", Some(json!({ "_id": "zzz" }))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_documents_keep_field_order() {
    let router = router(&[]);
    let id = create(&router, "things", json!({ "z": 1, "a": 2, "m": 3 })).await;

    let reply = send(&router, Method::GET, &format!("/things/{id}"), None).await;
    assert_eq!(reply.status, StatusCode::OK);

    let text = std::str::from_utf8(&reply.raw).unwrap();
    assert_eq!(text, format!(r#"{{"_id":"{id}","z":1,"a":2,"m":3}}"#));
}

#[tokio::test]
async fn test_undecodable_path_is_bad_request() {
    let router = router(&[]);

    for uri in ["/things/%FF%FE", "/%FF%FE"] {
        let reply = send(&router, Method::GET, uri, None).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(reply.body, error(400, "Bad request."), "{uri}");
        assert_eq!(reply.content_type.as_deref(), Some("application/json"), "{uri}");
    }
}

#[tokio::test]
async fn test_oversized_body_is_rejected_with_envelope() {
    let router = router(&[]);
    let padding = "x".repeat(3 * 1024 * 1024);
    let body = Body::from(format!(r#"{{"padding":"{padding}"}}"#));

    let reply = send_raw(&router, Method::POST, "/things", body).await;
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(reply.body, error(413, "Payload Too Large."));
    assert_eq!(reply.content_type.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn test_unsupported_routes() {
    let router = router(&[]);
    let id = DocumentId::new();

    let reply = send(&router, Method::PUT, "/things", Some(json!({}))).await;
    assert_eq!(reply.status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(reply.body, error(501, "Not Implemented."));

    let reply = send(&router, Method::POST, &format!("/things/{id}"), Some(json!({}))).await;
    assert_eq!(reply.status, StatusCode::NOT_IMPLEMENTED);

    let reply = send(&router, Method::OPTIONS, "/things", None).await;
    assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(reply.body, error(405, "Method Not Allowed."));

    let reply = send(&router, Method::GET, "/things/a/b", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, error(404, "Document Not Found."));
}

#[tokio::test]
async fn test_every_response_is_json() {
    let router = router(&[]);
    let id = create(&router, "things", json!({ "a": 1 })).await;

    for (method, uri) in [
        (Method::GET, "/things".to_string()),
        (Method::GET, format!("/things/{id}")),
        (Method::DELETE, format!("/things/{id}")),
        (Method::PUT, "/things".to_string()),
        (Method::GET, "/a/b/c".to_string()),
    ] {
        let reply = send(&router, method.clone(), &uri, None).await;
        assert_eq!(reply.content_type.as_deref(), Some("application/json"), "{method} {uri}");
    }
}

async fn count_widgets(ctx: ViewContext, request: ResourceRequest) -> ViewResult {
    let widgets = ctx.collection(&request.collection)?;
    let total = widgets.count(&Default::default()).await?;

    Ok(ResourceResponse::ok(json!({ "collection": request.collection, "total": total })))
}

#[tokio::test]
async fn test_override_takes_precedence_for_its_collection() {
    let gateway = gateway(&["widgets", "gadgets"]);
    gateway
        .collection("widgets")
        .unwrap()
        .insert(doc! { "name": "sprocket" })
        .await
        .unwrap();

    let router = Resources::new()
        .view(Verb::Get, "widgets", Cardinality::List, count_widgets)
        .into_router(gateway);

    let reply = send(&router, Method::GET, "/widgets", None).await;
    assert_eq!(reply.body, Some(json!({ "collection": "widgets", "total": 1 })));

    let reply = send(&router, Method::GET, "/gadgets", None).await;
    assert_eq!(reply.body.unwrap()["meta"]["total_count"], json!(0));

    let id = create(&router, "widgets", json!({ "name": "cog" })).await;
    let reply = send(&router, Method::GET, &format!("/widgets/{id}"), None).await;
    assert_eq!(reply.body, Some(json!({ "_id": id, "name": "cog" })));

    let reply = send(&router, Method::GET, "/widgets", None).await;
    assert_eq!(reply.body, Some(json!({ "collection": "widgets", "total": 2 })));
}

#[tokio::test]
async fn test_detail_override_receives_pk() {
    async fn echo(_ctx: ViewContext, request: ResourceRequest) -> ViewResult {
        Ok(ResourceResponse::accepted(json!({ "collection": request.collection, "pk": request.pk })))
    }

    let router = Resources::new()
        .view(Verb::Delete, "widgets", Cardinality::Detail, echo)
        .into_router(gateway(&[]));

    let reply = send(&router, Method::DELETE, "/widgets/anything", None).await;
    assert_eq!(reply.status, StatusCode::ACCEPTED);
    assert_eq!(reply.body, Some(json!({ "collection": "widgets", "pk": "anything" })));

    let reply = send(&router, Method::DELETE, "/gadgets/anything", None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

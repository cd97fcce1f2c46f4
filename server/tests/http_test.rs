//! Integration tests for the HTTP surface.
//!
//! Requests are driven through the router directly, backed by the in-memory
//! service.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use collab_server::backend::{AnyConnection, MemoryService, SyncService};
use collab_server::config::Config;
use collab_server::{app, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn test_app() -> Router {
    let connection = MemoryService::new().connect().await.unwrap();
    app(AppState {
        connection: AnyConnection::Memory(connection),
        config: Arc::new(Config::default()),
    })
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };

    (status, value)
}

#[tokio::test]
async fn test_health_reports_backend() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn test_create_then_existing() {
    let app = test_app().await;
    let uri = "/collections/notes/documents/n1";

    let (status, body) = send(&app, Method::POST, uri, Some(json!({"data": {"title": "Hi"}}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"], true);
    assert_eq!(body["document"]["docType"], "json0");
    assert_eq!(body["document"]["namespace"], "collab_data_notes");
    assert_eq!(body["document"]["data"], json!({"title": "Hi"}));

    let (status, body) = send(&app, Method::POST, uri, Some(json!({"data": "ignored"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], false);
    assert_eq!(body["document"]["data"], json!({"title": "Hi"}));
}

#[tokio::test]
async fn test_create_without_data_is_empty_string() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/collections/notes/documents/n1",
        Some(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["document"]["data"], "");
}

#[tokio::test]
async fn test_rich_text_route() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/collections/docs/rich-text/d1",
        Some(json!({"text": "hello"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["document"]["docType"], "rich-text");
    assert_eq!(body["document"]["data"], json!([{"insert": "hello"}]));
}

#[tokio::test]
async fn test_form_route() {
    let app = test_app().await;
    let schema = json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "age": {"type": "integer", "default": 18},
            "tags": {"type": "array"}
        }
    });

    let (status, body) = send(
        &app,
        Method::POST,
        "/collections/forms/forms/f1",
        Some(json!({"schema": schema})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body["document"]["data"]["data"],
        json!({"name": "", "age": 18, "tags": null})
    );
}

#[tokio::test]
async fn test_form_route_rejects_bad_root() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/collections/forms/forms/f1",
        Some(json!({"schema": {"type": "array"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "root element must be an object, got array");

    let (status, body) = send(&app, Method::GET, "/collections/forms/documents/f1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["docType"], Value::Null);
}

#[tokio::test]
async fn test_get_unknown_document() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/collections/notes/documents/none", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 0);
    assert_eq!(body["docType"], Value::Null);
}

#[tokio::test]
async fn test_delete_route() {
    let app = test_app().await;
    let uri = "/collections/notes/documents/n1";

    send(&app, Method::POST, uri, Some(json!({"data": 1}))).await;

    let (status, body) = send(&app, Method::DELETE, uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);
    assert_eq!(body["version"], 2);

    let (status, body) = send(&app, Method::DELETE, uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], false);
    assert!(body.get("version").is_none());
}

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use notes_store::{
    BackendError, NoteStore, WritePolicy,
    handlers::{self, rest::ApiState},
    repository::{Backend, MemoryBackend, Session},
};

const BACKEND_MESSAGE: &str = "connection refused by db-7";

/// Backend that cannot hand out sessions.
struct UnreachableBackend;

#[async_trait]
impl Backend for UnreachableBackend {
    async fn acquire(&self) -> Result<Box<dyn Session>, BackendError> {
        Err(BackendError::Unavailable(BACKEND_MESSAGE.to_string()))
    }
}

fn app() -> Router {
    let store = NoteStore::new(Arc::new(MemoryBackend::new()), WritePolicy::BestEffort);
    handlers::router(Arc::new(ApiState::new(store, 2)))
}

fn unreachable_app(policy: WritePolicy) -> Router {
    let store = NoteStore::new(Arc::new(UnreachableBackend), policy);
    handlers::router(Arc::new(ApiState::new(store, 2)))
}

fn assert_generic_failure(status: StatusCode, body: Vec<u8>, expected: &str) {
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = String::from_utf8(body).unwrap();
    assert_eq!(body, expected);
    assert!(!body.contains(BACKEND_MESSAGE));
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, body.to_vec())
}

async fn create(app: &Router, title: &str, text: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/rest/notes",
        Some(json!({ "title": title, "text": text })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_root_endpoint() {
    let app = app();

    let (status, body) = send(&app, "GET", "/", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "Hello world!");
}

#[tokio::test]
async fn test_create_and_get_note() {
    let app = app();

    let created = create(&app, "Shopping", "Milk").await;
    assert_eq!(created["title"], "Shopping");
    assert_eq!(created["text"], "Milk");
    assert_eq!(created["created_at"], created["updated_at"]);

    let id = created["id"].as_i64().unwrap();
    let (status, body) = send(&app, "GET", &format!("/rest/notes/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let fetched: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_create_with_empty_title_is_bad_request() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/rest/notes",
        Some(json!({ "title": "", "text": "body" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8(body).unwrap().contains("title"));

    let (_, body) = send(&app, "GET", "/rest/notes/count", None).await;
    let count: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(count["count"], 0);
}

#[tokio::test]
async fn test_get_missing_note_is_not_found() {
    let app = app();

    let (status, _) = send(&app, "GET", "/rest/notes/404", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_notes_pages_newest_first() {
    let app = app();
    create(&app, "N1", "T1").await;
    create(&app, "N2", "T2").await;
    create(&app, "N3", "T3").await;

    let (status, body) = send(&app, "GET", "/rest/notes", None).await;
    assert_eq!(status, StatusCode::OK);
    let page: Value = serde_json::from_slice(&body).unwrap();
    let titles: Vec<&str> = page["notes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|note| note["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["N3", "N2"]);
    assert_eq!(page["page"], 1);
    assert_eq!(page["page_size"], 2);
    assert_eq!(page["total_count"], 3);
    assert_eq!(page["total_pages"], 2);

    let (_, body) = send(&app, "GET", "/rest/notes?page=2&page_size=2", None).await;
    let page: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(page["notes"].as_array().unwrap().len(), 1);
    assert_eq!(page["notes"][0]["title"], "N1");

    let (_, body) = send(&app, "GET", "/rest/notes?page=9", None).await;
    let page: Value = serde_json::from_slice(&body).unwrap();
    assert!(page["notes"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_notes_rejects_negative_page() {
    let app = app();

    let (status, _) = send(&app, "GET", "/rest/notes?page=-1", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_notes_is_case_insensitive() {
    let app = app();
    create(&app, "Hello", "world").await;
    create(&app, "Other", "note").await;

    let (status, body) = send(&app, "GET", "/rest/notes/search?term=HELLO", None).await;
    assert_eq!(status, StatusCode::OK);
    let found: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["title"], "Hello");

    let (_, body) = send(&app, "GET", "/rest/notes/search", None).await;
    let all: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_update_note() {
    let app = app();
    let created = create(&app, "Initial", "Text").await;
    let id = created["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/rest/notes/{id}"),
        Some(json!({ "title": "Updated", "text": "New text" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, "GET", &format!("/rest/notes/{id}"), None).await;
    let fetched: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(fetched["title"], "Updated");
    assert_eq!(fetched["text"], "New text");
    assert_eq!(fetched["created_at"], created["created_at"]);
    assert_ne!(fetched["updated_at"], created["updated_at"]);
}

#[tokio::test]
async fn test_update_missing_note_is_no_content() {
    let app = app();

    let (status, _) = send(
        &app,
        "PUT",
        "/rest/notes/999",
        Some(json!({ "title": "t", "text": "x" })),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_update_with_empty_text_is_bad_request() {
    let app = app();
    let created = create(&app, "Initial", "Text").await;
    let id = created["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/rest/notes/{id}"),
        Some(json!({ "title": "Updated", "text": "" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_note() {
    let app = app();
    let created = create(&app, "Bye", "Soon gone").await;
    let id = created["id"].as_i64().unwrap();

    let (status, _) = send(&app, "DELETE", &format!("/rest/notes/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/rest/notes/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", &format!("/rest/notes/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_openapi_document_lists_note_paths() {
    let app = app();

    let (status, body) = send(&app, "GET", "/rest/api-doc/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);

    let doc: Value = serde_json::from_slice(&body).unwrap();
    assert!(doc["paths"]["/notes"].is_object());
    assert!(doc["paths"]["/notes/search"].is_object());
    assert!(doc["paths"]["/notes/{id}"].is_object());
}

#[tokio::test]
async fn test_create_with_unreachable_backend_is_server_error() {
    for policy in [WritePolicy::BestEffort, WritePolicy::Strict] {
        let app = unreachable_app(policy);

        let (status, body) = send(
            &app,
            "POST",
            "/rest/notes",
            Some(json!({ "title": "t", "text": "x" })),
        )
        .await;

        assert_generic_failure(status, body, "Failed to create note");
    }
}

#[tokio::test]
async fn test_reads_with_unreachable_backend_are_server_errors() {
    let app = unreachable_app(WritePolicy::BestEffort);

    let (status, body) = send(&app, "GET", "/rest/notes", None).await;
    assert_generic_failure(status, body, "Failed to list notes");

    let (status, body) = send(&app, "GET", "/rest/notes/1", None).await;
    assert_generic_failure(status, body, "Failed to get note");

    let (status, body) = send(&app, "GET", "/rest/notes/search?term=x", None).await;
    assert_generic_failure(status, body, "Failed to search notes");

    let (status, body) = send(&app, "GET", "/rest/notes/count", None).await;
    assert_generic_failure(status, body, "Failed to count notes");
}

#[tokio::test]
async fn test_best_effort_writes_hide_backend_failure() {
    let app = unreachable_app(WritePolicy::BestEffort);

    let (status, _) = send(
        &app,
        "PUT",
        "/rest/notes/1",
        Some(json!({ "title": "t", "text": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "DELETE", "/rest/notes/1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_strict_writes_report_backend_failure() {
    let app = unreachable_app(WritePolicy::Strict);

    let (status, body) = send(
        &app,
        "PUT",
        "/rest/notes/1",
        Some(json!({ "title": "t", "text": "x" })),
    )
    .await;
    assert_generic_failure(status, body, "Failed to update note");

    let (status, body) = send(&app, "DELETE", "/rest/notes/1", None).await;
    assert_generic_failure(status, body, "Failed to delete note");
}

#[tokio::test]
async fn test_validation_wins_over_unreachable_backend() {
    let app = unreachable_app(WritePolicy::Strict);

    let (status, _) = send(
        &app,
        "PUT",
        "/rest/notes/1",
        Some(json!({ "title": "", "text": "x" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

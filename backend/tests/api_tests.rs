//! Router tests over an in-memory database and a temporary storage dir.

use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use backend::{
    AppState, build_router,
    config::StorageLayout,
    db_utils::{
        document_records::{DocumentRecord, insert_document},
        sqlite_utils::get_sqlite_pool,
    },
    server_extra::event_broadcaster::EventBroadcaster,
};
use common::{
    document_summary::{DocumentDetail, DocumentListItem, DocumentStatus},
    live_event::LiveEvent,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    state: AppState,
    router: Router,
    _storage: TempDir,
}

async fn setup() -> TestApp {
    let storage = TempDir::new().unwrap();
    let layout = StorageLayout::new(storage.path());
    layout.ensure_dirs().await.unwrap();
    let pool = get_sqlite_pool("sqlite::memory:").await.unwrap();
    let state = AppState::new(pool, layout, EventBroadcaster::new(16));
    let router = build_router(state.clone());
    TestApp { state, router, _storage: storage }
}

async fn seed(app: &TestApp, id: &str, status: DocumentStatus, json_path: Option<String>) {
    let record = DocumentRecord {
        id: id.to_string(),
        original_name: format!("{}.pdf", id),
        doc_type: Some("invoice".to_string()),
        status,
        upload_time: format!("2024-01-0{}T00:00:00Z", id.len() % 9),
        result_pdf_path: None,
        result_json_path: json_path,
    };
    insert_document(&app.state.pool, &record).await.unwrap();
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn invoice_json() -> Value {
    json!({
        "pages": [{
            "fields": [
                {"field_name": "invoice_no", "field_value": "INV-7", "array_index": -1},
                {"field_name": "amount", "field_value": "10.00", "array_index": 1, "field_order": 1},
                {"field_name": "amount", "field_value": "20.00", "array_index": 2, "field_order": 1}
            ]
        }],
        "source": "ocr"
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let app = setup().await;
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unknown_document_is_not_found() {
    let app = setup().await;
    let (status, _) = send(&app, get("/api/documents/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(&app, get("/api/results/json/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["detail"], "JSON not found");
}

#[tokio::test]
async fn upload_creates_queued_record_and_files() {
    let app = setup().await;
    let boundary = "portal-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"type\"\r\n\r\ninvoice\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"scan.PDF\"\r\n\
         Content-Type: application/pdf\r\n\r\n%PDF-1.4\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));

    let detail: DocumentDetail = serde_json::from_slice(&body).unwrap();
    assert_eq!(detail.item.status, DocumentStatus::Queued);
    assert_eq!(detail.item.original_name, "scan.PDF");
    assert_eq!(detail.item.doc_type.as_deref(), Some("invoice"));
    assert!(!detail.item.has_json);

    let folder = app.state.storage.incoming_dir(&detail.item.id);
    assert!(folder.join("scan.PDF").exists());
    let meta: Value = serde_json::from_slice(&std::fs::read(folder.join("meta.json")).unwrap()).unwrap();
    assert_eq!(meta["doc_id"], detail.item.id.as_str());
    assert_eq!(meta["type"], "invoice");
}

#[tokio::test]
async fn upload_rejects_unsupported_extension() {
    let app = setup().await;
    let boundary = "portal-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\n\r\nhello\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_is_newest_first() {
    let app = setup().await;
    seed(&app, "a", DocumentStatus::Queued, None).await;
    seed(&app, "bbb", DocumentStatus::Ready, None).await;
    let (status, body) = send(&app, get("/api/documents")).await;
    assert_eq!(status, StatusCode::OK);
    let items: Vec<DocumentListItem> = serde_json::from_slice(&body).unwrap();
    let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
    assert_eq!(ids, vec!["bbb", "a"]);
}

#[tokio::test]
async fn save_writes_result_file_and_keeps_unknown_attributes() {
    let app = setup().await;
    seed(&app, "doc", DocumentStatus::Ready, None).await;

    let (status, _) = send(&app, json_request("PUT", "/api/documents/doc/results", invoice_json())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get("/api/results/json/doc")).await;
    assert_eq!(status, StatusCode::OK);
    let saved: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(saved, invoice_json());

    let (_, body) = send(&app, get("/api/documents/doc")).await;
    let detail: DocumentDetail = serde_json::from_slice(&body).unwrap();
    assert!(detail.item.has_json);
    assert_eq!(detail.result_json_url.as_deref(), Some("/api/results/json/doc"));
}

#[tokio::test]
async fn save_overwrites_existing_result_path() {
    let app = setup().await;
    let path = app.state.storage.root.join("pipeline-output.json");
    std::fs::write(&path, b"{\"pages\": []}").unwrap();
    seed(&app, "doc", DocumentStatus::Ready, Some(path.to_string_lossy().to_string())).await;

    let (status, _) = send(&app, json_request("PUT", "/api/documents/doc/results", invoice_json())).await;
    assert_eq!(status, StatusCode::OK);
    let on_disk: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(on_disk, invoice_json());
}

#[tokio::test]
async fn save_rejects_payload_without_pages() {
    let app = setup().await;
    seed(&app, "doc", DocumentStatus::Ready, None).await;
    let (status, _) = send(&app, json_request("PUT", "/api/documents/doc/results", json!({"fields": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, json_request("PUT", "/api/documents/nope/results", invoice_json())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn approve_requires_a_result() {
    let app = setup().await;
    seed(&app, "doc", DocumentStatus::Processing, None).await;
    let (status, _) = send(&app, json_request("POST", "/api/documents/doc/approve", json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    send(&app, json_request("PUT", "/api/documents/doc/results", invoice_json())).await;
    let (status, body) = send(&app, json_request("POST", "/api/documents/doc/approve", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let detail: DocumentDetail = serde_json::from_slice(&body).unwrap();
    assert_eq!(detail.item.status, DocumentStatus::Approved);
}

#[tokio::test]
async fn notify_flow_updates_status() {
    let app = setup().await;
    seed(&app, "doc", DocumentStatus::Queued, None).await;
    let mut events = app.state.events.subscribe();

    let (status, _) = send(
        &app,
        json_request("POST", "/api/notify/processing-started", json!({"doc_id": "doc"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(events.recv().await.unwrap(), LiveEvent::processing_started("doc"));

    let json_path = app.state.storage.root.join("out.json");
    let pdf_path = app.state.storage.root.join("out.pdf");
    std::fs::write(&json_path, invoice_json().to_string()).unwrap();
    std::fs::write(&pdf_path, b"%PDF-1.4 test").unwrap();
    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/notify/result-ready",
            json!({
                "doc_id": "doc",
                "pdf_path": pdf_path.to_string_lossy(),
                "json_path": json_path.to_string_lossy(),
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(events.recv().await.unwrap(), LiveEvent::result_ready("doc"));

    let (_, body) = send(&app, get("/api/documents/doc")).await;
    let detail: DocumentDetail = serde_json::from_slice(&body).unwrap();
    assert_eq!(detail.item.status, DocumentStatus::Ready);
    assert!(detail.item.has_pdf && detail.item.has_json);

    let (status, body) = send(&app, get("/api/results/pdf/doc")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"%PDF-1.4 test");
}

#[tokio::test]
async fn result_ready_rejects_missing_files() {
    let app = setup().await;
    seed(&app, "doc", DocumentStatus::Processing, None).await;
    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/notify/result-ready",
            json!({"doc_id": "doc", "json_path": "/definitely/not/here.json"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notify_error_requires_message_and_clears_results() {
    let app = setup().await;
    let path = app.state.storage.root.join("old.json");
    std::fs::write(&path, b"{\"pages\": []}").unwrap();
    seed(&app, "doc", DocumentStatus::Ready, Some(path.to_string_lossy().to_string())).await;

    let (status, _) = send(&app, json_request("POST", "/api/notify/error", json!({"doc_id": "doc"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/notify/error", json!({"doc_id": "doc", "error_message": "ocr failed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, get("/api/documents/doc")).await;
    let detail: DocumentDetail = serde_json::from_slice(&body).unwrap();
    assert_eq!(detail.item.status, DocumentStatus::Error);
    assert!(!detail.item.has_json);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/notify/error", json!({"doc_id": "ghost", "error_message": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn document_event_channel_filters_other_documents() {
    let app = setup().await;
    let response = app.router.clone().oneshot(get("/api/events/doc-a")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");

    app.state.events.broadcast_lossy(LiveEvent::result_ready("doc-b"));
    app.state.events.broadcast_lossy(LiveEvent::result_ready("doc-a"));

    let mut body = response.into_body();
    let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(text.contains("event: result-ready"), "{}", text);
    assert!(text.contains("\"doc_id\":\"doc-a\""), "{}", text);
    assert!(!text.contains("doc-b"), "{}", text);
}

//! Axum router for the portal API.

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Request, State},
    http::header,
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post, put},
};
use common::document_summary::{
    DocumentDetail, DocumentListItem, NotifyErrorPayload, NotifyProcessingStartedPayload, NotifyResultReadyPayload,
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::debug;

use crate::api;
use crate::app_state::AppState;
use crate::server_extra::api_error::ApiError;
use crate::server_extra::event_broadcaster::live_event_sse;

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;
const MAX_RESULT_BYTES: usize = 16 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/upload", post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)))
        .route("/api/documents", get(list_documents))
        .route("/api/documents/{doc_id}", get(get_document))
        .route("/api/documents/{doc_id}/approve", post(approve_document))
        .route(
            "/api/documents/{doc_id}/results",
            put(save_results).layer(DefaultBodyLimit::max(MAX_RESULT_BYTES)),
        )
        .route("/api/results/json/{doc_id}", get(result_json))
        .route("/api/results/pdf/{doc_id}", get(result_pdf))
        .route("/api/notify/processing-started", post(notify_processing_started))
        .route("/api/notify/result-ready", post(notify_result_ready))
        .route("/api/notify/error", post(notify_error))
        .route("/api/events", get(events_all))
        .route("/api/events/{doc_id}", get(events_for_document))
        .layer(middleware::from_fn(|request: Request, next: Next| async move {
            let method = request.method().clone();
            let path = request.uri().path().to_string();
            let res = next.run(request).await;
            debug!("{} {} -> {}", method, path, res.status());
            res
        }))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<DocumentDetail>, ApiError> {
    let mut file = None;
    let mut doc_type = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
                file = Some((filename, content));
            }
            "type" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read type: {}", e)))?;
                doc_type = Some(text).filter(|t| !t.is_empty());
            }
            _ => {}
        }
    }
    let (filename, content) = file.ok_or_else(|| ApiError::BadRequest("Missing file field".to_string()))?;
    let x = api::documents::upload_document::upload_document(&state, &filename, doc_type, content).await;
    Ok(Json(x?))
}

async fn list_documents(State(state): State<AppState>) -> Result<Json<Vec<DocumentListItem>>, ApiError> {
    let x = api::documents::list_documents::list_documents(&state.pool).await;
    Ok(Json(x?))
}

async fn get_document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Json<DocumentDetail>, ApiError> {
    let x = api::documents::get_document::get_document(&state.pool, &doc_id).await;
    Ok(Json(x?))
}

async fn approve_document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Json<DocumentDetail>, ApiError> {
    let x = api::documents::approve_document::approve_document(&state.pool, &doc_id).await;
    Ok(Json(x?))
}

async fn save_results(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    api::documents::save_results::save_results(&state, &doc_id, payload).await?;
    Ok(Json(json!({ "status": "saved" })))
}

async fn result_json(State(state): State<AppState>, Path(doc_id): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let body = api::documents::get_results::get_result_json(&state.pool, &doc_id).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

async fn result_pdf(State(state): State<AppState>, Path(doc_id): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let (size, stream) = api::documents::get_results::open_result_pdf(&state.pool, &doc_id).await?;
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_LENGTH, size.to_string()),
        (header::CONTENT_DISPOSITION, format!("inline; filename=\"{}.pdf\"", doc_id)),
    ];
    Ok((headers, Body::from_stream(stream)))
}

async fn notify_processing_started(
    State(state): State<AppState>,
    Json(payload): Json<NotifyProcessingStartedPayload>,
) -> Result<Json<Value>, ApiError> {
    api::notify::processing_started::notify_processing_started(&state, payload).await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn notify_result_ready(
    State(state): State<AppState>,
    Json(payload): Json<NotifyResultReadyPayload>,
) -> Result<Json<Value>, ApiError> {
    api::notify::result_ready::notify_result_ready(&state, payload).await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn notify_error(
    State(state): State<AppState>,
    Json(payload): Json<NotifyErrorPayload>,
) -> Result<Json<Value>, ApiError> {
    api::notify::report_error::notify_error(&state, payload).await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn events_all(State(state): State<AppState>) -> impl IntoResponse {
    live_event_sse(state.events.subscribe(), None)
}

async fn events_for_document(State(state): State<AppState>, Path(doc_id): Path<String>) -> impl IntoResponse {
    live_event_sse(state.events.subscribe(), Some(doc_id))
}

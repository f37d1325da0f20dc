//! Axum REST API handlers

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::error::ServiceError;
use crate::service::FaceService;
use crate::storage::History;
use crate::utils::image::jpeg_data_url;

use super::dto::*;

/// Application state shared across handlers
pub struct AppState {
    pub service: Arc<FaceService>,
    pub start_time: Instant,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Create the REST API router
pub fn create_rest_router(state: Arc<AppState>, body_limit_mb: usize) -> Router {
    Router::new()
        // Gallery
        .route("/api/persons", get(persons_handler))
        .route("/api/upload", post(upload_handler))
        .route("/api/person/create", post(create_person_handler))
        .route("/api/person/add", post(add_to_person_handler))
        .route("/api/person/delete", post(delete_person_handler))
        .route("/api/face/delete", post(delete_face_handler))
        .route("/api/face/delete-from-person", post(delete_face_from_person_handler))
        .route("/api/persons/delete-all", post(delete_all_persons_handler))
        .route("/api/faces/delete-all", post(delete_all_faces_handler))
        // History
        .route("/api/history", get(get_history_handler).post(save_history_handler))
        .route("/api/history/delete-all", post(delete_all_history_handler))
        // System endpoints
        .route("/health", get(health_handler))
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit_mb * 1024 * 1024))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Map a service error to its HTTP response
fn reject(e: ServiceError) -> (StatusCode, Json<ErrorResponse>) {
    let status = e.status();
    if status.is_server_error() {
        error!("Request failed: {}", e);
    } else {
        warn!("Request rejected: {}", e);
    }
    (status, Json(ErrorResponse::new(&e.to_string(), e.code())))
}

/// Unwrap a JSON body, turning extractor rejections into validation errors
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, (StatusCode, Json<ErrorResponse>)> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| reject(ServiceError::Validation(e.body_text())))
}

/// A present, non-blank request field
fn required(value: Option<String>) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| reject(ServiceError::Validation("Missing required fields".to_string())))
}

/// List persons and unclaimed faces
async fn persons_handler(State(state): State<Arc<AppState>>) -> ApiResult<PersonsResponse> {
    let summary = state.service.identity().get_all_persons().await.map_err(reject)?;

    Ok(Json(PersonsResponse {
        persons: summary.persons,
        unrecognized: summary.unrecognized,
    }))
}

/// Detect, match and store every face of an uploaded image
async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    let mut image_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| reject(ServiceError::Validation(e.to_string())))?
    {
        if field.name() == Some("image") {
            image_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| reject(ServiceError::Validation(e.to_string())))?
                    .to_vec(),
            );
        }
    }

    let image_data = image_data
        .ok_or_else(|| reject(ServiceError::Validation("No image provided".to_string())))?;

    let result = state.service.upload(&image_data).await.map_err(reject)?;

    let results: Vec<FaceResultDto> = result
        .faces
        .into_iter()
        .map(|f| FaceResultDto {
            id: f.face_id,
            name: f.name,
            confidence: f.confidence,
            face_image: jpeg_data_url(&f.face_image),
            face_position: f.position,
        })
        .collect();

    Ok(Json(UploadResponse {
        message: format!("Processed {} faces", results.len()),
        results,
    }))
}

/// Assign an unrecognized face to a new or existing person
async fn create_person_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FaceRequest>, JsonRejection>,
) -> ApiResult<PersonResponse> {
    let req = json_body(payload)?;
    let face_id = required(req.face_id)?;
    let name = required(req.name)?;

    let claim = state
        .service
        .create_person_or_add_face(&face_id, &name)
        .await
        .map_err(reject)?;

    Ok(Json(PersonResponse {
        message: format!("Added face to person: {}", claim.person),
        person: claim.person,
    }))
}

/// Assign an unrecognized face to an existing person
async fn add_to_person_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FaceRequest>, JsonRejection>,
) -> ApiResult<PersonResponse> {
    let req = json_body(payload)?;
    let face_id = required(req.face_id)?;
    let name = required(req.person_name)?;

    let claim = state
        .service
        .add_face_to_existing_person(&face_id, &name)
        .await
        .map_err(reject)?;

    Ok(Json(PersonResponse {
        message: format!("Added face to person: {}", claim.person),
        person: claim.person,
    }))
}

/// Delete a person and all their face images
async fn delete_person_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FaceRequest>, JsonRejection>,
) -> ApiResult<DeleteResponse> {
    let req = json_body(payload)?;
    let name = required(req.person_name)?;

    let cleanup = state.service.identity().delete_person(&name).await.map_err(reject)?;

    Ok(Json(DeleteResponse {
        message: format!("Successfully deleted person: {}", name),
        person: Some(name),
        face_id: None,
        warnings: cleanup.warnings,
    }))
}

/// Delete an unrecognized face
async fn delete_face_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FaceRequest>, JsonRejection>,
) -> ApiResult<DeleteResponse> {
    let req = json_body(payload)?;
    let face_id = required(req.face_id)?;

    let cleanup = state
        .service
        .identity()
        .delete_unrecognized_face(&face_id)
        .await
        .map_err(reject)?;

    Ok(Json(DeleteResponse {
        message: format!("Successfully deleted face: {}", face_id),
        person: None,
        face_id: Some(face_id),
        warnings: cleanup.warnings,
    }))
}

/// Delete one face image from a person
async fn delete_face_from_person_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FaceRequest>, JsonRejection>,
) -> ApiResult<DeleteResponse> {
    let req = json_body(payload)?;
    let name = required(req.person_name)?;
    let face_id = required(req.face_id)?;

    let cleanup = state
        .service
        .identity()
        .delete_face_from_person(&name, &face_id)
        .await
        .map_err(reject)?;

    Ok(Json(DeleteResponse {
        message: format!("Successfully deleted face from person: {}", name),
        person: Some(name),
        face_id: Some(face_id),
        warnings: cleanup.warnings,
    }))
}

/// Delete all persons and their face images
async fn delete_all_persons_handler(State(state): State<Arc<AppState>>) -> ApiResult<BulkDeleteResponse> {
    let cleanup = state.service.identity().delete_all_persons().await.map_err(reject)?;

    Ok(Json(BulkDeleteResponse {
        message: format!("Successfully deleted {} persons", cleanup.removed),
        count: cleanup.removed,
        warnings: cleanup.warnings,
    }))
}

/// Delete all unrecognized faces
async fn delete_all_faces_handler(State(state): State<Arc<AppState>>) -> ApiResult<BulkDeleteResponse> {
    let cleanup = state
        .service
        .identity()
        .delete_all_unrecognized_faces()
        .await
        .map_err(reject)?;

    Ok(Json(BulkDeleteResponse {
        message: format!("Successfully deleted {} unrecognized faces", cleanup.removed),
        count: cleanup.removed,
        warnings: cleanup.warnings,
    }))
}

async fn get_history_handler(State(state): State<Arc<AppState>>) -> ApiResult<History> {
    let history = state.service.identity().get_history().await.map_err(reject)?;
    Ok(Json(history))
}

/// Overwrite the history document
async fn save_history_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let body = json_body(payload)?;

    let has_data = body.as_object().is_some_and(|o| !o.is_empty());
    if !has_data {
        return Err(reject(ServiceError::Validation("No data provided".to_string())));
    }

    let history: History = serde_json::from_value(body)
        .map_err(|e| reject(ServiceError::Validation(e.to_string())))?;

    state.service.identity().save_history(&history).await.map_err(reject)?;

    Ok(Json(MessageResponse {
        message: "History saved successfully".to_string(),
    }))
}

async fn delete_all_history_handler(State(state): State<Arc<AppState>>) -> ApiResult<HistoryDeleteResponse> {
    let removed = state.service.identity().delete_all_history().await.map_err(reject)?;

    Ok(Json(HistoryDeleteResponse {
        message: "Successfully deleted all history data".to_string(),
        success: removed > 0,
    }))
}

/// Health check
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

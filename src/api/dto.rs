//! REST API request/response data transfer objects

use serde::{Deserialize, Serialize};

use crate::engine::FaceLocation;

/// Body shared by the person/face endpoints; each endpoint checks the fields it needs
#[derive(Debug, Default, Deserialize)]
pub struct FaceRequest {
    #[serde(rename = "faceId")]
    pub face_id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "personName")]
    pub person_name: Option<String>,
}

/// Upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub results: Vec<FaceResultDto>,
}

#[derive(Debug, Serialize)]
pub struct FaceResultDto {
    pub id: String,
    pub name: String,
    pub confidence: i32,
    /// `data:image/jpeg;base64,...`
    pub face_image: String,
    /// `[top, right, bottom, left]`
    pub face_position: FaceLocation,
}

/// Person listing
#[derive(Debug, Serialize)]
pub struct PersonsResponse {
    pub persons: Vec<String>,
    pub unrecognized: Vec<String>,
}

/// Claim response
#[derive(Debug, Serialize)]
pub struct PersonResponse {
    pub message: String,
    pub person: String,
}

/// Single delete response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person: Option<String>,
    #[serde(rename = "faceId", skip_serializing_if = "Option::is_none")]
    pub face_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Bulk delete response
#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub message: String,
    pub count: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// History delete response
#[derive(Debug, Serialize)]
pub struct HistoryDeleteResponse {
    pub message: String,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            code: code.to_string(),
        }
    }
}

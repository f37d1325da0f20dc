//! Service error taxonomy

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or malformed request fields
    #[error("{0}")]
    Validation(String),

    /// Unknown person or face
    #[error("{0}")]
    NotFound(String),

    /// Every detection was rejected by the filter (or none were found)
    #[error("No valid faces detected in the image")]
    NoFacesDetected,

    /// Detector, record store or blob store failure
    #[error("{0:#}")]
    Upstream(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::NoFacesDetected => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::NoFacesDetected => "NO_FACES_DETECTED",
            Self::Upstream(_) => "UPSTREAM_FAILURE",
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

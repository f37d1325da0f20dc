//! Service layer types

use serde::{Deserialize, Serialize};

use crate::engine::FaceLocation;

/// Name reported for faces with no accepted match
pub const UNKNOWN_PERSON: &str = "Person not found";

/// Outcome for one face of an uploaded image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceResult {
    pub face_id: String,
    pub name: String,
    pub confidence: i32,
    /// JPEG crop of the face
    pub face_image: Vec<u8>,
    pub position: FaceLocation,
    /// Matched a person but the crop was already stored for them
    pub duplicate: bool,
}

impl FaceResult {
    pub fn is_recognized(&self) -> bool {
        self.name != UNKNOWN_PERSON
    }
}

/// Whole-image ingestion result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    pub faces: Vec<FaceResult>,
    pub elapsed_ms: u64,
}

/// Result of assigning an unrecognized face to a person
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimResult {
    pub person: String,
    pub face_id: String,
    /// The person already had a byte-identical image, nothing was stored
    pub duplicate: bool,
}

/// Summary listing of the gallery
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GallerySummary {
    pub persons: Vec<String>,
    pub unrecognized: Vec<String>,
}

/// Outcome of a delete: records removed plus non-fatal blob cleanup failures
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cleanup {
    pub removed: u64,
    pub warnings: Vec<String>,
}

impl Cleanup {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

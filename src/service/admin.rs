//! Administration operations: claiming unrecognized faces

use tracing::{debug, info, warn};

use super::duplicate::is_duplicate;
use super::face_service::FaceService;
use super::types::ClaimResult;
use crate::error::{ServiceError, ServiceResult};

impl FaceService {
    /// Assign an unrecognized face to `name`, creating the person if needed
    pub async fn create_person_or_add_face(&self, face_id: &str, name: &str) -> ServiceResult<ClaimResult> {
        self.claim_face(face_id, name, false).await
    }

    /// Assign an unrecognized face to an existing person
    pub async fn add_face_to_existing_person(&self, face_id: &str, name: &str) -> ServiceResult<ClaimResult> {
        self.claim_face(face_id, name, true).await
    }

    async fn claim_face(&self, face_id: &str, name: &str, require_person: bool) -> ServiceResult<ClaimResult> {
        let identity = self.identity();
        let face = identity.unrecognized_face(face_id).await?;

        let person = identity.get_person(name).await?;
        if require_person && person.is_none() {
            return Err(ServiceError::NotFound("Person not found".to_string()));
        }

        let image = identity.read_blob(&face.blob_id).await?;
        let duplicate = is_duplicate(identity.blobs(), person.as_ref(), &image).await;

        let stored_blob = if duplicate {
            debug!("Face {} already stored for {}, marking only", face_id, name);
            None
        } else {
            // The person slot gets its own copy; the face row keeps its blob
            Some(
                identity
                    .store_person_face(name, face_id, &image, face.embedding)
                    .await?,
            )
        };

        if let Err(e) = identity.mark_face_recognized(face_id, name).await {
            if let Some(blob_id) = stored_blob {
                if let Err(undo) = identity
                    .unstore_person_face(name, face_id, &blob_id, person.is_none())
                    .await
                {
                    warn!("Failed to roll back claim of {} by {}: {}", face_id, name, undo);
                }
            }
            return Err(e);
        }
        info!("Face {} assigned to {}", face_id, name);

        Ok(ClaimResult {
            person: name.to_string(),
            face_id: face_id.to_string(),
            duplicate,
        })
    }
}

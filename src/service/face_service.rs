//! Face Service - Core business logic
//!
//! Runs the ingestion pipeline for uploaded images: detect, filter, encode,
//! match against the gallery, then store each face either under the matched
//! person or as an unrecognized face.

use std::sync::Arc;
use std::time::Instant;

use image::GenericImageView;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{Config, DetectionConfig};
use crate::engine::{filter_faces, Embedding, FaceEngine, FaceLocation};
use crate::error::{ServiceError, ServiceResult};
use crate::storage::{BlobStore, RecordStore};
use crate::utils::image::{crop_face, decode_image, encode_jpeg};

use super::duplicate::is_duplicate;
use super::identity::IdentityStore;
use super::matcher::GalleryMatcher;
use super::types::*;

/// Face gallery service
pub struct FaceService {
    engine: Arc<dyn FaceEngine>,
    identity: IdentityStore,
    matcher: GalleryMatcher,
    detection: DetectionConfig,
}

impl FaceService {
    /// Create a new face service
    pub fn new(
        engine: Arc<dyn FaceEngine>,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        config: &Config,
    ) -> Self {
        Self {
            engine,
            identity: IdentityStore::new(records, blobs),
            matcher: GalleryMatcher::new(&config.recognition),
            detection: config.detection.clone(),
        }
    }

    /// Get a reference to the identity store
    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    /// Process one uploaded image end to end.
    ///
    /// Any failing face step fails the whole upload.
    pub async fn upload(&self, image_data: &[u8]) -> ServiceResult<UploadResult> {
        let start = Instant::now();

        let image = decode_image(image_data)
            .map_err(|e| ServiceError::Validation(format!("{:#}", e)))?;
        let (width, height) = image.dimensions();

        let located = self.engine.locate(image_data).await?;
        let faces = filter_faces(width, height, &located, &self.detection);
        if faces.is_empty() {
            return Err(ServiceError::NoFacesDetected);
        }

        // Only surviving boxes are encoded
        let embeddings = self.engine.encode(image_data, &faces).await?;
        if embeddings.len() != faces.len() {
            return Err(anyhow::anyhow!(
                "Encoder returned {} embeddings for {} faces",
                embeddings.len(),
                faces.len()
            )
            .into());
        }

        let mut results = Vec::with_capacity(faces.len());
        for (location, embedding) in faces.into_iter().zip(embeddings) {
            let crop = encode_jpeg(&crop_face(&image, &location))?;
            results.push(self.ingest_face(location, embedding, crop).await?);
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let recognized = results.iter().filter(|r| r.is_recognized()).count();
        info!(
            "Processed {} faces ({} recognized) in {}ms",
            results.len(),
            recognized,
            elapsed_ms
        );

        Ok(UploadResult { faces: results, elapsed_ms })
    }

    async fn ingest_face(
        &self,
        position: FaceLocation,
        embedding: Embedding,
        crop: Vec<u8>,
    ) -> ServiceResult<FaceResult> {
        let face_id = Uuid::new_v4().to_string();

        // Fetched per face so earlier faces of the same upload are matchable
        let gallery = self.identity.gallery().await?;
        let ranked = self.matcher.rank(&embedding, &gallery);

        let Some(best) = self.matcher.accept(&ranked) else {
            self.identity
                .store_unrecognized_face(&face_id, &crop, embedding)
                .await?;
            debug!("Face {} unrecognized ({} weak candidates)", face_id, ranked.len());

            return Ok(FaceResult {
                face_id,
                name: UNKNOWN_PERSON.to_string(),
                confidence: 0,
                face_image: crop,
                position,
                duplicate: false,
            });
        };

        let person = self.identity.get_person(&best.name).await?;
        let duplicate = is_duplicate(self.identity.blobs(), person.as_ref(), &crop).await;
        if duplicate {
            debug!("Face {} is a duplicate image of {}, not stored", face_id, best.name);
        } else {
            self.identity
                .store_person_face(&best.name, &face_id, &crop, embedding)
                .await?;
        }

        Ok(FaceResult {
            face_id,
            name: best.name.clone(),
            confidence: best.confidence,
            face_image: crop,
            position,
            duplicate,
        })
    }
}

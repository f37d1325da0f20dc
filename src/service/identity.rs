//! Identity store
//!
//! Keeps persons, unrecognized faces and their blobs consistent. Blobs are
//! written before the record that references them and deleted before the
//! record that owned them; a failed blob delete never blocks the record
//! delete and is reported back as a [`Cleanup`] warning instead.

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::matcher::GalleryEntry;
use super::types::{Cleanup, GallerySummary};
use crate::engine::Embedding;
use crate::error::{ServiceError, ServiceResult};
use crate::storage::{BlobStore, History, Person, PersonFace, RecordStore, UnrecognizedFace};

pub struct IdentityStore {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
}

impl IdentityStore {
    pub fn new(records: Arc<dyn RecordStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { records, blobs }
    }

    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    /// Append a face to a person, creating the person on first face
    pub async fn add_face_to_person(
        &self,
        name: &str,
        face_id: &str,
        blob_id: &str,
        embedding: Embedding,
    ) -> ServiceResult<()> {
        let face = PersonFace {
            face_id: face_id.to_string(),
            blob_id: blob_id.to_string(),
            embedding,
        };
        self.records
            .append_person_face(name, &face, now())
            .await
            .with_context(|| format!("Failed to add face {} to {}", face_id, name))?;
        Ok(())
    }

    pub async fn save_unrecognized_face(
        &self,
        face_id: &str,
        blob_id: &str,
        embedding: Embedding,
    ) -> ServiceResult<()> {
        let face = UnrecognizedFace {
            face_id: face_id.to_string(),
            blob_id: blob_id.to_string(),
            embedding,
            recognized: false,
            person_name: None,
            timestamp: now(),
        };
        self.records
            .insert_unrecognized(&face)
            .await
            .with_context(|| format!("Failed to save unrecognized face {}", face_id))?;
        Ok(())
    }

    pub async fn mark_face_recognized(&self, face_id: &str, name: &str) -> ServiceResult<()> {
        if !self.records.mark_recognized(face_id, name).await? {
            return Err(ServiceError::NotFound(format!("Face not found: {}", face_id)));
        }
        debug!("Face {} claimed by {}", face_id, name);
        Ok(())
    }

    /// Store a crop and attach it to a person.
    ///
    /// If the record write fails the fresh blob is removed again.
    pub async fn store_person_face(
        &self,
        name: &str,
        face_id: &str,
        image: &[u8],
        embedding: Embedding,
    ) -> ServiceResult<String> {
        let blob_id = self.store_blob(image).await?;
        if let Err(e) = self.add_face_to_person(name, face_id, &blob_id, embedding).await {
            self.discard_blob(&blob_id, &mut Cleanup::default()).await;
            return Err(e);
        }
        Ok(blob_id)
    }

    /// Undo [`store_person_face`](Self::store_person_face).
    ///
    /// With `created_person` the person record is deleted as well.
    pub async fn unstore_person_face(
        &self,
        name: &str,
        face_id: &str,
        blob_id: &str,
        created_person: bool,
    ) -> ServiceResult<()> {
        let removed = if created_person {
            self.records.delete_person(name).await
        } else {
            self.records.remove_person_face(name, face_id).await
        }
        .with_context(|| format!("Failed to remove face {} from {}", face_id, name))?;

        if !removed {
            warn!("Face {} of {} was already gone", face_id, name);
        }
        self.discard_blob(blob_id, &mut Cleanup::default()).await;
        Ok(())
    }

    /// Store a crop as a new unrecognized face
    pub async fn store_unrecognized_face(
        &self,
        face_id: &str,
        image: &[u8],
        embedding: Embedding,
    ) -> ServiceResult<String> {
        let blob_id = self.store_blob(image).await?;
        if let Err(e) = self.save_unrecognized_face(face_id, &blob_id, embedding).await {
            self.discard_blob(&blob_id, &mut Cleanup::default()).await;
            return Err(e);
        }
        Ok(blob_id)
    }

    pub async fn get_person(&self, name: &str) -> ServiceResult<Option<Person>> {
        Ok(self.records.get_person(name).await?)
    }

    /// An unclaimed face; claimed or missing faces are not found
    pub async fn unrecognized_face(&self, face_id: &str) -> ServiceResult<UnrecognizedFace> {
        match self.records.get_unrecognized(face_id).await? {
            Some(face) if !face.recognized => Ok(face),
            _ => Err(ServiceError::NotFound(
                "Face ID not found in unrecognized faces".to_string(),
            )),
        }
    }

    pub async fn read_blob(&self, blob_id: &str) -> ServiceResult<Vec<u8>> {
        Ok(self.blobs.get(blob_id).await?)
    }

    /// Every stored `(person, embedding)` pair, persons oldest first
    pub async fn gallery(&self) -> ServiceResult<Vec<GalleryEntry>> {
        let persons = self.records.list_persons().await?;
        Ok(persons
            .into_iter()
            .flat_map(|person| {
                let name = person.name;
                person.faces.into_iter().map(move |face| GalleryEntry {
                    name: name.clone(),
                    embedding: face.embedding,
                })
            })
            .collect())
    }

    pub async fn get_all_persons(&self) -> ServiceResult<GallerySummary> {
        let persons = self.records.list_persons().await?;
        let unrecognized = self.records.list_unrecognized(false).await?;
        Ok(GallerySummary {
            persons: persons.into_iter().map(|p| p.name).collect(),
            unrecognized: unrecognized.into_iter().map(|f| f.face_id).collect(),
        })
    }

    /// Delete a person, their blobs, and release faces they had claimed
    pub async fn delete_person(&self, name: &str) -> ServiceResult<Cleanup> {
        let person = self
            .records
            .get_person(name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Person not found: {}", name)))?;

        let mut cleanup = Cleanup::default();
        for face in &person.faces {
            self.discard_blob(&face.blob_id, &mut cleanup).await;
        }

        if !self.records.delete_person(name).await? {
            return Err(ServiceError::NotFound(format!("Person not found: {}", name)));
        }
        cleanup.removed = 1;

        let face_ids: Vec<String> = person.faces.iter().map(|f| f.face_id.clone()).collect();
        let released = self.records.unclaim_person_faces(name, &face_ids).await?;
        info!("Deleted person {} ({} faces, {} released)", name, person.faces.len(), released);
        Ok(cleanup)
    }

    pub async fn delete_unrecognized_face(&self, face_id: &str) -> ServiceResult<Cleanup> {
        let face = self.unrecognized_face(face_id).await.map_err(|e| match e {
            ServiceError::NotFound(_) => ServiceError::NotFound(format!("Face not found: {}", face_id)),
            other => other,
        })?;

        let mut cleanup = Cleanup::default();
        self.discard_blob(&face.blob_id, &mut cleanup).await;

        if !self.records.delete_unrecognized(face_id).await? {
            return Err(ServiceError::NotFound(format!("Face not found: {}", face_id)));
        }
        cleanup.removed = 1;
        Ok(cleanup)
    }

    /// Remove one face from a person. The person stays even when emptied
    pub async fn delete_face_from_person(&self, name: &str, face_id: &str) -> ServiceResult<Cleanup> {
        let person = self
            .records
            .get_person(name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Person not found: {}", name)))?;

        let face = person
            .faces
            .iter()
            .find(|f| f.face_id == face_id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Face ID not found for this person: {}", face_id))
            })?;

        let mut cleanup = Cleanup::default();
        self.discard_blob(&face.blob_id, &mut cleanup).await;

        if !self.records.remove_person_face(name, face_id).await? {
            return Err(ServiceError::NotFound(format!(
                "Face ID not found for this person: {}",
                face_id
            )));
        }
        cleanup.removed = 1;
        Ok(cleanup)
    }

    pub async fn delete_all_persons(&self) -> ServiceResult<Cleanup> {
        let persons = self.records.list_persons().await?;

        let mut cleanup = Cleanup::default();
        for face in persons.iter().flat_map(|p| &p.faces) {
            self.discard_blob(&face.blob_id, &mut cleanup).await;
        }

        cleanup.removed = self.records.delete_all_persons().await?;
        let released = self.records.unclaim_all_faces().await?;
        info!("Deleted {} persons ({} faces released)", cleanup.removed, released);
        Ok(cleanup)
    }

    pub async fn delete_all_unrecognized_faces(&self) -> ServiceResult<Cleanup> {
        let faces = self.records.list_unrecognized(false).await?;

        let mut cleanup = Cleanup::default();
        for face in &faces {
            self.discard_blob(&face.blob_id, &mut cleanup).await;
        }

        cleanup.removed = self.records.delete_all_unrecognized().await?;
        info!("Deleted {} unrecognized faces", cleanup.removed);
        Ok(cleanup)
    }

    pub async fn get_history(&self) -> ServiceResult<History> {
        Ok(self.records.load_history().await?.unwrap_or_default())
    }

    pub async fn save_history(&self, history: &History) -> ServiceResult<()> {
        self.records
            .store_history(history)
            .await
            .context("Failed to save history")?;
        Ok(())
    }

    /// Drop the history document and leave an empty one in its place.
    ///
    /// Returns 1 if a document existed, 0 otherwise.
    pub async fn delete_all_history(&self) -> ServiceResult<u64> {
        let existed = self.records.remove_history().await?;
        self.records.store_history(&History::default()).await?;
        Ok(u64::from(existed))
    }

    async fn store_blob(&self, image: &[u8]) -> ServiceResult<String> {
        let blob_id = Uuid::new_v4().to_string();
        self.blobs
            .put(&blob_id, image)
            .await
            .context("Failed to store face image")?;
        Ok(blob_id)
    }

    async fn discard_blob(&self, blob_id: &str, cleanup: &mut Cleanup) {
        if let Err(e) = self.blobs.delete(blob_id).await {
            warn!("Error deleting blob {}: {:#}", blob_id, e);
            cleanup.warnings.push(format!("Error deleting blob {}: {:#}", blob_id, e));
        }
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

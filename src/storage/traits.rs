//! Storage abstraction traits
//!
//! Records (persons, unrecognized faces, history) and image blobs live in
//! separate stores with no transaction spanning them. The identity layer
//! orders calls so a crash leaves orphaned blobs rather than dangling ids.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::engine::Embedding;

/// One face assigned to a person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonFace {
    pub face_id: String,
    pub blob_id: String,
    pub embedding: Embedding,
}

/// A named person and their faces, in assignment order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub faces: Vec<PersonFace>,
    pub created_at: i64,
}

/// A face that had no confident match at upload time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnrecognizedFace {
    pub face_id: String,
    pub blob_id: String,
    pub embedding: Embedding,
    /// Claimed by a person; the row stays addressable by `face_id`
    pub recognized: bool,
    pub person_name: Option<String>,
    pub timestamp: i64,
}

/// Client-owned browsing history, stored as a single document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct History {
    pub image_history: Vec<serde_json::Value>,
    pub recognized_persons: Vec<serde_json::Value>,
    pub unrecognized_persons: Vec<serde_json::Value>,
}

/// Document store for persons, unrecognized faces and history
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Get a person with their faces
    async fn get_person(&self, name: &str) -> Result<Option<Person>>;

    /// All persons, oldest first
    async fn list_persons(&self) -> Result<Vec<Person>>;

    /// Append a face to a person, creating the person if absent
    async fn append_person_face(&self, name: &str, face: &PersonFace, created_at: i64) -> Result<()>;

    /// Remove a single face from a person. Returns false if it was not there
    async fn remove_person_face(&self, name: &str, face_id: &str) -> Result<bool>;

    /// Delete a person and their faces
    async fn delete_person(&self, name: &str) -> Result<bool>;

    /// Delete every person, returning how many were removed
    async fn delete_all_persons(&self) -> Result<u64>;

    /// Insert an unrecognized face record
    async fn insert_unrecognized(&self, face: &UnrecognizedFace) -> Result<()>;

    /// Get an unrecognized face record, claimed or not
    async fn get_unrecognized(&self, face_id: &str) -> Result<Option<UnrecognizedFace>>;

    /// Unrecognized face records filtered by claim state, oldest first
    async fn list_unrecognized(&self, recognized: bool) -> Result<Vec<UnrecognizedFace>>;

    /// Flip a face to claimed by `person_name`
    async fn mark_recognized(&self, face_id: &str, person_name: &str) -> Result<bool>;

    /// Reset the listed faces to unclaimed where `person_name` still holds the claim
    async fn unclaim_person_faces(&self, person_name: &str, face_ids: &[String]) -> Result<u64>;

    /// Reset every claimed face to unclaimed
    async fn unclaim_all_faces(&self) -> Result<u64>;

    /// Delete an unclaimed face record. Claimed rows are left alone
    async fn delete_unrecognized(&self, face_id: &str) -> Result<bool>;

    /// Delete every unclaimed face record
    async fn delete_all_unrecognized(&self) -> Result<u64>;

    /// Load the history document, if one was ever stored
    async fn load_history(&self) -> Result<Option<History>>;

    /// Replace the history document
    async fn store_history(&self, history: &History) -> Result<()>;

    /// Remove the history document. Returns whether one existed
    async fn remove_history(&self) -> Result<bool>;
}

/// Binary store for face crops
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    async fn put(&self, blob_id: &str, data: &[u8]) -> Result<()>;

    async fn get(&self, blob_id: &str) -> Result<Vec<u8>>;

    async fn delete(&self, blob_id: &str) -> Result<()>;
}

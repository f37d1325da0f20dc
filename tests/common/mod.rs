//! Shared fixtures: a scripted face engine and in-process stores

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use parking_lot::Mutex;
use tempfile::TempDir;

use facetag::config::Config;
use facetag::engine::{Embedding, FaceEngine, FaceLocation};
use facetag::service::FaceService;
use facetag::storage::{
    History, MemoryBlobStore, Person, PersonFace, RecordStore, SqliteStore, UnrecognizedFace,
};

/// Engine that returns pre-set detections and records what it was asked to encode
#[derive(Default)]
pub struct ScriptedEngine {
    locations: Mutex<Vec<FaceLocation>>,
    embeddings: Mutex<Vec<Embedding>>,
    encoded: Mutex<Vec<Vec<FaceLocation>>>,
}

impl ScriptedEngine {
    /// Script the next upload: raw detections and the embeddings handed back for the survivors
    pub fn script(&self, locations: Vec<FaceLocation>, embeddings: Vec<Vec<f32>>) {
        *self.locations.lock() = locations;
        *self.embeddings.lock() = embeddings.into_iter().map(Embedding).collect();
    }

    /// Locations passed to every `encode` call so far
    pub fn encoded(&self) -> Vec<Vec<FaceLocation>> {
        self.encoded.lock().clone()
    }
}

#[async_trait]
impl FaceEngine for ScriptedEngine {
    async fn locate(&self, _image_data: &[u8]) -> Result<Vec<FaceLocation>> {
        Ok(self.locations.lock().clone())
    }

    async fn encode(&self, _image_data: &[u8], locations: &[FaceLocation]) -> Result<Vec<Embedding>> {
        self.encoded.lock().push(locations.to_vec());
        Ok(self.embeddings.lock().clone())
    }
}

/// SQLite record store whose writes can be switched to fail
pub struct FlakyRecords {
    inner: SqliteStore,
    fail_appends: AtomicBool,
    fail_inserts: AtomicBool,
    fail_marks: AtomicBool,
}

impl FlakyRecords {
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::Relaxed);
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::Relaxed);
    }

    pub fn fail_marks(&self, fail: bool) {
        self.fail_marks.store(fail, Ordering::Relaxed);
    }

    fn check(flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::Relaxed) {
            anyhow::bail!("store offline");
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FlakyRecords {
    async fn get_person(&self, name: &str) -> Result<Option<Person>> {
        self.inner.get_person(name).await
    }

    async fn list_persons(&self) -> Result<Vec<Person>> {
        self.inner.list_persons().await
    }

    async fn append_person_face(&self, name: &str, face: &PersonFace, created_at: i64) -> Result<()> {
        Self::check(&self.fail_appends)?;
        self.inner.append_person_face(name, face, created_at).await
    }

    async fn remove_person_face(&self, name: &str, face_id: &str) -> Result<bool> {
        self.inner.remove_person_face(name, face_id).await
    }

    async fn delete_person(&self, name: &str) -> Result<bool> {
        self.inner.delete_person(name).await
    }

    async fn delete_all_persons(&self) -> Result<u64> {
        self.inner.delete_all_persons().await
    }

    async fn insert_unrecognized(&self, face: &UnrecognizedFace) -> Result<()> {
        Self::check(&self.fail_inserts)?;
        self.inner.insert_unrecognized(face).await
    }

    async fn get_unrecognized(&self, face_id: &str) -> Result<Option<UnrecognizedFace>> {
        self.inner.get_unrecognized(face_id).await
    }

    async fn list_unrecognized(&self, recognized: bool) -> Result<Vec<UnrecognizedFace>> {
        self.inner.list_unrecognized(recognized).await
    }

    async fn mark_recognized(&self, face_id: &str, person_name: &str) -> Result<bool> {
        Self::check(&self.fail_marks)?;
        self.inner.mark_recognized(face_id, person_name).await
    }

    async fn unclaim_person_faces(&self, person_name: &str, face_ids: &[String]) -> Result<u64> {
        self.inner.unclaim_person_faces(person_name, face_ids).await
    }

    async fn unclaim_all_faces(&self) -> Result<u64> {
        self.inner.unclaim_all_faces().await
    }

    async fn delete_unrecognized(&self, face_id: &str) -> Result<bool> {
        self.inner.delete_unrecognized(face_id).await
    }

    async fn delete_all_unrecognized(&self) -> Result<u64> {
        self.inner.delete_all_unrecognized().await
    }

    async fn load_history(&self) -> Result<Option<History>> {
        self.inner.load_history().await
    }

    async fn store_history(&self, history: &History) -> Result<()> {
        self.inner.store_history(history).await
    }

    async fn remove_history(&self) -> Result<bool> {
        self.inner.remove_history().await
    }
}

pub struct Harness {
    pub engine: Arc<ScriptedEngine>,
    pub records: Arc<FlakyRecords>,
    pub blobs: Arc<MemoryBlobStore>,
    pub service: Arc<FaceService>,
    _dir: TempDir,
}

pub async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let records = Arc::new(FlakyRecords {
        inner: SqliteStore::new(&dir.path().join("faces.db")).await.unwrap(),
        fail_appends: AtomicBool::new(false),
        fail_inserts: AtomicBool::new(false),
        fail_marks: AtomicBool::new(false),
    });
    let blobs = Arc::new(MemoryBlobStore::new());
    let engine = Arc::new(ScriptedEngine::default());

    let service = Arc::new(FaceService::new(
        engine.clone(),
        records.clone(),
        blobs.clone(),
        &Config::default(),
    ));

    Harness {
        engine,
        records,
        blobs,
        service,
        _dir: dir,
    }
}

/// 200x200 box spanning 50..150 on both axes
pub fn centered_face() -> FaceLocation {
    FaceLocation {
        top: 50,
        right: 150,
        bottom: 150,
        left: 50,
    }
}

/// A 200x200 PNG filled with one color
pub fn photo(color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(200, 200, Rgb(color));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

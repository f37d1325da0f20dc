//! In-memory blob store
//!
//! Used for tests and for running the service without a blob directory.
//! Deletes can be made to fail to exercise best-effort cleanup paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

use super::traits::BlobStore;

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    fail_deletes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `delete` fail without removing anything
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::Relaxed);
    }

    pub fn contains(&self, blob_id: &str) -> bool {
        self.blobs.read().contains_key(blob_id)
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, blob_id: &str, data: &[u8]) -> Result<()> {
        self.blobs.write().insert(blob_id.to_string(), data.to_vec());
        Ok(())
    }

    async fn get(&self, blob_id: &str) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .get(blob_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Blob not found: {}", blob_id))
    }

    async fn delete(&self, blob_id: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::Relaxed) {
            anyhow::bail!("Blob store rejected delete of {}", blob_id);
        }
        self.blobs
            .write()
            .remove(blob_id)
            .map(|_| ())
            .ok_or_else(|| anyhow::anyhow!("Blob not found: {}", blob_id))
    }
}

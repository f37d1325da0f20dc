//! Filesystem blob store
//!
//! One `<blob_id>.jpg` file per blob under a single directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::traits::BlobStore;

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)
            .with_context(|| format!("Failed to create blob directory {:?}", root))?;
        Ok(Self { root: root.to_path_buf() })
    }

    fn path_for(&self, blob_id: &str) -> Result<PathBuf> {
        // Blob ids are generated uuids; refuse anything that could escape the root
        if blob_id.is_empty() || blob_id.contains(['/', '\\', '.']) {
            anyhow::bail!("Invalid blob id: {:?}", blob_id);
        }
        Ok(self.root.join(format!("{}.jpg", blob_id)))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, blob_id: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(blob_id)?;
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write blob {}", blob_id))?;
        debug!("Stored blob {} ({} bytes)", blob_id, data.len());
        Ok(())
    }

    async fn get(&self, blob_id: &str) -> Result<Vec<u8>> {
        let path = self.path_for(blob_id)?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read blob {}", blob_id))
    }

    async fn delete(&self, blob_id: &str) -> Result<()> {
        let path = self.path_for(blob_id)?;
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to delete blob {}", blob_id))
    }
}

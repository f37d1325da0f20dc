//! Duplicate image detection
//!
//! Compares the SHA-256 digest of a new crop against every image already
//! stored for a person. Stored images are fetched and hashed on demand.

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::storage::{BlobStore, Person};

/// Hex SHA-256 digest of image bytes
pub fn content_hash(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Whether `person` already has a byte-identical image.
///
/// Blobs that cannot be read are skipped.
pub async fn is_duplicate(blobs: &dyn BlobStore, person: Option<&Person>, image: &[u8]) -> bool {
    let Some(person) = person else {
        return false;
    };

    let new_hash = content_hash(image);

    for face in &person.faces {
        match blobs.get(&face.blob_id).await {
            Ok(existing) => {
                if content_hash(&existing) == new_hash {
                    return true;
                }
            }
            Err(e) => warn!("Error comparing image {} of {}: {:#}", face.blob_id, person.name, e),
        }
    }

    false
}

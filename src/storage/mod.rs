//! Storage module for face data persistence

pub mod blob;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use blob::FsBlobStore;
pub use memory::MemoryBlobStore;
pub use sqlite::SqliteStore;
pub use traits::{BlobStore, History, Person, PersonFace, RecordStore, UnrecognizedFace};

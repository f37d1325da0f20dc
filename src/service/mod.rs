//! Service layer module

pub mod admin;
pub mod duplicate;
pub mod face_service;
pub mod identity;
pub mod matcher;
pub mod types;

pub use face_service::FaceService;
pub use identity::IdentityStore;
pub use matcher::{Candidate, GalleryEntry, GalleryMatcher};
pub use types::*;

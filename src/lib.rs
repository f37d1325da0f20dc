//! Face gallery service library
//!
//! Uploaded photos are run through an external face detector, each face is
//! matched against the gallery of known persons, and the result is stored
//! either under the matched person or as an unrecognized face awaiting a
//! claim.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod service;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};

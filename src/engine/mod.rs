//! Face engine seam
//!
//! Face location and encoding are delegated to an external detector. The
//! service only depends on the [`FaceEngine`] trait; [`HttpEngine`] talks to
//! the detector sidecar, and [`filter`] post-processes its raw detections.

pub mod filter;
pub mod http;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::math::euclidean_distance;

pub use filter::filter_faces;
pub use http::HttpEngine;

/// Face bounding box in pixel coordinates.
///
/// Serialized as `[top, right, bottom, left]`, the order the detector and
/// the web client both use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct FaceLocation {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl FaceLocation {
    pub fn width(&self) -> f32 {
        self.right as f32 - self.left as f32
    }

    pub fn height(&self) -> f32 {
        self.bottom as f32 - self.top as f32
    }
}

impl From<[u32; 4]> for FaceLocation {
    fn from([top, right, bottom, left]: [u32; 4]) -> Self {
        Self { top, right, bottom, left }
    }
}

impl From<FaceLocation> for [u32; 4] {
    fn from(loc: FaceLocation) -> Self {
        [loc.top, loc.right, loc.bottom, loc.left]
    }
}

/// Face encoding produced by the external encoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn distance(&self, other: &Embedding) -> f32 {
        euclidean_distance(&self.0, &other.0)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        crate::utils::math::f32_to_bytes(&self.0)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        crate::utils::math::f32_from_bytes(bytes).map(Self)
    }
}

/// External face locator + encoder
#[async_trait]
pub trait FaceEngine: Send + Sync + 'static {
    /// Locate every face in an encoded image
    async fn locate(&self, image_data: &[u8]) -> Result<Vec<FaceLocation>>;

    /// Encode only the given faces; one embedding per location, same order
    async fn encode(&self, image_data: &[u8], locations: &[FaceLocation]) -> Result<Vec<Embedding>>;
}

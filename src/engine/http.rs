//! Detector sidecar client
//!
//! The sidecar wraps the face location/encoding model and exposes two calls:
//! `POST /locate` (raw image bytes in, `{"locations": [...]}` out) and
//! `POST /encode` (`{"image": <base64>, "locations": [...]}` in,
//! `{"encodings": [...]}` out).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Embedding, FaceEngine, FaceLocation};
use crate::config::EngineConfig;

#[derive(Debug, Deserialize)]
struct LocateResponse {
    locations: Vec<FaceLocation>,
}

#[derive(Debug, Serialize)]
struct EncodeRequest<'a> {
    image: String,
    locations: &'a [FaceLocation],
}

#[derive(Debug, Deserialize)]
struct EncodeResponse {
    encodings: Vec<Embedding>,
}

/// HTTP-backed [`FaceEngine`]
pub struct HttpEngine {
    base_url: String,
    client: reqwest::Client,
}

impl HttpEngine {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build detector client")?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn check(response: reqwest::Response, call: &str) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Detector {} failed ({}): {}", call, status, body);
        }
        Ok(response)
    }
}

#[async_trait]
impl FaceEngine for HttpEngine {
    async fn locate(&self, image_data: &[u8]) -> Result<Vec<FaceLocation>> {
        let response = self
            .client
            .post(format!("{}/locate", self.base_url))
            .header("Content-Type", "application/octet-stream")
            .body(image_data.to_vec())
            .send()
            .await
            .context("Detector unreachable")?;

        let body: LocateResponse = Self::check(response, "locate")
            .await?
            .json()
            .await
            .context("Malformed locate response")?;

        debug!("Detector located {} faces", body.locations.len());
        Ok(body.locations)
    }

    async fn encode(&self, image_data: &[u8], locations: &[FaceLocation]) -> Result<Vec<Embedding>> {
        if locations.is_empty() {
            return Ok(Vec::new());
        }

        let request = EncodeRequest {
            image: base64::engine::general_purpose::STANDARD.encode(image_data),
            locations,
        };

        let response = self
            .client
            .post(format!("{}/encode", self.base_url))
            .json(&request)
            .send()
            .await
            .context("Detector unreachable")?;

        let body: EncodeResponse = Self::check(response, "encode")
            .await?
            .json()
            .await
            .context("Malformed encode response")?;

        Ok(body.encodings)
    }
}

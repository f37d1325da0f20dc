//! Face gallery service configuration

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub rest_port: u16,
    /// Upper bound for an uploaded request body, in megabytes
    pub body_limit_mb: usize,
}

/// Detector sidecar that performs face location and encoding
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub url: String,
    pub timeout_secs: u64,
}

/// Heuristics applied to raw detections before encoding
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum face side as a fraction of the image's shorter side
    pub min_face_ratio: f32,
    pub min_aspect: f32,
    pub max_aspect: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_face_ratio: 0.08,
            min_aspect: 0.6,
            max_aspect: 1.7,
        }
    }
}

/// Gallery matching thresholds.
///
/// Candidates are first cut at `distance_cutoff` (Euclidean), then the best
/// one is accepted only when its confidence exceeds `accept_confidence`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub distance_cutoff: f32,
    pub accept_confidence: i32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            distance_cutoff: 0.6,
            accept_confidence: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub sqlite_path: PathBuf,
    pub blob_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Config file path, overridable with `FACETAG_CONFIG`
    pub fn default_path() -> String {
        std::env::var("FACETAG_CONFIG").unwrap_or_else(|_| "config.toml".to_string())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                rest_port: 5000,
                body_limit_mb: 50,
            },
            engine: EngineConfig {
                url: "http://127.0.0.1:8100".to_string(),
                timeout_secs: 60,
            },
            detection: DetectionConfig::default(),
            recognition: RecognitionConfig::default(),
            storage: StorageConfig {
                sqlite_path: PathBuf::from("data/faces.db"),
                blob_dir: PathBuf::from("data/blobs"),
            },
            logging: LoggingConfig::default(),
        }
    }
}

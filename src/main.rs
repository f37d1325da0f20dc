//! Face Gallery Service
//!
//! Detects faces in uploaded photos, recognizes known persons and keeps
//! unknown faces around until someone names them. Serves a REST (Axum) API.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use facetag::api::rest::{create_rest_router, AppState};
use facetag::config::Config;
use facetag::engine::HttpEngine;
use facetag::service::FaceService;
use facetag::storage::{FsBlobStore, SqliteStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration before logging so the level can come from it
    let config_path = Config::default_path();
    let loaded = Config::load(&config_path);
    let config = loaded.as_ref().cloned().unwrap_or_default();

    let level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .init();

    info!("Starting Face Gallery Service v{}", env!("CARGO_PKG_VERSION"));
    if let Err(e) = &loaded {
        warn!("Using default config ({:#})", e);
    }

    info!("Configuration loaded:");
    info!("  REST port: {}", config.server.rest_port);
    info!("  Engine: {}", config.engine.url);
    info!(
        "  Recognition: distance < {}, confidence > {}",
        config.recognition.distance_cutoff, config.recognition.accept_confidence
    );

    // Initialize storage
    let records = Arc::new(SqliteStore::new(&config.storage.sqlite_path).await?);
    info!("SQLite storage initialized at: {}", config.storage.sqlite_path.display());

    let blobs = Arc::new(FsBlobStore::new(&config.storage.blob_dir)?);
    info!("Blob storage initialized at: {}", config.storage.blob_dir.display());

    let engine = Arc::new(HttpEngine::new(&config.engine)?);

    // Create face service
    let service = Arc::new(FaceService::new(engine, records, blobs, &config));

    let app_state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
    });
    let rest_router = create_rest_router(app_state, config.server.body_limit_mb);

    let addr = format!("0.0.0.0:{}", config.server.rest_port);
    let listener = TcpListener::bind(&addr).await?;
    info!("REST API listening on http://{}", addr);
    info!("Face Gallery Service is ready!");

    axum::serve(listener, rest_router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received, cleaning up...");
        })
        .await?;

    info!("Goodbye!");
    Ok(())
}

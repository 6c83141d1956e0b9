//! Lecture analysis worker binary.
//!
//! Usage: `lectern-worker <video-id> <object-key>`

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lectern_models::VideoId;
use lectern_storage::SourceBucket;
use lectern_worker::{CatalogApiSink, GeminiClient, VideoPipeline, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::from_default_env().add_directive("lectern=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let mut args = std::env::args().skip(1);
    let (video_id, object_key) = match (args.next(), args.next()) {
        (Some(id), Some(key)) => (VideoId::from_string(id), key),
        _ => {
            error!("Usage: lectern-worker <video-id> <object-key>");
            std::process::exit(2);
        }
    };

    info!("Starting lectern-worker for video {}", video_id);

    let config = WorkerConfig::from_env();

    let storage = match SourceBucket::from_env().await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create storage client: {}", e);
            std::process::exit(1);
        }
    };

    let gemini = match GeminiClient::new() {
        Ok(g) => g,
        Err(e) => {
            error!("Failed to create Gemini client: {}", e);
            std::process::exit(1);
        }
    };

    let sink = Arc::new(CatalogApiSink::new(config.catalog_api_url.clone()));

    let pipeline = VideoPipeline::new(Arc::new(storage), gemini, sink, config);
    let outcome = pipeline.process(video_id, &object_key).await;

    if outcome.is_success() {
        info!("Processing succeeded");
    } else {
        error!("Processing failed: {:?}", outcome);
        std::process::exit(1);
    }
}

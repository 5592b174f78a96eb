// Main entry point for the classifieds-server application.
// Parses configuration, sets up logging, builds the listing store and the Axum
// router, and serves HTTP until a shutdown signal arrives.

mod image_intake;
mod listing_store;
mod models;
mod query;
mod shutdown_signal;
mod web;

use clap::Parser;
use image_intake::{DEFAULT_MAX_IMAGE_SIZE_BYTES, FilenameStrategy, UploadConfig};
use listing_store::ListingStore;
use shutdown_signal::shutdown_signal;
use std::path::PathBuf;
use tracing::Level;
use web::AppState;

/// Command line arguments for classifieds-server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct AppConfig {
    /// Hostname/IP to bind the server to.
    /// If this option is specified without value, it will default to "*", meaning the server will listen on all interfaces.
    #[arg(long, env = "CLASSIFIEDS_HOST", default_value = "localhost", num_args = 0..=1, default_missing_value = "*")]
    host: String,

    /// Port number to listen on.
    #[arg(short, long, env = "CLASSIFIEDS_PORT", default_value_t = 3000)]
    port: u16,

    /// Directory uploaded listing images are written to and served from.
    #[arg(long, env = "CLASSIFIEDS_UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    /// Largest accepted image, in bytes.
    #[arg(long, env = "CLASSIFIEDS_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_IMAGE_SIZE_BYTES)]
    max_upload_bytes: usize,

    /// How stored image files are named.
    #[arg(long, env = "CLASSIFIEDS_FILENAME_STRATEGY", value_enum, default_value_t = FilenameStrategy::TimestampRandom)]
    filename_strategy: FilenameStrategy,

    /// Maximum log level (error, warn, info, debug, trace).
    #[arg(long, env = "CLASSIFIEDS_LOG_LEVEL", default_value_t = Level::INFO)]
    log_level: Level,
}

#[tokio::main]
async fn main() {
    // Parse command line args and environment variables
    let config = AppConfig::parse();

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(true) // Include module path in logs
        .with_file(true) // Include source file name
        .with_line_number(true) // Include line numbers
        .init();

    tracing::info!("Starting classifieds-server...");

    let uploads = UploadConfig {
        upload_dir: config.upload_dir,
        max_size_bytes: config.max_upload_bytes,
        filename_strategy: config.filename_strategy,
        ..Default::default()
    };
    tracing::info!(
        "Images go to {} (max {} bytes, served under {})",
        uploads.upload_dir.display(),
        uploads.max_size_bytes,
        uploads.public_prefix
    );

    // The store is created once here and shared with every handler; nothing survives a restart.
    let state = AppState::new(ListingStore::default(), uploads);
    let app = web::create_app(state);

    tracing::info!("Axum router configured.");

    let listener = match web::create_listener(&config.host, config.port).await {
        Ok((addr, listener)) => {
            tracing::info!("Server successfully bound. Listening on {}", addr);
            listener
        }
        Err(e) => {
            tracing::error!("FATAL: Failed to bind server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server run error: {}", e);
    }

    tracing::info!("classifieds-server has shut down.");
}

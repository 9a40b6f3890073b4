//! Main entry point for the Survale position hub.
//!
//! This binary keeps the shared position collection in memory and serves it
//! over HTTP and WebSocket using the Axum web framework.

use std::sync::Arc;

use survale_sync::{Config, MemoryStore, server::app};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Survale position hub...");

    let config = Config::load();
    let addr = match config.bind_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(MemoryStore::new());
    let app = app(store);

    info!("Hub listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /health             - Health check");
    info!("  GET  /locations          - Current snapshot");
    info!("  GET  /locations/bounds   - Region framing every position");
    info!("  PUT  /locations/:user_id - Publish a position");
    info!("  GET  /ws                 - Live snapshot session");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

//! HTTP server for vigild

use crate::routes;
use anyhow::{Context, Result};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use vigil_common::{FileStore, VigilConfig};

/// Application state shared across handlers
pub struct AppState {
    /// Account records; every store call is serialized through the lock
    /// and runs on the blocking pool
    pub store: Arc<Mutex<FileStore>>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            store: Arc::new(Mutex::new(FileStore::new(data_dir))),
            start_time: Instant::now(),
        }
    }
}

/// Router with every route and request tracing
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::progress_routes())
        .merge(routes::health_routes())
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until ctrl-c
pub async fn run(config: &VigilConfig) -> Result<()> {
    let data_dir = config.server_data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;
    info!("  Account records in {}", data_dir.display());

    let app = app(AppState::new(&data_dir));

    let addr = config.server.bind.as_str();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down gracefully"),
        Err(e) => {
            warn!("Cannot listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

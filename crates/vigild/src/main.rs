//! vigild - remote progression store daemon

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vigil_common::VigilConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("vigild v{} starting", env!("CARGO_PKG_VERSION"));

    let config = VigilConfig::load();
    vigild::run(&config).await
}

//! vigilctl - CLI for Vigil progression

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use vigil_common::{ReconciliationService, VigilConfig};
use vigilctl::{Cli, SessionFile};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => VigilConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => VigilConfig::load(),
    };

    let session_path = config.session_path();
    let session = SessionFile::load(&session_path)?;
    let mut service = ReconciliationService::from_config(&config)?.with_session(session.identity);

    let output = vigilctl::run(cli.command, &mut service, &session_path)?;
    print!("{}", output);
    Ok(())
}

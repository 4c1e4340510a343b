use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use anomaly_common::Config;
use anomaly_service::start;

#[derive(Parser)]
#[command(name = "anomaly-service", about = "Per-service anomaly detection router")]
struct Cli {
    /// Path to a JSON configuration file; environment variables still override it.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("anomaly_service=info")))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.exists().then_some(cli.config.as_path());
    let config = Config::load(config_path).with_context(|| format!("unable to load config from {}", cli.config.display()))?;
    config.log_redacted();

    let handle = start(config).await?;

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }

    handle.shutdown().await;
    tracing::info!("shutdown complete");
    Ok(())
}

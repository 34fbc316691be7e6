use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use svckit_core::config::AppConfig;
use svckit_server::Server;
use tokio::signal;
use tracing::info;

/// svckit - lightweight backend-service node with multicast peer discovery
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "bench.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::from_file(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    let mut server = Server::start(config, |event| {
        info!(
            name = %event.peer.name,
            id = event.peer.id,
            ip = %event.peer.ip,
            port = event.peer.port,
            "peer discovered"
        );
    })
    .await
    .context("failed to start server")?;

    signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutdown signal received");

    server.stop().await;

    Ok(())
}

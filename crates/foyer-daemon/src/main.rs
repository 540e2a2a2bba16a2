//! Foyer Daemon - Main entry point
//!
//! Receives presence scan batches, reconciles them against the
//! known-device catalogue, and serves the merged snapshot to the display
//! client.

mod api;
mod config;
mod server;
mod state;
mod weather;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "foyerd")]
#[command(about = "Home network presence daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "foyer.toml")]
    config: PathBuf,

    /// Bind address for the web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Foyer v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(&args.config)?;

    if let Some(bind) = args.bind {
        config.daemon.bind = bind;
    }

    info!(
        storage = %config.storage.path,
        bind = %config.daemon.bind,
        "Configuration loaded"
    );

    let state = state::AppState::new(config.clone())?;
    server::run(state, &config.daemon.bind).await?;

    Ok(())
}

//! Foyer Scanner - Main entry point
//!
//! Periodically reads the kernel neighbour table and posts the observed
//! devices to the Foyer daemon.

mod arp;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use foyer_core::ObservedDevice;
use std::collections::HashSet;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "foyer-scan")]
#[command(about = "Network presence scanner for the Foyer daemon")]
#[command(version)]
struct Args {
    /// Ingest endpoint of the Foyer daemon
    #[arg(short, long, default_value = "http://localhost:5002/api/devices")]
    api_url: String,

    /// Seconds between scans
    #[arg(short, long, default_value_t = 10)]
    interval: u64,

    /// Run a single scan and exit
    #[arg(long)]
    once: bool,

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

    info!(api_url = %args.api_url, interval = args.interval, "Foyer scanner starting");

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    loop {
        let batch = scan_network();

        if batch.is_empty() {
            warn!("No devices found on the network");
        } else {
            info!(count = batch.len(), "Scan found devices");
            if let Err(e) = send_batch(&client, &args.api_url, &batch).await {
                warn!(error = %e, "Failed to send batch to daemon");
            }
        }

        if args.once {
            break;
        }
        debug!("Waiting {} seconds before next scan", args.interval);
        sleep(Duration::from_secs(args.interval)).await;
    }

    Ok(())
}

/// Read the neighbour table and build a validated, deduplicated batch.
fn scan_network() -> Vec<ObservedDevice> {
    let entries = match arp::neighbor_table() {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Failed to read neighbour table");
            return Vec::new();
        }
    };

    let mut seen: HashSet<String> = HashSet::new();
    let mut batch = Vec::new();

    for entry in entries {
        if !entry.state.is_present() || !arp::is_valid_mac(&entry.mac) {
            continue;
        }
        let mac = arp::normalize_mac(&entry.mac);
        // First sighting wins within a single scan
        if !seen.insert(mac.clone()) {
            continue;
        }

        batch.push(ObservedDevice {
            mac,
            ip: Some(entry.ip.to_string()),
            hostname: arp::resolve_hostname(entry.ip),
            last_seen: Some(Utc::now().to_rfc3339()),
        });
    }

    batch
}

/// POST the batch to the daemon's ingest endpoint.
async fn send_batch(
    client: &reqwest::Client,
    api_url: &str,
    batch: &[ObservedDevice],
) -> Result<()> {
    let response = client.post(api_url).json(batch).send().await?;

    if response.status().is_success() {
        debug!(status = %response.status(), "Batch accepted");
        Ok(())
    } else {
        anyhow::bail!("daemon rejected batch with status {}", response.status())
    }
}

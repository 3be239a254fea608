//! Add-on ingress proxy.
//!
//! Fronts add-on web UIs behind a single authenticated entry point.
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                      INGRESS                         │
//!   Browser          │  ┌─────────┐   ┌──────────┐   ┌──────────────────┐   │
//!   /{token}/{path} ─┼─▶│ session │──▶│  route   │──▶│ header transform │   │
//!                    │  │  gate   │   │ resolver │   └────────┬─────────┘   │
//!                    │  └─────────┘   └──────────┘            │             │
//!                    │                          ┌─────────────┴──────┐      │
//!                    │                          ▼                    ▼      │
//!                    │                   ┌────────────┐     ┌────────────┐  │    Add-on
//!   ◀────────────────┼───────────────────│ HTTP proxy │     │ WebSocket  │◀─┼──▶ container
//!                    │                   │  engine    │     │   relay    │  │
//!                    │                   └────────────┘     └────────────┘  │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use addon_ingress::config::{load_config, watcher::ConfigWatcher, IngressConfig};
use addon_ingress::http::HttpServer;
use addon_ingress::lifecycle::{signals, Shutdown};
use addon_ingress::observability::{logging, metrics};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "addon-ingress")]
#[command(about = "Authenticated ingress proxy for add-on web interfaces", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => IngressConfig::default(),
    };

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "addon-ingress starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        addons = config.addons.len(),
        buffer_threshold_bytes = config.proxy.buffer_threshold_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));

    let server = HttpServer::new(config);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

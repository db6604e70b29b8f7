//! scan-relay: server-side transform relay for the barcode scanner.
//!
//! Holds one-shot transform callbacks registered by hosts and answers
//! scanner redemptions over JSON-over-WebSocket.
//!
//! # Usage
//!
//! ```text
//! scan-relay [OPTIONS]
//!
//! Options:
//!   --ws-bind <ADDR>          IP address to bind [default: 127.0.0.1]
//!   --ws-port <PORT>          WebSocket listener port [default: 9580]
//!   --callback-ttl <SECS>     Callback lifetime in seconds [default: 300]
//!   --sweep-interval <SECS>   Expiry sweep period in seconds [default: 60]
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence when both are present.
//!
//! | Variable                    | Default     |
//! |-----------------------------|-------------|
//! | `SCAN_RELAY_WS_BIND`        | `127.0.0.1` |
//! | `SCAN_RELAY_WS_PORT`        | `9580`      |
//! | `SCAN_RELAY_CALLBACK_TTL`   | `300`       |
//! | `SCAN_RELAY_SWEEP_INTERVAL` | `60`        |

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{ensure, Context};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scan_relay::application::RelayService;
use scan_relay::domain::RelayConfig;
use scan_relay::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Barcode scanner transform relay.
#[derive(Debug, Parser)]
#[command(
    name = "scan-relay",
    about = "Server-side transform relay for barcode scanner sessions",
    version
)]
struct Cli {
    /// IP address to bind the WebSocket server to.
    #[arg(long, default_value = "127.0.0.1", env = "SCAN_RELAY_WS_BIND")]
    ws_bind: String,

    /// TCP port for the WebSocket server to listen on.
    #[arg(long, default_value_t = 9580, env = "SCAN_RELAY_WS_PORT")]
    ws_port: u16,

    /// Seconds a registered callback stays redeemable.
    #[arg(long, default_value_t = 300, env = "SCAN_RELAY_CALLBACK_TTL")]
    callback_ttl: u64,

    /// Seconds between sweeps of expired callbacks.
    #[arg(long, default_value_t = 60, env = "SCAN_RELAY_SWEEP_INTERVAL")]
    sweep_interval: u64,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`RelayConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--ws-bind` is not an IP address, or if either
    /// duration is zero.
    fn into_relay_config(self) -> anyhow::Result<RelayConfig> {
        let ws_bind_addr: SocketAddr = format!("{}:{}", self.ws_bind, self.ws_port)
            .parse()
            .with_context(|| {
                format!(
                    "invalid WebSocket bind address: '{}:{}'",
                    self.ws_bind, self.ws_port
                )
            })?;

        ensure!(self.callback_ttl > 0, "--callback-ttl must be at least 1 second");
        ensure!(self.sweep_interval > 0, "--sweep-interval must be at least 1 second");

        Ok(RelayConfig {
            ws_bind_addr,
            callback_ttl: Duration::from_secs(self.callback_ttl),
            sweep_interval: Duration::from_secs(self.sweep_interval),
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `RUST_LOG` controls verbosity; invalid or absent falls back to `info`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_relay_config()?;

    info!(
        "scan relay starting: ws={}, callback_ttl={:?}, sweep_interval={:?}",
        config.ws_bind_addr, config.callback_ttl, config.sweep_interval
    );

    let service = RelayService::with_ttl(config.callback_ttl);

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, service, running).await?;

    info!("scan relay stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

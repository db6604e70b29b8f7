//! WebSocket server: accept loop, per-connection tasks and the expiry sweep.
//!
//! Each accepted connection runs in its own Tokio task and is answered
//! frame by frame: one JSON request in, one JSON reply out.  A separate task
//! purges expired callbacks on `sweep_interval`.  Everything stops when the
//! shared `running` flag is cleared.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};

use crate::application::{CallbackRegistry, RelayService};
use crate::domain::config::RelayConfig;
use crate::domain::messages::RelayToClientMsg;

/// How often the accept loop re-checks the `running` flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Lower bound for the sweep period; `interval` rejects zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.ws_bind_addr` and serves until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn run_server(
    config: RelayConfig,
    service: RelayService,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.ws_bind_addr)
        .await
        .with_context(|| {
            format!(
                "failed to bind relay WebSocket listener on {}",
                config.ws_bind_addr
            )
        })?;

    info!("scan relay listening on {}", config.ws_bind_addr);

    serve(listener, service, config.sweep_interval, running).await
}

/// Serves relay connections on an already-bound listener.
///
/// Split from [`run_server`] so tests can bind port 0 and read the chosen
/// address before serving.
pub async fn serve(
    listener: TcpListener,
    service: RelayService,
    sweep_interval: Duration,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let sweeper = tokio::spawn(sweep_expired(
        Arc::clone(service.registry()),
        sweep_interval,
        Arc::clone(&running),
    ));

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new relay connection from {peer_addr}");
                let service = service.clone();
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, service).await;
                });
            }
            Ok(Err(e)) => {
                error!("accept error: {e}");
            }
            Err(_) => {
                // No connection within the poll window.
            }
        }
    }

    sweeper.abort();
    Ok(())
}

// ── Expiry sweep ──────────────────────────────────────────────────────────────

async fn sweep_expired(
    registry: Arc<CallbackRegistry>,
    sweep_interval: Duration,
    running: Arc<AtomicBool>,
) {
    let mut ticker = interval(sweep_interval.max(MIN_SWEEP_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while running.load(Ordering::Relaxed) {
        ticker.tick().await;
        let removed = registry.purge_expired();
        if removed > 0 {
            debug!(removed, remaining = registry.len(), "purged expired callbacks");
        }
    }
}

// ── Per-connection handler ────────────────────────────────────────────────────

async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, service: RelayService) {
    match run_connection(stream, peer_addr, service).await {
        Ok(()) => debug!("relay connection {peer_addr} closed"),
        Err(e) => warn!("relay connection {peer_addr} closed with error: {e:#}"),
    }
}

async fn run_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    service: RelayService,
) -> anyhow::Result<()> {
    let mut ws = accept_async(stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    while let Some(frame) = ws.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(WsError::ConnectionClosed | WsError::Protocol(_)) => {
                debug!("{peer_addr}: WebSocket closed");
                break;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("{peer_addr}: WebSocket read failed"));
            }
        };

        let reply = match frame {
            WsMessage::Text(text) => service.handle_text(&text),
            WsMessage::Binary(_) => RelayToClientMsg::Error {
                message: "binary frames are not supported".to_string(),
            },
            WsMessage::Close(_) => break,
            // Ping/pong is answered by tungstenite itself.
            _ => continue,
        };

        debug!("{peer_addr}: reply {}", reply.type_name());

        let json = serde_json::to_string(&reply).context("failed to serialise relay reply")?;
        ws.send(WsMessage::Text(json))
            .await
            .with_context(|| format!("{peer_addr}: WebSocket send failed"))?;
    }

    Ok(())
}

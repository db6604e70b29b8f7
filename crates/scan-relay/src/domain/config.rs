//! Relay configuration types.
//!
//! [`RelayConfig`] is populated by the binary from CLI arguments.  Tests
//! build it directly.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// All runtime configuration for the relay.
///
/// ```rust
/// use scan_relay::domain::RelayConfig;
///
/// let cfg = RelayConfig::default();
/// assert_eq!(cfg.ws_bind_addr.port(), 9580);
/// assert_eq!(cfg.callback_ttl.as_secs(), 300);
/// ```
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the WebSocket server binds to.
    ///
    /// Defaults to loopback.  The relay executes host-registered logic, so
    /// exposing it beyond the host machine is an explicit deployment choice.
    pub ws_bind_addr: SocketAddr,

    /// How long a registered callback stays redeemable.
    pub callback_ttl: Duration,

    /// How often expired callbacks are purged.
    ///
    /// Expiry is also checked on redemption, so this only bounds memory.
    pub sweep_interval: Duration,
}

impl Default for RelayConfig {
    /// | Field           | Default          |
    /// |-----------------|------------------|
    /// | ws_bind_addr    | `127.0.0.1:9580` |
    /// | callback_ttl    | 300 seconds      |
    /// | sweep_interval  | 60 seconds       |
    fn default() -> Self {
        Self {
            ws_bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 9580)),
            callback_ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Domain layer for scan-relay: pure types, no I/O.

pub mod config;
pub mod messages;

pub use config::RelayConfig;
pub use messages::{ClientToRelayMsg, RelayToClientMsg};

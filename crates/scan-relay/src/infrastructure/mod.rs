//! Infrastructure layer for scan-relay: the WebSocket server and the
//! scanner-side client.

pub mod relay_client;
pub mod ws_server;

pub use relay_client::RelayClient;
pub use ws_server::{run_server, serve};

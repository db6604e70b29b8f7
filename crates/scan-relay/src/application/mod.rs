//! Application layer for scan-relay.
//!
//! Owns the one-shot callback registry and maps wire requests onto it.  No
//! sockets or task spawning here; see `infrastructure`.

pub mod registry;
pub mod relay_service;

pub use registry::{CallbackRegistry, HandlerOutcome, DEFAULT_CALLBACK_TTL};
pub use relay_service::{RelayError, RelayService};

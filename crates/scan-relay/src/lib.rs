//! scan-relay library crate.
//!
//! Server-side transform logic for scanners whose host cannot run the
//! transform in-process.  A host registers a handler (or a rule pipeline)
//! and receives a session id.  The scanner later redeems that id exactly
//! once with the decoded value.
//!
//! ```text
//! scanner (RelayClient)  ── JSON over WebSocket ──  scan-relay
//!                                                    ├── domain/          wire messages, RelayConfig
//!                                                    ├── application/     CallbackRegistry, RelayService
//!                                                    └── infrastructure/  WebSocket server + client
//! ```

/// Domain layer: wire message types and configuration.
pub mod domain;

/// Application layer: the callback registry and request handling.
pub mod application;

/// Infrastructure layer: WebSocket server and client.
pub mod infrastructure;

//! # scan-core
//!
//! Shared library for the barcode scanner containing the format table, the
//! scanner configuration, the camera preference policy, the error taxonomy,
//! and the event types exchanged with the hosting page.
//!
//! This crate is used by both the session controller (`scan-session`) and
//! the server-side transform relay (`scan-relay`).  It has zero dependencies
//! on async runtimes, sockets, or camera APIs.
//!
//! # Architecture overview
//!
//! A scanner widget lives inside a server-rendered admin page.  It opens the
//! device camera, runs a third-party decode loop against a video element, and
//! hands the first decoded value back to the page.
//!
//! - **`domain`** – Pure rules: which formats exist and what their wire codes
//!   are, which camera to open first, how an engine failure string maps to a
//!   user-facing category, and how decoded text is sanitised.
//!
//! - **`protocol`** – What crosses the boundary to the host page: outbound
//!   scanner events, inbound host lifecycle events, and the sandboxed
//!   transform rules that replace dynamically evaluated modifier code.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `scan_core::ScannerConfig` instead of `scan_core::domain::config::ScannerConfig`.
pub use domain::camera::{next_camera_index, select_initial_camera, CameraDescriptor};
pub use domain::config::{ConfigError, FacingMode, FocusRegion, ScannerConfig, ScannerLabels};
pub use domain::error::{classify_signal, is_benign_teardown_signal, ErrorCategory};
pub use domain::format::BarcodeFormat;
pub use domain::sanitize::sanitize_scanned_text;
pub use domain::ScanResult;
pub use protocol::events::{HostEvent, ScannerEvent, ScannerEventKind};
pub use protocol::transform::{TransformOp, TransformPipeline, TransformRule};

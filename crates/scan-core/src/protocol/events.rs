//! Event-bus contract between a scanner widget and its host page.
//!
//! # Outbound
//!
//! Every [`ScannerEvent`] carries the originating widget's `scanner_id` so
//! that several widgets on one page never react to each other's events.
//! The JSON form flattens the kind into the envelope:
//!
//! ```json
//! {"scanner_id":"scanner-1","timestamp_ms":1700000000000,"event":"scanner-scanned",
//!  "value":"12345","format_id":6,"format_name":"Code 128"}
//! ```
//!
//! # Inbound
//!
//! [`HostEvent`] is what the page tells the widget: its surface is closing,
//! or some other surface opened on top of it.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::domain::camera::CameraDescriptor;
use crate::domain::error::ErrorCategory;
use crate::domain::format::BarcodeFormat;
use crate::domain::ScanResult;

/// An event published by one scanner widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerEvent {
    pub scanner_id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    #[serde(flatten)]
    pub kind: ScannerEventKind,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ScannerEventKind {
    /// The camera is live.
    ScannerReady {
        camera_count: usize,
        current_camera: CameraDescriptor,
    },
    /// The camera was released.
    ScannerStopped,
    /// A value was decoded; `value` is already sanitised.
    ScannerScanned {
        value: String,
        format_id: u32,
        format_name: String,
    },
    /// The widget entered its error state.
    ScannerError { error: String, error_type: String },
}

impl ScannerEvent {
    /// Stamps `kind` with `scanner_id` and the current wall-clock time.
    pub fn now(scanner_id: &str, kind: ScannerEventKind) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            scanner_id: scanner_id.to_string(),
            timestamp_ms,
            kind,
        }
    }

    pub fn ready(scanner_id: &str, camera_count: usize, current_camera: CameraDescriptor) -> Self {
        Self::now(
            scanner_id,
            ScannerEventKind::ScannerReady {
                camera_count,
                current_camera,
            },
        )
    }

    pub fn stopped(scanner_id: &str) -> Self {
        Self::now(scanner_id, ScannerEventKind::ScannerStopped)
    }

    pub fn scanned(scanner_id: &str, result: &ScanResult) -> Self {
        Self::now(
            scanner_id,
            ScannerEventKind::ScannerScanned {
                value: result.text().to_string(),
                format_id: result.format_code(),
                format_name: BarcodeFormat::event_name_for_code(result.format_code()).to_string(),
            },
        )
    }

    pub fn error(scanner_id: &str, signal: &str, category: ErrorCategory) -> Self {
        Self::now(
            scanner_id,
            ScannerEventKind::ScannerError {
                error: signal.to_string(),
                error_type: category.error_type().to_string(),
            },
        )
    }

    /// Returns `true` if this event originated from widget `scanner_id`.
    pub fn is_from(&self, scanner_id: &str) -> bool {
        self.scanner_id == scanner_id
    }
}

/// A lifecycle notification from the host page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostEvent {
    /// The surface that contains the widget is closing (modal close,
    /// navigation away).
    SurfaceClosing,
    /// A surface opened somewhere on the page.
    SurfaceOpened { surface_id: String },
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Decode engine binding surface.
//!
//! The barcode decoding itself is done by a third-party engine.  The session
//! controller talks to it only through the two traits defined here:
//!
//! - [`DecodeEngine`] – the library as a whole: lazy load, camera-API
//!   detection, device enumeration, and binding to a render container.
//! - [`EngineHandle`] – one live binding to a container.  It runs the
//!   per-frame decode loop for one camera at a time.
//!
//! Decode results travel back over a [`DecodeSink`] channel instead of a
//! callback so the controller can process them on its own task.
//!
//! # Testability
//!
//! [`mock::MockDecodeEngine`] is a scriptable in-memory engine used by the
//! controller's unit and integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use scan_core::{classify_signal, CameraDescriptor, ErrorCategory, FocusRegion, ScannerConfig};
use thiserror::Error;
use tokio::sync::mpsc;

pub mod mock;

/// One notification from a running decode loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// A frame decoded successfully.
    Decoded { text: String, format_code: u32 },
    /// A frame contained no readable code.  Emitted many times per second.
    FrameMissed { reason: String },
}

/// Where a running [`EngineHandle`] sends its [`DecodeEvent`]s.
pub type DecodeSink = mpsc::UnboundedSender<DecodeEvent>;

/// Options passed to [`EngineHandle::start`].
#[derive(Debug, Clone, PartialEq)]
pub struct StartOptions {
    pub fps: u32,
    /// Wire codes of the symbologies to decode.
    pub formats: Vec<u32>,
    pub focus_region: Option<FocusRegion>,
    pub aspect_ratio: Option<f64>,
}

impl StartOptions {
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            fps: config.fps_value(),
            formats: config.format_codes(),
            focus_region: config.focus_region_value(),
            aspect_ratio: config.aspect_ratio_value(),
        }
    }
}

/// What an [`EngineHandle`] reports about its decode loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    NotStarted,
    Scanning,
    Paused,
}

impl EngineState {
    /// Returns `true` if the camera is held by the handle.
    pub fn holds_camera(self) -> bool {
        matches!(self, EngineState::Scanning | EngineState::Paused)
    }
}

/// Error type for decode engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine library itself could not be loaded.
    #[error("decode engine failed to load: {0}")]
    Load(String),

    /// A device-level failure.  The payload is the raw signal reported by
    /// the engine (e.g. `"NotAllowedError: Permission denied"`).
    #[error("{0}")]
    Device(String),
}

impl EngineError {
    /// The user-facing category for this failure.
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::Load(_) => ErrorCategory::EngineUnavailable,
            EngineError::Device(signal) => classify_signal(signal),
        }
    }

    /// The raw failure text.
    pub fn signal(&self) -> &str {
        match self {
            EngineError::Load(signal) | EngineError::Device(signal) => signal,
        }
    }
}

/// The decode library.
#[async_trait]
pub trait DecodeEngine: Send + Sync {
    /// Loads the library on first use.  Later calls return immediately.
    async fn ensure_loaded(&self) -> Result<(), EngineError>;

    /// Returns `false` when the runtime exposes no camera API at all.
    fn camera_api_available(&self) -> bool;

    /// Enumerates the camera devices currently attached.
    async fn list_cameras(&self) -> Result<Vec<CameraDescriptor>, EngineError>;

    /// Binds a fresh handle to the render container `container_id`.
    fn bind(&self, container_id: &str) -> Result<Arc<dyn EngineHandle>, EngineError>;
}

/// One binding of the decode library to a render container.
#[async_trait]
pub trait EngineHandle: Send + Sync {
    /// Opens `camera_id` and starts the decode loop, which reports through `sink`.
    async fn start(
        &self,
        camera_id: &str,
        options: &StartOptions,
        sink: DecodeSink,
    ) -> Result<(), EngineError>;

    /// Stops the decode loop and releases the camera.
    async fn stop(&self) -> Result<(), EngineError>;

    /// Removes the video element from the render container.
    fn clear(&self) -> Result<(), EngineError>;

    fn state(&self) -> EngineState;
}

/// Stops (if running) and clears `handle`.
///
/// `clear` is attempted even when `stop` fails; the first error is returned.
pub async fn shutdown_handle(handle: &dyn EngineHandle) -> Result<(), EngineError> {
    let stopped = if handle.state().holds_camera() {
        handle.stop().await
    } else {
        Ok(())
    };
    let cleared = handle.clear();
    stopped.and(cleared)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use scan_core::BarcodeFormat;

    #[test]
    fn test_start_options_copy_config_values() {
        // Arrange
        let config = ScannerConfig::default()
            .fps(15)
            .and_then(|c| c.focus_region(250, None))
            .map(|c| c.supported_formats(vec![BarcodeFormat::QrCode, BarcodeFormat::Itf]))
            .expect("valid config");

        // Act
        let options = StartOptions::from_config(&config);

        // Assert
        assert_eq!(options.fps, 15);
        assert_eq!(options.formats, vec![0, 8]);
        assert_eq!(
            options.focus_region,
            Some(FocusRegion {
                width: 250,
                height: 250
            })
        );
        assert_eq!(options.aspect_ratio, None);
    }

    #[test]
    fn test_load_error_is_engine_unavailable() {
        let err = EngineError::Load("script 404".to_string());
        assert_eq!(err.category(), ErrorCategory::EngineUnavailable);
    }

    #[test]
    fn test_device_error_is_classified_by_signal() {
        let err = EngineError::Device("OverconstrainedError: facingMode".to_string());
        assert_eq!(err.category(), ErrorCategory::ConstraintsUnmet);
        assert_eq!(err.signal(), "OverconstrainedError: facingMode");
    }

    #[test]
    fn test_holds_camera() {
        assert!(EngineState::Scanning.holds_camera());
        assert!(EngineState::Paused.holds_camera());
        assert!(!EngineState::NotStarted.holds_camera());
    }
}

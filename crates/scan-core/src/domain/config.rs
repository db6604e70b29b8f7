//! Scanner configuration and UI labels.
//!
//! [`ScannerConfig`] is supplied by the host page when a widget is built and
//! is immutable once a session starts.  Every way of producing one goes
//! through [`ScannerConfig::validate`], so an out-of-range value is rejected
//! before any camera access is attempted, whether it came from builder calls
//! or from a settings file.
//!
//! # Example
//!
//! ```rust
//! use scan_core::{BarcodeFormat, ScannerConfig};
//!
//! let cfg = ScannerConfig::default()
//!     .fps(15)?
//!     .focus_region(250, None)?
//!     .prefer_back_camera()
//!     .supported_formats(vec![BarcodeFormat::QrCode, BarcodeFormat::Code128]);
//! assert_eq!(cfg.format_codes(), vec![0, 6]);
//! # Ok::<(), scan_core::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::error::ErrorCategory;
use super::format::BarcodeFormat;

/// Lowest accepted decode rate.
pub const MIN_FPS: u32 = 1;
/// Highest accepted decode rate.
pub const MAX_FPS: u32 = 30;
/// Decode rate used when the host does not choose one.
pub const DEFAULT_FPS: u32 = 10;

/// Errors raised while building or validating a [`ScannerConfig`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("FPS must be between 1 and 30, got {0}")]
    FpsOutOfRange(u32),

    #[error("focus region width must be positive")]
    FocusWidthNotPositive,

    #[error("focus region height must be positive")]
    FocusHeightNotPositive,

    #[error("aspect ratio must be a positive number, got {0}")]
    AspectRatioNotPositive(f64),
}

/// Camera preference hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera.
    User,
    /// Rear camera.
    Environment,
}

/// The scan box the engine restricts decoding to, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusRegion {
    pub width: u32,
    pub height: u32,
}

/// Immutable per-widget scanner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawScannerConfig", into = "RawScannerConfig")]
pub struct ScannerConfig {
    fps: u32,
    focus_region: Option<FocusRegion>,
    aspect_ratio: Option<f64>,
    facing_mode: Option<FacingMode>,
    formats: Vec<BarcodeFormat>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            focus_region: None,
            aspect_ratio: None,
            facing_mode: None,
            formats: Vec::new(),
        }
    }
}

impl ScannerConfig {
    /// Sets the decode rate.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FpsOutOfRange`] unless `1 <= fps <= 30`.
    pub fn fps(mut self, fps: u32) -> Result<Self, ConfigError> {
        check_fps(fps)?;
        self.fps = fps;
        Ok(self)
    }

    /// Sets the focus region.  A missing height produces a square box.
    ///
    /// # Errors
    ///
    /// Returns an error when either dimension is zero.
    pub fn focus_region(mut self, width: u32, height: Option<u32>) -> Result<Self, ConfigError> {
        let region = FocusRegion {
            width,
            height: height.unwrap_or(width),
        };
        check_focus_region(&region)?;
        self.focus_region = Some(region);
        Ok(self)
    }

    /// Sets the camera feed aspect ratio (e.g. `1.777778` for 16:9).
    ///
    /// # Errors
    ///
    /// [`ConfigError::AspectRatioNotPositive`] for zero, negative or
    /// non-finite ratios.
    pub fn aspect_ratio(mut self, ratio: f64) -> Result<Self, ConfigError> {
        check_aspect_ratio(ratio)?;
        self.aspect_ratio = Some(ratio);
        Ok(self)
    }

    pub fn facing_mode(mut self, mode: FacingMode) -> Self {
        self.facing_mode = Some(mode);
        self
    }

    pub fn prefer_back_camera(self) -> Self {
        self.facing_mode(FacingMode::Environment)
    }

    pub fn prefer_front_camera(self) -> Self {
        self.facing_mode(FacingMode::User)
    }

    /// Restricts decoding to `formats`.  An empty list allows every format.
    pub fn supported_formats(mut self, formats: Vec<BarcodeFormat>) -> Self {
        self.formats = formats;
        self
    }

    pub fn fps_value(&self) -> u32 {
        self.fps
    }

    pub fn focus_region_value(&self) -> Option<FocusRegion> {
        self.focus_region
    }

    pub fn aspect_ratio_value(&self) -> Option<f64> {
        self.aspect_ratio
    }

    pub fn facing_mode_value(&self) -> Option<FacingMode> {
        self.facing_mode
    }

    /// The effective allowlist: the configured formats, or all of them.
    pub fn effective_formats(&self) -> Vec<BarcodeFormat> {
        if self.formats.is_empty() {
            BarcodeFormat::ALL.to_vec()
        } else {
            self.formats.clone()
        }
    }

    /// The allowlist as engine wire codes.
    pub fn format_codes(&self) -> Vec<u32> {
        self.effective_formats().into_iter().map(BarcodeFormat::code).collect()
    }

    /// Re-checks every invariant.
    ///
    /// # Errors
    ///
    /// The first violated invariant, checked in field order.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_fps(self.fps)?;
        if let Some(region) = &self.focus_region {
            check_focus_region(region)?;
        }
        if let Some(ratio) = self.aspect_ratio {
            check_aspect_ratio(ratio)?;
        }
        Ok(())
    }
}

fn check_fps(fps: u32) -> Result<(), ConfigError> {
    if (MIN_FPS..=MAX_FPS).contains(&fps) {
        Ok(())
    } else {
        Err(ConfigError::FpsOutOfRange(fps))
    }
}

fn check_focus_region(region: &FocusRegion) -> Result<(), ConfigError> {
    if region.width == 0 {
        return Err(ConfigError::FocusWidthNotPositive);
    }
    if region.height == 0 {
        return Err(ConfigError::FocusHeightNotPositive);
    }
    Ok(())
}

fn check_aspect_ratio(ratio: f64) -> Result<(), ConfigError> {
    if ratio.is_finite() && ratio > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::AspectRatioNotPositive(ratio))
    }
}

/// On-disk / on-wire shape of [`ScannerConfig`]; converted through `validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawScannerConfig {
    #[serde(default = "default_fps")]
    fps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    focus_region: Option<FocusRegion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    facing_mode: Option<FacingMode>,
    #[serde(default)]
    formats: Vec<BarcodeFormat>,
}

fn default_fps() -> u32 {
    DEFAULT_FPS
}

impl TryFrom<RawScannerConfig> for ScannerConfig {
    type Error = ConfigError;

    fn try_from(raw: RawScannerConfig) -> Result<Self, Self::Error> {
        let cfg = ScannerConfig {
            fps: raw.fps,
            focus_region: raw.focus_region,
            aspect_ratio: raw.aspect_ratio,
            facing_mode: raw.facing_mode,
            formats: raw.formats,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

impl From<ScannerConfig> for RawScannerConfig {
    fn from(cfg: ScannerConfig) -> Self {
        Self {
            fps: cfg.fps,
            focus_region: cfg.focus_region,
            aspect_ratio: cfg.aspect_ratio,
            facing_mode: cfg.facing_mode,
            formats: cfg.formats,
        }
    }
}

// ── Labels ────────────────────────────────────────────────────────────────────

/// Localisable strings rendered by the scanner widget.
///
/// Hosts translate these before handing them over; missing fields in a
/// settings file fall back to the English defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerLabels {
    #[serde(default = "default_switch_camera")]
    pub switch_camera: String,
    #[serde(default = "default_camera_unavailable")]
    pub camera_unavailable: String,
    #[serde(default = "default_permission_denied")]
    pub permission_denied: String,
    #[serde(default = "default_browser_not_supported")]
    pub browser_not_supported: String,
    #[serde(default = "default_camera_constraints")]
    pub camera_constraints: String,
    #[serde(default = "default_engine_unavailable")]
    pub engine_unavailable: String,
    #[serde(default = "default_try_again")]
    pub try_again: String,
    #[serde(default = "default_loading_camera")]
    pub loading_camera: String,
    #[serde(default = "default_camera_preview")]
    pub camera_preview: String,
}

impl ScannerLabels {
    /// The message shown next to the retry affordance for `category`.
    pub fn message_for(&self, category: ErrorCategory) -> &str {
        match category {
            ErrorCategory::EngineUnavailable => &self.engine_unavailable,
            ErrorCategory::BrowserUnsupported => &self.browser_not_supported,
            ErrorCategory::ConstraintsUnmet => &self.camera_constraints,
            ErrorCategory::PermissionDenied => &self.permission_denied,
            ErrorCategory::CameraUnavailable => &self.camera_unavailable,
        }
    }
}

fn default_switch_camera() -> String {
    "Switch Camera".to_string()
}
fn default_camera_unavailable() -> String {
    "Camera is not available. Please check your device settings.".to_string()
}
fn default_permission_denied() -> String {
    "Camera permission was denied. Please allow camera access to scan barcodes.".to_string()
}
fn default_browser_not_supported() -> String {
    "Your browser does not support camera access.".to_string()
}
fn default_camera_constraints() -> String {
    "The selected camera does not meet the requirements.".to_string()
}
fn default_engine_unavailable() -> String {
    "The barcode scanner library could not be loaded.".to_string()
}
fn default_try_again() -> String {
    "Try Again".to_string()
}
fn default_loading_camera() -> String {
    "Loading camera...".to_string()
}
fn default_camera_preview() -> String {
    "Barcode scanner camera preview".to_string()
}

impl Default for ScannerLabels {
    fn default() -> Self {
        Self {
            switch_camera: default_switch_camera(),
            camera_unavailable: default_camera_unavailable(),
            permission_denied: default_permission_denied(),
            browser_not_supported: default_browser_not_supported(),
            camera_constraints: default_camera_constraints(),
            engine_unavailable: default_engine_unavailable(),
            try_again: default_try_again(),
            loading_camera: default_loading_camera(),
            camera_preview: default_camera_preview(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

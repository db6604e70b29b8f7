//! TOML-based settings persistence for scanner hosts.
//!
//! Reads and writes [`ScannerSettings`] to the platform-appropriate file:
//! - Windows:  `%APPDATA%\BarcodeScanner\settings.toml`
//! - Linux:    `~/.config/barcode-scanner/settings.toml`
//! - macOS:    `~/Library/Application Support/BarcodeScanner/settings.toml`
//!
//! ```toml
//! [scanner]
//! fps = 15
//! facing_mode = "environment"
//! formats = [0, 6, 9]
//!
//! [scanner.focus_region]
//! width = 250
//! height = 250
//!
//! [labels]
//! switch_camera = "Kamera wechseln"
//!
//! [relay]
//! url = "ws://127.0.0.1:9580"
//! ```
//!
//! Every section is optional.  Scanner values go through the same
//! validation as the builder API, so an out-of-range `fps` in the file is
//! reported as a parse error instead of reaching the camera.

use std::path::{Path, PathBuf};

use scan_core::{ScannerConfig, ScannerLabels};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level settings stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScannerSettings {
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub labels: ScannerLabels,
    /// Server transform relay; absent when values are only transformed locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay: Option<RelaySettings>,
}

/// Where the server-side transform relay listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaySettings {
    #[serde(default = "default_relay_url")]
    pub url: String,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            url: default_relay_url(),
        }
    }
}

fn default_relay_url() -> String {
    "ws://127.0.0.1:9580".to_string()
}

/// Returns the application config directory.
///
/// # Errors
///
/// [`SettingsError::NoPlatformConfigDir`] if the base directory cannot be
/// determined from the environment.
pub fn config_dir() -> Result<PathBuf, SettingsError> {
    platform_config_dir().ok_or(SettingsError::NoPlatformConfigDir)
}

pub fn settings_file_path() -> Result<PathBuf, SettingsError> {
    Ok(config_dir()?.join("settings.toml"))
}

/// Loads settings from the platform file, returning defaults if it does not
/// exist yet.
pub fn load_settings() -> Result<ScannerSettings, SettingsError> {
    load_settings_from(&settings_file_path()?)
}

/// Loads settings from `path`, returning defaults if the file is absent.
///
/// # Errors
///
/// [`SettingsError::Io`] for file-system errors other than "not found",
/// [`SettingsError::Parse`] for malformed TOML or invalid scanner values.
pub fn load_settings_from(path: &Path) -> Result<ScannerSettings, SettingsError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ScannerSettings::default()),
        Err(e) => Err(SettingsError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

pub fn save_settings(settings: &ScannerSettings) -> Result<(), SettingsError> {
    save_settings_to(settings, &settings_file_path()?)
}

/// Writes `settings` to `path`, creating the parent directory if needed.
pub fn save_settings_to(settings: &ScannerSettings, path: &Path) -> Result<(), SettingsError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(settings)?;
    std::fs::write(path, content).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("BarcodeScanner"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("barcode-scanner"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("BarcodeScanner")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

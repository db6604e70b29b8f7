//! Camera descriptors and the initial-camera preference policy.
//!
//! Descriptors are enumerated fresh every time scanning (re)starts; the
//! order is whatever the device API returns.  The controller only re-indexes
//! logically by preference and never reorders the list itself.

use serde::{Deserialize, Serialize};

use super::config::FacingMode;

/// Label fragments that identify a rear-facing camera.
const BACK_CAMERA_HINTS: [&str; 3] = ["back", "rear", "environment"];

/// Label fragments that identify a front-facing camera.
const FRONT_CAMERA_HINTS: [&str; 2] = ["front", "user"];

/// One camera device as reported by the decode engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDescriptor {
    pub id: String,
    pub label: String,
}

impl CameraDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// The label to show in the UI; unlabeled devices become `"Camera N"`
    /// where `N` is the 1-based position in the enumeration.
    pub fn display_label(&self, index: usize) -> String {
        if self.label.is_empty() {
            format!("Camera {}", index + 1)
        } else {
            self.label.clone()
        }
    }
}

/// Picks the index of the camera to open first.
///
/// - `Environment` and no hint: first label containing "back", "rear" or
///   "environment" (case-insensitive).
/// - `User`: first label containing "front" or "user".
/// - Index 0 when nothing matches or the list is empty.
pub fn select_initial_camera(cameras: &[CameraDescriptor], hint: Option<FacingMode>) -> usize {
    let needles: &[&str] = match hint {
        Some(FacingMode::User) => &FRONT_CAMERA_HINTS,
        Some(FacingMode::Environment) | None => &BACK_CAMERA_HINTS,
    };

    cameras
        .iter()
        .position(|camera| {
            let label = camera.label.to_lowercase();
            needles.iter().any(|needle| label.contains(needle))
        })
        .unwrap_or(0)
}

/// Advances circularly through `count` cameras.  Returns 0 when `count` is 0.
pub fn next_camera_index(current: usize, count: usize) -> usize {
    if count == 0 {
        0
    } else {
        (current + 1) % count
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! User-facing error taxonomy and signal classification.
//!
//! The decode engine reports failures as free-form strings (DOM exception
//! names, library messages).  [`classify_signal`] maps such a string onto a
//! fixed set of categories so the widget can show a localised message and a
//! retry button.  Every category is recoverable.

use serde::{Deserialize, Serialize};

/// The category shown to the user when the controller enters `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The decode engine could not be loaded.
    EngineUnavailable,
    /// The runtime refuses camera access outright.
    BrowserUnsupported,
    /// No usable camera, or the device is busy.
    CameraUnavailable,
    /// The user or the platform denied camera permission.
    PermissionDenied,
    /// The selected camera cannot satisfy the requested constraints.
    ConstraintsUnmet,
}

impl ErrorCategory {
    /// Stable identifier carried in `scanner-error` events.
    pub fn error_type(self) -> &'static str {
        match self {
            ErrorCategory::EngineUnavailable => "engine_unavailable",
            ErrorCategory::BrowserUnsupported => "not_supported",
            ErrorCategory::CameraUnavailable => "camera_unavailable",
            ErrorCategory::PermissionDenied => "permission_denied",
            ErrorCategory::ConstraintsUnmet => "overconstrained",
        }
    }

    /// Inverse of [`ErrorCategory::error_type`].
    pub fn from_error_type(error_type: &str) -> Option<Self> {
        ALL_CATEGORIES
            .into_iter()
            .find(|category| category.error_type() == error_type)
    }
}

const ALL_CATEGORIES: [ErrorCategory; 5] = [
    ErrorCategory::EngineUnavailable,
    ErrorCategory::BrowserUnsupported,
    ErrorCategory::CameraUnavailable,
    ErrorCategory::PermissionDenied,
    ErrorCategory::ConstraintsUnmet,
];

/// Signal fragments checked in order; the first row with any match wins.
const CLASSIFICATION_TABLE: [(&[&str], ErrorCategory); 4] = [
    (&["NotSupportedError"], ErrorCategory::BrowserUnsupported),
    (&["OverconstrainedError"], ErrorCategory::ConstraintsUnmet),
    (
        &["Permission", "NotAllowedError", "denied"],
        ErrorCategory::PermissionDenied,
    ),
    (
        &["camera_unavailable", "NotFoundError", "NotReadableError"],
        ErrorCategory::CameraUnavailable,
    ),
];

/// Maps an engine failure signal to its category.
///
/// Matching is case-sensitive substring search.  Signals that match no row
/// fall back to [`ErrorCategory::CameraUnavailable`].
pub fn classify_signal(signal: &str) -> ErrorCategory {
    CLASSIFICATION_TABLE
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| signal.contains(needle)))
        .map(|(_, category)| *category)
        .unwrap_or(ErrorCategory::CameraUnavailable)
}

/// Returns `true` for the DOM-removal and `clear` races seen while handing
/// the camera over during a switch.  These are suppressed, never surfaced.
pub fn is_benign_teardown_signal(signal: &str) -> bool {
    signal.contains("removeChild") || signal.contains("clear")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

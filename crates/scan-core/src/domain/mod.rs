//! Domain layer for the barcode scanner.
//!
//! Everything here is deterministic and free of I/O so the session
//! controller and the relay can share one definition of each rule.

pub mod camera;
pub mod config;
pub mod error;
pub mod format;
pub mod sanitize;

use serde::{Deserialize, Serialize};

use self::format::BarcodeFormat;
use self::sanitize::sanitize_scanned_text;

/// The single decoded value produced by one scan session.
///
/// `raw_text` is always sanitised: decoded payloads are untrusted and may
/// carry markup, so the only constructor strips tags and trims whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    raw_text: String,
    format_code: u32,
}

impl ScanResult {
    /// Builds a result from the engine's decoded text and format code.
    pub fn from_decoded(text: &str, format_code: u32) -> Self {
        Self {
            raw_text: sanitize_scanned_text(text),
            format_code,
        }
    }

    /// The sanitised decoded text.
    pub fn text(&self) -> &str {
        &self.raw_text
    }

    /// The engine format code, possibly unassigned.
    pub fn format_code(&self) -> u32 {
        self.format_code
    }

    /// The known symbology, if the code is assigned.
    pub fn format(&self) -> Option<BarcodeFormat> {
        BarcodeFormat::from_code(self.format_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_result_strips_markup_on_construction() {
        let result = ScanResult::from_decoded("<b>12345</b>", 6);
        assert_eq!(result.text(), "12345");
        assert_eq!(result.format(), Some(BarcodeFormat::Code128));
    }

    #[test]
    fn test_scan_result_keeps_unassigned_format_code() {
        let result = ScanResult::from_decoded("abc", 7);
        assert_eq!(result.format_code(), 7);
        assert_eq!(result.format(), None);
    }
}

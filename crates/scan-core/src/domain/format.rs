//! Barcode symbology table.
//!
//! The integer codes are a wire contract with the decode engine: the engine
//! reports them on every successful read and accepts them in its format
//! allowlist.  Codes 3, 7 and 13 are deliberately unassigned.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A barcode symbology the decode engine can recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarcodeFormat {
    QrCode,
    Aztec,
    Codabar,
    Code39,
    Code93,
    Code128,
    Itf,
    Ean13,
    Pdf417,
    Ean8,
    DataMatrix,
    UpcA,
    UpcE,
}

impl BarcodeFormat {
    /// Every supported format, in wire-code order.
    pub const ALL: [BarcodeFormat; 13] = [
        BarcodeFormat::QrCode,
        BarcodeFormat::Aztec,
        BarcodeFormat::Codabar,
        BarcodeFormat::Code39,
        BarcodeFormat::Code93,
        BarcodeFormat::Code128,
        BarcodeFormat::Itf,
        BarcodeFormat::Ean13,
        BarcodeFormat::Pdf417,
        BarcodeFormat::Ean8,
        BarcodeFormat::DataMatrix,
        BarcodeFormat::UpcA,
        BarcodeFormat::UpcE,
    ];

    /// Returns the engine wire code for this format.
    pub fn code(self) -> u32 {
        match self {
            BarcodeFormat::QrCode => 0,
            BarcodeFormat::Aztec => 1,
            BarcodeFormat::Codabar => 2,
            BarcodeFormat::Code39 => 4,
            BarcodeFormat::Code93 => 5,
            BarcodeFormat::Code128 => 6,
            BarcodeFormat::Itf => 8,
            BarcodeFormat::Ean13 => 9,
            BarcodeFormat::Pdf417 => 10,
            BarcodeFormat::Ean8 => 11,
            BarcodeFormat::DataMatrix => 12,
            BarcodeFormat::UpcA => 14,
            BarcodeFormat::UpcE => 15,
        }
    }

    /// Maps an engine wire code back to a format.
    ///
    /// Returns `None` for unassigned codes so callers can pass an unknown
    /// symbology through instead of failing the scan.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.code() == code)
    }

    /// Human-readable label shown in admin UIs.
    pub fn label(self) -> &'static str {
        match self {
            BarcodeFormat::QrCode => "QR Code",
            BarcodeFormat::Aztec => "Aztec",
            BarcodeFormat::Codabar => "Codabar",
            BarcodeFormat::Code39 => "Code 39",
            BarcodeFormat::Code93 => "Code 93",
            BarcodeFormat::Code128 => "Code 128",
            BarcodeFormat::Itf => "ITF (Interleaved 2 of 5)",
            BarcodeFormat::Ean13 => "EAN-13",
            BarcodeFormat::Pdf417 => "PDF417",
            BarcodeFormat::Ean8 => "EAN-8",
            BarcodeFormat::DataMatrix => "Data Matrix",
            BarcodeFormat::UpcA => "UPC-A",
            BarcodeFormat::UpcE => "UPC-E",
        }
    }

    /// Short name carried in the `scanner-scanned` event.
    ///
    /// Matches [`label`](Self::label) except for ITF, and yields `"Unknown"`
    /// for codes the table does not assign.
    pub fn event_name_for_code(code: u32) -> &'static str {
        match Self::from_code(code) {
            Some(BarcodeFormat::Itf) => "ITF",
            Some(format) => format.label(),
            None => "Unknown",
        }
    }
}

impl Serialize for BarcodeFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.code())
    }
}

impl<'de> Deserialize<'de> for BarcodeFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u32::deserialize(deserializer)?;
        BarcodeFormat::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unassigned barcode format code {code}")))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{PathwaySet, Quad};
use crate::quality::QualityVerdict;

/// Symbology of a decoded symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeType {
    /// EAN-13 retail barcode
    #[serde(rename = "EAN13")]
    Ean13,
    /// EAN-8 retail barcode
    #[serde(rename = "EAN8")]
    Ean8,
    /// UPC-A retail barcode
    #[serde(rename = "UPCA")]
    UpcA,
    /// Code 128
    #[serde(rename = "CODE128")]
    Code128,
    /// Code 39
    #[serde(rename = "CODE39")]
    Code39,
    /// QR code
    #[serde(rename = "QR")]
    Qr,
    /// Anything else a decoder reported
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl CodeType {
    /// Upper-case label used in reports
    pub fn label(self) -> &'static str {
        match self {
            CodeType::Ean13 => "EAN13",
            CodeType::Ean8 => "EAN8",
            CodeType::UpcA => "UPCA",
            CodeType::Code128 => "CODE128",
            CodeType::Code39 => "CODE39",
            CodeType::Qr => "QR",
            CodeType::Unknown => "UNKNOWN",
        }
    }

    /// One-dimensional (bar) symbologies
    pub fn is_linear(self) -> bool {
        !matches!(self, CodeType::Qr | CodeType::Unknown)
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A symbol that was located and read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedCode {
    /// Symbology
    pub code_type: CodeType,
    /// Decoded text
    pub payload: String,
    /// Location in original image coordinates
    pub polygon: Quad,
    /// Wall time spent reading this region
    pub decode_time_ms: f64,
    /// Rotation (degrees) of the crop that produced the read
    pub orientation_deg: f32,
    /// Detection pathways that found the region
    pub pathways: PathwaySet,
}

/// Everything found in one image
#[derive(Debug, Clone, Serialize)]
pub struct ImageResult {
    /// Validated reads, one per physical symbol
    pub codes: Vec<DecodedCode>,
    /// Regions that looked like symbols but could not be read
    pub unrecognized: Vec<Quad>,
    /// Wall time for the whole image
    pub elapsed_ms: f64,
    /// Quality assessment that chose the processing path
    pub quality: QualityVerdict,
}

impl ImageResult {
    /// Codes of the given symbology
    pub fn codes_of(&self, code_type: CodeType) -> impl Iterator<Item = &DecodedCode> {
        self.codes.iter().filter(move |c| c.code_type == code_type)
    }
}

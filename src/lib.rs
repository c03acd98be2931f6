//! rust_scan - barcode and QR code detection and recognition for photographs
//!
//! Locates symbols with four independent pathways (direct decoding, QR finder
//! patterns, edge contours and gradient energy), rectifies and deduplicates
//! the regions, then reads each one across a fixed set of rotations and
//! enhancements. Results are deterministic for a given input and decoder.
//!
//! ```no_run
//! let image = image::open("shelf.jpg")?;
//! let result = rust_scan::detect_and_recognize(&image)?;
//! for code in &result.codes {
//!     println!("{} {}", code.code_type, code.payload);
//! }
//! # Ok::<(), rust_scan::ScanError>(())
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Final per-image result assembly
pub mod aggregate;
/// Tunable constants
pub mod config;
/// Symbol decode primitives (rxing, rqrr)
pub mod decode;
/// Cross-pathway duplicate resolution
pub mod dedup;
/// Candidate region detection pathways
pub mod detector;
/// Error types
pub mod error;
/// Core data structures (regions, quads, decoded codes)
pub mod models;
/// Per-image orchestration
pub mod pipeline;
/// Image variant generation
pub mod preprocess;
/// Blur and glare triage
pub mod quality;
/// Orientation search and decoding
pub mod recognize;
/// Quad fitting, padding and rectification
pub mod refine;
/// Detection and recognition event sinks
pub mod report;
/// Image loading and dataset helpers for the binaries and benches
pub mod tools;
/// Utility functions (grayscale, binarization, geometry, morphology)
pub mod utils;
/// Check-digit validation
pub mod validate;

pub use config::ScanConfig;
pub use decode::{RqrrDecoder, RxingDecoder, SymbolDecoder, SymbolRead};
pub use error::{DecodeError, ScanError};
pub use models::{BitMatrix, CodeType, DecodedCode, ImageResult, Pathway, Point, Quad};
pub use pipeline::Scanner;
pub use quality::{ProcessingPath, QualityVerdict};
pub use report::{MetricsSink, MetricsSnapshot, NullSink, ReportSink};

/// Detect and read every symbol in an image with the default scanner
///
/// # Arguments
/// * `image` - Any decoded image; color is converted to luminance
///
/// # Returns
/// The validated reads, the regions that could not be read and timing, or
/// an error when the image is empty
pub fn detect_and_recognize(image: &image::DynamicImage) -> Result<ImageResult, ScanError> {
    Scanner::new().detect_and_recognize(image)
}

/// Detect and read from a raw interleaved buffer (1, 3 or 4 channels)
pub fn detect_and_recognize_raw(
    data: &[u8],
    width: u32,
    height: u32,
    channels: u8,
) -> Result<ImageResult, ScanError> {
    Scanner::new().detect_and_recognize_raw(data, width, height, channels)
}

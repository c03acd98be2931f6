//! Candidate region detection
//!
//! Four independent pathways propose regions:
//! - Direct: whole-image decoding, located by the decoder
//! - QR finder: grid-searched 1:1:3:1:1 finder pattern triples
//! - Edge: Canny edges closed into blobs
//! - Gradient: Sobel energy closed along the bar direction

/// Shared contour filtering for the edge and gradient pathways
pub mod contour;
/// Whole-image decoding pathway
pub mod direct;
/// Canny edge pathway
pub mod edge;
/// 1:1:3:1:1 finder pattern scanning
pub mod finder;
/// Gradient energy pathway
pub mod gradient;
/// Finder triples to QR quads
pub mod qr_finder;

pub use direct::DirectDetector;
pub use edge::EdgeDetector;
pub use gradient::GradientDetector;
pub use qr_finder::QrFinderDetector;

//! Core data structures
//!
//! - Points, bounding boxes and canonical quads
//! - Bit matrices for binarized images
//! - Region lifecycle types and pathway sets
//! - Decoded codes and per-image results

/// Symbologies, reads and per-image results
pub mod code;
/// Binary images
pub mod matrix;
/// 2D points
pub mod point;
/// Boxes and quads
pub mod polygon;
/// Region lifecycle
pub mod region;

pub use code::{CodeType, DecodedCode, ImageResult};
pub use matrix::BitMatrix;
pub use point::Point;
pub use polygon::{BoundingBox, Quad, polygon_area};
pub use region::{
    Pathway, PathwaySet, RawCandidate, RefinedRegion, RegionState, ResolvedRegion,
};

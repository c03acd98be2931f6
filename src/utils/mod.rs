//! Utility functions for image processing
//!
//! - Grayscale conversion of raw interleaved buffers
//! - Binarization (Otsu, global and adaptive mean)
//! - Geometry (perspective transforms, corner ordering)
//! - Line morphology and crop transforms

pub mod binarization;
pub mod geometry;
pub mod grayscale;
pub mod morphology;
pub mod transform;

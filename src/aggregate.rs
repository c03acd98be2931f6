//! Final per-image bookkeeping.

use std::time::Instant;

use crate::models::{DecodedCode, ImageResult, Quad};
use crate::quality::QualityVerdict;

/// Collects reads and unreadable regions for one image
#[derive(Debug)]
pub struct ResultAggregator {
    started: Instant,
    codes: Vec<DecodedCode>,
    unrecognized: Vec<Quad>,
}

impl ResultAggregator {
    /// Start timing an image
    pub fn new(started: Instant) -> Self {
        Self {
            started,
            codes: Vec::new(),
            unrecognized: Vec::new(),
        }
    }

    /// Add a read unless one with the same payload already covers an
    /// overlapping area. Returns whether it was kept.
    pub fn push_decoded(&mut self, code: DecodedCode) -> bool {
        let bbox = code.polygon.bbox();
        let duplicate = self.codes.iter().any(|existing| {
            existing.payload == code.payload && existing.polygon.bbox().intersection_area(&bbox) > 0.0
        });
        if duplicate {
            log::debug!("dropping repeated {} read {:?}", code.code_type, code.payload);
            return false;
        }
        self.codes.push(code);
        true
    }

    /// Record a region that exhausted every attempt
    pub fn push_unrecognized(&mut self, polygon: Quad) {
        self.unrecognized.push(polygon);
    }

    /// Number of reads kept so far
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// No reads kept yet
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Close out the image
    pub fn finish(self, quality: QualityVerdict) -> ImageResult {
        ImageResult {
            codes: self.codes,
            unrecognized: self.unrecognized,
            elapsed_ms: self.started.elapsed().as_secs_f64() * 1000.0,
            quality,
        }
    }
}

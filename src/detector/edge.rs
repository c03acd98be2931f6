use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;

use super::contour::contour_candidates;
use crate::config::EdgeConfig;
use crate::models::{Pathway, RawCandidate};
use crate::preprocess::ImageVariant;
use crate::utils::morphology::close_square;

/// Canny edges closed into blobs
#[derive(Debug, Clone, Default)]
pub struct EdgeDetector {
    config: EdgeConfig,
}

impl EdgeDetector {
    /// Detector with the given parameters
    pub fn new(config: EdgeConfig) -> Self {
        Self { config }
    }

    /// Candidates from every variant, in original image coordinates
    pub fn detect(&self, variants: &[ImageVariant], width: u32, height: u32) -> Vec<RawCandidate> {
        let cfg = &self.config;
        let mut out = Vec::new();
        for variant in variants {
            let blurred = gaussian_blur_f32(&variant.image, cfg.blur_sigma);
            let edges = canny(&blurred, cfg.canny_low, cfg.canny_high);
            let closed = close_square(&edges, cfg.closing_size);
            let found = contour_candidates(&closed, &cfg.shape, Pathway::Edge, variant.scale, width, height);
            log::trace!("edge: {} -> {} candidates", variant.descriptor, found.len());
            out.extend(found);
        }
        out
    }
}

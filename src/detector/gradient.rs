//! Gradient-energy localization for 1-D barcodes.
//!
//! Bars produce strong gradients across one axis and almost none along the
//! other. The magnitude map is thresholded, then closed with a long line
//! across the bars so the gaps between them fill in.

use image::{GrayImage, Luma};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use super::contour::contour_candidates;
use crate::config::GradientConfig;
use crate::models::{Pathway, RawCandidate};
use crate::preprocess::ImageVariant;
use crate::utils::morphology::{LineAxis, close_line};

/// Sobel magnitude with directional closing
#[derive(Debug, Clone, Default)]
pub struct GradientDetector {
    config: GradientConfig,
}

impl GradientDetector {
    /// Detector with the given parameters
    pub fn new(config: GradientConfig) -> Self {
        Self { config }
    }

    /// Candidates from every variant, in original image coordinates
    pub fn detect(&self, variants: &[ImageVariant], width: u32, height: u32) -> Vec<RawCandidate> {
        let mut out = Vec::new();
        for variant in variants {
            let (mask, axes) = self.energy_mask(&variant.image);
            for axis in axes {
                let closed = self.close_along(&mask, axis);
                out.extend(contour_candidates(
                    &closed,
                    &self.config.shape,
                    Pathway::Gradient,
                    variant.scale,
                    width,
                    height,
                ));
            }
        }
        out
    }

    /// Thresholded, normalized gradient magnitude and the closing axes to use.
    ///
    /// Horizontal gradients dominate over vertical bars, which are bridged
    /// with a horizontal line. Without a clear winner both axes are returned.
    pub fn energy_mask(&self, gray: &GrayImage) -> (GrayImage, Vec<LineAxis>) {
        let gx = horizontal_sobel(gray);
        let gy = vertical_sobel(gray);
        let (w, h) = gray.dimensions();

        let mut magnitude = vec![0f32; (w * h) as usize];
        let (mut sum_x, mut sum_y) = (0f64, 0f64);
        let mut peak = 0f32;
        for (i, (px, py)) in gx.pixels().zip(gy.pixels()).enumerate() {
            let (dx, dy) = (px[0] as f32, py[0] as f32);
            sum_x += dx.abs() as f64;
            sum_y += dy.abs() as f64;
            let m = (dx * dx + dy * dy).sqrt();
            peak = peak.max(m);
            magnitude[i] = m;
        }

        let threshold = self.config.magnitude_threshold as f32;
        let mask = GrayImage::from_fn(w, h, |x, y| {
            let m = magnitude[(y * w + x) as usize];
            let normalized = if peak > 0.0 { m * 255.0 / peak } else { 0.0 };
            if normalized >= threshold { Luma([255]) } else { Luma([0]) }
        });

        let ratio = self.config.dominance_ratio as f64;
        let axes = if sum_x >= sum_y * ratio {
            vec![LineAxis::Horizontal]
        } else if sum_y >= sum_x * ratio {
            vec![LineAxis::Vertical]
        } else {
            vec![LineAxis::Horizontal, LineAxis::Vertical]
        };
        (mask, axes)
    }

    fn close_along(&self, mask: &GrayImage, axis: LineAxis) -> GrayImage {
        let across = match axis {
            LineAxis::Horizontal => LineAxis::Vertical,
            LineAxis::Vertical => LineAxis::Horizontal,
        };
        let long = close_line(mask, self.config.line_length, axis);
        close_line(&long, self.config.cross_length, across)
    }
}

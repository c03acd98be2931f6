//! Orientation search and decoding of resolved regions.

pub mod enhance;

use std::time::Instant;

use image::GrayImage;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use crate::config::RecognizeConfig;
use crate::decode::{SymbolDecoder, SymbolRead};
use crate::models::{DecodedCode, Pathway, RegionState, ResolvedRegion};
use crate::utils::transform::rotate_expanded;
use crate::validate::PayloadValidator;

pub use enhance::Enhancement;

/// Minimum separation (degrees) for the estimated angle to count as new
const ANGLE_EPSILON: f32 = 3.0;

/// Reads regions by trying rotations and enhancements in a fixed order
pub struct OrientationRecognizer<'a> {
    config: &'a RecognizeConfig,
    primary: &'a dyn SymbolDecoder,
    secondary: Option<&'a dyn SymbolDecoder>,
    validator: PayloadValidator,
}

impl<'a> OrientationRecognizer<'a> {
    /// Recognizer reading with `primary`, falling back to `secondary` on
    /// QR-shaped regions
    pub fn new(
        config: &'a RecognizeConfig,
        primary: &'a dyn SymbolDecoder,
        secondary: Option<&'a dyn SymbolDecoder>,
    ) -> Self {
        Self {
            config,
            primary,
            secondary,
            validator: PayloadValidator,
        }
    }

    /// Decode one region, advancing its state to a terminal one.
    ///
    /// An immediate read that passes validation is returned without touching
    /// the pixels. Otherwise every angle is tried with every enhancement and
    /// the first validated read wins. `max_attempts` bounds the primary
    /// decoder calls; each may be followed by one secondary call.
    pub fn recognize(&self, resolved: &mut ResolvedRegion) -> Option<DecodedCode> {
        let started = Instant::now();
        let region = &mut resolved.region;

        if let Some(read) = region.immediate.clone() {
            if self.validator.validate(read.code_type, &read.payload) {
                region.transition(RegionState::Validated);
                return Some(self.finish(resolved, read, 0.0, started));
            }
            log::debug!(
                "immediate {} read failed validation, searching orientations",
                read.code_type
            );
            region.immediate = None;
            region.transition(RegionState::Deduplicated);
        }

        let qr_shaped = self.is_qr_shaped(resolved);
        let mut attempts = 0usize;
        for angle in self.angles(&resolved.region.crop) {
            let rotated = rotate_expanded(&resolved.region.crop, angle);
            for enhancement in enhance::schedule(self.config.max_enhancements) {
                if attempts >= self.config.max_attempts {
                    log::debug!("attempt budget exhausted after {attempts} primary decodes");
                    resolved.region.transition(RegionState::Unrecognized);
                    return None;
                }
                let image = enhancement.apply(&rotated, self.config.border);

                attempts += 1;
                if let Some(read) = self.try_decode(self.primary, &image) {
                    resolved.region.transition(RegionState::Recognized);
                    return Some(self.finish(resolved, read, angle, started));
                }
                if !qr_shaped {
                    continue;
                }
                if let Some(secondary) = self.secondary {
                    if let Some(read) = self.try_decode(secondary, &image) {
                        resolved.region.transition(RegionState::Recognized);
                        return Some(self.finish(resolved, read, angle, started));
                    }
                }
            }
        }

        log::debug!("region unreadable after {attempts} primary decodes");
        resolved.region.transition(RegionState::Unrecognized);
        None
    }

    fn try_decode(&self, decoder: &dyn SymbolDecoder, image: &GrayImage) -> Option<SymbolRead> {
        match decoder.decode(image) {
            Ok(Some(read)) if self.validator.validate(read.code_type, &read.payload) => Some(read),
            Ok(Some(read)) => {
                log::trace!("{}: rejected {} payload {:?}", decoder.name(), read.code_type, read.payload);
                None
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("{}: {e}", decoder.name());
                None
            }
        }
    }

    fn finish(&self, resolved: &ResolvedRegion, read: SymbolRead, angle: f32, started: Instant) -> DecodedCode {
        DecodedCode {
            code_type: read.code_type,
            payload: read.payload,
            polygon: resolved.region.quad,
            decode_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            orientation_deg: angle,
            pathways: resolved.region.pathways,
        }
    }

    /// Found by the finder pathway, or close to square
    fn is_qr_shaped(&self, resolved: &ResolvedRegion) -> bool {
        let region = &resolved.region;
        if region.pathways.contains(Pathway::QrFinder) {
            return true;
        }
        let (w, h) = (region.quad.width(), region.quad.height());
        if h <= 0.0 {
            return false;
        }
        let (lo, hi) = self.config.qr_aspect_range;
        (lo..=hi).contains(&(w / h))
    }

    /// Configured angles, then the estimated dominant angle when it is new
    fn angles(&self, crop: &GrayImage) -> Vec<f32> {
        let mut angles = self.config.angles.clone();
        if self.config.dominant_angle {
            if let Some(estimated) = dominant_angle(crop) {
                if angles.iter().all(|a| (a - estimated).abs() > ANGLE_EPSILON) {
                    angles.push(estimated);
                }
            }
        }
        angles
    }
}

/// Rotation (degrees, in `(-90, 90]`) that turns the dominant gradient
/// direction horizontal, from the structure tensor of the crop
pub fn dominant_angle(crop: &GrayImage) -> Option<f32> {
    if crop.width() < 3 || crop.height() < 3 {
        return None;
    }
    let gx = horizontal_sobel(crop);
    let gy = vertical_sobel(crop);
    let (mut jxx, mut jyy, mut jxy) = (0f64, 0f64, 0f64);
    for (px, py) in gx.pixels().zip(gy.pixels()) {
        let (dx, dy) = (px[0] as f64, py[0] as f64);
        jxx += dx * dx;
        jyy += dy * dy;
        jxy += dx * dy;
    }
    if jxx + jyy <= f64::EPSILON {
        return None;
    }
    let theta = 0.5 * (2.0 * jxy).atan2(jxx - jyy);
    let mut degrees = -(theta.to_degrees() as f32);
    if degrees <= -90.0 {
        degrees += 180.0;
    } else if degrees > 90.0 {
        degrees -= 180.0;
    }
    Some(degrees)
}

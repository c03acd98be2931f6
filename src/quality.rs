//! Per-image triage: how blurry, how much glare, and how hard to try.

use image::GrayImage;
use imageproc::filter::filter3x3;
use serde::Serialize;

use crate::config::QualityConfig;

const LAPLACIAN: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];

/// How much preprocessing and how many pathways an image gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingPath {
    /// Sharp, glare-free: minimal variants, direct decoding may short-circuit
    Fast,
    /// Moderate variant set
    Standard,
    /// Full variant cross-product
    Aggressive,
}

/// Outcome of [`QualityAssessor::assess`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityVerdict {
    /// Variance of the Laplacian; higher is sharper
    pub blur_score: f64,
    /// Fraction of bright, locally flat pixels
    pub glare_ratio: f64,
    /// Global intensity standard deviation
    pub std_dev: f64,
    /// Glare flag derived from the ratio and the global contrast
    pub has_glare: bool,
    /// Chosen path
    pub path: ProcessingPath,
}

/// Stateless image quality triage
#[derive(Debug, Clone, Default)]
pub struct QualityAssessor {
    config: QualityConfig,
}

impl QualityAssessor {
    /// Assessor with the given thresholds
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Score blur and glare and choose a processing path.
    ///
    /// Uniform or empty images are degenerate and get the aggressive path so
    /// nothing is short-circuited on them.
    pub fn assess(&self, gray: &GrayImage) -> QualityVerdict {
        let cfg = &self.config;
        let (mean, std_dev) = mean_std(gray.as_raw());
        let uniform = gray
            .as_raw()
            .iter()
            .all(|&v| gray.as_raw().first() == Some(&v));

        if gray.width() < 3 || gray.height() < 3 || uniform {
            log::debug!("degenerate image (mean {mean:.1}), aggressive path");
            return QualityVerdict {
                blur_score: 0.0,
                glare_ratio: 0.0,
                std_dev,
                has_glare: false,
                path: ProcessingPath::Aggressive,
            };
        }

        let blur_score = laplacian_variance(gray);
        let glare_ratio = glare_ratio(gray, cfg.glare_brightness, cfg.glare_flat_variance);
        let has_glare = glare_ratio > cfg.glare_ratio && std_dev > cfg.glare_min_std;
        let sharp = blur_score >= cfg.blur_threshold;
        let severe_blur = blur_score < cfg.blur_threshold * cfg.severe_blur_fraction;

        let path = match (sharp, has_glare) {
            (true, false) => ProcessingPath::Fast,
            (false, true) => ProcessingPath::Aggressive,
            (false, false) if severe_blur => ProcessingPath::Aggressive,
            _ => ProcessingPath::Standard,
        };

        log::debug!(
            "quality: blur {blur_score:.1}, glare {glare_ratio:.4}, std {std_dev:.1} -> {path:?}"
        );
        QualityVerdict {
            blur_score,
            glare_ratio,
            std_dev,
            has_glare,
            path,
        }
    }
}

/// Variance of the 4-neighbour Laplacian response
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let response = filter3x3::<_, f32, f32>(gray, &LAPLACIAN).into_raw();
    let n = response.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean = response.iter().map(|&v| v as f64).sum::<f64>() / n;
    response
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n
}

/// Fraction of pixels at or above `brightness` whose 3x3 neighbourhood
/// variance is at most `flat_variance`
pub fn glare_ratio(gray: &GrayImage, brightness: u8, flat_variance: f64) -> f64 {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }
    let mut glare = 0usize;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            if gray.get_pixel(x, y)[0] < brightness {
                continue;
            }
            let (mut sum, mut sum_sq) = (0.0f64, 0.0f64);
            for dy in 0..3 {
                for dx in 0..3 {
                    let v = gray.get_pixel(x + dx - 1, y + dy - 1)[0] as f64;
                    sum += v;
                    sum_sq += v * v;
                }
            }
            let mean = sum / 9.0;
            if sum_sq / 9.0 - mean * mean <= flat_variance {
                glare += 1;
            }
        }
    }
    glare as f64 / (w as f64 * h as f64)
}

fn mean_std(values: &[u8]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean, var.sqrt())
}

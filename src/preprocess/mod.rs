//! Image variant generation.
//!
//! Each variant is a transformed copy of the grayscale input tagged with a
//! descriptor such as `"clahe+bilateral+block15"` and the scale it was
//! resampled to. Coordinates found on a variant divide by `scale` to get
//! back to the original image.

pub mod clahe;
pub mod deglare;

use image::GrayImage;
use image::imageops::{self, FilterType};
use imageproc::filter::bilateral_filter;

use crate::config::PreprocessConfig;
use crate::quality::{ProcessingPath, QualityVerdict};
use crate::utils::binarization::adaptive_binarize;

pub use clahe::clahe;
pub use deglare::deglare;

/// One transformed copy of the input
#[derive(Debug, Clone)]
pub struct ImageVariant {
    /// Transform chain, e.g. `"deglare+clahe+bilateral+block11"`
    pub descriptor: String,
    /// Resampling factor relative to the original
    pub scale: f32,
    /// Pixels, print polarity (dark symbol on light ground)
    pub image: GrayImage,
    /// Two-level image produced by thresholding
    pub binarized: bool,
}

/// Builds the variant set for an image according to its verdict
#[derive(Debug, Clone, Default)]
pub struct PreprocessingBank {
    config: PreprocessConfig,
}

impl PreprocessingBank {
    /// Bank with the given parameters
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Generate variants for `gray`, never more than `max_variants`.
    ///
    /// The fast path gets the plain image and its CLAHE copy. The standard
    /// path adds a bilateral-smoothed copy, two adaptive thresholds and the
    /// off-unity scales. The aggressive path crosses every scale with every
    /// block size.
    pub fn generate(&self, gray: &GrayImage, verdict: &QualityVerdict) -> Vec<ImageVariant> {
        let cfg = &self.config;
        let mut out = Vec::new();

        let (base, prefix) = if verdict.has_glare {
            (
                deglare(gray, cfg.deglare_brightness, cfg.deglare_radius),
                "deglare+",
            )
        } else {
            (gray.clone(), "")
        };
        let contrast = clahe(
            &base,
            cfg.clahe_grid.0,
            cfg.clahe_grid.1,
            cfg.clahe_clip_limit,
        );

        let identity = if prefix.is_empty() { "gray".to_string() } else { "deglare".to_string() };
        out.push(ImageVariant {
            descriptor: identity,
            scale: 1.0,
            image: base,
            binarized: false,
        });

        if verdict.path == ProcessingPath::Fast {
            out.push(ImageVariant {
                descriptor: format!("{prefix}clahe"),
                scale: 1.0,
                image: contrast,
                binarized: false,
            });
            out.truncate(cfg.max_variants);
            log::debug!("generated {} variants (fast)", out.len());
            return out;
        }

        let smooth = bilateral_filter(
            &contrast,
            cfg.bilateral_window,
            cfg.bilateral_sigma_color,
            cfg.bilateral_sigma_spatial,
        );
        let smooth_desc = format!("{prefix}clahe+bilateral");

        let blocks: Vec<u32> = match verdict.path {
            ProcessingPath::Aggressive => cfg.block_sizes.clone(),
            _ => middle_two(&cfg.block_sizes),
        };

        if verdict.path == ProcessingPath::Standard {
            out.push(ImageVariant {
                descriptor: format!("{prefix}clahe"),
                scale: 1.0,
                image: contrast,
                binarized: false,
            });
        }

        for &scale in &cfg.scales {
            let image = if (scale - 1.0).abs() < f32::EPSILON {
                smooth.clone()
            } else {
                match resample(&smooth, scale) {
                    Some(img) => img,
                    None => continue,
                }
            };

            let thresholded_here =
                verdict.path == ProcessingPath::Aggressive || (scale - 1.0).abs() < f32::EPSILON;
            if thresholded_here {
                for &block in &blocks {
                    let binary = adaptive_binarize(&image, block, cfg.threshold_c);
                    out.push(ImageVariant {
                        descriptor: format!("{smooth_desc}+block{block}"),
                        scale,
                        image: binary.to_print(),
                        binarized: true,
                    });
                }
            }
            out.push(ImageVariant {
                descriptor: smooth_desc.clone(),
                scale,
                image,
                binarized: false,
            });
        }

        // Unthresholded variants first so truncation drops binarized ones
        out.sort_by_key(|v| v.binarized);
        out.truncate(cfg.max_variants);
        log::debug!("generated {} variants ({:?})", out.len(), verdict.path);
        out
    }
}

fn middle_two(blocks: &[u32]) -> Vec<u32> {
    if blocks.len() <= 2 {
        return blocks.to_vec();
    }
    let start = (blocks.len() - 2) / 2;
    blocks[start..start + 2].to_vec()
}

/// Resize by `scale`, `None` when the result would be empty
pub fn resample(img: &GrayImage, scale: f32) -> Option<GrayImage> {
    let w = (img.width() as f32 * scale).round() as u32;
    let h = (img.height() as f32 * scale).round() as u32;
    if w == 0 || h == 0 {
        return None;
    }
    Some(imageops::resize(img, w, h, FilterType::Triangle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn verdict(path: ProcessingPath, has_glare: bool) -> QualityVerdict {
        QualityVerdict {
            blur_score: 200.0,
            glare_ratio: 0.0,
            std_dev: 50.0,
            has_glare,
            path,
        }
    }

    fn sample() -> GrayImage {
        GrayImage::from_fn(60, 40, |x, y| Luma([((x * 5 + y * 3) % 256) as u8]))
    }

    #[test]
    fn test_fast_path_is_minimal() {
        let variants = PreprocessingBank::default().generate(&sample(), &verdict(ProcessingPath::Fast, false));
        let names: Vec<_> = variants.iter().map(|v| v.descriptor.as_str()).collect();
        assert_eq!(names, vec!["gray", "clahe"]);
    }

    #[test]
    fn test_paths_grow_monotonically() {
        let bank = PreprocessingBank::default();
        let img = sample();
        let fast = bank.generate(&img, &verdict(ProcessingPath::Fast, false)).len();
        let standard = bank.generate(&img, &verdict(ProcessingPath::Standard, false)).len();
        let aggressive = bank.generate(&img, &verdict(ProcessingPath::Aggressive, false)).len();
        assert!(fast < standard && standard < aggressive);
        assert!(aggressive <= PreprocessConfig::default().max_variants);
    }

    #[test]
    fn test_scaled_variants_have_scaled_size() {
        let variants = PreprocessingBank::default()
            .generate(&sample(), &verdict(ProcessingPath::Aggressive, false));
        let small = variants
            .iter()
            .find(|v| (v.scale - 0.7).abs() < 1e-6)
            .unwrap();
        assert_eq!(small.image.dimensions(), (42, 28));
        assert!(variants.iter().any(|v| v.descriptor == "clahe+bilateral+block19"));
    }

    #[test]
    fn test_glare_prefix_and_cap() {
        let bank = PreprocessingBank::new(PreprocessConfig {
            max_variants: 3,
            ..PreprocessConfig::default()
        });
        let variants = bank.generate(&sample(), &verdict(ProcessingPath::Aggressive, true));
        assert_eq!(variants.len(), 3);
        assert!(variants.iter().all(|v| v.descriptor.starts_with("deglare")));
        assert!(variants.iter().all(|v| !v.binarized));
    }
}

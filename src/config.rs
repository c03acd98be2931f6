//! Tunable constants for every pipeline stage.
//!
//! [`ScanConfig::default`] holds the documented defaults. Partial JSON
//! documents are layered over them by [`ScanConfig::from_json_str`], and a
//! handful of budgets can be overridden from the environment.

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Image quality triage
    pub quality: QualityConfig,
    /// Variant generation
    pub preprocess: PreprocessConfig,
    /// Edge pathway
    pub edge: EdgeConfig,
    /// Gradient pathway
    pub gradient: GradientConfig,
    /// QR finder pathway
    pub finder: FinderConfig,
    /// Quad fitting and rectification
    pub refine: RefineConfig,
    /// Duplicate resolution
    pub dedup: DedupConfig,
    /// Orientation search and enhancement
    pub recognize: RecognizeConfig,
    /// Pathway switches
    pub pathways: PathwayToggles,
}

impl ScanConfig {
    /// Parse a (possibly partial) JSON document over the defaults
    pub fn from_json_str(json: &str) -> Result<Self, ScanError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply `SCAN_MAX_VARIANTS`, `SCAN_MAX_ENHANCEMENTS` and
    /// `SCAN_MAX_DECODE_ATTEMPTS` when set
    pub fn with_env_overrides(mut self) -> Self {
        self.preprocess.max_variants =
            parse_env_usize("SCAN_MAX_VARIANTS", self.preprocess.max_variants).clamp(1, 64);
        self.recognize.max_enhancements =
            parse_env_usize("SCAN_MAX_ENHANCEMENTS", self.recognize.max_enhancements)
                .clamp(1, 20);
        self.recognize.max_attempts =
            parse_env_usize("SCAN_MAX_DECODE_ATTEMPTS", self.recognize.max_attempts).max(1);
        self
    }
}

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

/// Thresholds for [`crate::quality::QualityAssessor`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Laplacian variance above which an image counts as sharp
    pub blur_threshold: f64,
    /// Fraction of `blur_threshold` below which blur alone forces the aggressive path
    pub severe_blur_fraction: f64,
    /// Intensity at or above which a pixel may be glare
    pub glare_brightness: u8,
    /// Maximum 3x3 local variance of a glare pixel
    pub glare_flat_variance: f64,
    /// Fraction of glare pixels that flags the image
    pub glare_ratio: f64,
    /// Minimum global standard deviation for the glare flag
    pub glare_min_std: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            blur_threshold: 150.0,
            severe_blur_fraction: 0.33,
            glare_brightness: 215,
            glare_flat_variance: 30.0,
            glare_ratio: 0.025,
            glare_min_std: 35.0,
        }
    }
}

/// Parameters for [`crate::preprocess::PreprocessingBank`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// CLAHE clip limit
    pub clahe_clip_limit: f32,
    /// CLAHE tile grid (columns, rows)
    pub clahe_grid: (u32, u32),
    /// Bilateral filter window
    pub bilateral_window: u32,
    /// Bilateral intensity sigma
    pub bilateral_sigma_color: f32,
    /// Bilateral spatial sigma
    pub bilateral_sigma_spatial: f32,
    /// Adaptive threshold block sizes
    pub block_sizes: Vec<u32>,
    /// Constant subtracted from the local mean
    pub threshold_c: i32,
    /// Rescale factors
    pub scales: Vec<f32>,
    /// Upper bound on the number of variants per image
    pub max_variants: usize,
    /// Saturation level treated as glare during deglaring
    pub deglare_brightness: u8,
    /// Neighbourhood radius for deglaring
    pub deglare_radius: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            clahe_clip_limit: 2.5,
            clahe_grid: (6, 6),
            bilateral_window: 5,
            bilateral_sigma_color: 40.0,
            bilateral_sigma_spatial: 40.0,
            block_sizes: vec![7, 11, 15, 19],
            threshold_c: 2,
            scales: vec![0.7, 1.0, 1.3],
            max_variants: 24,
            deglare_brightness: 225,
            deglare_radius: 4,
        }
    }
}

/// Contour acceptance rules shared by the edge and gradient pathways
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeFilter {
    /// Minimum contour area at scale 1.0
    pub min_area: f32,
    /// Accepted width/height range of the minimum-area rectangle
    pub aspect_range: (f32, f32),
    /// Minimum contour area over rectangle area
    pub min_fill: f32,
    /// Maximum contour area as a fraction of the image
    pub max_image_fraction: f32,
}

impl Default for ShapeFilter {
    fn default() -> Self {
        Self {
            min_area: 200.0,
            aspect_range: (0.15, 8.0),
            min_fill: 0.4,
            max_image_fraction: 0.95,
        }
    }
}

/// Parameters for the edge pathway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Canny low threshold
    pub canny_low: f32,
    /// Canny high threshold
    pub canny_high: f32,
    /// Gaussian pre-blur sigma
    pub blur_sigma: f32,
    /// Side of the square closing element
    pub closing_size: u32,
    /// Contour filter
    pub shape: ShapeFilter,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            canny_low: 40.0,
            canny_high: 120.0,
            blur_sigma: 0.8,
            closing_size: 12,
            shape: ShapeFilter::default(),
        }
    }
}

/// Parameters for the gradient pathway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientConfig {
    /// Threshold on the normalized (0..255) gradient magnitude
    pub magnitude_threshold: u8,
    /// Length of the closing line along the dominant direction
    pub line_length: u32,
    /// Length of the short closing line across it
    pub cross_length: u32,
    /// Closing runs in both directions when neither direction leads by this ratio
    pub dominance_ratio: f32,
    /// Contour filter
    pub shape: ShapeFilter,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            magnitude_threshold: 30,
            line_length: 21,
            cross_length: 5,
            dominance_ratio: 1.25,
            shape: ShapeFilter {
                min_fill: 0.3,
                ..ShapeFilter::default()
            },
        }
    }
}

/// Parameters for the QR finder pathway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    /// The shorter image side is split into this many grid cells
    pub grid_divisions: u32,
    /// Smallest grid cell in pixels
    pub min_cell: u32,
    /// Allowed deviation of each run from its ideal 1:1:3:1:1 share
    pub ratio_tolerance: f32,
    /// Upper bound on finder triples turned into candidates
    pub max_groups: usize,
    /// Number of same-scale variants scanned besides the original image
    pub extra_variants: usize,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            grid_divisions: 3,
            min_cell: 48,
            ratio_tolerance: 0.5,
            max_groups: 8,
            extra_variants: 1,
        }
    }
}

/// Parameters for [`crate::refine::SegmentationRefiner`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Douglas-Peucker epsilons as fractions of the perimeter
    pub approx_epsilons: Vec<f64>,
    /// Padding as a fraction of the quad size
    pub padding: f32,
    /// Pixels darker than this count as content
    pub content_threshold: u8,
    /// Content pixels required before trimming
    pub min_content_pixels: usize,
    /// Accepted (min, max) area ratio of a trimmed crop
    pub accept_band: (f32, f32),
    /// Smallest side of a rectified crop
    pub min_side: u32,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            approx_epsilons: vec![0.01, 0.015, 0.02, 0.025, 0.03],
            padding: 0.05,
            content_threshold: 200,
            min_content_pixels: 50,
            accept_band: (0.3, 0.85),
            min_side: 10,
        }
    }
}

/// Parameters for [`crate::dedup::DuplicateResolver`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Bounding-box IoU that links two regions
    pub iou_threshold: f32,
    /// Centroid distance (pixels) that links two regions
    pub centroid_distance: f32,
    /// Undecoded regions smaller than this image fraction are dropped
    pub min_area_fraction: f32,
    /// Undecoded regions larger than this image fraction are dropped
    pub max_area_fraction: f32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.15,
            centroid_distance: 15.0,
            min_area_fraction: 0.0005,
            max_area_fraction: 0.95,
        }
    }
}

/// Parameters for [`crate::recognize::OrientationRecognizer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizeConfig {
    /// Rotations tried, in order, in degrees
    pub angles: Vec<f32>,
    /// Also try the angle estimated from the crop's gradients
    pub dominant_angle: bool,
    /// Enhancement variants per orientation
    pub max_enhancements: usize,
    /// Primary decoder calls allowed per region. Secondary fallback calls
    /// ride along with the primary call they follow.
    pub max_attempts: usize,
    /// White border added by the bordered enhancements
    pub border: u32,
    /// Width/height range treated as QR-shaped
    pub qr_aspect_range: (f32, f32),
}

impl Default for RecognizeConfig {
    fn default() -> Self {
        Self {
            angles: vec![0.0, 30.0, -30.0, 45.0, -45.0, 90.0, -90.0],
            dominant_angle: true,
            max_enhancements: 20,
            // Seven fixed angles plus the estimated one, 20 enhancements each
            max_attempts: 160,
            border: 8,
            qr_aspect_range: (0.75, 1.33),
        }
    }
}

/// Pathway switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathwayToggles {
    /// Whole-image decoding
    pub direct: bool,
    /// Edge contours
    pub edge: bool,
    /// Gradient contours
    pub gradient: bool,
    /// QR finder triples
    pub qr_finder: bool,
    /// Skip edge and gradient when direct decoding succeeded on a sharp image
    pub direct_fast_exit: bool,
}

impl Default for PathwayToggles {
    fn default() -> Self {
        Self {
            direct: true,
            edge: true,
            gradient: true,
            qr_finder: true,
            direct_fast_exit: true,
        }
    }
}

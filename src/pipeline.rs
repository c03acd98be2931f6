//! Per-image orchestration: triage, variants, detection, refinement,
//! duplicate resolution, recognition and aggregation.

use std::sync::Arc;
use std::time::Instant;

use image::{DynamicImage, GenericImageView, GrayImage};
use rayon::prelude::*;

use crate::aggregate::ResultAggregator;
use crate::config::ScanConfig;
use crate::decode::{RqrrDecoder, RxingDecoder, SymbolDecoder};
use crate::dedup::DuplicateResolver;
use crate::detector::{DirectDetector, EdgeDetector, GradientDetector, QrFinderDetector};
use crate::error::ScanError;
use crate::models::{ImageResult, Pathway, RawCandidate, RefinedRegion, ResolvedRegion};
use crate::preprocess::{ImageVariant, PreprocessingBank};
use crate::quality::{ProcessingPath, QualityAssessor, QualityVerdict};
use crate::recognize::OrientationRecognizer;
use crate::refine::SegmentationRefiner;
use crate::report::{DetectionEvent, NullSink, RecognitionEvent, ReportSink};
use crate::utils::grayscale::to_luma;

/// Configured detection and recognition pipeline.
///
/// A scanner holds no per-image state, so one instance can serve any number
/// of images, including concurrently through [`Scanner::scan_batch`].
pub struct Scanner {
    config: ScanConfig,
    assessor: QualityAssessor,
    bank: PreprocessingBank,
    edge: EdgeDetector,
    gradient: GradientDetector,
    finder: QrFinderDetector,
    refiner: SegmentationRefiner,
    resolver: DuplicateResolver,
    primary: Box<dyn SymbolDecoder>,
    secondary: Option<Box<dyn SymbolDecoder>>,
    sink: Arc<dyn ReportSink>,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    /// Scanner with default constants (plus environment budget overrides),
    /// `rxing` as the primary decoder and `rqrr` as the QR fallback
    pub fn new() -> Self {
        Self::with_config(ScanConfig::default().with_env_overrides())
    }

    /// Scanner with explicit constants and the default decoders
    pub fn with_config(config: ScanConfig) -> Self {
        Self {
            assessor: QualityAssessor::new(config.quality.clone()),
            bank: PreprocessingBank::new(config.preprocess.clone()),
            edge: EdgeDetector::new(config.edge.clone()),
            gradient: GradientDetector::new(config.gradient.clone()),
            finder: QrFinderDetector::new(config.finder.clone()),
            refiner: SegmentationRefiner::new(config.refine.clone()),
            resolver: DuplicateResolver::new(config.dedup.clone()),
            config,
            primary: Box::new(RxingDecoder),
            secondary: Some(Box::new(RqrrDecoder)),
            sink: Arc::new(NullSink),
        }
    }

    /// Replace the decode primitives
    pub fn with_decoders(
        mut self,
        primary: Box<dyn SymbolDecoder>,
        secondary: Option<Box<dyn SymbolDecoder>>,
    ) -> Self {
        self.primary = primary;
        self.secondary = secondary;
        self
    }

    /// Send detection and recognition events to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Detect and read every symbol in a decoded image
    pub fn detect_and_recognize(&self, image: &DynamicImage) -> Result<ImageResult, ScanError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ScanError::EmptyImage);
        }
        match image {
            DynamicImage::ImageLuma8(gray) => self.detect_and_recognize_gray(gray),
            other => {
                let rgb = other.to_rgb8();
                let gray = to_luma(rgb.as_raw(), rgb.width(), rgb.height(), 3)?;
                self.detect_and_recognize_gray(&gray)
            }
        }
    }

    /// Detect and read from an interleaved 8-bit buffer of 1, 3 or 4 channels
    pub fn detect_and_recognize_raw(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        channels: u8,
    ) -> Result<ImageResult, ScanError> {
        let gray = to_luma(data, width, height, channels)?;
        self.detect_and_recognize_gray(&gray)
    }

    /// Detect and read from a grayscale image
    pub fn detect_and_recognize_gray(&self, gray: &GrayImage) -> Result<ImageResult, ScanError> {
        if gray.width() == 0 || gray.height() == 0 {
            return Err(ScanError::EmptyImage);
        }
        let started = Instant::now();
        let (width, height) = gray.dimensions();

        // Step 1: triage and variants
        let verdict = self.assessor.assess(gray);
        let variants = self.bank.generate(gray, &verdict);
        log::debug!(
            "{width}x{height}: {:?} path (blur {:.1}, glare {:.3}), {} variants",
            verdict.path,
            verdict.blur_score,
            verdict.glare_ratio,
            variants.len()
        );

        // Step 2: candidate regions from every enabled pathway
        let candidates = self.detect_candidates(gray, &variants, &verdict);

        // Step 3: fit and rectify, then collapse duplicates
        let refined: Vec<RefinedRegion> = candidates
            .into_iter()
            .filter_map(|c| self.refiner.refine(c, gray))
            .collect();
        let mut resolved = self.resolver.resolve(refined);
        self.resolver.retain_plausible(&mut resolved, width, height);
        sort_for_recognition(&mut resolved);
        log::debug!("{} regions to recognize", resolved.len());

        // Step 4: read each region
        let recognizer = OrientationRecognizer::new(
            &self.config.recognize,
            &*self.primary,
            self.secondary.as_deref(),
        );
        let mut aggregator = ResultAggregator::new(started);
        for mut region in resolved {
            let region_started = Instant::now();
            match recognizer.recognize(&mut region) {
                Some(code) => {
                    self.sink.record_recognition(&RecognitionEvent {
                        code_type: Some(code.code_type),
                        decode_time_ms: code.decode_time_ms,
                    });
                    aggregator.push_decoded(code);
                }
                None => {
                    self.sink.record_recognition(&RecognitionEvent {
                        code_type: None,
                        decode_time_ms: elapsed_ms(region_started),
                    });
                    aggregator.push_unrecognized(region.region.quad);
                }
            }
        }

        let result = aggregator.finish(verdict);
        log::debug!(
            "{} codes, {} unrecognized in {:.1} ms",
            result.codes.len(),
            result.unrecognized.len(),
            result.elapsed_ms
        );
        Ok(result)
    }

    /// Scan images in parallel, one independent result per input
    pub fn scan_batch(&self, images: &[DynamicImage]) -> Vec<Result<ImageResult, ScanError>> {
        images
            .par_iter()
            .map(|image| self.detect_and_recognize(image))
            .collect()
    }

    /// Run the pathways in order: direct, QR finder, then edge and gradient.
    ///
    /// Edge and gradient are skipped when direct decoding already read a
    /// symbol on a fast-path image and the fast exit is enabled.
    fn detect_candidates(
        &self,
        gray: &GrayImage,
        variants: &[ImageVariant],
        verdict: &QualityVerdict,
    ) -> Vec<RawCandidate> {
        let toggles = &self.config.pathways;
        let (width, height) = gray.dimensions();
        let mut candidates = Vec::new();

        if toggles.direct {
            let direct = DirectDetector::new(&*self.primary);
            candidates.extend(self.run_pathway(Pathway::Direct, || direct.detect(gray)));
        }
        let direct_hit = candidates.iter().any(|c| c.immediate.is_some());

        if toggles.qr_finder {
            candidates.extend(self.run_pathway(Pathway::QrFinder, || {
                self.finder.detect(gray, variants)
            }));
        }

        if toggles.direct_fast_exit && direct_hit && verdict.path == ProcessingPath::Fast {
            log::debug!("direct read on a sharp image, skipping edge and gradient");
            return candidates;
        }

        if toggles.edge {
            candidates.extend(self.run_pathway(Pathway::Edge, || {
                self.edge.detect(variants, width, height)
            }));
        }
        if toggles.gradient {
            candidates.extend(self.run_pathway(Pathway::Gradient, || {
                self.gradient.detect(variants, width, height)
            }));
        }
        candidates
    }

    fn run_pathway<F>(&self, pathway: Pathway, detect: F) -> Vec<RawCandidate>
    where
        F: FnOnce() -> Vec<RawCandidate>,
    {
        let started = Instant::now();
        let found = detect();
        let event = DetectionEvent {
            pathway,
            candidates: found.len(),
            elapsed_ms: elapsed_ms(started),
        };
        log::debug!(
            "{}: {} candidates in {:.1} ms",
            pathway.name(),
            event.candidates,
            event.elapsed_ms
        );
        self.sink.record_detection(&event);
        found
    }
}

/// Most authoritative and then largest regions are read first
fn sort_for_recognition(regions: &mut [ResolvedRegion]) {
    regions.sort_by(|a, b| {
        b.region
            .authority()
            .cmp(&a.region.authority())
            .then(b.region.area().total_cmp(&a.region.area()))
    });
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::SymbolRead;
    use crate::error::DecodeError;
    use crate::models::CodeType;
    use crate::report::MetricsSink;
    use image::Luma;

    /// Never finds anything
    struct Blind;

    impl SymbolDecoder for Blind {
        fn name(&self) -> &'static str {
            "blind"
        }

        fn decode(&self, _image: &GrayImage) -> Result<Option<SymbolRead>, DecodeError> {
            Ok(None)
        }
    }

    /// Reads a fixed QR payload from anything with a dark pixel
    struct AnyDark;

    impl SymbolDecoder for AnyDark {
        fn name(&self) -> &'static str {
            "any_dark"
        }

        fn decode(&self, image: &GrayImage) -> Result<Option<SymbolRead>, DecodeError> {
            let dark = image.pixels().any(|p| p[0] < 64);
            Ok(dark.then(|| SymbolRead {
                code_type: CodeType::Qr,
                payload: "fixed".into(),
                points: Vec::new(),
            }))
        }
    }

    fn scanner(primary: Box<dyn SymbolDecoder>) -> Scanner {
        Scanner::with_config(ScanConfig::default()).with_decoders(primary, None)
    }

    #[test]
    fn test_blank_image_has_no_codes() {
        let sink = Arc::new(MetricsSink::new());
        let scanner = scanner(Box::new(Blind)).with_sink(sink.clone());
        let gray = GrayImage::from_pixel(120, 120, Luma([128]));
        let result = scanner.detect_and_recognize_gray(&gray).unwrap();
        assert!(result.codes.is_empty());
        assert!(result.unrecognized.is_empty());
        assert_eq!(sink.snapshot().detection_runs, 4);
    }

    #[test]
    fn test_rejects_empty_input() {
        let scanner = scanner(Box::new(Blind));
        assert!(matches!(
            scanner.detect_and_recognize_gray(&GrayImage::new(0, 5)),
            Err(ScanError::EmptyImage)
        ));
        assert!(matches!(
            scanner.detect_and_recognize_raw(&[0; 5], 2, 2, 1),
            Err(ScanError::BufferSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_disabled_pathways_are_not_run() {
        let sink = Arc::new(MetricsSink::new());
        let mut config = ScanConfig::default();
        config.pathways.edge = false;
        config.pathways.gradient = false;
        let scanner = Scanner::with_config(config)
            .with_decoders(Box::new(Blind), None)
            .with_sink(sink.clone());
        let gray = GrayImage::from_pixel(80, 80, Luma([200]));
        scanner.detect_and_recognize_gray(&gray).unwrap();
        assert_eq!(sink.snapshot().detection_runs, 2);
    }

    #[test]
    fn test_direct_read_is_reported_once() {
        let scanner = scanner(Box::new(AnyDark));
        let gray = GrayImage::from_fn(100, 100, |x, y| {
            let inside = (30..70).contains(&x) && (30..70).contains(&y);
            Luma([if inside && (x / 4) % 2 == 0 { 0 } else { 255 }])
        });
        let result = scanner.detect_and_recognize_gray(&gray).unwrap();
        assert_eq!(result.codes.len(), 1);
        assert_eq!(result.codes[0].payload, "fixed");
        assert!(result.codes[0].pathways.contains(Pathway::Direct));
    }

    #[test]
    fn test_batch_keeps_input_order() {
        let scanner = scanner(Box::new(Blind));
        let images = vec![
            DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 40, Luma([90]))),
            DynamicImage::ImageLuma8(GrayImage::new(0, 0)),
            DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 30, Luma([90]))),
        ];
        let results = scanner.scan_batch(&images);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(ScanError::EmptyImage)));
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_sort_for_recognition() {
        use crate::models::{BoundingBox, PathwaySet, Quad, RegionState};
        let region = |pathway, size: f32| {
            let bbox = BoundingBox {
                min_x: 0.0,
                min_y: 0.0,
                max_x: size,
                max_y: size,
            };
            ResolvedRegion {
                region: RefinedRegion {
                    quad: Quad::from_bbox(&bbox),
                    bbox,
                    pathways: PathwaySet::single(pathway),
                    crop: GrayImage::new(1, 1),
                    immediate: None,
                    located: true,
                    state: RegionState::Deduplicated,
                },
                merged: 1,
            }
        };
        let mut regions = vec![
            region(Pathway::Gradient, 90.0),
            region(Pathway::Edge, 20.0),
            region(Pathway::Edge, 40.0),
        ];
        sort_for_recognition(&mut regions);
        let areas: Vec<f32> = regions.iter().map(|r| r.region.area()).collect();
        assert_eq!(areas, [1600.0, 400.0, 8100.0]);
    }
}

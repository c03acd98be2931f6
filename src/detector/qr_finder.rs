//! QR localization from finder pattern triples.
//!
//! The image is tiled into overlapping windows, each binarized with its own
//! Otsu threshold so uneven lighting does not hide patterns. Patterns from
//! all windows are merged, grouped into plausible triples and each triple is
//! extrapolated to the symbol's outer corners.

use image::GrayImage;
use image::imageops::crop_imm;

use super::finder::{FinderPattern, FinderScanner, merge_patterns};
use crate::config::FinderConfig;
use crate::models::{Pathway, Point, RawCandidate};
use crate::preprocess::ImageVariant;
use crate::utils::binarization::otsu_binarize;

/// Finder triple ordered top-left, top-right, bottom-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderTriple {
    /// Corner finder
    pub top_left: Point,
    /// Finder along the first row
    pub top_right: Point,
    /// Finder along the first column
    pub bottom_left: Point,
    /// Module size implied by the finder spacing
    pub module_size: f32,
    /// Estimated modules per side
    pub dimension: usize,
}

impl FinderTriple {
    /// Outer corners of the symbol, top-left, top-right, bottom-right, bottom-left
    pub fn corners(&self) -> [Point; 4] {
        let span = (self.dimension as f32 - 7.0).max(1.0);
        let u = Point::new(
            (self.top_right.x - self.top_left.x) / span,
            (self.top_right.y - self.top_left.y) / span,
        );
        let v = Point::new(
            (self.bottom_left.x - self.top_left.x) / span,
            (self.bottom_left.y - self.top_left.y) / span,
        );
        let shift = |p: Point, su: f32, sv: f32| {
            Point::new(p.x + u.x * su + v.x * sv, p.y + u.y * su + v.y * sv)
        };
        let bottom_right = Point::new(
            self.top_right.x + self.bottom_left.x - self.top_left.x,
            self.top_right.y + self.bottom_left.y - self.top_left.y,
        );
        [
            shift(self.top_left, -3.5, -3.5),
            shift(self.top_right, 3.5, -3.5),
            shift(bottom_right, 3.5, 3.5),
            shift(self.bottom_left, -3.5, 3.5),
        ]
    }
}

/// Grid-searched finder pattern pathway
#[derive(Debug, Clone, Default)]
pub struct QrFinderDetector {
    config: FinderConfig,
}

impl QrFinderDetector {
    /// Detector with the given parameters
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Scan the original image plus a few same-scale grayscale variants
    pub fn detect(&self, gray: &GrayImage, variants: &[ImageVariant]) -> Vec<RawCandidate> {
        let mut patterns = self.scan_grid(gray);
        for variant in variants
            .iter()
            .filter(|v| !v.binarized && (v.scale - 1.0).abs() < f32::EPSILON)
            .filter(|v| v.descriptor != "gray")
            .take(self.config.extra_variants)
        {
            patterns.extend(self.scan_grid(&variant.image));
        }
        let patterns = merge_patterns(patterns);

        let triples = self.select_triples(&patterns);
        log::debug!(
            "qr finder: {} patterns, {} triples",
            patterns.len(),
            triples.len()
        );

        triples
            .iter()
            .filter_map(|t| {
                RawCandidate::from_scaled(
                    &t.corners(),
                    Pathway::QrFinder,
                    1.0,
                    gray.width(),
                    gray.height(),
                )
            })
            .collect()
    }

    /// Finder patterns from the whole image and from overlapping windows
    pub fn scan_grid(&self, gray: &GrayImage) -> Vec<FinderPattern> {
        let (w, h) = gray.dimensions();
        let tolerance = self.config.ratio_tolerance;
        let mut patterns = FinderScanner::scan(&otsu_binarize(gray), tolerance);

        let divisions = self.config.grid_divisions.max(1);
        let cell = (w.min(h) / divisions).max(self.config.min_cell).max(1);
        if cell >= w && cell >= h {
            return patterns;
        }
        let window = cell * 2;
        let mut y0 = 0;
        while y0 < h {
            let mut x0 = 0;
            while x0 < w {
                let ww = window.min(w - x0);
                let wh = window.min(h - y0);
                let tile = crop_imm(gray, x0, y0, ww, wh).to_image();
                patterns.extend(
                    FinderScanner::scan(&otsu_binarize(&tile), tolerance)
                        .into_iter()
                        .map(|p| p.translated(x0 as f32, y0 as f32)),
                );
                x0 += cell;
            }
            y0 += cell;
        }
        patterns
    }

    /// Best-scoring triples that share no pattern
    pub fn select_triples(&self, patterns: &[FinderPattern]) -> Vec<FinderTriple> {
        let mut groups = group_finder_patterns(patterns);
        groups.sort_by(|a, b| {
            group_score(patterns, a)
                .partial_cmp(&group_score(patterns, b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut used = vec![false; patterns.len()];
        let mut triples = Vec::new();
        for group in groups {
            if triples.len() >= self.config.max_groups {
                break;
            }
            if group.iter().any(|&i| used[i]) {
                continue;
            }
            if let Some(triple) =
                order_finder_patterns(&patterns[group[0]], &patterns[group[1]], &patterns[group[2]])
            {
                for &i in &group {
                    used[i] = true;
                }
                triples.push(triple);
            }
        }
        triples
    }
}

fn order_finder_patterns(
    a: &FinderPattern,
    b: &FinderPattern,
    c: &FinderPattern,
) -> Option<FinderTriple> {
    let patterns = [a, b, c];

    if patterns.iter().any(|p| p.module_size < 1.0) {
        return None;
    }

    // The corner finder sits at the right angle
    let mut best_idx = 0usize;
    let mut best_cos = f32::INFINITY;
    for i in 0..3 {
        let p = &patterns[i].center;
        let p1 = &patterns[(i + 1) % 3].center;
        let p2 = &patterns[(i + 2) % 3].center;

        let v1 = Point::new(p1.x - p.x, p1.y - p.y);
        let v2 = Point::new(p2.x - p.x, p2.y - p.y);
        let denom = p.distance(p1) * p.distance(p2);
        if denom == 0.0 {
            continue;
        }
        let cos = ((v1.x * v2.x + v1.y * v2.y) / denom).abs();
        if cos < best_cos {
            best_cos = cos;
            best_idx = i;
        }
    }

    let tl = patterns[best_idx];
    let p1 = patterns[(best_idx + 1) % 3];
    let p2 = patterns[(best_idx + 2) % 3];

    // Clockwise on screen: top-left -> top-right -> bottom-left
    let cross = tl.center.cross(&p1.center, &p2.center);
    let (tr, bl) = if cross > 0.0 { (p1, p2) } else { (p2, p1) };
    let avg_module = (tl.module_size + tr.module_size + bl.module_size) / 3.0;
    let d_tr = tl.center.distance(&tr.center);
    let d_bl = tl.center.distance(&bl.center);

    let dim1 = estimate_dimension_from_distance(d_tr, avg_module)?;
    let dim2 = estimate_dimension_from_distance(d_bl, avg_module)?;
    let dimension = if dim1 == dim2 {
        dim1
    } else if dim1.abs_diff(dim2) <= 4 {
        ((dim1 + dim2) / 2).max(21)
    } else {
        return None;
    };

    let module_size = (d_tr + d_bl) / 2.0 / (dimension as f32 - 7.0);
    let module_ratio = module_size / avg_module;
    if !(0.7..=1.3).contains(&module_ratio) {
        return None;
    }

    Some(FinderTriple {
        top_left: tl.center,
        top_right: tr.center,
        bottom_left: bl.center,
        module_size,
        dimension,
    })
}

fn estimate_dimension_from_distance(distance: f32, module_size: f32) -> Option<usize> {
    if module_size <= 0.0 {
        return None;
    }
    let raw_dim = distance / module_size + 7.0;
    if raw_dim < 19.0 {
        return None;
    }
    let version = ((raw_dim - 17.0) / 4.0).round().max(1.0) as i32;
    if !(1..=40).contains(&version) {
        return None;
    }
    Some(17 + 4 * version as usize)
}

/// Candidate triples from patterns of similar module size
fn group_finder_patterns(patterns: &[FinderPattern]) -> Vec<[usize; 3]> {
    if patterns.len() < 3 {
        return Vec::new();
    }

    let mut indexed: Vec<(usize, f32)> = patterns
        .iter()
        .enumerate()
        .map(|(i, p)| (i, p.module_size))
        .collect();
    indexed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut bins: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut bin_min = 0.0f32;
    let bin_ratio = 1.25f32;

    for (idx, size) in indexed {
        if current.is_empty() {
            current.push(idx);
            bin_min = size;
        } else if size <= bin_min * bin_ratio {
            current.push(idx);
        } else {
            bins.push(std::mem::take(&mut current));
            current.push(idx);
            bin_min = size;
        }
    }
    if !current.is_empty() {
        bins.push(current);
    }

    // Each bin together with its neighbour, to allow slight size mismatch
    let mut all_groups = Vec::new();
    for i in 0..bins.len() {
        let mut indices = bins[i].clone();
        if let Some(next) = bins.get(i + 1) {
            indices.extend_from_slice(next);
        }
        if indices.len() >= 3 {
            all_groups.extend(build_groups(patterns, &indices));
        }
    }
    all_groups.sort_unstable();
    all_groups.dedup();
    all_groups
}

fn build_groups(patterns: &[FinderPattern], indices: &[usize]) -> Vec<[usize; 3]> {
    let mut groups = Vec::new();

    for (a, &i) in indices.iter().enumerate() {
        for (b, &j) in indices.iter().enumerate().skip(a + 1) {
            for &k in indices.iter().skip(b + 1) {
                let (pi, pj, pk) = (&patterns[i], &patterns[j], &patterns[k]);

                let sizes = [pi.module_size, pj.module_size, pk.module_size];
                let min_size = sizes.iter().fold(f32::INFINITY, |a, &b| a.min(b));
                let max_size = sizes.iter().fold(0.0f32, |a, &b| a.max(b));
                if max_size / min_size > 2.0 {
                    continue;
                }

                let d_ij = pi.center.distance(&pj.center);
                let d_ik = pi.center.distance(&pk.center);
                let d_jk = pj.center.distance(&pk.center);
                let min_d = d_ij.min(d_ik).min(d_jk);
                let max_d = d_ij.max(d_ik).max(d_jk);

                let avg_module = (sizes[0] + sizes[1] + sizes[2]) / 3.0;
                if min_d < avg_module * 2.5 || max_d / min_d > 5.0 {
                    continue;
                }

                let (a2, b2, c2) = (d_ij * d_ij, d_ik * d_ik, d_jk * d_jk);
                let cos_i = (a2 + b2 - c2) / (2.0 * d_ij * d_ik);
                let cos_j = (a2 + c2 - b2) / (2.0 * d_ij * d_jk);
                let cos_k = (b2 + c2 - a2) / (2.0 * d_ik * d_jk);
                if cos_i.abs() < 0.4 || cos_j.abs() < 0.4 || cos_k.abs() < 0.4 {
                    let mut group = [i, j, k];
                    group.sort_unstable();
                    groups.push(group);
                }
            }
        }
    }

    groups
}

/// Lower is better: size consistency, leg balance and squareness
fn group_score(patterns: &[FinderPattern], group: &[usize; 3]) -> f32 {
    let [p0, p1, p2] = group.map(|i| &patterns[i]);

    let sizes = [p0.module_size, p1.module_size, p2.module_size];
    let min_size = sizes.iter().fold(f32::INFINITY, |a, &b| a.min(b));
    let max_size = sizes.iter().fold(0.0f32, |a, &b| a.max(b));
    let size_ratio = max_size / min_size;

    let d01 = p0.center.distance(&p1.center);
    let d02 = p0.center.distance(&p2.center);
    let d12 = p1.center.distance(&p2.center);
    let min_d = d01.min(d02).min(d12);
    let max_d = d01.max(d02).max(d12);
    // Two equal legs and a hypotenuse of sqrt(2)
    let distortion = (max_d / min_d - std::f32::consts::SQRT_2).abs();

    let (a2, b2, c2) = (d01 * d01, d02 * d02, d12 * d12);
    let cos_i = ((a2 + b2 - c2) / (2.0 * d01 * d02)).abs();
    let cos_j = ((a2 + c2 - b2) / (2.0 * d01 * d12)).abs();
    let cos_k = ((b2 + c2 - a2) / (2.0 * d02 * d12)).abs();
    let best_cos = cos_i.min(cos_j).min(cos_k);

    size_ratio * 2.0 + distortion + best_cos
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Three 7x7-module finders of a 21-module symbol, `unit` px per module,
    /// symbol top-left at `(x0, y0)`
    fn draw_symbol(img: &mut GrayImage, x0: u32, y0: u32, unit: u32) {
        for (fx, fy) in [(0, 0), (14, 0), (0, 14)] {
            for my in 0..7u32 {
                for mx in 0..7u32 {
                    let ring = mx == 0 || mx == 6 || my == 0 || my == 6;
                    let core = (2..=4).contains(&mx) && (2..=4).contains(&my);
                    if !(ring || core) {
                        continue;
                    }
                    for dy in 0..unit {
                        for dx in 0..unit {
                            img.put_pixel(
                                x0 + (fx + mx) * unit + dx,
                                y0 + (fy + my) * unit + dy,
                                Luma([0]),
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_triple_corners_cover_symbol() {
        let mut img = GrayImage::from_pixel(200, 200, Luma([255]));
        draw_symbol(&mut img, 40, 30, 5);
        let detector = QrFinderDetector::default();
        let candidates = detector.detect(&img, &[]);
        assert_eq!(candidates.len(), 1);

        let bbox = candidates[0].bbox();
        // Symbol spans 40..145 x 30..135
        assert!((bbox.min_x - 40.0).abs() < 4.0, "{bbox:?}");
        assert!((bbox.max_x - 145.0).abs() < 4.0, "{bbox:?}");
        assert!((bbox.min_y - 30.0).abs() < 4.0, "{bbox:?}");
        assert!((bbox.max_y - 135.0).abs() < 4.0, "{bbox:?}");
    }

    #[test]
    fn test_order_finder_patterns_assigns_roles() {
        let tl = FinderPattern::new(20.0, 20.0, 2.0);
        let tr = FinderPattern::new(48.0, 20.0, 2.0);
        let bl = FinderPattern::new(20.0, 48.0, 2.0);
        let triple = order_finder_patterns(&bl, &tl, &tr).unwrap();
        assert_eq!(triple.top_left, tl.center);
        assert_eq!(triple.top_right, tr.center);
        assert_eq!(triple.bottom_left, bl.center);
        assert_eq!(triple.dimension, 21);
    }

    #[test]
    fn test_blank_image_has_no_candidates() {
        let img = GrayImage::from_pixel(120, 90, Luma([128]));
        assert!(QrFinderDetector::default().detect(&img, &[]).is_empty());
    }

    #[test]
    fn test_grid_terminates_with_zero_min_cell() {
        let detector = QrFinderDetector::new(FinderConfig {
            min_cell: 0,
            grid_divisions: 8,
            ..FinderConfig::default()
        });
        let img = GrayImage::from_pixel(5, 4, Luma([200]));
        assert!(detector.scan_grid(&img).is_empty());
    }

    #[test]
    fn test_estimate_dimension() {
        assert_eq!(estimate_dimension_from_distance(14.0 * 3.0, 3.0), Some(21));
        assert_eq!(estimate_dimension_from_distance(18.0 * 3.0, 3.0), Some(25));
        assert_eq!(estimate_dimension_from_distance(3.0, 3.0), None);
    }
}

//! Quad fitting and perspective rectification of raw candidates.

use image::GrayImage;
use imageproc::geometry::{approximate_polygon_dp, arc_length, min_area_rect};
use imageproc::point::Point as IPoint;

use crate::config::RefineConfig;
use crate::models::{
    BitMatrix, PathwaySet, Point, Quad, RawCandidate, RefinedRegion, RegionState, polygon_area,
};
use crate::utils::geometry::PerspectiveTransform;
use crate::utils::morphology::close_square;
use crate::utils::transform::rectify;

/// Turns candidate outlines into ordered quads and rectified crops
#[derive(Debug, Clone, Default)]
pub struct SegmentationRefiner {
    config: RefineConfig,
}

impl SegmentationRefiner {
    /// Refiner with the given parameters
    pub fn new(config: RefineConfig) -> Self {
        Self { config }
    }

    /// Fit, pad, rectify and (for located-only candidates) trim to content.
    ///
    /// Returns `None` when no quad can be fitted or the crop would be smaller
    /// than `min_side` in either direction.
    pub fn refine(&self, candidate: RawCandidate, gray: &GrayImage) -> Option<RefinedRegion> {
        let (w, h) = gray.dimensions();
        let fitted = self.fit_quad(&candidate.polygon)?;
        let fast = candidate.immediate.is_some();

        let quad = if fast {
            fitted
        } else {
            fitted.expanded(self.config.padding).clamped(w, h)
        };
        let (quad, crop) = self.rectify_quad(gray, &quad)?;
        let (quad, crop) = if fast {
            (quad, crop)
        } else {
            self.trim_to_content(gray, &quad, crop)
        };

        let mut region = RefinedRegion {
            bbox: quad.bbox(),
            quad,
            pathways: PathwaySet::single(candidate.pathway),
            crop,
            immediate: candidate.immediate,
            located: candidate.located,
            state: candidate.state,
        };
        if !fast {
            region.transition(RegionState::Refined);
        }
        Some(region)
    }

    /// Best four-corner fit of an outline.
    ///
    /// Four-point outlines are used as-is. Longer outlines are simplified with
    /// Douglas-Peucker at each configured epsilon; the most rectangular
    /// four-vertex result wins, with the minimum-area rectangle as fallback.
    pub fn fit_quad(&self, polygon: &[Point]) -> Option<Quad> {
        if let [a, b, c, d] = polygon {
            let quad = Quad::from_unordered([*a, *b, *c, *d]);
            return (quad.area() > 0.0).then_some(quad);
        }
        if polygon.len() < 3 {
            return None;
        }

        let points: Vec<IPoint<i32>> = polygon.iter().map(|&p| p.into()).collect();
        let perimeter = arc_length(&points, true);

        let mut best: Option<(f32, Quad)> = None;
        for &eps in &self.config.approx_epsilons {
            let mut approx = approximate_polygon_dp(&points, eps * perimeter, true);
            if approx.len() == 5 && approx.first() == approx.last() {
                approx.pop();
            }
            if approx.len() != 4 {
                continue;
            }
            let corners = [0, 1, 2, 3].map(|i| Point::from(approx[i]));
            let quad = Quad::from_unordered(corners);
            let score = rectangularity(&quad);
            if best.as_ref().is_none_or(|(s, _)| score > *s) {
                best = Some((score, quad));
            }
        }

        match best {
            Some((_, quad)) if quad.area() > 0.0 => Some(quad),
            _ => {
                let rect = min_area_rect(&points).map(Point::from);
                let quad = Quad::from_unordered(rect);
                (quad.area() > 0.0).then_some(quad)
            }
        }
    }

    fn rectify_quad(&self, gray: &GrayImage, quad: &Quad) -> Option<(Quad, GrayImage)> {
        let width = quad.width().round() as u32;
        let height = quad.height().round() as u32;
        if width < self.config.min_side || height < self.config.min_side {
            return None;
        }
        let crop = rectify(gray, quad, width, height)?;
        Some((*quad, crop))
    }

    /// Shrink a padded crop onto its dark content.
    ///
    /// The trimmed rectangle is mapped back through the crop's perspective so
    /// the quad stays in original coordinates. Trims removing too little or
    /// too much are rejected and the padded crop is kept.
    fn trim_to_content(&self, gray: &GrayImage, quad: &Quad, crop: GrayImage) -> (Quad, GrayImage) {
        let cfg = &self.config;
        let dark = BitMatrix::from_gray_below(&crop, cfg.content_threshold).to_mask();
        let content = BitMatrix::from_mask(&close_square(&dark, 2));
        if content.count_ones() < cfg.min_content_pixels {
            return (*quad, crop);
        }
        let Some((x0, y0, x1, y1)) = content.ones_bounds() else {
            return (*quad, crop);
        };
        let (cw, ch) = (crop.width() as f32, crop.height() as f32);
        let pad_x = (cw * cfg.padding).max(3.0);
        let pad_y = (ch * cfg.padding).max(3.0);
        let left = (x0 as f32 - pad_x).max(0.0);
        let top = (y0 as f32 - pad_y).max(0.0);
        let right = (x1 as f32 + pad_x).min(cw - 1.0);
        let bottom = (y1 as f32 + pad_y).min(ch - 1.0);

        let ratio = ((right - left + 1.0) * (bottom - top + 1.0)) / (cw * ch);
        let (lo, hi) = cfg.accept_band;
        if !(lo..=hi).contains(&ratio) {
            return (*quad, crop);
        }

        let Some(to_image) = PerspectiveTransform::from_rect_to_quad(cw, ch, &quad.corners) else {
            return (*quad, crop);
        };
        let trimmed = Quad {
            corners: [
                Point::new(left, top),
                Point::new(right, top),
                Point::new(right, bottom),
                Point::new(left, bottom),
            ]
            .map(|p| to_image.transform(&p)),
        };
        match self.rectify_quad(gray, &trimmed) {
            Some(result) => result,
            None => (*quad, crop),
        }
    }
}

/// Quad area over the product of its longest edges; 1.0 for a rectangle
fn rectangularity(quad: &Quad) -> f32 {
    let enclosing = quad.width() * quad.height();
    if enclosing <= 0.0 {
        0.0
    } else {
        polygon_area(&quad.corners) / enclosing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Pathway;
    use image::Luma;

    fn scene() -> GrayImage {
        // Dark 80x40 block on white
        GrayImage::from_fn(200, 150, |x, y| {
            if (60..140).contains(&x) && (50..90).contains(&y) {
                Luma([20])
            } else {
                Luma([240])
            }
        })
    }

    fn outline(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<Point> {
        // Dense border so the fit has to simplify
        let mut pts = Vec::new();
        let steps = 20;
        for i in 0..steps {
            pts.push(Point::new(x0 + (x1 - x0) * i as f32 / steps as f32, y0));
        }
        for i in 0..steps {
            pts.push(Point::new(x1, y0 + (y1 - y0) * i as f32 / steps as f32));
        }
        for i in 0..steps {
            pts.push(Point::new(x1 - (x1 - x0) * i as f32 / steps as f32, y1));
        }
        for i in 0..steps {
            pts.push(Point::new(x0, y1 - (y1 - y0) * i as f32 / steps as f32));
        }
        pts
    }

    #[test]
    fn test_fit_quad_simplifies_dense_outline() {
        let quad = SegmentationRefiner::default()
            .fit_quad(&outline(10.0, 10.0, 90.0, 50.0))
            .unwrap();
        assert_eq!(quad.top_left(), Point::new(10.0, 10.0));
        assert_eq!(quad.corners[2], Point::new(90.0, 50.0));
    }

    #[test]
    fn test_fit_quad_rejects_degenerate() {
        let refiner = SegmentationRefiner::default();
        assert!(refiner.fit_quad(&[Point::new(1.0, 1.0), Point::new(5.0, 5.0)]).is_none());
        let line = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(3.0, 0.0),
        ];
        assert!(refiner.fit_quad(&line).is_none());
    }

    #[test]
    fn test_refine_trims_loose_candidate_to_content() {
        let gray = scene();
        let candidate =
            RawCandidate::from_scaled(&outline(45.0, 35.0, 155.0, 105.0), Pathway::Edge, 1.0, 200, 150)
                .unwrap();
        let region = SegmentationRefiner::default().refine(candidate, &gray).unwrap();
        assert_eq!(region.state, RegionState::Refined);
        let bbox = region.bbox;
        assert!(bbox.min_x > 45.0 && bbox.min_x < 60.0, "{bbox:?}");
        assert!(bbox.max_x > 139.0 && bbox.max_x < 155.0, "{bbox:?}");
        assert!(bbox.min_y > 35.0 && bbox.min_y < 50.0, "{bbox:?}");
    }

    #[test]
    fn test_refine_rejects_tiny() {
        let gray = scene();
        let candidate =
            RawCandidate::from_scaled(&outline(5.0, 5.0, 11.0, 9.0), Pathway::Gradient, 1.0, 200, 150)
                .unwrap();
        assert!(SegmentationRefiner::default().refine(candidate, &gray).is_none());
    }
}

use serde::{Deserialize, Serialize};

use super::Point;
use crate::utils::geometry::order_corners;

/// Axis-aligned bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub min_x: f32,
    /// Top edge
    pub min_y: f32,
    /// Right edge
    pub max_x: f32,
    /// Bottom edge
    pub max_y: f32,
}

impl BoundingBox {
    /// Tight box around a point set
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = Self {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in &points[1..] {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        Some(bbox)
    }

    /// Box width
    pub fn width(&self) -> f32 {
        (self.max_x - self.min_x).max(0.0)
    }

    /// Box height
    pub fn height(&self) -> f32 {
        (self.max_y - self.min_y).max(0.0)
    }

    /// Box area
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Box center
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Area shared with `other`
    pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
        let w = self.max_x.min(other.max_x) - self.min_x.max(other.min_x);
        let h = self.max_y.min(other.max_y) - self.min_y.max(other.min_y);
        if w <= 0.0 || h <= 0.0 { 0.0 } else { w * h }
    }

    /// Intersection over union, 0.0 for degenerate boxes
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }
}

/// Quadrilateral ordered top-left, top-right, bottom-right, bottom-left
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    /// Corners in canonical order
    pub corners: [Point; 4],
}

impl Quad {
    /// Build a quad from corners in any order
    pub fn from_unordered(points: [Point; 4]) -> Self {
        Self {
            corners: order_corners(points),
        }
    }

    /// Axis-aligned rectangle quad
    pub fn from_bbox(bbox: &BoundingBox) -> Self {
        Self {
            corners: [
                Point::new(bbox.min_x, bbox.min_y),
                Point::new(bbox.max_x, bbox.min_y),
                Point::new(bbox.max_x, bbox.max_y),
                Point::new(bbox.min_x, bbox.max_y),
            ],
        }
    }

    /// Top-left corner
    pub fn top_left(&self) -> Point {
        self.corners[0]
    }

    /// Enclosed area
    pub fn area(&self) -> f32 {
        polygon_area(&self.corners)
    }

    /// Mean of the corners
    pub fn centroid(&self) -> Point {
        Point::centroid(&self.corners).unwrap_or_default()
    }

    /// Axis-aligned bounds
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::from_points(&self.corners).unwrap_or_default()
    }

    /// Longer of the top and bottom edges
    pub fn width(&self) -> f32 {
        let [tl, tr, br, bl] = self.corners;
        tl.distance(&tr).max(bl.distance(&br))
    }

    /// Longer of the left and right edges
    pub fn height(&self) -> f32 {
        let [tl, tr, br, bl] = self.corners;
        tl.distance(&bl).max(tr.distance(&br))
    }

    /// Long side over short side, `f32::INFINITY` for a collapsed quad
    pub fn elongation(&self) -> f32 {
        let (w, h) = (self.width(), self.height());
        let short = w.min(h);
        if short <= f32::EPSILON {
            f32::INFINITY
        } else {
            w.max(h) / short
        }
    }

    /// Grow about the centroid so each side gains `fraction` of its length on both ends
    pub fn expanded(&self, fraction: f32) -> Self {
        let c = self.centroid();
        let factor = 1.0 + 2.0 * fraction;
        let corners = self
            .corners
            .map(|p| Point::new(c.x + (p.x - c.x) * factor, c.y + (p.y - c.y) * factor));
        Self { corners }
    }

    /// Clamp every corner into a `width x height` image
    pub fn clamped(&self, width: u32, height: u32) -> Self {
        let max_x = width.saturating_sub(1) as f32;
        let max_y = height.saturating_sub(1) as f32;
        Self {
            corners: self.corners.map(|p| p.clamp(max_x, max_y)),
        }
    }
}

/// Absolute polygon area by the shoelace formula
pub fn polygon_area(points: &[Point]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0f32;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        twice += a.x * b.y - b.x * a.y;
    }
    twice.abs() / 2.0
}

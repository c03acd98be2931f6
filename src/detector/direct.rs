use image::GrayImage;
use imageproc::filter::bilateral_filter;
use imageproc::geometry::min_area_rect;

use crate::decode::SymbolDecoder;
use crate::models::{BoundingBox, Pathway, Point, Quad, RawCandidate};
use crate::preprocess::clahe;
use crate::utils::binarization::threshold_binarize;

/// Whole-image decoding; success yields a located region with its payload
pub struct DirectDetector<'a> {
    decoder: &'a dyn SymbolDecoder,
}

impl<'a> DirectDetector<'a> {
    /// Detector that reads with `decoder`
    pub fn new(decoder: &'a dyn SymbolDecoder) -> Self {
        Self { decoder }
    }

    /// Try the preprocessing ladder until one rung reads a symbol
    pub fn detect(&self, gray: &GrayImage) -> Vec<RawCandidate> {
        let (w, h) = gray.dimensions();
        let enhanced = bilateral_filter(&clahe(gray, 8, 8, 2.0), 3, 30.0, 30.0);

        let ladder: [(&str, Box<dyn Fn() -> GrayImage + '_>); 5] = [
            ("clahe+bilateral", Box::new(|| enhanced.clone())),
            ("gray", Box::new(|| gray.clone())),
            ("threshold127", Box::new(|| threshold_binarize(&enhanced, 127).to_print())),
            ("threshold100", Box::new(|| threshold_binarize(&enhanced, 100).to_print())),
            ("threshold150", Box::new(|| threshold_binarize(&enhanced, 150).to_print())),
        ];

        for (name, build) in ladder {
            let image = build();
            match self.decoder.decode(&image) {
                Ok(Some(read)) => {
                    log::debug!(
                        "direct: {} read {} via {name}",
                        self.decoder.name(),
                        read.code_type
                    );
                    let located = locate(&read.points, w, h);
                    let quad = located.unwrap_or_else(|| frame(w, h));
                    return RawCandidate::from_scaled(&quad.corners, Pathway::Direct, 1.0, w, h)
                        .map(|c| {
                            let c = c.with_read(read);
                            if located.is_some() { c } else { c.unlocated() }
                        })
                        .into_iter()
                        .collect();
                }
                Ok(None) => log::trace!("direct: nothing via {name}"),
                Err(e) => log::warn!("direct: {} rejected {name}: {e}", self.decoder.name()),
            }
        }
        Vec::new()
    }
}

fn frame(width: u32, height: u32) -> Quad {
    Quad::from_bbox(&BoundingBox {
        min_x: 0.0,
        min_y: 0.0,
        max_x: width.saturating_sub(1) as f32,
        max_y: height.saturating_sub(1) as f32,
    })
}

/// Quad around the location a decoder reported.
///
/// Two points are the ends of a scan line and grow into a band, three are
/// finder centres completed into a parallelogram, four or more are enclosed
/// by their minimum-area rectangle. Anything else has no location.
pub fn locate(points: &[Point], width: u32, height: u32) -> Option<Quad> {
    let quad = match points {
        [a, b] => band_around(a, b),
        [a, b, c] => parallelogram(a, b, c),
        pts if pts.len() >= 4 => {
            let ipts: Vec<imageproc::point::Point<i32>> = pts.iter().map(|&p| p.into()).collect();
            let rect = min_area_rect(&ipts).map(Point::from);
            let quad = Quad::from_unordered(rect);
            if quad.area() < 1.0 {
                None
            } else {
                Some(quad.expanded(0.1))
            }
        }
        _ => None,
    };

    quad.map(|q| q.clamped(width, height))
}

fn band_around(a: &Point, b: &Point) -> Option<Quad> {
    let length = a.distance(b);
    if length < 1.0 {
        return None;
    }
    let dir = Point::new((b.x - a.x) / length, (b.y - a.y) / length);
    let normal = Point::new(-dir.y, dir.x);
    let half = (length * 0.25).max(8.0);
    let ext = length * 0.05;
    let start = Point::new(a.x - dir.x * ext, a.y - dir.y * ext);
    let end = Point::new(b.x + dir.x * ext, b.y + dir.y * ext);
    Some(Quad::from_unordered([
        start.translate(-normal.x * half, -normal.y * half),
        end.translate(-normal.x * half, -normal.y * half),
        end.translate(normal.x * half, normal.y * half),
        start.translate(normal.x * half, normal.y * half),
    ]))
}

fn parallelogram(a: &Point, b: &Point, c: &Point) -> Option<Quad> {
    let pts = [*a, *b, *c];
    // Corner with the squarest angle sits between the other two
    let corner = (0..3).min_by(|&i, &j| {
        corner_cos(&pts, i)
            .partial_cmp(&corner_cos(&pts, j))
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;
    let p = pts[corner];
    let q = pts[(corner + 1) % 3];
    let r = pts[(corner + 2) % 3];
    let fourth = Point::new(q.x + r.x - p.x, q.y + r.y - p.y);
    let quad = Quad::from_unordered([p, q, fourth, r]);
    if quad.area() < 1.0 {
        return None;
    }
    // Finder centres sit about 3.5 modules inside a 21-module symbol
    Some(quad.expanded(0.25))
}

fn corner_cos(pts: &[Point; 3], i: usize) -> f32 {
    let p = pts[i];
    let q = pts[(i + 1) % 3];
    let r = pts[(i + 2) % 3];
    let denom = p.distance(&q) * p.distance(&r);
    if denom == 0.0 {
        return f32::INFINITY;
    }
    (((q.x - p.x) * (r.x - p.x) + (q.y - p.y) * (r.y - p.y)) / denom).abs()
}

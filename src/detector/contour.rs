use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometry::min_area_rect;
use imageproc::point::Point as IPoint;

use crate::config::ShapeFilter;
use crate::models::{Pathway, Point, RawCandidate, polygon_area};

/// Outer contours of a 0/255 mask that look like symbol blobs.
///
/// `mask` is in the coordinates of a variant resampled by `scale`; accepted
/// outlines are mapped back into the `width x height` original.
pub fn contour_candidates(
    mask: &GrayImage,
    filter: &ShapeFilter,
    pathway: Pathway,
    scale: f32,
    width: u32,
    height: u32,
) -> Vec<RawCandidate> {
    let mask_area = mask.width() as f32 * mask.height() as f32;
    let min_area = filter.min_area * scale * scale;
    let max_area = filter.max_image_fraction * mask_area;

    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|contour| {
            if contour.points.len() < 4 {
                return None;
            }
            let outline: Vec<Point> = contour.points.iter().map(|&p| Point::from(p)).collect();
            let area = polygon_area(&outline);
            if area < min_area || area > max_area {
                return None;
            }
            if !accept_shape(&contour.points, area, filter) {
                return None;
            }
            RawCandidate::from_scaled(&outline, pathway, scale, width, height)
        })
        .collect()
}

/// Aspect and fill checks against the minimum-area rectangle
fn accept_shape(points: &[IPoint<i32>], area: f32, filter: &ShapeFilter) -> bool {
    let rect = min_area_rect(points);
    let side_a = Point::from(rect[0]).distance(&Point::from(rect[1]));
    let side_b = Point::from(rect[1]).distance(&Point::from(rect[2]));
    let (long, short) = (side_a.max(side_b), side_a.min(side_b));
    if short < 1.0 {
        return false;
    }
    // The rectangle has no preferred side, so the range bounds elongation either way
    let (min_aspect, max_aspect) = filter.aspect_range;
    let elongation_limit = max_aspect.min(1.0 / min_aspect.max(f32::EPSILON));
    if long / short > elongation_limit {
        return false;
    }
    area / (long * short) >= filter.min_fill
}

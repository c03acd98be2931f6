//! Crop-level pixel transforms: rotation, padding and rectification.

use image::{GrayImage, Luma, imageops};
use imageproc::geometric_transformations::{Interpolation, Projection, rotate_about_center, warp_into};

use crate::models::Quad;

/// Paper-white fill for pixels outside the source
pub const BACKGROUND: Luma<u8> = Luma([255]);

/// Surround `img` with a `border`-pixel frame of `fill`
pub fn pad(img: &GrayImage, border: u32, fill: Luma<u8>) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = GrayImage::from_pixel(w + 2 * border, h + 2 * border, fill);
    imageops::overlay(&mut out, img, border as i64, border as i64);
    out
}

/// Rotate by `degrees` (clockwise on screen) without cutting corners off.
///
/// Multiples of 90 degrees are exact pixel shuffles; other angles expand the
/// canvas to the rotated diagonal and fill the new area with white.
pub fn rotate_expanded(img: &GrayImage, degrees: f32) -> GrayImage {
    let normalized = degrees.rem_euclid(360.0);
    if normalized.abs() < 1e-3 || (normalized - 360.0).abs() < 1e-3 {
        return img.clone();
    }
    if (normalized - 90.0).abs() < 1e-3 {
        return imageops::rotate90(img);
    }
    if (normalized - 180.0).abs() < 1e-3 {
        return imageops::rotate180(img);
    }
    if (normalized - 270.0).abs() < 1e-3 {
        return imageops::rotate270(img);
    }

    let (w, h) = img.dimensions();
    let diagonal = ((w * w + h * h) as f32).sqrt().ceil() as u32;
    let border = (diagonal.saturating_sub(w.min(h)) / 2) + 1;
    let canvas = pad(img, border, BACKGROUND);
    rotate_about_center(
        &canvas,
        normalized.to_radians(),
        Interpolation::Bilinear,
        BACKGROUND,
    )
}

/// Warp the inside of `quad` onto an axis-aligned `width x height` crop
pub fn rectify(gray: &GrayImage, quad: &Quad, width: u32, height: u32) -> Option<GrayImage> {
    if width == 0 || height == 0 {
        return None;
    }
    let from = quad.corners.map(|p| (p.x, p.y));
    let (w, h) = ((width - 1) as f32, (height - 1) as f32);
    let to = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
    let projection = Projection::from_control_points(from, to)?;
    let mut out = GrayImage::new(width, height);
    warp_into(gray, &projection, Interpolation::Bilinear, BACKGROUND, &mut out);
    Some(out)
}

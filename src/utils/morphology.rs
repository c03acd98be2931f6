//! Line-shaped morphology on 0/255 masks.
//!
//! Square elements go through `imageproc::morphology`; elongated ones are
//! done here as separable running max/min passes.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;

/// Orientation of a line structuring element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAxis {
    /// Element spans columns
    Horizontal,
    /// Element spans rows
    Vertical,
}

fn line_filter(mask: &GrayImage, length: u32, axis: LineAxis, take_max: bool) -> GrayImage {
    let (w, h) = mask.dimensions();
    let radius = (length / 2) as i64;
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut acc = if take_max { 0u8 } else { 255u8 };
            for d in -radius..=radius {
                let (sx, sy) = match axis {
                    LineAxis::Horizontal => (x as i64 + d, y as i64),
                    LineAxis::Vertical => (x as i64, y as i64 + d),
                };
                if sx < 0 || sy < 0 || sx >= w as i64 || sy >= h as i64 {
                    continue;
                }
                let v = mask.get_pixel(sx as u32, sy as u32)[0];
                acc = if take_max { acc.max(v) } else { acc.min(v) };
            }
            out.put_pixel(x, y, Luma([acc]));
        }
    }
    out
}

/// Dilate then erode with a `length`-pixel line
pub fn close_line(mask: &GrayImage, length: u32, axis: LineAxis) -> GrayImage {
    if length < 2 {
        return mask.clone();
    }
    let dilated = line_filter(mask, length, axis, true);
    line_filter(&dilated, length, axis, false)
}

/// Closing with a square of side `size`
pub fn close_square(mask: &GrayImage, size: u32) -> GrayImage {
    let k = (size / 2).clamp(1, u8::MAX as u32) as u8;
    imageproc::morphology::close(mask, Norm::LInf, k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_line_bridges_gaps_along_axis_only() {
        // Two vertical bars separated by a 3 pixel gap
        let mut mask = GrayImage::new(20, 20);
        for y in 5..15 {
            for x in [5, 6, 10, 11] {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let closed = close_line(&mask, 7, LineAxis::Horizontal);
        assert_eq!(closed.get_pixel(8, 10)[0], 255);
        assert_eq!(closed.get_pixel(8, 2)[0], 0);

        let vertical = close_line(&mask, 7, LineAxis::Vertical);
        assert_eq!(vertical.get_pixel(8, 10)[0], 0);
    }

    #[test]
    fn test_close_square_fills_hole() {
        let mut mask = GrayImage::from_pixel(12, 12, Luma([255]));
        mask.put_pixel(6, 6, Luma([0]));
        let closed = close_square(&mask, 3);
        assert_eq!(closed.get_pixel(6, 6)[0], 255);
    }
}

use image::{GrayImage, Luma};

use crate::models::BitMatrix;

/// Convert grayscale image to binary using Otsu's thresholding method
/// Returns a BitMatrix where true = black, false = white
pub fn otsu_binarize(gray: &GrayImage) -> BitMatrix {
    BitMatrix::from_gray_below(gray, otsu_threshold(gray.as_raw()))
}

/// Otsu's optimal threshold; pixels strictly below it form the dark class
pub fn otsu_threshold(gray: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &pixel in gray {
        histogram[pixel as usize] += 1;
    }

    let total = gray.len() as f64;
    let total_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut below_count = 0.0f64;
    let mut below_sum = 0.0f64;
    let mut max_variance = 0.0;
    let mut optimal_threshold = 128u8;

    // Threshold t splits [0, t) from [t, 255]
    for t in 1..=255usize {
        below_count += histogram[t - 1] as f64;
        below_sum += (t - 1) as f64 * histogram[t - 1] as f64;
        let above_count = total - below_count;
        if below_count == 0.0 || above_count == 0.0 {
            continue;
        }

        let mean_below = below_sum / below_count;
        let mean_above = (total_sum - below_sum) / above_count;
        let variance = (below_count / total) * (above_count / total) * (mean_below - mean_above).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = t as u8;
        }
    }

    optimal_threshold
}

/// Simple global threshold binarization
pub fn threshold_binarize(gray: &GrayImage, threshold: u8) -> BitMatrix {
    BitMatrix::from_gray_below(gray, threshold)
}

/// Adaptive mean thresholding.
///
/// A pixel is dark when it is more than `c` below the mean of the
/// `block x block` window around it. Window sums come from an integral image,
/// so the cost does not depend on `block`.
pub fn adaptive_binarize(gray: &GrayImage, block: u32, c: i32) -> BitMatrix {
    let width = gray.width() as usize;
    let height = gray.height() as usize;
    let mut binary = BitMatrix::new(width, height);
    if width == 0 || height == 0 {
        return binary;
    }

    let integral = integral_image(gray);
    let stride = width + 1;
    let radius = (block.max(3) / 2) as usize;

    for y in 0..height {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius + 1).min(height);
        for x in 0..width {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius + 1).min(width);
            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let area = ((y1 - y0) * (x1 - x0)) as i64;
            let value = gray.get_pixel(x as u32, y as u32)[0] as i64;
            binary.set(x, y, value * area < sum - c as i64 * area);
        }
    }

    binary
}

/// Summed-area table with one row and column of leading zeros
pub fn integral_image(gray: &GrayImage) -> Vec<i64> {
    let width = gray.width() as usize;
    let height = gray.height() as usize;
    let stride = width + 1;
    let mut integral = vec![0i64; stride * (height + 1)];
    for y in 0..height {
        let mut row_sum = 0i64;
        for x in 0..width {
            row_sum += gray.get_pixel(x as u32, y as u32)[0] as i64;
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }
    integral
}

/// Swap dark and light
pub fn invert(gray: &GrayImage) -> GrayImage {
    let mut out = gray.clone();
    for p in out.pixels_mut() {
        *p = Luma([255 - p[0]]);
    }
    out
}

use image::{GrayImage, Luma};

/// Replace saturated pixels with the mean of the unsaturated pixels in the
/// surrounding `(2 * radius + 1)` square.
///
/// Pixels with no unsaturated neighbour keep their value.
pub fn deglare(gray: &GrayImage, brightness: u8, radius: u32) -> GrayImage {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    let stride = w + 1;
    let mut sums = vec![0u64; stride * (h + 1)];
    let mut counts = vec![0u32; stride * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        let mut row_count = 0u32;
        for x in 0..w {
            let v = gray.get_pixel(x as u32, y as u32)[0];
            if v < brightness {
                row_sum += v as u64;
                row_count += 1;
            }
            sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row_sum;
            counts[(y + 1) * stride + x + 1] = counts[y * stride + x + 1] + row_count;
        }
    }

    let r = radius as usize;
    let mut out = gray.clone();
    for y in 0..h {
        let y0 = y.saturating_sub(r);
        let y1 = (y + r + 1).min(h);
        for x in 0..w {
            if gray.get_pixel(x as u32, y as u32)[0] < brightness {
                continue;
            }
            let x0 = x.saturating_sub(r);
            let x1 = (x + r + 1).min(w);
            let count = counts[y1 * stride + x1] + counts[y0 * stride + x0]
                - counts[y0 * stride + x1]
                - counts[y1 * stride + x0];
            if count == 0 {
                continue;
            }
            let sum = sums[y1 * stride + x1] + sums[y0 * stride + x0]
                - sums[y0 * stride + x1]
                - sums[y1 * stride + x0];
            out.put_pixel(x as u32, y as u32, Luma([(sum / count as u64) as u8]));
        }
    }
    out
}

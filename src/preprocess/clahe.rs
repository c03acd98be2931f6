//! Contrast limited adaptive histogram equalization.

use image::GrayImage;

/// Equalize each tile of a `tiles_x x tiles_y` grid with its histogram
/// clipped at `clip_limit` times the mean bin height, blending the four
/// nearest tile mappings bilinearly.
///
/// Images smaller than the grid are returned unchanged.
pub fn clahe(gray: &GrayImage, tiles_x: u32, tiles_y: u32, clip_limit: f32) -> GrayImage {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    let (tx_n, ty_n) = (tiles_x as usize, tiles_y as usize);
    if tx_n == 0 || ty_n == 0 || w < tx_n || h < ty_n {
        return gray.clone();
    }
    let tile_w = w / tx_n;
    let tile_h = h / ty_n;
    let src = gray.as_raw();

    let mut maps = vec![[0u8; 256]; tx_n * ty_n];
    for ty in 0..ty_n {
        for tx in 0..tx_n {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = if tx == tx_n - 1 { w } else { x0 + tile_w };
            let y1 = if ty == ty_n - 1 { h } else { y0 + tile_h };

            let mut hist = [0u32; 256];
            for row in y0..y1 {
                for &v in &src[row * w + x0..row * w + x1] {
                    hist[v as usize] += 1;
                }
            }
            maps[ty * tx_n + tx] = tile_mapping(&mut hist, (x1 - x0) * (y1 - y0), clip_limit);
        }
    }

    let mut out = vec![0u8; w * h];
    for y in 0..h {
        let fy = ((y as f32 + 0.5) / tile_h as f32 - 0.5).clamp(0.0, (ty_n - 1) as f32);
        let ty0 = fy.floor() as usize;
        let ty1 = (ty0 + 1).min(ty_n - 1);
        let wy = fy - ty0 as f32;
        for x in 0..w {
            let fx = ((x as f32 + 0.5) / tile_w as f32 - 0.5).clamp(0.0, (tx_n - 1) as f32);
            let tx0 = fx.floor() as usize;
            let tx1 = (tx0 + 1).min(tx_n - 1);
            let wx = fx - tx0 as f32;

            let v = src[y * w + x] as usize;
            let top = maps[ty0 * tx_n + tx0][v] as f32 * (1.0 - wx) + maps[ty0 * tx_n + tx1][v] as f32 * wx;
            let bottom = maps[ty1 * tx_n + tx0][v] as f32 * (1.0 - wx) + maps[ty1 * tx_n + tx1][v] as f32 * wx;
            out[y * w + x] = (top * (1.0 - wy) + bottom * wy).round().clamp(0.0, 255.0) as u8;
        }
    }

    GrayImage::from_raw(gray.width(), gray.height(), out).unwrap_or_else(|| gray.clone())
}

fn identity() -> [u8; 256] {
    let mut map = [0u8; 256];
    for (i, slot) in map.iter_mut().enumerate() {
        *slot = i as u8;
    }
    map
}

fn tile_mapping(hist: &mut [u32; 256], pixels: usize, clip_limit: f32) -> [u8; 256] {
    // A flat tile has no contrast to redistribute
    if hist.iter().filter(|&&count| count > 0).count() <= 1 {
        return identity();
    }
    let clip = ((clip_limit * pixels as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let per_bin = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, bin) in hist.iter_mut().enumerate() {
        *bin += per_bin + u32::from(i < remainder);
    }

    let mut cdf = [0u32; 256];
    let mut running = 0u32;
    for (slot, &count) in cdf.iter_mut().zip(hist.iter()) {
        running += count;
        *slot = running;
    }
    let cdf_min = cdf.iter().copied().find(|&v| v > 0).unwrap_or(0);
    let denom = cdf[255].saturating_sub(cdf_min);

    if denom == 0 {
        return identity();
    }
    let mut map = [0u8; 256];
    for (slot, &c) in map.iter_mut().zip(cdf.iter()) {
        *slot = ((c.saturating_sub(cdf_min) as f32 / denom as f32) * 255.0).min(255.0) as u8;
    }
    map
}

//! Interleaved 8-bit buffer to luminance conversion.
//!
//! Y = 0.299*R + 0.587*G + 0.114*B, evaluated as
//! `(76*R + 150*G + 29*B) >> 8` in integer arithmetic.

use image::GrayImage;
use rayon::prelude::*;

use crate::error::ScanError;

const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

/// Below this many pixels rows are converted on the calling thread
const PARALLEL_MIN_PIXELS: usize = 1 << 18;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8).min(255) as u8
}

/// Convert a 1, 3 or 4 channel buffer (alpha ignored) to a gray image
pub fn to_luma(data: &[u8], width: u32, height: u32, channels: u8) -> Result<GrayImage, ScanError> {
    if width == 0 || height == 0 {
        return Err(ScanError::EmptyImage);
    }
    if !matches!(channels, 1 | 3 | 4) {
        return Err(ScanError::UnsupportedChannels(channels));
    }
    let pixel_count = width as usize * height as usize;
    let expected = pixel_count * channels as usize;
    if data.len() != expected {
        return Err(ScanError::BufferSizeMismatch {
            expected,
            actual: data.len(),
        });
    }

    let gray = if channels == 1 {
        data.to_vec()
    } else {
        let stride = channels as usize;
        let row_in = width as usize * stride;
        let mut gray = vec![0u8; pixel_count];
        let convert_row = |(out, src): (&mut [u8], &[u8])| {
            for (dst, px) in out.iter_mut().zip(src.chunks_exact(stride)) {
                *dst = luma(px[0], px[1], px[2]);
            }
        };
        if pixel_count >= PARALLEL_MIN_PIXELS {
            gray.par_chunks_mut(width as usize)
                .zip(data.par_chunks(row_in))
                .for_each(convert_row);
        } else {
            gray.chunks_mut(width as usize)
                .zip(data.chunks(row_in))
                .for_each(convert_row);
        }
        gray
    };

    GrayImage::from_raw(width, height, gray).ok_or(ScanError::BufferSizeMismatch {
        expected: pixel_count,
        actual: 0,
    })
}

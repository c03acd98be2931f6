//! Enhancement variants tried on each rotated crop.

use image::{GrayImage, Luma};
use imageproc::filter::filter3x3;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use crate::preprocess::clahe;
use crate::utils::binarization::{adaptive_binarize, invert, otsu_binarize, threshold_binarize};
use crate::utils::transform::{BACKGROUND, pad};

const SHARPEN: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

/// One pixel transform applied before a decode attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enhancement {
    /// Unchanged crop
    Raw,
    /// CLAHE with clip 2.5 on a 6x6 grid
    Clahe,
    /// Otsu threshold
    Otsu,
    /// Otsu threshold, inverted polarity
    OtsuInverted,
    /// Adaptive mean threshold, 9 pixel block
    Adaptive,
    /// 3x3 unsharp kernel
    Sharpen,
    /// Fixed threshold
    Global(u8),
    /// Fixed threshold, inverted polarity
    GlobalInverted(u8),
    /// Sobel magnitude, dark edges on white
    Sobel,
    /// Another enhancement with a white border added
    Bordered(&'static Enhancement),
}

const BASE: [Enhancement; 13] = [
    Enhancement::Raw,
    Enhancement::Clahe,
    Enhancement::Otsu,
    Enhancement::OtsuInverted,
    Enhancement::Adaptive,
    Enhancement::Sharpen,
    Enhancement::Global(80),
    Enhancement::Global(120),
    Enhancement::Global(160),
    Enhancement::GlobalInverted(80),
    Enhancement::GlobalInverted(120),
    Enhancement::GlobalInverted(160),
    Enhancement::Sobel,
];

const BORDERED: [Enhancement; 7] = [
    Enhancement::Bordered(&BASE[0]),
    Enhancement::Bordered(&BASE[1]),
    Enhancement::Bordered(&BASE[2]),
    Enhancement::Bordered(&BASE[3]),
    Enhancement::Bordered(&BASE[4]),
    Enhancement::Bordered(&BASE[5]),
    Enhancement::Bordered(&BASE[7]),
];

/// The first `max` enhancements in trial order
pub fn schedule(max: usize) -> impl Iterator<Item = Enhancement> {
    BASE.into_iter().chain(BORDERED).take(max)
}

impl Enhancement {
    /// Apply to `img`; `border` is the frame width for bordered variants
    pub fn apply(&self, img: &GrayImage, border: u32) -> GrayImage {
        match self {
            Enhancement::Raw => img.clone(),
            Enhancement::Clahe => clahe(img, 6, 6, 2.5),
            Enhancement::Otsu => otsu_binarize(img).to_print(),
            Enhancement::OtsuInverted => invert(&otsu_binarize(img).to_print()),
            Enhancement::Adaptive => adaptive_binarize(img, 9, 2).to_print(),
            Enhancement::Sharpen => filter3x3::<_, f32, u8>(img, &SHARPEN),
            Enhancement::Global(t) => threshold_binarize(img, *t).to_print(),
            Enhancement::GlobalInverted(t) => invert(&threshold_binarize(img, *t).to_print()),
            Enhancement::Sobel => sobel_edges(img),
            Enhancement::Bordered(inner) => pad(&inner.apply(img, border), border, BACKGROUND),
        }
    }
}

fn sobel_edges(img: &GrayImage) -> GrayImage {
    let gx = horizontal_sobel(img);
    let gy = vertical_sobel(img);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let m = (gx.get_pixel(x, y)[0].unsigned_abs() as u32 + gy.get_pixel(x, y)[0].unsigned_abs() as u32) / 2;
        Luma([255 - m.min(255) as u8])
    })
}

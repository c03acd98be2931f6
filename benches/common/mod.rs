use image::{GrayImage, Luma};
use rust_scan::tools::{bench_limit_from_env, dataset_iter, dataset_root_from_env, smoke_from_env};
use std::path::PathBuf;

#[allow(dead_code)]
pub fn collect_dataset_images() -> (PathBuf, Vec<PathBuf>) {
    let root = dataset_root_from_env();
    let limit = bench_limit_from_env();
    let smoke = smoke_from_env();

    let images: Vec<PathBuf> = dataset_iter(&root, limit, smoke).collect();
    (root, images)
}

/// Light textured background with a bar block and a checker block
#[allow(dead_code)]
pub fn synthetic_scene(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let bars = (width / 8..width / 2).contains(&x) && (height / 4..height * 3 / 4).contains(&y);
        let checker = (width * 5 / 8..width * 7 / 8).contains(&x)
            && (height / 4..height / 2).contains(&y);
        let v = if bars {
            if (x / 3) % 2 == 0 { 20 } else { 235 }
        } else if checker {
            if ((x / 5) + (y / 5)) % 2 == 0 { 20 } else { 235 }
        } else {
            200 + ((x * 7 + y * 13) % 23) as u8
        };
        Luma([v])
    })
}

//! Image loading and dataset iteration shared by the CLI and benchmarks.

use image::{DynamicImage, GenericImageView, GrayImage};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

fn max_dim_from_env() -> Option<u32> {
    match env::var("SCAN_MAX_DIM") {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(v) => Some(v),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

/// Open an image, downscaling so its longer side is at most `SCAN_MAX_DIM`
/// when that variable is set.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage, image::ImageError> {
    let img = image::open(path)?;
    let Some(max_dim) = max_dim_from_env() else {
        return Ok(img);
    };
    let (orig_w, orig_h) = img.dimensions();
    if orig_w.max(orig_h) > max_dim {
        Ok(img.resize(max_dim, max_dim, image::imageops::FilterType::Triangle))
    } else {
        Ok(img)
    }
}

/// Summary statistics for grayscale data.
#[derive(Debug, Clone, Copy)]
pub struct GrayStats {
    /// Minimum grayscale value.
    pub min: u8,
    /// Maximum grayscale value.
    pub max: u8,
    /// Average grayscale value.
    pub avg: u8,
}

/// Compute min/max/avg for a grayscale image.
pub fn grayscale_stats(gray: &GrayImage) -> GrayStats {
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    let mut sum: u64 = 0;
    for &v in gray.as_raw() {
        min = min.min(v);
        max = max.max(v);
        sum += v as u64;
    }
    let avg = if gray.as_raw().is_empty() {
        0
    } else {
        (sum / gray.as_raw().len() as u64) as u8
    };
    GrayStats { min, max, avg }
}

/// Default dataset root from `SCAN_DATASET_ROOT`.
pub fn dataset_root_from_env() -> PathBuf {
    env::var("SCAN_DATASET_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("benches/images"))
}

/// Image limit from `SCAN_BENCH_LIMIT`.
///
/// Returns `None` (full dataset) when unset or set to `0`.
pub fn bench_limit_from_env() -> Option<usize> {
    match env::var("SCAN_BENCH_LIMIT") {
        Ok(value) => value
            .parse::<usize>()
            .ok()
            .and_then(|v| if v == 0 { None } else { Some(v) }),
        Err(_) => None,
    }
}

/// Smoke test flag from `SCAN_SMOKE`.
pub fn smoke_from_env() -> bool {
    matches!(
        env::var("SCAN_SMOKE").as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("yes") | Ok("YES")
    )
}

/// Iterate dataset image paths in sorted order with optional smoke list and limit.
///
/// With `smoke` set, `<root>/_smoke.txt` (one path per line, `#` comments)
/// replaces the directory walk when it names at least one existing file.
pub fn dataset_iter<P: AsRef<Path>>(
    root: P,
    limit: Option<usize>,
    smoke: bool,
) -> impl Iterator<Item = PathBuf> {
    let root = root.as_ref();
    let mut images = if smoke {
        load_smoke_list(root).unwrap_or_else(|| collect_images(root))
    } else {
        collect_images(root)
    };

    images.sort();
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images.into_iter()
}

fn load_smoke_list(root: &Path) -> Option<Vec<PathBuf>> {
    let smoke_path = root.join("_smoke.txt");
    let contents = fs::read_to_string(&smoke_path).ok()?;
    let mut paths = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let candidate = Path::new(line);
        let path = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            root.join(candidate)
        };
        if path.exists() {
            paths.push(path);
        }
    }
    if paths.is_empty() { None } else { Some(paths) }
}

/// Every image file under `root`, recursively, in no particular order
pub fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy().to_lowercase();
                if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                    images.push(path);
                }
            }
        }
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before UNIX epoch")
            .as_nanos();
        let sequence = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("rust_scan_tools_{nanos}_{sequence}"));
        fs::create_dir_all(dir.join("nested")).expect("failed to create temp dir");
        dir
    }

    #[test]
    fn test_dataset_iter_walks_sorts_and_limits() {
        let root = temp_dir();
        for name in ["b.png", "a.JPG", "notes.txt", "nested/c.bmp"] {
            fs::write(root.join(name), b"x").unwrap();
        }
        let all: Vec<_> = dataset_iter(&root, None, false).collect();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(dataset_iter(&root, Some(1), false).count(), 1);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn test_smoke_list_overrides_walk() {
        let root = temp_dir();
        fs::write(root.join("a.png"), b"x").unwrap();
        fs::write(root.join("b.png"), b"x").unwrap();
        fs::write(root.join("_smoke.txt"), "# smoke\nb.png\nmissing.png\n").unwrap();
        let picked: Vec<_> = dataset_iter(&root, None, true).collect();
        assert_eq!(picked, vec![root.join("b.png")]);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn test_grayscale_stats() {
        let gray = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 10 } else { 30 }]));
        let stats = grayscale_stats(&gray);
        assert_eq!((stats.min, stats.max, stats.avg), (10, 30, 20));
    }
}

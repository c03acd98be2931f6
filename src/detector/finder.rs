/// Finder pattern detection using 1:1:3:1:1 ratio scanning with a vertical cross-check
use crate::models::{BitMatrix, Point};

/// Center of a QR finder pattern
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderPattern {
    /// Center in the scanned image's coordinates
    pub center: Point,
    /// Estimated module size in pixels
    pub module_size: f32,
    /// Number of scan hits merged into this pattern
    pub count: usize,
}

impl FinderPattern {
    /// Single-hit pattern
    pub fn new(x: f32, y: f32, module_size: f32) -> Self {
        Self {
            center: Point::new(x, y),
            module_size,
            count: 1,
        }
    }

    /// Shift by `(dx, dy)`
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            center: self.center.translate(dx, dy),
            ..*self
        }
    }
}

/// Row scanner for finder patterns in a binary matrix
pub struct FinderScanner;

impl FinderScanner {
    /// Find finder pattern centers; each must pass the ratio test both along
    /// its row and along its column
    pub fn scan(matrix: &BitMatrix, tolerance: f32) -> Vec<FinderPattern> {
        let width = matrix.width();
        let height = matrix.height();
        let mut candidates = Vec::new();

        for y in 0..height {
            if !Self::has_significant_edges(matrix, y, width) {
                continue;
            }
            candidates.extend(Self::scan_row(matrix, y, width, tolerance));
        }

        merge_patterns(candidates)
    }

    /// Check if row has enough edge transitions to potentially contain patterns
    fn has_significant_edges(matrix: &BitMatrix, y: usize, width: usize) -> bool {
        let mut transitions = 0;
        let sample_step = 2;
        let mut prev_color = matrix.get(0, y);

        for x in (sample_step..width).step_by(sample_step) {
            let color = matrix.get(x, y);
            if color != prev_color {
                transitions += 1;
                prev_color = color;
                if transitions >= 3 {
                    return true;
                }
            }
        }

        false
    }

    fn scan_row(matrix: &BitMatrix, y: usize, width: usize, tolerance: f32) -> Vec<FinderPattern> {
        let mut candidates = Vec::new();
        let mut run_lengths: Vec<usize> = Vec::new();
        let mut run_colors: Vec<bool> = Vec::new();
        let mut run_start = 0usize;
        let mut current_color = matrix.get(0, y);

        const MAX_PATTERNS_PER_ROW: usize = 8;

        // One step past the end closes the final run
        for x in 1..=width {
            let color = if x < width { matrix.get(x, y) } else { !current_color };
            if color == current_color {
                continue;
            }

            run_lengths.push(x - run_start);
            run_colors.push(current_color);
            run_start = x;
            current_color = color;

            if run_colors.len() < 5 {
                continue;
            }
            let end_idx = run_colors.len();
            let colors = &run_colors[end_idx - 5..end_idx];
            let lengths = &run_lengths[end_idx - 5..end_idx];

            // Pattern should be: black-white-black-white-black
            if !(colors[0] && !colors[1] && colors[2] && !colors[3] && colors[4]) {
                continue;
            }
            if !Self::quick_ratio_check(lengths) {
                continue;
            }
            let Some(row_hit) = Self::check_pattern(lengths, x, y, tolerance) else {
                continue;
            };
            let total: usize = lengths.iter().sum();
            let cx = row_hit.center.x.round().max(0.0) as usize;
            if let Some((cy, unit)) = Self::cross_check_vertical(matrix, cx, y, total, tolerance) {
                let module = (row_hit.module_size + unit) / 2.0;
                candidates.push(FinderPattern::new(row_hit.center.x, cy, module));
                if candidates.len() >= MAX_PATTERNS_PER_ROW {
                    break;
                }
            }
        }

        candidates
    }

    /// Quick ratio validation - rough check before floating-point math
    fn quick_ratio_check(lengths: &[usize]) -> bool {
        let b1 = lengths[0];
        let w1 = lengths[1];
        let b2 = lengths[2];
        let w2 = lengths[3];
        let b3 = lengths[4];

        let total = b1 + w1 + b2 + w2 + b3;

        // Minimum 7 modules at 1 pixel each
        if total < 7 {
            return false;
        }

        let b2_min = b1.min(b3).max(1);
        if b2 < b2_min * 2 || b2 > b2_min * 5 {
            return false;
        }

        let outer_avg = ((b1 + b3 + w1 + w2) / 4).max(1);
        let w1_ok = w1 * 2 >= outer_avg && w1 <= outer_avg * 2;
        let w2_ok = w2 * 2 >= outer_avg && w2 <= outer_avg * 2;

        w1_ok && w2_ok
    }

    fn ratios_match(lengths: &[usize; 5], tolerance: f32) -> Option<f32> {
        let total: usize = lengths.iter().sum();
        if total < 7 {
            return None;
        }
        let unit = total as f32 / 7.0;
        let expected = [1.0, 1.0, 3.0, 1.0, 1.0];
        let ok = lengths
            .iter()
            .zip(expected)
            .all(|(&len, e)| (len as f32 / unit - e).abs() <= tolerance * e.max(1.0));
        ok.then_some(unit)
    }

    fn check_pattern(lengths: &[usize], end_x: usize, y: usize, tolerance: f32) -> Option<FinderPattern> {
        let runs: [usize; 5] = lengths.try_into().ok()?;
        let unit = Self::ratios_match(&runs, tolerance)?;
        let [_, _, b2, w2, b3] = runs;
        let center_x = end_x as f32 - b3 as f32 - w2 as f32 - b2 as f32 / 2.0;
        Some(FinderPattern::new(center_x, y as f32, unit))
    }

    /// Walk the column through `(x, y)` and check the same 1:1:3:1:1 structure.
    ///
    /// Returns the refined center row and module size.
    fn cross_check_vertical(
        matrix: &BitMatrix,
        x: usize,
        y: usize,
        row_total: usize,
        tolerance: f32,
    ) -> Option<(f32, f32)> {
        if !matrix.get(x, y) {
            return None;
        }
        let height = matrix.height() as isize;
        let limit = row_total * 2;
        let mut counts = [0usize; 5];

        let mut cy = y as isize;
        for (slot, dark) in [(2usize, true), (1, false), (0, true)] {
            while cy >= 0 && matrix.get(x, cy as usize) == dark && counts[slot] <= limit {
                counts[slot] += 1;
                cy -= 1;
            }
        }

        let mut cy = y as isize + 1;
        for (slot, dark) in [(2usize, true), (3, false), (4, true)] {
            while cy < height && matrix.get(x, cy as usize) == dark && counts[slot] <= limit {
                counts[slot] += 1;
                cy += 1;
            }
        }

        if counts.iter().any(|&c| c == 0) {
            return None;
        }
        let total: usize = counts.iter().sum();
        // Row and column extents of a square pattern should agree
        if (total as f32 - row_total as f32).abs() > row_total as f32 * 0.4 {
            return None;
        }
        let unit = Self::ratios_match(&counts, tolerance)?;
        let end = cy as f32;
        let center_y = end - counts[4] as f32 - counts[3] as f32 - counts[2] as f32 / 2.0;
        Some((center_y, unit))
    }
}

/// Merge hits closer than twice their module size, weighting by hit count
pub fn merge_patterns(candidates: Vec<FinderPattern>) -> Vec<FinderPattern> {
    let mut merged: Vec<FinderPattern> = Vec::new();

    for candidate in candidates {
        let existing = merged.iter_mut().find(|existing| {
            let limit = (existing.module_size.max(candidate.module_size) * 2.0).max(5.0);
            existing.center.distance(&candidate.center) < limit
        });
        match existing {
            Some(existing) => {
                let (a, b) = (existing.count as f32, candidate.count as f32);
                let n = a + b;
                existing.center = Point::new(
                    (existing.center.x * a + candidate.center.x * b) / n,
                    (existing.center.y * a + candidate.center.y * b) / n,
                );
                existing.module_size = (existing.module_size * a + candidate.module_size * b) / n;
                existing.count += candidate.count;
            }
            None => merged.push(candidate),
        }
    }

    merged
}

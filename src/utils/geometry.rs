/// Geometry utilities for perspective transformations and corner ordering
use crate::models::Point;

/// Perspective transformation matrix (3x3)
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveTransform {
    a11: f32,
    a12: f32,
    a13: f32,
    a21: f32,
    a22: f32,
    a23: f32,
    a31: f32,
    a32: f32,
    a33: f32,
}

impl PerspectiveTransform {
    /// Create transform from 4 source points to 4 destination points
    pub fn from_points(src: &[Point; 4], dst: &[Point; 4]) -> Option<Self> {
        // Direct linear transform with a33 fixed to 1
        let mut a = [[0.0f32; 8]; 8];
        let mut b = [0.0f32; 8];

        for i in 0..4 {
            let (sx, sy) = (src[i].x, src[i].y);
            let (dx, dy) = (dst[i].x, dst[i].y);

            let row = i * 2;
            a[row] = [sx, sy, 1.0, 0.0, 0.0, 0.0, -dx * sx, -dx * sy];
            b[row] = dx;
            a[row + 1] = [0.0, 0.0, 0.0, sx, sy, 1.0, -dy * sx, -dy * sy];
            b[row + 1] = dy;
        }

        solve_linear_system(&a, &b).map(|solution| Self {
            a11: solution[0],
            a12: solution[1],
            a13: solution[2],
            a21: solution[3],
            a22: solution[4],
            a23: solution[5],
            a31: solution[6],
            a32: solution[7],
            a33: 1.0,
        })
    }

    /// Transform mapping the axis-aligned `width x height` rectangle onto `quad`.
    ///
    /// `quad` must be ordered top-left, top-right, bottom-right, bottom-left.
    pub fn from_rect_to_quad(width: f32, height: f32, quad: &[Point; 4]) -> Option<Self> {
        let rect = rect_corners(width, height);
        Self::from_points(&rect, quad)
    }

    /// Transform a point using this perspective matrix
    pub fn transform(&self, p: &Point) -> Point {
        let x = p.x;
        let y = p.y;

        let denominator = self.a31 * x + self.a32 * y + self.a33;
        if denominator.abs() < 1e-10 {
            return Point::new(0.0, 0.0);
        }

        let x_new = (self.a11 * x + self.a12 * y + self.a13) / denominator;
        let y_new = (self.a21 * x + self.a22 * y + self.a23) / denominator;

        Point::new(x_new, y_new)
    }
}

/// Corners of a `width x height` rectangle anchored at the origin, clockwise from top-left
pub fn rect_corners(width: f32, height: f32) -> [Point; 4] {
    let w = (width - 1.0).max(0.0);
    let h = (height - 1.0).max(0.0);
    [
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(w, h),
        Point::new(0.0, h),
    ]
}

/// Solve 8x8 linear system using Gaussian elimination
#[allow(clippy::needless_range_loop)]
fn solve_linear_system(a: &[[f32; 8]; 8], b: &[f32; 8]) -> Option<[f32; 8]> {
    let mut a = *a;
    let mut b = *b;
    let n = 8;

    for i in 0..n {
        let mut max_val = a[i][i].abs();
        let mut max_row = i;

        for k in (i + 1)..n {
            if a[k][i].abs() > max_val {
                max_val = a[k][i].abs();
                max_row = k;
            }
        }

        if max_val < 1e-10 {
            return None;
        }

        if max_row != i {
            a.swap(i, max_row);
            b.swap(i, max_row);
        }

        for k in (i + 1)..n {
            let factor = a[k][i] / a[i][i];
            b[k] -= factor * b[i];

            for j in i..n {
                a[k][j] -= factor * a[i][j];
            }
        }
    }

    let mut x = [0.0f32; 8];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[i][j] * x[j];
        }

        if a[i][i].abs() < 1e-10 {
            return None;
        }

        x[i] = sum / a[i][i];
    }

    Some(x)
}

/// Order four corners as top-left, top-right, bottom-right, bottom-left.
///
/// Uses the coordinate sum/difference rule with coordinate tie-breaks, so the
/// result depends only on the point set. When that rule collapses (near 45
/// degree rotations) the points are split into left and right pairs instead.
pub fn order_corners(points: [Point; 4]) -> [Point; 4] {
    let key = |p: &Point, k: f32| (k, p.x, p.y);
    let pick = |f: &dyn Fn(&Point) -> f32, largest: bool| -> usize {
        let mut best = 0;
        for i in 1..4 {
            let a = key(&points[i], f(&points[i]));
            let b = key(&points[best], f(&points[best]));
            let ord = a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal);
            let better = if largest {
                ord == std::cmp::Ordering::Greater
            } else {
                ord == std::cmp::Ordering::Less
            };
            if better {
                best = i;
            }
        }
        best
    };

    let sum = |p: &Point| p.x + p.y;
    let diff = |p: &Point| p.x - p.y;
    let tl = pick(&sum, false);
    let br = pick(&sum, true);
    let tr = pick(&diff, true);
    let bl = pick(&diff, false);

    let mut seen = [false; 4];
    for idx in [tl, tr, br, bl] {
        seen[idx] = true;
    }
    if seen.iter().all(|s| *s) {
        let ordered = [points[tl], points[tr], points[br], points[bl]];
        if is_convex_clockwise(&ordered) {
            return ordered;
        }
    }

    order_by_halves(points)
}

fn order_by_halves(mut points: [Point; 4]) -> [Point; 4] {
    points.sort_by(|a, b| {
        (a.x, a.y)
            .partial_cmp(&(b.x, b.y))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let (mut left, mut right) = ([points[0], points[1]], [points[2], points[3]]);
    left.sort_by(|a, b| {
        (a.y, a.x)
            .partial_cmp(&(b.y, b.x))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let tl = left[0];
    let bl = left[1];
    // The right-hand point farther from top-left sits on the diagonal
    if tl.distance_squared(&right[0]) > tl.distance_squared(&right[1]) {
        right.swap(0, 1);
    }
    [tl, right[0], right[1], bl]
}

/// True when the quad turns clockwise on screen (y down) at every vertex
pub fn is_convex_clockwise(quad: &[Point; 4]) -> bool {
    (0..4).all(|i| {
        let prev = quad[(i + 3) % 4];
        let cur = quad[i];
        let next = quad[(i + 1) % 4];
        prev.cross(&cur, &next) > 0.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perspective_transform() {
        let src = [
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ];

        let dst = [
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(50.0, 50.0),
            Point::new(0.0, 50.0),
        ];

        let t = PerspectiveTransform::from_points(&src, &dst).unwrap();
        let p = t.transform(&Point::new(50.0, 50.0));
        assert!((p.x - 25.0).abs() < 0.01);
        assert!((p.y - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_rect_to_quad_hits_corners() {
        let quad = [
            Point::new(10.0, 12.0),
            Point::new(90.0, 8.0),
            Point::new(95.0, 60.0),
            Point::new(5.0, 55.0),
        ];
        let t = PerspectiveTransform::from_rect_to_quad(41.0, 21.0, &quad).unwrap();
        let mapped = t.transform(&Point::new(40.0, 20.0));
        assert!(mapped.distance(&quad[2]) < 0.01);
    }

    #[test]
    fn test_order_corners_shuffled() {
        let expected = [
            Point::new(10.0, 10.0),
            Point::new(110.0, 20.0),
            Point::new(100.0, 80.0),
            Point::new(5.0, 70.0),
        ];
        let shuffled = [expected[2], expected[0], expected[3], expected[1]];
        assert_eq!(order_corners(shuffled), expected);
    }

    #[test]
    fn test_order_corners_is_idempotent() {
        let inputs = [
            [
                Point::new(50.0, 0.0),
                Point::new(100.0, 50.0),
                Point::new(50.0, 100.0),
                Point::new(0.0, 50.0),
            ],
            [
                Point::new(3.0, 40.0),
                Point::new(60.0, 2.0),
                Point::new(97.0, 58.0),
                Point::new(40.0, 96.0),
            ],
        ];
        for pts in inputs {
            let once = order_corners(pts);
            assert_eq!(order_corners(once), once);
            let reversed = [pts[3], pts[2], pts[1], pts[0]];
            assert_eq!(order_corners(reversed), once);
        }
    }

    #[test]
    fn test_diamond_falls_back_to_halves() {
        let diamond = [
            Point::new(50.0, 0.0),
            Point::new(100.0, 50.0),
            Point::new(50.0, 100.0),
            Point::new(0.0, 50.0),
        ];
        let ordered = order_corners(diamond);
        assert!(is_convex_clockwise(&ordered));
    }
}

//! Planar projective transforms (homographies) between two quadrilaterals.
//!
//! The matrix is stored row-major:
//! ```text
//! [ m0 m1 m2 ]
//! [ m3 m4 m5 ]
//! [ m6 m7 m8 ]
//! ```
//! and maps `(x, y, 1)` to `(x', y', w')`; the projected point is
//! `(x' / w', y' / w')`.

use crate::error::TransformError;
use crate::geometry::{Point, Quadrilateral};

/// Relative tolerance for collinearity and pivot checks.
const EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveTransform {
    m: [f64; 9],
}

impl PerspectiveTransform {
    /// Solves the homography mapping `src` onto `dst`.
    ///
    /// Both arguments are `[x0, y0, x1, y1, x2, y2, x3, y3]`; point `i` of the
    /// source maps to point `i` of the destination.
    pub fn new(src: [f64; 8], dst: [f64; 8]) -> Result<Self, TransformError> {
        Self::from_points(&Quadrilateral::from_matrix(src), &Quadrilateral::from_matrix(dst))
    }

    /// Same as [`PerspectiveTransform::new`] for quads.
    pub fn from_points(src: &Quadrilateral, dst: &Quadrilateral) -> Result<Self, TransformError> {
        if !src.is_finite() || !dst.is_finite() {
            return Err(TransformError::NonFinite);
        }
        check_non_degenerate(src, "source")?;
        check_non_degenerate(dst, "destination")?;

        // A * h = b with h = [m0 .. m7] and m8 fixed to 1:
        // [x y 1 0 0 0 -xX -yX] h = X
        // [0 0 0 x y 1 -xY -yY] h = Y
        let mut a = [[0.0_f64; 8]; 8];
        let mut b = [0.0_f64; 8];
        for i in 0..4 {
            let s = src.points[i];
            let d = dst.points[i];
            let r0 = 2 * i;
            let r1 = r0 + 1;

            a[r0][0] = s.x;
            a[r0][1] = s.y;
            a[r0][2] = 1.0;
            a[r0][6] = -s.x * d.x;
            a[r0][7] = -s.y * d.x;
            b[r0] = d.x;

            a[r1][3] = s.x;
            a[r1][4] = s.y;
            a[r1][5] = 1.0;
            a[r1][6] = -s.x * d.y;
            a[r1][7] = -s.y * d.y;
            b[r1] = d.y;
        }

        let h = solve_8x8(a, b)?;
        let mut m = [0.0; 9];
        m[..8].copy_from_slice(&h);
        m[8] = 1.0;

        if m.iter().all(|v| v.is_finite()) {
            Ok(Self { m })
        } else {
            Err(TransformError::Singular)
        }
    }

    /// Projects `(x, y)` through the homography.
    pub fn transform(&self, x: f64, y: f64) -> [f64; 2] {
        let m = &self.m;
        let w = m[6] * x + m[7] * y + m[8];
        [
            (m[0] * x + m[1] * y + m[2]) / w,
            (m[3] * x + m[4] * y + m[5]) / w,
        ]
    }

    pub fn transform_point(&self, p: Point) -> Point {
        let [x, y] = self.transform(p.x, p.y);
        Point::new(x, y)
    }

    pub fn matrix(&self) -> [f64; 9] {
        self.m
    }

    /// The mapping from destination back to source.
    pub fn inverse(&self) -> Result<Self, TransformError> {
        let [a, b, c, d, e, f, g, h, i] = self.m;
        let det = a * (e * i - f * h) - b * (d * i - f * g) + c * (d * h - e * g);
        let scale = self.m.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if !det.is_finite() || det.abs() <= EPSILON * scale.powi(3) {
            return Err(TransformError::Singular);
        }

        let adj = [
            e * i - f * h,
            c * h - b * i,
            b * f - c * e,
            f * g - d * i,
            a * i - c * g,
            c * d - a * f,
            d * h - e * g,
            b * g - a * h,
            a * e - b * d,
        ];
        Ok(Self {
            m: adj.map(|v| v / det),
        })
    }
}

/// Rejects quads where any three points are (nearly) collinear, which also
/// covers coincident points.
fn check_non_degenerate(q: &Quadrilateral, side: &'static str) -> Result<(), TransformError> {
    let p = &q.points;
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for pt in p {
        min_x = min_x.min(pt.x);
        min_y = min_y.min(pt.y);
        max_x = max_x.max(pt.x);
        max_y = max_y.max(pt.y);
    }
    let extent = (max_x - min_x).max(max_y - min_y);
    if extent <= 0.0 {
        return Err(TransformError::Degenerate { side });
    }

    let tolerance = EPSILON * extent * extent;
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    for [i, j, k] in TRIPLES {
        let cross = (p[j].x - p[i].x) * (p[k].y - p[i].y) - (p[j].y - p[i].y) * (p[k].x - p[i].x);
        if cross.abs() <= tolerance {
            return Err(TransformError::Degenerate { side });
        }
    }
    Ok(())
}

/// Gaussian elimination with partial pivoting.
fn solve_8x8(mut a: [[f64; 8]; 8], mut b: [f64; 8]) -> Result<[f64; 8], TransformError> {
    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let tolerance = EPSILON * scale.max(1.0);

    for col in 0..8 {
        let mut pivot = col;
        for row in (col + 1)..8 {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() <= tolerance {
            return Err(TransformError::Singular);
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..8 {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..8 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; 8];
    for row in (0..8).rev() {
        let mut sum = b[row];
        for k in (row + 1)..8 {
            sum -= a[row][k] * x[k];
        }
        x[row] = sum / a[row][row];
    }
    Ok(x)
}

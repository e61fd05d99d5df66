use serde::{Deserialize, Serialize};

/// A 2D point.
///
/// Stored selections use normalized coordinates in `[0, 1]`; the renderer and
/// hit testing denormalize into pixel space as needed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamps both components into `[0, 1]`.
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
        }
    }

    /// Multiplies x by `sx` and y by `sy`, e.g. normalized to pixels.
    pub fn scaled(self, sx: f64, sy: f64) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<Point> for egui::Pos2 {
    fn from(p: Point) -> Self {
        egui::pos2(p.x as f32, p.y as f32)
    }
}

impl From<egui::Pos2> for Point {
    fn from(p: egui::Pos2) -> Self {
        Point::new(p.x as f64, p.y as f64)
    }
}

/// A circular hit target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Exactly four points.
///
/// Storage order is not meaningful until [`Quadrilateral::sorted`] has been
/// applied, after which the indices are top-left, top-right, bottom-right,
/// bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quadrilateral {
    pub points: [Point; 4],
}

pub const TOP_LEFT: usize = 0;
pub const TOP_RIGHT: usize = 1;
pub const BOTTOM_RIGHT: usize = 2;
pub const BOTTOM_LEFT: usize = 3;

impl Default for Quadrilateral {
    fn default() -> Self {
        Self::unit_square()
    }
}

impl Quadrilateral {
    pub const fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    pub const fn unit_square() -> Self {
        Self::new([
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ])
    }

    /// Axis-aligned rectangle in TL, TR, BR, BL order.
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new([
            Point::new(x, y),
            Point::new(x + width, y),
            Point::new(x + width, y + height),
            Point::new(x, y + height),
        ])
    }

    /// Builds a quadrilateral from an 8-number matrix `[x0, y0, .., x3, y3]`.
    pub fn from_matrix(m: [f64; 8]) -> Self {
        Self::new([
            Point::new(m[0], m[1]),
            Point::new(m[2], m[3]),
            Point::new(m[4], m[5]),
            Point::new(m[6], m[7]),
        ])
    }

    pub fn to_matrix(&self) -> [f64; 8] {
        let [a, b, c, d] = self.points;
        [a.x, a.y, b.x, b.y, c.x, c.y, d.x, d.y]
    }

    pub fn map(&self, f: impl FnMut(Point) -> Point) -> Self {
        Self::new(self.points.map(f))
    }

    /// Corners reordered as top-left, top-right, bottom-right, bottom-left.
    pub fn sorted(&self) -> Self {
        sort_convex_quadrilateral_points(self)
    }

    /// Shoelace area in the current storage order. Positive for clockwise
    /// winding in a y-down coordinate system.
    pub fn signed_area(&self) -> f64 {
        let p = &self.points;
        let mut sum = 0.0;
        for i in 0..4 {
            let a = p[i];
            let b = p[(i + 1) % 4];
            sum += a.x * b.y - b.x * a.y;
        }
        sum / 2.0
    }

    /// Even-odd containment test against the polygon in storage order.
    pub fn contains(&self, point: Point) -> bool {
        let p = &self.points;
        let mut inside = false;
        let mut j = 3;
        for i in 0..4 {
            let (a, b) = (p[i], p[j]);
            if (a.y > point.y) != (b.y > point.y) {
                let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
                if point.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    pub fn is_finite(&self) -> bool {
        self.points.iter().all(|p| p.is_finite())
    }
}

/// Reorders four points into TL, TR, BR, BL.
///
/// Points are sorted by y; the top pair is ordered by ascending x and the
/// bottom pair by descending x. The sorts are stable, so sorting an already
/// sorted quadrilateral returns it unchanged. Degenerate inputs get an
/// arbitrary but deterministic assignment.
pub fn sort_convex_quadrilateral_points(quad: &Quadrilateral) -> Quadrilateral {
    let mut points = quad.points;
    points.sort_by(|a, b| a.y.total_cmp(&b.y));

    let (top, bottom) = points.split_at_mut(2);
    top.sort_by(|a, b| a.x.total_cmp(&b.x));
    bottom.sort_by(|a, b| b.x.total_cmp(&a.x));

    Quadrilateral::new(points)
}

/// Euclidean distance between two points
pub fn get_line_length(a: Point, b: Point) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Angle of the vector `a -> b` in degrees, in `(-180, 180]`.
pub fn get_line_angle(a: Point, b: Point) -> f64 {
    let degrees = (b.y - a.y).atan2(b.x - a.x).to_degrees();
    // atan2 yields -180 for (-x, -0.0); fold it onto the open end of the range.
    if degrees <= -180.0 { degrees + 360.0 } else { degrees }
}

/// Inclusive point-in-circle test on squared distances.
pub fn is_point_within_circle(point: Point, circle: Circle) -> bool {
    let dx = point.x - circle.x;
    let dy = point.y - circle.y;
    dx * dx + dy * dy <= circle.radius * circle.radius
}

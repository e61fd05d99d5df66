use egui::{Pos2, Rect, Vec2};

use super::quad::{Circle, Point, Quadrilateral, is_point_within_circle};

/// Where an image lands when drawn "contained" (letterboxed) inside a container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub rect: Rect,
}

impl Placement {
    /// Fits `image_size` inside `container` preserving aspect ratio, centered.
    /// Returns `None` when either size is empty.
    pub fn contain(container: Rect, image_size: Vec2) -> Option<Self> {
        if container.width() <= 0.0
            || container.height() <= 0.0
            || image_size.x <= 0.0
            || image_size.y <= 0.0
        {
            return None;
        }

        let scale = (container.width() / image_size.x).min(container.height() / image_size.y);
        let size = image_size * scale;
        let min = container.center() - size / 2.0;
        Some(Self {
            rect: Rect::from_min_size(min, size),
        })
    }

    /// Normalized image coordinates to screen pixels.
    pub fn denormalize(&self, p: Point) -> Pos2 {
        Pos2::new(
            self.rect.min.x + p.x as f32 * self.rect.width(),
            self.rect.min.y + p.y as f32 * self.rect.height(),
        )
    }

    /// Screen pixels to normalized image coordinates. The result is not
    /// clamped; callers clamp before committing.
    pub fn normalize(&self, pos: Pos2) -> Point {
        Point::new(
            (pos.x - self.rect.min.x) as f64 / self.rect.width() as f64,
            (pos.y - self.rect.min.y) as f64 / self.rect.height() as f64,
        )
    }
}

/// Effective radius of a handle's hit target: the drawn radius plus half the
/// outline stroke.
pub fn handle_hit_radius(handle_radius: f32, stroke_width: f32) -> f32 {
    handle_radius + stroke_width / 2.0
}

/// Returns the index of the first point of `quad` whose handle contains `pos`.
pub fn hit_test_handles(
    pos: Pos2,
    quad: &Quadrilateral,
    placement: &Placement,
    hit_radius: f32,
) -> Option<usize> {
    quad.points.iter().position(|p| {
        let center = placement.denormalize(*p);
        is_point_within_circle(
            Point::from(pos),
            Circle {
                x: center.x as f64,
                y: center.y as f64,
                radius: hit_radius as f64,
            },
        )
    })
}

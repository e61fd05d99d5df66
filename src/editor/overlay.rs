use egui::{Color32, Mesh, Pos2, Rect, Shape, Stroke};

use super::EditorSurface;

pub const VALID_STROKE_COLOR: Color32 = Color32::from_rgb(30, 144, 255);
pub const INVALID_STROKE_COLOR: Color32 = Color32::from_rgb(220, 50, 47);
pub const HANDLE_COLOR: Color32 = Color32::WHITE;
pub const HANDLE_ACTIVE_COLOR: Color32 = Color32::from_rgb(135, 206, 250);

/// Builds the interactive overlay: the dimmed surround with a hole over the
/// active quadrilateral, its outline stroke and one handle per point.
///
/// Pure function of the surface state, so it can be rebuilt every frame.
pub fn overlay_shapes(surface: &EditorSurface, now: f64) -> Vec<Shape> {
    let (Some(container), Some(placement), Some(quad)) =
        (surface.container(), surface.placement(), surface.active_quad())
    else {
        return Vec::new();
    };
    let config = surface.config();

    let corners: Vec<Pos2> = quad
        .sorted()
        .points
        .iter()
        .map(|p| placement.denormalize(*p))
        .collect();

    let alpha = (config.overlay_alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    let mut shapes = vec![dim_outside(container, &corners, Color32::from_black_alpha(alpha))];

    let stroke_color = outline_color(surface);
    shapes.push(Shape::closed_line(
        corners.clone(),
        Stroke::new(config.stroke_width, stroke_color),
    ));

    // Handles follow storage order so indices match hit testing.
    for (index, point) in quad.points.iter().enumerate() {
        let center = placement.denormalize(*point);
        let active = surface.is_point_moving(index, now) || surface.focused_index() == Some(index);
        let fill = if active { HANDLE_ACTIVE_COLOR } else { HANDLE_COLOR };
        shapes.push(Shape::circle_filled(center, config.handle_radius, fill));
        shapes.push(Shape::circle_stroke(
            center,
            config.handle_radius,
            Stroke::new(1.0, stroke_color),
        ));
    }

    shapes
}

/// Stroke colour for the active quadrilateral: the error colour while it fails
/// the validity check.
pub fn outline_color(surface: &EditorSurface) -> Color32 {
    if surface.is_valid() {
        VALID_STROKE_COLOR
    } else {
        INVALID_STROKE_COLOR
    }
}

/// Triangulates the ring between the container rect and a convex quad in
/// TL, TR, BR, BL order.
fn dim_outside(container: Rect, quad: &[Pos2], color: Color32) -> Shape {
    let ring = [
        container.left_top(),
        container.right_top(),
        container.right_bottom(),
        container.left_bottom(),
    ];

    let mut mesh = Mesh::default();
    for pos in ring.iter().chain(quad.iter()) {
        mesh.colored_vertex(*pos, color);
    }
    for i in 0..4u32 {
        let next = (i + 1) % 4;
        let (outer, outer_next) = (i, next);
        let (inner, inner_next) = (4 + i, 4 + next);
        mesh.add_triangle(outer, outer_next, inner_next);
        mesh.add_triangle(outer, inner_next, inner);
    }
    Shape::mesh(mesh)
}

//! Geometry and colours for the pseudo-3D frame preview.
//!
//! The preview draws the frame as an isometric box (front, top and left
//! faces) and, when a window is cut out, the two visible inner faces of the
//! cutout along its bottom and right edges. Everything here is derived from
//! the same quadrilateral math as the editor.

use image::{Rgba, RgbaImage, imageops};

use crate::geometry::quad::{BOTTOM_LEFT, BOTTOM_RIGHT, TOP_RIGHT};
use crate::geometry::{Point, get_line_angle, get_line_length};
use crate::selection::Window;

/// Which vertical edge of the unwarped image to sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSide {
    Left,
    Right,
}

/// An edge to extrude into a depth face: where it starts, how long it is and
/// which way it points (degrees, y down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthFace {
    pub origin: Point,
    pub length: f64,
    pub angle: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowDepthFaces {
    pub bottom: DepthFace,
    pub right: DepthFace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBoxColors {
    pub front: Rgba<u8>,
    pub top: Rgba<u8>,
    pub left: Rgba<u8>,
    pub inner_bottom: Rgba<u8>,
    pub inner_right: Rgba<u8>,
}

/// Average colour of a `strip_width`-pixel column along one edge of the
/// unwarped image, weighted by alpha. `None` if the strip is fully
/// transparent or the image is empty.
pub fn sample_edge_color(rectified: &RgbaImage, side: EdgeSide, strip_width: u32) -> Option<Rgba<u8>> {
    let (w, h) = rectified.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let strip_width = strip_width.clamp(1, w);
    let x = match side {
        EdgeSide::Left => 0,
        EdgeSide::Right => w - strip_width,
    };
    let strip = imageops::crop_imm(rectified, x, 0, strip_width, h).to_image();

    let mut sums = [0.0_f64; 3];
    let mut alpha_sum = 0.0_f64;
    for pixel in strip.pixels() {
        let a = pixel.0[3] as f64 / 255.0;
        for c in 0..3 {
            sums[c] += pixel.0[c] as f64 * a;
        }
        alpha_sum += a;
    }
    if alpha_sum <= 0.0 {
        return None;
    }
    Some(Rgba([
        (sums[0] / alpha_sum).round() as u8,
        (sums[1] / alpha_sum).round() as u8,
        (sums[2] / alpha_sum).round() as u8,
        255,
    ]))
}

/// Moves each channel toward black by `factor` (0..=1).
pub fn darken(color: Rgba<u8>, factor: f32) -> Rgba<u8> {
    let f = 1.0 - factor.clamp(0.0, 1.0);
    let [r, g, b, a] = color.0;
    Rgba([scale(r, f), scale(g, f), scale(b, f), a])
}

/// Moves each channel toward white by `factor` (0..=1).
pub fn lighten(color: Rgba<u8>, factor: f32) -> Rgba<u8> {
    let f = factor.clamp(0.0, 1.0);
    let [r, g, b, a] = color.0;
    let up = |c: u8| (c as f32 + (255.0 - c as f32) * f).round() as u8;
    Rgba([up(r), up(g), up(b), a])
}

fn scale(c: u8, f: f32) -> u8 {
    (c as f32 * f).round() as u8
}

/// Face colours for the box preview from a sampled edge colour.
pub fn frame_box_colors(edge: Rgba<u8>, shade_factor: f32) -> FrameBoxColors {
    FrameBoxColors {
        front: edge,
        top: lighten(edge, shade_factor),
        left: darken(edge, shade_factor),
        inner_bottom: lighten(edge, shade_factor),
        inner_right: darken(edge, shade_factor),
    }
}

/// Positions the two visible inner faces of a window cutout.
///
/// `width` and `height` are the preview size of the unwarped outline in
/// preview units; window points are scaled by them before measuring.
pub fn window_depth_faces(window: &Window, width: f64, height: f64) -> WindowDepthFaces {
    let p = window.quad().sorted().map(|p| p.scaled(width, height)).points;
    let bottom_left = p[BOTTOM_LEFT];
    let bottom_right = p[BOTTOM_RIGHT];
    let top_right = p[TOP_RIGHT];

    WindowDepthFaces {
        bottom: DepthFace {
            origin: bottom_left,
            length: get_line_length(bottom_left, bottom_right),
            angle: get_line_angle(bottom_left, bottom_right),
        },
        right: DepthFace {
            origin: top_right,
            length: get_line_length(top_right, bottom_right),
            angle: get_line_angle(top_right, bottom_right),
        },
    }
}

use image::{Rgba, RgbaImage};

use crate::geometry::{Point, Quadrilateral};

/// How drawn pixels combine with what is already on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeOp {
    /// Normal painting
    #[default]
    SourceOver,
    /// Erases the destination where the source is opaque
    DestinationOut,
}

/// A straight-alpha RGBA destination with a current composite mode.
#[derive(Debug, Clone)]
pub struct Canvas {
    pixels: RgbaImage,
    op: CompositeOp,
}

impl Canvas {
    /// A fully transparent canvas
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_image(RgbaImage::new(width, height))
    }

    pub fn from_image(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            op: CompositeOp::SourceOver,
        }
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }

    pub fn composite_op(&self) -> CompositeOp {
        self.op
    }

    /// Runs `f` with `op` active and restores the previous mode afterwards,
    /// whatever `f` returns.
    pub fn with_composite<R>(&mut self, op: CompositeOp, f: impl FnOnce(&mut Canvas) -> R) -> R {
        let previous = std::mem::replace(&mut self.op, op);
        let result = f(self);
        self.op = previous;
        result
    }

    /// Draws `image` with its top-left corner at `(x, y)`; parts outside the
    /// canvas are dropped.
    pub fn draw_image(&mut self, image: &RgbaImage, x: i64, y: i64) {
        let op = self.op;
        for (ix, iy, src) in image.enumerate_pixels() {
            let (cx, cy) = (x + ix as i64, y + iy as i64);
            if cx < 0 || cy < 0 || cx >= self.width() as i64 || cy >= self.height() as i64 {
                continue;
            }
            let dst = self.pixels.get_pixel_mut(cx as u32, cy as u32);
            *dst = blend(*dst, *src, op);
        }
    }

    /// Fills a convex polygon, sampling at pixel centers.
    pub fn fill_polygon(&mut self, polygon: &Quadrilateral, color: Rgba<u8>) {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &polygon.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
            return;
        }

        let x0 = min_x.floor().max(0.0) as u32;
        let y0 = min_y.floor().max(0.0) as u32;
        let x1 = (max_x.ceil().max(0.0) as u32).min(self.width());
        let y1 = (max_y.ceil().max(0.0) as u32).min(self.height());

        let op = self.op;
        for y in y0..y1 {
            for x in x0..x1 {
                if polygon.contains(Point::new(x as f64 + 0.5, y as f64 + 0.5)) {
                    let dst = self.pixels.get_pixel_mut(x, y);
                    *dst = blend(*dst, color, op);
                }
            }
        }
    }
}

fn blend(dst: Rgba<u8>, src: Rgba<u8>, op: CompositeOp) -> Rgba<u8> {
    let sa = src.0[3] as f32 / 255.0;
    let da = dst.0[3] as f32 / 255.0;
    match op {
        CompositeOp::SourceOver => {
            let out_a = sa + da * (1.0 - sa);
            if out_a <= 0.0 {
                return Rgba([0, 0, 0, 0]);
            }
            let mut out = [0u8; 4];
            for c in 0..3 {
                let sc = src.0[c] as f32;
                let dc = dst.0[c] as f32;
                out[c] = ((sc * sa + dc * da * (1.0 - sa)) / out_a).round() as u8;
            }
            out[3] = (out_a * 255.0).round() as u8;
            Rgba(out)
        }
        CompositeOp::DestinationOut => {
            let out_a = da * (1.0 - sa);
            let mut out = dst;
            out.0[3] = (out_a * 255.0).round() as u8;
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_composite_restores_mode() {
        let mut canvas = Canvas::new(4, 4);
        let seen = canvas.with_composite(CompositeOp::DestinationOut, |c| c.composite_op());
        assert_eq!(seen, CompositeOp::DestinationOut);
        assert_eq!(canvas.composite_op(), CompositeOp::SourceOver);
    }

    #[test]
    fn test_source_over_and_destination_out() {
        let mut canvas = Canvas::new(10, 10);
        canvas.fill_polygon(&Quadrilateral::rect(0.0, 0.0, 10.0, 10.0), Rgba([200, 100, 50, 255]));
        assert_eq!(canvas.pixels().get_pixel(5, 5), &Rgba([200, 100, 50, 255]));

        canvas.with_composite(CompositeOp::DestinationOut, |c| {
            c.fill_polygon(&Quadrilateral::rect(2.0, 2.0, 4.0, 4.0), Rgba([0, 0, 0, 255]));
        });
        assert_eq!(canvas.pixels().get_pixel(3, 3).0[3], 0);
        assert_eq!(canvas.pixels().get_pixel(1, 1).0[3], 255);
        assert_eq!(canvas.pixels().get_pixel(6, 6).0[3], 255);
    }

    #[test]
    fn test_draw_image_clips_to_canvas() {
        let mut canvas = Canvas::new(4, 4);
        let red = RgbaImage::from_pixel(3, 3, Rgba([255, 0, 0, 255]));
        canvas.draw_image(&red, 2, -1);
        assert_eq!(canvas.pixels().get_pixel(3, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.pixels().get_pixel(3, 1), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.pixels().get_pixel(3, 2).0[3], 0);
        assert_eq!(canvas.pixels().get_pixel(1, 0).0[3], 0);
    }

    #[test]
    fn test_half_transparent_over_transparent_keeps_color() {
        let mut canvas = Canvas::new(1, 1);
        let half = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 128]));
        canvas.draw_image(&half, 0, 0);
        assert_eq!(canvas.pixels().get_pixel(0, 0), &Rgba([10, 20, 30, 128]));
    }
}

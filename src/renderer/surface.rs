use image::{Rgba, RgbaImage};
use log::debug;

use crate::error::RenderError;
use crate::geometry::{Point, Quadrilateral};
use crate::perspective::PerspectiveTransform;

/// The minimal texture-capable drawing surface the compositor needs.
///
/// A GPU implementation uploads a texture and draws it through a perspective
/// shader; [`CpuSurface`] does the same by inverse-mapping every output
/// pixel. Callers must not read pixels before a draw has completed; the CPU
/// surface draws synchronously so `read_pixels` is always current.
pub trait DrawingSurface {
    /// Binds `image` as the source texture, replacing any previous one.
    fn upload_texture(&mut self, image: &RgbaImage) -> Result<(), RenderError>;

    /// Draws the bound texture so that `src` (texture pixels, 8 numbers)
    /// lands on `dst` (surface pixels, 8 numbers). The surface is resized to
    /// the bounding box of `dst` anchored at the origin.
    fn draw_perspective(&mut self, src: [f64; 8], dst: [f64; 8]) -> Result<(), RenderError>;

    /// The result of the last draw
    fn read_pixels(&self) -> Option<&RgbaImage>;

    /// Frees the texture and drawn pixels. Safe to call repeatedly.
    fn release(&mut self) -> Result<(), RenderError>;

    fn has_texture(&self) -> bool;
}

/// Software implementation of [`DrawingSurface`] using bilinear sampling.
#[derive(Debug, Default)]
pub struct CpuSurface {
    texture: Option<RgbaImage>,
    canvas: Option<RgbaImage>,
}

impl CpuSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DrawingSurface for CpuSurface {
    fn upload_texture(&mut self, image: &RgbaImage) -> Result<(), RenderError> {
        debug!("uploading {}x{} texture", image.width(), image.height());
        self.texture = Some(image.clone());
        Ok(())
    }

    fn draw_perspective(&mut self, src: [f64; 8], dst: [f64; 8]) -> Result<(), RenderError> {
        let texture = self.texture.as_ref().ok_or(RenderError::NoTexture)?;
        // Map output pixels back into the texture.
        let inverse = PerspectiveTransform::new(src, dst)?.inverse()?;

        let dst_quad = Quadrilateral::from_matrix(dst);
        let max_x = dst_quad.points.iter().fold(0.0_f64, |m, p| m.max(p.x));
        let max_y = dst_quad.points.iter().fold(0.0_f64, |m, p| m.max(p.y));
        let (width, height) = (max_x.ceil() as u32, max_y.ceil() as u32);

        let mut canvas = RgbaImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if !dst_quad.contains(center) {
                    continue;
                }
                let [sx, sy] = inverse.transform(center.x, center.y);
                if let Some(pixel) = sample_bilinear(texture, sx, sy) {
                    canvas.put_pixel(x, y, pixel);
                }
            }
        }
        self.canvas = Some(canvas);
        Ok(())
    }

    fn read_pixels(&self) -> Option<&RgbaImage> {
        self.canvas.as_ref()
    }

    fn release(&mut self) -> Result<(), RenderError> {
        if self.texture.take().is_some() {
            debug!("released surface texture");
        }
        self.canvas = None;
        Ok(())
    }

    fn has_texture(&self) -> bool {
        self.texture.is_some()
    }
}

/// Samples `image` at continuous coordinates where pixel `i` covers
/// `[i, i + 1)`. Returns `None` outside the image.
pub fn sample_bilinear(image: &RgbaImage, x: f64, y: f64) -> Option<Rgba<u8>> {
    let (w, h) = (image.width(), image.height());
    if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 || x > w as f64 || y > h as f64 {
        return None;
    }
    if w == 0 || h == 0 {
        return None;
    }

    let fx = (x - 0.5).clamp(0.0, (w - 1) as f64);
    let fy = (y - 0.5).clamp(0.0, (h - 1) as f64);
    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let tx = fx - x0 as f64;
    let ty = fy - y0 as f64;

    let p00 = image.get_pixel(x0, y0).0;
    let p10 = image.get_pixel(x1, y0).0;
    let p01 = image.get_pixel(x0, y1).0;
    let p11 = image.get_pixel(x1, y1).0;

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f64 * (1.0 - tx) + p10[c] as f64 * tx;
        let bottom = p01[c] as f64 * (1.0 - tx) + p11[c] as f64 * tx;
        out[c] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    Some(Rgba(out))
}

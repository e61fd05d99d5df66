//! Composite rendering: unwarps the outlined artwork into a rectangle, scales
//! it into a caller-owned canvas and punches the matte window out of it.

pub mod canvas;
pub mod depth;
pub mod surface;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use log::{debug, trace, warn};

pub use canvas::{Canvas, CompositeOp};
pub use depth::{EdgeSide, FrameBoxColors, WindowDepthFaces};
pub use surface::{CpuSurface, DrawingSurface};

use crate::config::EditorConfig;
use crate::error::RenderError;
use crate::geometry::quad::{BOTTOM_LEFT, BOTTOM_RIGHT, TOP_LEFT, TOP_RIGHT};
use crate::geometry::{Quadrilateral, get_line_length};
use crate::perspective::PerspectiveTransform;
use crate::selection::Snapshot;
use crate::source::SourceImage;

/// Where the preview goes in the destination canvas, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl TargetRect {
    /// A rectangle at `(x, y)` in destination canvas pixels.
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self { x, y, width, height }
    }

    fn corners(&self) -> [f64; 8] {
        let (x, y) = (self.x as f64, self.y as f64);
        let (w, h) = (self.width as f64, self.height as f64);
        [x, y, x + w, y, x + w, y + h, x, y + h]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Zero or negative target width or height
    EmptyTarget,
    /// The source pixels have not arrived yet
    SourceNotReady,
    /// The outline fails the validity check; the editor shows it in the error
    /// colour until it is fixed
    InvalidSelection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The preview was drawn. `rectified` is the size of the unwarped image
    /// at working resolution.
    Rendered { rectified: (u32, u32) },
    /// Inputs were not ready or not drawable; nothing was drawn. Retry on the
    /// next update.
    Skipped(SkipReason),
}

pub type RenderCallback = Box<dyn FnMut(&RgbaImage)>;

#[derive(Debug, Clone, Copy)]
struct Uploaded {
    source_id: u64,
    width: u32,
    height: u32,
}

/// Renders selections of one source image through a [`DrawingSurface`].
///
/// The texture stays bound between renders of the same image and is released
/// when the image changes, when a render fails and when the renderer drops.
pub struct CompositeRenderer<S: DrawingSurface> {
    surface: S,
    config: EditorConfig,
    uploaded: Option<Uploaded>,
    rectified: Option<RgbaImage>,
    on_rendered: Option<RenderCallback>,
}

impl<S: DrawingSurface> CompositeRenderer<S> {
    /// Draws through `surface`, capping work at the config's resolution.
    pub fn new(surface: S, config: EditorConfig) -> Self {
        Self {
            surface,
            config,
            uploaded: None,
            rectified: None,
            on_rendered: None,
        }
    }

    /// Registers a callback that receives the destination pixels after each
    /// successful render.
    pub fn set_on_rendered(&mut self, callback: impl FnMut(&RgbaImage) + 'static) {
        self.on_rendered = Some(Box::new(callback));
    }

    /// The drawing surface, for inspecting its texture state.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The unwarped image from the last successful render
    pub fn rectified(&self) -> Option<&RgbaImage> {
        self.rectified.as_ref()
    }

    /// Drops the bound texture if it belongs to a different image.
    pub fn set_source(&mut self, source: &SourceImage) {
        if self.uploaded.is_some_and(|u| u.source_id != source.id()) {
            debug!("source image changed, releasing texture");
            self.release();
        }
    }

    /// Frees the surface texture. Failures are logged and otherwise ignored.
    pub fn release(&mut self) {
        self.uploaded = None;
        self.rectified = None;
        if let Err(err) = self.surface.release() {
            warn!("failed to release drawing surface: {err}");
        }
    }

    /// Unwarps the outline of `source` into `target` on `dest` and punches
    /// out the window, if any.
    ///
    /// Unready inputs and invalid outlines are skipped; only a surface or
    /// transform failure is an error, and it releases the texture.
    pub fn render(
        &mut self,
        source: &SourceImage,
        snapshot: &Snapshot,
        target: TargetRect,
        dest: &mut Canvas,
    ) -> Result<RenderOutcome, RenderError> {
        // A swapped image must not keep the old texture alive while it loads.
        self.set_source(source);

        if target.width <= 0 || target.height <= 0 {
            trace!("skipping render: empty target {target:?}");
            return Ok(RenderOutcome::Skipped(SkipReason::EmptyTarget));
        }
        let Some(pixels) = source.pixels().filter(|_| source.is_complete()) else {
            trace!("skipping render: source image not ready");
            return Ok(RenderOutcome::Skipped(SkipReason::SourceNotReady));
        };
        if !snapshot.is_valid() {
            trace!("skipping render: outline is not a valid quadrilateral");
            return Ok(RenderOutcome::Skipped(SkipReason::InvalidSelection));
        }

        match self.render_inner(source.id(), pixels, snapshot, target, dest) {
            Ok(rectified) => {
                if let Some(callback) = self.on_rendered.as_mut() {
                    callback(dest.pixels());
                }
                Ok(RenderOutcome::Rendered { rectified })
            }
            Err(err) => {
                warn!("render failed: {err}");
                self.release();
                Err(err)
            }
        }
    }

    fn render_inner(
        &mut self,
        source_id: u64,
        pixels: &RgbaImage,
        snapshot: &Snapshot,
        target: TargetRect,
        dest: &mut Canvas,
    ) -> Result<(u32, u32), RenderError> {
        let uploaded = match self.uploaded.filter(|_| self.surface.has_texture()) {
            Some(uploaded) => uploaded,
            None => self.upload(source_id, pixels)?,
        };
        let (ww, wh) = (uploaded.width as f64, uploaded.height as f64);

        let outline = snapshot.outline.quad().sorted().map(|p| p.scaled(ww, wh));
        let (rw, rh) = rectified_size(&outline, self.config.max_working_resolution);
        let dst = Quadrilateral::rect(0.0, 0.0, rw as f64, rh as f64);
        debug!("rendering {}x{} -> {rw}x{rh} -> {target:?}", uploaded.width, uploaded.height);

        self.surface.draw_perspective(outline.to_matrix(), dst.to_matrix())?;
        let rectified = self.surface.read_pixels().ok_or(RenderError::NoTexture)?.clone();

        let (tw, th) = (target.width as u32, target.height as u32);
        if rectified.dimensions() == (tw, th) {
            dest.draw_image(&rectified, target.x, target.y);
        } else {
            let scaled = imageops::resize(&rectified, tw, th, FilterType::Triangle);
            dest.draw_image(&scaled, target.x, target.y);
        }

        if let Some(window) = snapshot.inner {
            let placement = PerspectiveTransform::new(dst.to_matrix(), target.corners())?;
            let hole = window
                .quad()
                .sorted()
                .map(|p| placement.transform_point(p.scaled(rw as f64, rh as f64)));
            dest.with_composite(CompositeOp::DestinationOut, |canvas| {
                canvas.fill_polygon(&hole, Rgba([0, 0, 0, 255]));
            });
        }

        self.rectified = Some(rectified);
        Ok((rw, rh))
    }

    fn upload(&mut self, source_id: u64, pixels: &RgbaImage) -> Result<Uploaded, RenderError> {
        let (width, height) =
            working_resolution(pixels.dimensions(), self.config.max_working_resolution);
        if (width, height) == pixels.dimensions() {
            self.surface.upload_texture(pixels)?;
        } else {
            let working = imageops::resize(pixels, width, height, FilterType::Triangle);
            self.surface.upload_texture(&working)?;
        }
        let uploaded = Uploaded {
            source_id,
            width,
            height,
        };
        self.uploaded = Some(uploaded);
        Ok(uploaded)
    }

    /// Edge colour of the last rectified image, for the depth preview.
    pub fn edge_color(&self, side: EdgeSide) -> Option<Rgba<u8>> {
        let rectified = self.rectified.as_ref()?;
        depth::sample_edge_color(rectified, side, self.config.edge_strip_width)
    }
}

impl<S: DrawingSurface> Drop for CompositeRenderer<S> {
    fn drop(&mut self) {
        if let Err(err) = self.surface.release() {
            warn!("failed to release drawing surface on drop: {err}");
        }
    }
}

/// Scales `(width, height)` down so the longer side is at most `max_side`.
/// Never upscales.
pub fn working_resolution((width, height): (u32, u32), max_side: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_side || longest == 0 {
        return (width, height);
    }
    let scale = max_side as f64 / longest as f64;
    let fit = |v: u32| ((v as f64 * scale).round() as u32).max(1);
    (fit(width), fit(height))
}

/// Size of the rectangle a sorted quadrilateral unwarps to: the mean lengths
/// of its opposite edges, capped like the working resolution.
pub fn rectified_size(sorted: &Quadrilateral, max_side: u32) -> (u32, u32) {
    let p = &sorted.points;
    let width = (get_line_length(p[TOP_LEFT], p[TOP_RIGHT])
        + get_line_length(p[BOTTOM_LEFT], p[BOTTOM_RIGHT]))
        / 2.0;
    let height = (get_line_length(p[TOP_LEFT], p[BOTTOM_LEFT])
        + get_line_length(p[TOP_RIGHT], p[BOTTOM_RIGHT]))
        / 2.0;
    let size = ((width.round() as u32).max(1), (height.round() as u32).max(1));
    working_resolution(size, max_side)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use std::cell::Cell;
    use std::rc::Rc;

    fn solid(w: u32, h: u32) -> SourceImage {
        SourceImage::loaded(RgbaImage::from_pixel(w, h, Rgba([40, 80, 120, 255])))
    }

    /// Wraps a CPU surface and counts uploads and releases.
    #[derive(Default)]
    struct CountingSurface {
        inner: CpuSurface,
        uploads: Rc<Cell<usize>>,
        releases: Rc<Cell<usize>>,
    }

    impl DrawingSurface for CountingSurface {
        fn upload_texture(&mut self, image: &RgbaImage) -> Result<(), RenderError> {
            self.uploads.set(self.uploads.get() + 1);
            self.inner.upload_texture(image)
        }
        fn draw_perspective(&mut self, src: [f64; 8], dst: [f64; 8]) -> Result<(), RenderError> {
            self.inner.draw_perspective(src, dst)
        }
        fn read_pixels(&self) -> Option<&RgbaImage> {
            self.inner.read_pixels()
        }
        fn release(&mut self) -> Result<(), RenderError> {
            self.releases.set(self.releases.get() + 1);
            self.inner.release()
        }
        fn has_texture(&self) -> bool {
            self.inner.has_texture()
        }
    }

    /// Accepts the upload, then fails every draw.
    #[derive(Default)]
    struct FailingSurface {
        texture: Option<RgbaImage>,
        releases: Rc<Cell<usize>>,
    }

    impl DrawingSurface for FailingSurface {
        fn upload_texture(&mut self, image: &RgbaImage) -> Result<(), RenderError> {
            self.texture = Some(image.clone());
            Ok(())
        }
        fn draw_perspective(&mut self, _src: [f64; 8], _dst: [f64; 8]) -> Result<(), RenderError> {
            Err(RenderError::NoTexture)
        }
        fn read_pixels(&self) -> Option<&RgbaImage> {
            None
        }
        fn release(&mut self) -> Result<(), RenderError> {
            self.releases.set(self.releases.get() + 1);
            self.texture = None;
            Ok(())
        }
        fn has_texture(&self) -> bool {
            self.texture.is_some()
        }
    }

    #[test]
    fn test_working_resolution_caps_longest_side() {
        assert_eq!(working_resolution((4000, 3000), 2048), (2048, 1536));
        assert_eq!(working_resolution((1000, 500), 2048), (1000, 500));
        assert_eq!(working_resolution((3000, 4000), 2000), (1500, 2000));
    }

    #[test]
    fn test_rectified_size_of_inset_square() {
        let outline = Quadrilateral::rect(100.0, 100.0, 800.0, 600.0);
        assert_eq!(rectified_size(&outline, 2048), (800, 600));
        assert_eq!(rectified_size(&outline, 400), (400, 300));
    }

    #[test]
    fn test_skips_without_error() {
        let mut renderer = CompositeRenderer::new(CpuSurface::new(), EditorConfig::default());
        let mut dest = Canvas::new(10, 10);
        let snapshot = Snapshot::default();

        let outcome = renderer
            .render(&solid(4, 4), &snapshot, TargetRect::new(0, 0, 0, 10), &mut dest)
            .unwrap();
        assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::EmptyTarget));

        let outcome = renderer
            .render(&SourceImage::loading(), &snapshot, TargetRect::new(0, 0, 10, 10), &mut dest)
            .unwrap();
        assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::SourceNotReady));
        assert!(!renderer.surface().has_texture());
    }

    #[test]
    fn test_invalid_outlines_are_skipped() {
        let mut renderer = CompositeRenderer::new(CpuSurface::new(), EditorConfig::default());
        let mut dest = Canvas::new(16, 16);
        let target = TargetRect::new(0, 0, 16, 16);
        let concave = Snapshot::new(
            Quadrilateral::new([
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(0.3, 0.3),
                Point::new(0.0, 1.0),
            ]),
            None,
        );
        let collapsed = Snapshot::new(Quadrilateral::rect(0.5, 0.5, 0.0, 0.0), None);

        for snapshot in [concave, collapsed] {
            let outcome = renderer.render(&solid(16, 16), &snapshot, target, &mut dest).unwrap();
            assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::InvalidSelection));
        }
        assert!(dest.pixels().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_failed_draw_releases_texture() {
        let surface = FailingSurface::default();
        let releases = surface.releases.clone();
        let mut renderer = CompositeRenderer::new(surface, EditorConfig::default());
        let mut dest = Canvas::new(8, 8);

        let result = renderer.render(
            &solid(8, 8),
            &Snapshot::default(),
            TargetRect::new(0, 0, 8, 8),
            &mut dest,
        );
        assert!(matches!(result, Err(RenderError::NoTexture)));
        assert_eq!(releases.get(), 1);
        assert!(!renderer.surface().has_texture());
        assert!(renderer.rectified().is_none());
        assert_eq!(renderer.edge_color(EdgeSide::Left), None);
    }

    #[test]
    fn test_loading_swap_releases_old_texture() {
        let surface = CountingSurface::default();
        let releases = surface.releases.clone();
        let mut renderer = CompositeRenderer::new(surface, EditorConfig::default());
        let mut dest = Canvas::new(8, 8);
        let target = TargetRect::new(0, 0, 8, 8);

        renderer.render(&solid(8, 8), &Snapshot::default(), target, &mut dest).unwrap();
        assert!(renderer.surface().has_texture());

        let outcome = renderer
            .render(&SourceImage::loading(), &Snapshot::default(), target, &mut dest)
            .unwrap();
        assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::SourceNotReady));
        assert_eq!(releases.get(), 1);
        assert!(!renderer.surface().has_texture());
    }

    #[test]
    fn test_texture_reused_and_released_on_swap() {
        let surface = CountingSurface::default();
        let (uploads, releases) = (surface.uploads.clone(), surface.releases.clone());
        let mut renderer = CompositeRenderer::new(surface, EditorConfig::default());
        let mut dest = Canvas::new(8, 8);
        let target = TargetRect::new(0, 0, 8, 8);
        let first = solid(16, 16);

        renderer.render(&first, &Snapshot::default(), target, &mut dest).unwrap();
        renderer.render(&first, &Snapshot::default(), target, &mut dest).unwrap();
        assert_eq!(uploads.get(), 1);
        assert_eq!(releases.get(), 0);

        renderer.render(&solid(16, 16), &Snapshot::default(), target, &mut dest).unwrap();
        assert_eq!(uploads.get(), 2);
        assert_eq!(releases.get(), 1);

        drop(renderer);
        assert_eq!(releases.get(), 2);
    }

    #[test]
    fn test_callback_and_edge_color() {
        let mut renderer = CompositeRenderer::new(CpuSurface::new(), EditorConfig::default());
        let seen = Rc::new(Cell::new(0));
        let counter = seen.clone();
        renderer.set_on_rendered(move |pixels| {
            assert_eq!(pixels.dimensions(), (20, 20));
            counter.set(counter.get() + 1);
        });

        let mut dest = Canvas::new(20, 20);
        renderer
            .render(&solid(10, 10), &Snapshot::default(), TargetRect::new(0, 0, 20, 20), &mut dest)
            .unwrap();
        assert_eq!(seen.get(), 1);
        assert_eq!(renderer.edge_color(EdgeSide::Left), Some(Rgba([40, 80, 120, 255])));
    }

    #[test]
    fn test_draws_at_target_offset() {
        let mut renderer = CompositeRenderer::new(CpuSurface::new(), EditorConfig::default());
        let mut dest = Canvas::new(20, 20);
        renderer
            .render(&solid(10, 10), &Snapshot::default(), TargetRect::new(5, 5, 10, 10), &mut dest)
            .unwrap();
        assert_eq!(dest.pixels().get_pixel(4, 4).0[3], 0);
        assert_eq!(dest.pixels().get_pixel(5, 5), &Rgba([40, 80, 120, 255]));
        assert_eq!(dest.pixels().get_pixel(14, 14), &Rgba([40, 80, 120, 255]));
        assert_eq!(dest.pixels().get_pixel(15, 15).0[3], 0);
    }
}

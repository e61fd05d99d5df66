use egui::{Color32, Pos2, Rect, Sense, Shape, Stroke, Vec2, pos2, vec2};
use image::{Rgba, RgbaImage};
use log::{debug, error, info};

use crate::config::EditorConfig;
use crate::editor::{EditorSurface, overlay_shapes};
use crate::input::EguiInput;
use crate::renderer::depth::{self, FrameBoxColors};
use crate::renderer::{
    Canvas, CompositeRenderer, CpuSurface, EdgeSide, RenderOutcome, TargetRect, rectified_size,
};
use crate::selection::{Layer, Snapshot};
use crate::source::SourceImage;
use crate::texture_manager::{TextureManager, TextureSlot, color_image_from_rgba};

/// Storage key for the last committed selection.
pub const SELECTION_KEY: &str = "myseum_frame.selection";

const PREVIEW_SIZE: u32 = 320;
const SWATCH_SIZE: f32 = 48.0;

/// Viewer around the editor surface: the photo (or the unwarped preview when
/// the window is being edited) with the interactive overlay, and a side
/// panel with the composite preview and history controls.
pub struct FrameApp {
    source: SourceImage,
    editor: EditorSurface,
    input: EguiInput,
    renderer: CompositeRenderer<CpuSurface>,
    textures: TextureManager,
    preview: Option<RgbaImage>,
    preview_version: u64,
    rendered: Option<Snapshot>,
    edge_color: Option<Rgba<u8>>,
    last_error: Option<String>,
}

impl FrameApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>, pixels: RgbaImage, config: EditorConfig) -> Self {
        let restored: Option<Snapshot> = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, SELECTION_KEY));
        if restored.is_some() {
            info!("restored last selection");
        }
        Self::with_selection(pixels, restored, config)
    }

    /// Builds the viewer without eframe storage, starting from `initial` or
    /// the full image.
    pub fn with_selection(pixels: RgbaImage, initial: Option<Snapshot>, config: EditorConfig) -> Self {
        let (w, h) = pixels.dimensions();
        let source = SourceImage::loaded(pixels);
        Self {
            editor: EditorSurface::new(vec2(w as f32, h as f32), initial, config.clone()),
            renderer: CompositeRenderer::new(CpuSurface::new(), config),
            source,
            input: EguiInput::new(),
            textures: TextureManager::new(8),
            preview: None,
            preview_version: 0,
            rendered: None,
            edge_color: None,
            last_error: None,
        }
    }

    /// The interactive surface and its history.
    pub fn editor(&self) -> &EditorSurface {
        &self.editor
    }

    /// The latest composite, if one has rendered.
    pub fn preview(&self) -> Option<&RgbaImage> {
        self.preview.as_ref()
    }

    /// Re-renders the preview if the selection changed since the last render.
    pub fn refresh_preview(&mut self) {
        let snapshot = *self.editor.snapshot();
        if self.rendered == Some(snapshot) || !snapshot.is_valid() {
            return;
        }
        let Some((w, h)) = self.source.natural_size() else {
            return;
        };

        let outline = snapshot
            .outline
            .quad()
            .sorted()
            .map(|p| p.scaled(w as f64, h as f64));
        let (pw, ph) = rectified_size(&outline, PREVIEW_SIZE);
        let mut canvas = Canvas::new(pw, ph);
        let target = TargetRect::new(0, 0, pw as i64, ph as i64);

        match self.renderer.render(&self.source, &snapshot, target, &mut canvas) {
            Ok(RenderOutcome::Rendered { rectified }) => {
                debug!("preview rendered from {rectified:?}");
                self.preview = Some(canvas.into_pixels());
                self.preview_version += 1;
                self.edge_color = self.renderer.edge_color(EdgeSide::Left);
                self.rendered = Some(snapshot);
                self.last_error = None;
            }
            Ok(RenderOutcome::Skipped(reason)) => debug!("preview skipped: {reason:?}"),
            Err(err) => {
                error!("preview failed: {err}");
                self.last_error = Some(err.to_string());
                self.rendered = Some(snapshot);
            }
        }
    }

    /// The selection written to storage: the current one when it is valid,
    /// else the session's starting selection, else nothing.
    pub fn persisted_selection(&self) -> Option<Snapshot> {
        [self.editor.snapshot(), self.editor.history().origin()]
            .into_iter()
            .find(|snapshot| snapshot.is_valid())
            .copied()
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Selection");

        let mut layer = self.editor.active_layer();
        ui.horizontal(|ui| {
            ui.selectable_value(&mut layer, Layer::Outline, "Outline");
            ui.selectable_value(&mut layer, Layer::Window, "Window");
        });
        if layer != self.editor.active_layer() {
            if let Err(err) = self.editor.set_active_layer(layer) {
                self.last_error = Some(err.to_string());
            }
        }

        ui.horizontal(|ui| {
            let history = self.editor.history();
            let (can_undo, can_redo) = (history.can_undo(), history.can_redo());
            if ui.add_enabled(can_undo, egui::Button::new("Undo")).clicked() {
                self.editor.undo();
            }
            if ui.add_enabled(can_redo, egui::Button::new("Redo")).clicked() {
                self.editor.redo();
            }
        });

        let has_window = self.editor.snapshot().inner.is_some();
        if ui.add_enabled(has_window, egui::Button::new("Remove window")).clicked() {
            if let Err(err) = self.editor.remove_window() {
                self.last_error = Some(err.to_string());
            }
        }

        ui.horizontal(|ui| {
            let valid = self.editor.is_valid();
            if ui.add_enabled(valid, egui::Button::new("Done")).clicked() {
                self.editor.finish_session();
            }
            if ui.button("Reset").clicked() {
                self.editor.cancel_session();
            }
        });

        if !self.editor.is_valid() {
            ui.colored_label(Color32::LIGHT_RED, "The outline is not a convex quadrilateral");
        }
        if let Some(err) = &self.last_error {
            ui.colored_label(Color32::LIGHT_RED, err);
        }

        ui.separator();
        ui.heading("Preview");
        self.preview_image(ui);

        if let Some(edge) = self.edge_color {
            ui.separator();
            ui.label("Frame edge");
            let colors = depth::frame_box_colors(edge, self.editor.config().shade_factor);
            frame_box(ui, &colors);
        }
    }

    fn preview_image(&mut self, ui: &mut egui::Ui) {
        let Some(preview) = &self.preview else {
            ui.label("Nothing rendered yet");
            return;
        };
        let texture = self.textures.get_or_create_texture(
            TextureSlot::Preview,
            self.preview_version,
            || color_image_from_rgba(preview),
            ui.ctx(),
        );
        let texture = match texture {
            Ok(texture) => texture,
            Err(err) => {
                error!("failed to create preview texture: {err}");
                return;
            }
        };

        let size = vec2(preview.width() as f32, preview.height() as f32);
        let (rect, _) = ui.allocate_exact_size(size, Sense::hover());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, Color32::from_gray(40));
        painter.image(texture, rect, full_uv(), Color32::WHITE);

        let (Some(window), Some(edge)) = (self.editor.snapshot().inner, self.edge_color) else {
            return;
        };
        let colors = depth::frame_box_colors(edge, self.editor.config().shade_factor);
        let faces = depth::window_depth_faces(&window, size.x as f64, size.y as f64);
        let face_depth = 6.0;
        for (face, color) in [
            (faces.bottom, colors.inner_bottom),
            (faces.right, colors.inner_right),
        ] {
            let angle = (face.angle as f32).to_radians();
            let along = Vec2::angled(angle) * face.length as f32;
            // Inner faces recede away from the viewer, into the cutout.
            let inward = Vec2::angled(angle - std::f32::consts::FRAC_PI_2) * face_depth;
            let start = rect.min + vec2(face.origin.x as f32, face.origin.y as f32);
            let quad = vec![start, start + along, start + along + inward, start + inward];
            painter.add(Shape::convex_polygon(quad, to_color32(color), Stroke::NONE));
        }
    }

    fn editor_canvas(&mut self, ui: &mut egui::Ui, now: f64) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        if response.clicked() || response.drag_started() {
            response.request_focus();
        }
        ui.memory_mut(|memory| {
            memory.set_focus_lock_filter(
                response.id,
                egui::EventFilter {
                    tab: true,
                    horizontal_arrows: true,
                    vertical_arrows: true,
                    escape: true,
                },
            )
        });

        let backdrop = backdrop(&self.editor, &self.source, &self.renderer, self.preview_version);
        let backdrop = backdrop.map(|(slot, version, pixels)| {
            let size = vec2(pixels.width() as f32, pixels.height() as f32);
            let texture = self.textures.get_or_create_texture(
                slot,
                version,
                || color_image_from_rgba(pixels),
                ui.ctx(),
            );
            (texture, size)
        });
        let Some((texture, image_size)) = backdrop else {
            painter.text(
                response.rect.center(),
                egui::Align2::CENTER_CENTER,
                "Loading…",
                egui::FontId::default(),
                Color32::GRAY,
            );
            return;
        };
        self.editor.set_image_size(image_size);

        self.input.gather(ui.ctx(), response.rect, response.has_focus());
        if self.editor.process(&mut self.input, now) {
            ui.ctx().request_repaint();
        }

        if let (Ok(texture), Some(placement)) = (texture, self.editor.placement()) {
            painter.image(texture, placement.rect, full_uv(), Color32::WHITE);
        }
        painter.extend(overlay_shapes(&self.editor, now));

        if (0..4).any(|i| self.editor.is_point_moving(i, now)) {
            let timeout = self.editor.config().keyboard_moving_timeout;
            ui.ctx().request_repaint_after(std::time::Duration::from_secs_f64(timeout));
        }
    }
}

impl eframe::App for FrameApp {
    /// Called by the framework to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        match self.persisted_selection() {
            Some(snapshot) => eframe::set_value(storage, SELECTION_KEY, &snapshot),
            None => debug!("no valid selection to save"),
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = ctx.input(|input| input.time);
        self.textures.begin_frame();
        self.refresh_preview();

        egui::SidePanel::right("controls")
            .resizable(false)
            .min_width(PREVIEW_SIZE as f32 + 16.0)
            .show(ctx, |ui| self.side_panel(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.editor_canvas(ui, now));
    }
}

/// The image the active layer is edited over, with its cache key.
fn backdrop<'a>(
    editor: &EditorSurface,
    source: &'a SourceImage,
    renderer: &'a CompositeRenderer<CpuSurface>,
    preview_version: u64,
) -> Option<(TextureSlot, u64, &'a RgbaImage)> {
    match editor.active_layer() {
        Layer::Outline => source.pixels().map(|p| (TextureSlot::Source, source.id(), p)),
        Layer::Window => renderer
            .rectified()
            .map(|p| (TextureSlot::Rectified, preview_version, p)),
    }
}

fn full_uv() -> Rect {
    Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0))
}

fn to_color32(color: Rgba<u8>) -> Color32 {
    let [r, g, b, a] = color.0;
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

/// Isometric swatch of the frame: front face with lit top and shaded left side.
fn frame_box(ui: &mut egui::Ui, colors: &FrameBoxColors) {
    let depth = SWATCH_SIZE / 3.0;
    let (rect, _) = ui.allocate_exact_size(Vec2::splat(SWATCH_SIZE + depth), Sense::hover());
    let front = Rect::from_min_size(rect.min + vec2(depth, depth), Vec2::splat(SWATCH_SIZE));
    let back = |p: Pos2| p - vec2(depth, depth);

    let painter = ui.painter();
    let top = vec![
        back(front.left_top()),
        back(front.right_top()),
        front.right_top(),
        front.left_top(),
    ];
    let left = vec![
        back(front.left_top()),
        front.left_top(),
        front.left_bottom(),
        back(front.left_bottom()),
    ];
    painter.add(Shape::convex_polygon(top, to_color32(colors.top), Stroke::NONE));
    painter.add(Shape::convex_polygon(left, to_color32(colors.left), Stroke::NONE));
    painter.rect_filled(front, 0.0, to_color32(colors.front));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Quadrilateral};
    use crate::input::InputEvent;

    fn app() -> FrameApp {
        let pixels = RgbaImage::from_fn(64, 48, |x, y| Rgba([x as u8 * 4, y as u8 * 5, 90, 255]));
        FrameApp::with_selection(pixels, None, EditorConfig::default())
    }

    #[test]
    fn test_preview_renders_once_per_selection() {
        let mut app = app();
        app.refresh_preview();
        assert_eq!(app.preview().map(|p| p.dimensions()), Some((64, 48)));
        assert_eq!(app.preview_version, 1);
        assert!(app.edge_color.is_some());

        app.refresh_preview();
        assert_eq!(app.preview_version, 1);
    }

    #[test]
    fn test_restored_selection_drives_preview() {
        let pixels = RgbaImage::from_pixel(100, 100, Rgba([10, 20, 30, 255]));
        let outline = Quadrilateral::rect(0.25, 0.25, 0.5, 0.5);
        let mut app = FrameApp::with_selection(
            pixels,
            Some(Snapshot::new(outline, Some(Quadrilateral::rect(0.25, 0.25, 0.5, 0.5)))),
            EditorConfig::default(),
        );
        app.refresh_preview();
        let preview = app.preview().unwrap();
        assert_eq!(preview.dimensions(), (50, 50));
        assert_eq!(preview.get_pixel(25, 25).0[3], 0);
        assert_eq!(preview.get_pixel(2, 2), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_invalid_selection_is_not_persisted() {
        let mut app = app();
        let container = Rect::from_min_size(pos2(0.0, 0.0), vec2(64.0, 48.0));
        for event in [
            InputEvent::Resize { container },
            InputEvent::PointerDown { pos: pos2(0.0, 0.0) },
            InputEvent::PointerMove { pos: pos2(64.0, 0.0) },
            InputEvent::PointerUp { pos: pos2(64.0, 0.0) },
        ] {
            app.editor.handle_event(&event, 0.0);
        }
        assert_eq!(app.editor().snapshot().outline.0.points[0], Point::new(1.0, 0.0));
        assert!(!app.editor().is_valid());
        assert_eq!(app.persisted_selection(), Some(Snapshot::default()));
    }

    #[test]
    fn test_invalid_restored_selection_is_not_persisted() {
        let pixels = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 255]));
        let collapsed = Quadrilateral::new([Point::new(0.5, 0.5); 4]);
        let app = FrameApp::with_selection(
            pixels,
            Some(Snapshot::new(collapsed, None)),
            EditorConfig::default(),
        );
        assert_eq!(app.persisted_selection(), None);
    }
}

//! The interactive surface: turns pointer and keyboard input into edits of the
//! selection history.
//!
//! Exactly one layer is active at a time and only its points can be dragged or
//! focused. Pointer coordinates are mapped through the image's contained
//! placement inside the container, so the surface needs to know both the
//! container rect (from `Resize` events) and the natural size of the image
//! the active layer is drawn over. For the outline that is the source photo;
//! for the window it is the unwarped outline preview.

mod overlay;

pub use overlay::{
    HANDLE_ACTIVE_COLOR, HANDLE_COLOR, INVALID_STROKE_COLOR, VALID_STROKE_COLOR, outline_color,
    overlay_shapes,
};

use egui::{Key, Modifiers, Pos2, Rect, Vec2};
use log::debug;

use crate::command::{CommandResult, Edit, SelectionHistory};
use crate::config::EditorConfig;
use crate::geometry::{Placement, Quadrilateral, hit_test_handles};
use crate::input::{InputEvent, InputSource, arrow_direction, undo_shortcut};
use crate::selection::{Layer, Snapshot, is_valid_quad};

/// A point recently moved from the keyboard, shown as "moving" until `until`
#[derive(Debug, Clone, Copy, PartialEq)]
struct KeyboardMove {
    index: usize,
    until: f64,
}

#[derive(Debug, Clone)]
pub struct EditorSurface {
    history: SelectionHistory,
    config: EditorConfig,
    active_layer: Layer,
    container: Option<Rect>,
    image_size: Vec2,
    moving_index: Option<usize>,
    focused_index: Option<usize>,
    keyboard_move: Option<KeyboardMove>,
}

impl EditorSurface {
    /// Starts a session over an image of `image_size` pixels. Without an
    /// initial snapshot the outline covers the whole image.
    pub fn new(image_size: Vec2, initial: Option<Snapshot>, config: EditorConfig) -> Self {
        let history = SelectionHistory::new(initial.unwrap_or_default())
            .with_max_len(config.max_history);
        Self {
            history,
            config,
            active_layer: Layer::Outline,
            container: None,
            image_size,
            moving_index: None,
            focused_index: None,
            keyboard_move: None,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        self.history.current()
    }

    pub fn history(&self) -> &SelectionHistory {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn active_layer(&self) -> Layer {
        self.active_layer
    }

    pub fn active_quad(&self) -> Option<&Quadrilateral> {
        self.snapshot().layer(self.active_layer)
    }

    pub fn moving_index(&self) -> Option<usize> {
        self.moving_index
    }

    pub fn focused_index(&self) -> Option<usize> {
        self.focused_index
    }

    pub fn container(&self) -> Option<Rect> {
        self.container
    }

    pub fn set_container(&mut self, container: Rect) {
        self.container = Some(container);
    }

    /// Natural size of the image being outlined, in pixels.
    pub fn set_image_size(&mut self, image_size: Vec2) {
        self.image_size = image_size;
    }

    pub fn placement(&self) -> Option<Placement> {
        Placement::contain(self.container?, self.image_size)
    }

    /// Validity of the active layer, which drives the stroke colour
    pub fn is_valid(&self) -> bool {
        self.active_quad().is_some_and(is_valid_quad)
    }

    /// Whether point `index` should be drawn in its "moving" state.
    pub fn is_point_moving(&self, index: usize, now: f64) -> bool {
        self.moving_index == Some(index)
            || self
                .keyboard_move
                .is_some_and(|m| m.index == index && now < m.until)
    }

    /// Switches the editable layer. Activating a missing window creates it
    /// from the outline's points as an undoable step.
    pub fn set_active_layer(&mut self, layer: Layer) -> CommandResult {
        if layer == Layer::Window && self.snapshot().inner.is_none() {
            self.history.lap();
            self.history.commit(&Edit::EnsureWindow)?;
        }
        self.active_layer = layer;
        self.reset_interaction();
        Ok(())
    }

    /// Removes the window layer as an undoable step.
    pub fn remove_window(&mut self) -> CommandResult {
        if self.snapshot().inner.is_none() {
            return Ok(());
        }
        self.history.lap();
        self.history.commit(&Edit::RemoveWindow)?;
        self.active_layer = Layer::Outline;
        self.reset_interaction();
        Ok(())
    }

    pub fn focus_point(&mut self, index: Option<usize>) {
        self.focused_index = index.filter(|i| *i < 4);
    }

    /// Steps back one history entry, dropping any drag or nudge in progress.
    pub fn undo(&mut self) -> bool {
        self.reset_interaction();
        let changed = self.history.undo();
        self.fix_active_layer();
        changed
    }

    pub fn redo(&mut self) -> bool {
        self.reset_interaction();
        let changed = self.history.redo();
        self.fix_active_layer();
        changed
    }

    /// Ends the editing session keeping the current snapshot.
    pub fn finish_session(&mut self) -> Snapshot {
        self.reset_interaction();
        self.history.squash();
        *self.snapshot()
    }

    /// Abandons the session, reverting to its first snapshot.
    pub fn cancel_session(&mut self) -> Snapshot {
        self.reset_interaction();
        self.history.restart();
        self.fix_active_layer();
        *self.snapshot()
    }

    /// Clears the keyboard "moving" state once its timeout has passed.
    /// Returns true when something visible changed.
    pub fn tick(&mut self, now: f64) -> bool {
        match self.keyboard_move {
            Some(m) if now >= m.until => {
                self.keyboard_move = None;
                true
            }
            _ => false,
        }
    }

    /// Drains `source` and handles every event in order.
    pub fn process(&mut self, source: &mut impl InputSource, now: f64) -> bool {
        let mut changed = self.tick(now);
        for event in source.drain_events() {
            changed |= self.handle_event(&event, now);
        }
        changed
    }

    /// Handles a single event. Returns true when the overlay needs repainting.
    pub fn handle_event(&mut self, event: &InputEvent, now: f64) -> bool {
        match event {
            InputEvent::Resize { container } => {
                self.container = Some(*container);
                true
            }
            InputEvent::PointerDown { pos } => self.pointer_down(*pos),
            InputEvent::PointerMove { pos } => self.pointer_move(*pos),
            InputEvent::PointerUp { .. } => self.moving_index.take().is_some(),
            InputEvent::KeyDown { key, modifiers } => self.key_down(*key, *modifiers, now),
        }
    }

    fn pointer_down(&mut self, pos: Pos2) -> bool {
        let (Some(placement), Some(quad)) = (self.placement(), self.active_quad()) else {
            return false;
        };
        let Some(index) = hit_test_handles(pos, quad, &placement, self.config.hit_radius()) else {
            return false;
        };

        // The undo boundary goes in before any commit of this drag.
        self.history.lap();
        self.moving_index = Some(index);
        self.focused_index = Some(index);
        self.keyboard_move = None;
        debug!("drag start on {:?} point {index}", self.active_layer);
        true
    }

    fn pointer_move(&mut self, pos: Pos2) -> bool {
        let (Some(index), Some(placement)) = (self.moving_index, self.placement()) else {
            return false;
        };
        let edit = Edit::MovePoint {
            layer: self.active_layer,
            index,
            to: placement.normalize(pos),
        };
        self.history.commit(&edit).is_ok()
    }

    fn key_down(&mut self, key: Key, modifiers: Modifiers, now: f64) -> bool {
        if let Some(redo) = undo_shortcut(key, modifiers) {
            return if redo { self.redo() } else { self.undo() };
        }

        match key {
            Key::Tab => {
                let next = match (self.focused_index, modifiers.shift) {
                    (None, false) => 0,
                    (None, true) => 3,
                    (Some(i), false) => (i + 1) % 4,
                    (Some(i), true) => (i + 3) % 4,
                };
                self.focused_index = Some(next);
                true
            }
            Key::Escape => {
                if self.moving_index.take().is_some() {
                    self.history.undo();
                    self.history.drop_redo();
                } else {
                    self.focused_index = None;
                }
                true
            }
            _ => match (arrow_direction(key), self.focused_index) {
                (Some((dx, dy)), Some(index)) => self.nudge(index, dx, dy, modifiers.shift, now),
                _ => false,
            },
        }
    }

    fn nudge(&mut self, index: usize, dx: f64, dy: f64, boosted: bool, now: f64) -> bool {
        if self.active_quad().is_none() {
            return false;
        }
        // A burst of key presses on one point undoes as a single step.
        let continuing = self
            .keyboard_move
            .is_some_and(|m| m.index == index && now < m.until);
        if !continuing {
            self.history.lap();
        }

        let mut step = self.config.nudge_delta;
        if boosted {
            step *= self.config.nudge_modifier_factor;
        }
        let edit = Edit::NudgePoint {
            layer: self.active_layer,
            index,
            dx: dx * step,
            dy: dy * step,
        };
        let applied = self.history.commit(&edit).is_ok();
        self.keyboard_move = Some(KeyboardMove {
            index,
            until: now + self.config.keyboard_moving_timeout,
        });
        applied
    }

    fn reset_interaction(&mut self) {
        self.moving_index = None;
        self.keyboard_move = None;
    }

    /// Falls back to the outline when history moves to a snapshot without a
    /// window.
    fn fix_active_layer(&mut self) {
        if self.active_layer == Layer::Window && self.snapshot().inner.is_none() {
            self.active_layer = Layer::Outline;
            self.focused_index = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use egui::{pos2, vec2};

    fn surface() -> EditorSurface {
        let mut surface = EditorSurface::new(vec2(100.0, 100.0), None, EditorConfig::default());
        surface.set_container(Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 100.0)));
        surface
    }

    #[test]
    fn test_drag_is_one_undo_step() {
        let mut s = surface();
        assert!(s.handle_event(&InputEvent::PointerDown { pos: pos2(99.0, 99.0) }, 0.0));
        assert_eq!(s.moving_index(), Some(2));
        for p in [pos2(90.0, 90.0), pos2(80.0, 85.0), pos2(75.0, 80.0)] {
            s.handle_event(&InputEvent::PointerMove { pos: p }, 0.0);
        }
        s.handle_event(&InputEvent::PointerUp { pos: pos2(75.0, 80.0) }, 0.0);
        assert_eq!(s.moving_index(), None);
        assert_eq!(s.history().len(), 2);
        assert_eq!(s.snapshot().outline.0.points[2], Point::new(0.75, 0.8));

        assert!(s.undo());
        assert_eq!(s.snapshot(), &Snapshot::default());
    }

    #[test]
    fn test_miss_does_not_lap() {
        let mut s = surface();
        assert!(!s.handle_event(&InputEvent::PointerDown { pos: pos2(50.0, 50.0) }, 0.0));
        assert!(!s.handle_event(&InputEvent::PointerMove { pos: pos2(60.0, 60.0) }, 0.0));
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn test_drag_outside_is_clamped() {
        let mut s = surface();
        s.handle_event(&InputEvent::PointerDown { pos: pos2(0.0, 100.0) }, 0.0);
        s.handle_event(&InputEvent::PointerMove { pos: pos2(-50.0, 170.0) }, 0.0);
        assert_eq!(s.snapshot().outline.0.points[3], Point::new(0.0, 1.0));
    }

    #[test]
    fn test_keyboard_nudges_group_until_timeout() {
        let mut s = surface();
        s.focus_point(Some(0));
        let right = InputEvent::KeyDown { key: Key::ArrowRight, modifiers: Modifiers::NONE };
        let down_fast = InputEvent::KeyDown { key: Key::ArrowDown, modifiers: Modifiers::SHIFT };

        s.handle_event(&right, 0.0);
        s.handle_event(&down_fast, 0.2);
        assert_eq!(s.history().len(), 2);
        assert!(s.is_point_moving(0, 0.3));
        let p = s.snapshot().outline.0.points[0];
        assert!((p.x - 0.005).abs() < 1e-12);
        assert!((p.y - 0.05).abs() < 1e-12);

        assert!(s.tick(1.0));
        assert!(!s.is_point_moving(0, 1.0));
        s.handle_event(&right, 1.1);
        assert_eq!(s.history().len(), 3);
    }

    #[test]
    fn test_undo_redo_shortcuts() {
        let mut s = surface();
        s.focus_point(Some(1));
        s.handle_event(&InputEvent::KeyDown { key: Key::ArrowLeft, modifiers: Modifiers::NONE }, 0.0);
        let moved = *s.snapshot();

        s.handle_event(&InputEvent::KeyDown { key: Key::Z, modifiers: Modifiers::COMMAND }, 0.1);
        assert_eq!(s.snapshot(), &Snapshot::default());
        s.handle_event(
            &InputEvent::KeyDown { key: Key::Z, modifiers: Modifiers::COMMAND | Modifiers::SHIFT },
            0.2,
        );
        assert_eq!(s.snapshot(), &moved);
    }

    #[test]
    fn test_activating_window_copies_outline() {
        let mut s = surface();
        s.handle_event(&InputEvent::PointerDown { pos: pos2(0.0, 0.0) }, 0.0);
        s.handle_event(&InputEvent::PointerMove { pos: pos2(10.0, 10.0) }, 0.0);
        s.handle_event(&InputEvent::PointerUp { pos: pos2(10.0, 10.0) }, 0.0);

        s.set_active_layer(Layer::Window).unwrap();
        assert_eq!(s.snapshot().inner.unwrap().0, s.snapshot().outline.0);
        assert_eq!(s.active_layer(), Layer::Window);

        // Undoing the window creation falls back to the outline layer.
        s.undo();
        assert!(s.snapshot().inner.is_none());
        assert_eq!(s.active_layer(), Layer::Outline);
    }

    #[test]
    fn test_escape_cancels_drag() {
        let mut s = surface();
        s.handle_event(&InputEvent::PointerDown { pos: pos2(100.0, 0.0) }, 0.0);
        s.handle_event(&InputEvent::PointerMove { pos: pos2(70.0, 20.0) }, 0.0);
        s.handle_event(&InputEvent::KeyDown { key: Key::Escape, modifiers: Modifiers::NONE }, 0.0);
        assert_eq!(s.snapshot(), &Snapshot::default());
        assert_eq!(s.history().len(), 1);
        assert!(!s.history().can_redo());
    }

    #[test]
    fn test_tab_cycles_focus() {
        let mut s = surface();
        let tab = InputEvent::KeyDown { key: Key::Tab, modifiers: Modifiers::NONE };
        let back = InputEvent::KeyDown { key: Key::Tab, modifiers: Modifiers::SHIFT };
        s.handle_event(&tab, 0.0);
        assert_eq!(s.focused_index(), Some(0));
        s.handle_event(&back, 0.0);
        assert_eq!(s.focused_index(), Some(3));
    }

    #[test]
    fn test_finish_and_cancel_session() {
        let mut s = surface();
        s.focus_point(Some(0));
        s.handle_event(&InputEvent::KeyDown { key: Key::ArrowDown, modifiers: Modifiers::NONE }, 0.0);
        let edited = *s.snapshot();

        assert_eq!(s.finish_session(), edited);
        assert_eq!(s.history().len(), 1);

        s.handle_event(&InputEvent::KeyDown { key: Key::ArrowDown, modifiers: Modifiers::NONE }, 5.0);
        assert_ne!(*s.snapshot(), edited);
        assert_eq!(s.cancel_session(), edited);
    }
}

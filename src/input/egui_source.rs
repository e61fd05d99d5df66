use egui::{Context, Pos2, Rect};

use super::{InputEvent, InputSource};

/// Converts raw egui input into [`InputEvent`]s for one canvas area
#[derive(Debug, Default)]
pub struct EguiInput {
    last_pointer_pos: Option<Pos2>,
    last_container: Option<Rect>,
    pending: Vec<InputEvent>,
}

impl EguiInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads this frame's input. `container` is the canvas rect; a change in
    /// it is reported as a resize. Keys are only forwarded when `has_focus`.
    pub fn gather(&mut self, ctx: &Context, container: Rect, has_focus: bool) {
        if self.last_container != Some(container) {
            self.last_container = Some(container);
            self.pending.push(InputEvent::Resize { container });
        }

        ctx.input(|input| {
            if let Some(pos) = input.pointer.latest_pos() {
                if Some(pos) != self.last_pointer_pos {
                    self.pending.push(InputEvent::PointerMove { pos });
                }
                self.last_pointer_pos = Some(pos);
            }

            if input.pointer.primary_pressed() {
                if let Some(pos) = input.pointer.interact_pos() {
                    if container.contains(pos) {
                        self.pending.push(InputEvent::PointerDown { pos });
                    }
                }
            }
            if input.pointer.primary_released() {
                let pos = input
                    .pointer
                    .interact_pos()
                    .or(self.last_pointer_pos)
                    .unwrap_or(container.center());
                self.pending.push(InputEvent::PointerUp { pos });
            }

            if has_focus {
                for event in &input.events {
                    if let egui::Event::Key {
                        key,
                        pressed: true,
                        modifiers,
                        ..
                    } = event
                    {
                        self.pending.push(InputEvent::KeyDown {
                            key: *key,
                            modifiers: *modifiers,
                        });
                    }
                }
            }
        });
    }
}

impl InputSource for EguiInput {
    fn drain_events(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.pending)
    }
}

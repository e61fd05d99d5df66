use std::collections::VecDeque;

use egui::{Key, Modifiers, Pos2, Rect};

mod egui_source;
pub use egui_source::EguiInput;

/// Input the editor surface reacts to, in screen coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Primary button pressed
    PointerDown { pos: Pos2 },
    /// Pointer moved (with or without the button held)
    PointerMove { pos: Pos2 },
    /// Primary button released
    PointerUp { pos: Pos2 },
    /// A key was pressed while the surface had focus
    KeyDown { key: Key, modifiers: Modifiers },
    /// The container the image is laid out in changed size
    Resize { container: Rect },
}

/// Where the editor surface gets its events from.
///
/// The live app feeds egui input through [`EguiInput`]; tests use
/// [`ScriptedInput`] so hit testing and history edits run headlessly.
pub trait InputSource {
    /// Returns all events gathered since the last call, oldest first.
    fn drain_events(&mut self) -> Vec<InputEvent>;
}

/// Replays a fixed sequence of events
#[derive(Debug, Default)]
pub struct ScriptedInput {
    queue: VecDeque<InputEvent>,
}

impl ScriptedInput {
    pub fn new(events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self {
            queue: events.into_iter().collect(),
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.queue.push_back(event);
    }
}

impl InputSource for ScriptedInput {
    fn drain_events(&mut self) -> Vec<InputEvent> {
        self.queue.drain(..).collect()
    }
}

/// Platform-normalized "primary modifier + Z" (Cmd on macOS, Ctrl elsewhere).
/// Returns `Some(true)` for redo (Shift held), `Some(false)` for undo.
pub fn undo_shortcut(key: Key, modifiers: Modifiers) -> Option<bool> {
    if key == Key::Z && modifiers.command && !modifiers.alt {
        Some(modifiers.shift)
    } else {
        None
    }
}

/// Unit direction for an arrow key, y pointing down
pub fn arrow_direction(key: Key) -> Option<(f64, f64)> {
    match key {
        Key::ArrowLeft => Some((-1.0, 0.0)),
        Key::ArrowRight => Some((1.0, 0.0)),
        Key::ArrowUp => Some((0.0, -1.0)),
        Key::ArrowDown => Some((0.0, 1.0)),
        _ => None,
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceResult;

/// Tunables for the editor surface and the composite renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)] // missing keys fall back to defaults
pub struct EditorConfig {
    /// Drawn radius of a point handle, in screen pixels
    pub handle_radius: f32,
    /// Outline stroke width, in screen pixels
    pub stroke_width: f32,
    /// Longest side of the intermediate compositing surface
    pub max_working_resolution: u32,
    /// Keyboard nudge step, in normalized units
    pub nudge_delta: f64,
    /// Multiplier applied to the nudge step while Shift is held
    pub nudge_modifier_factor: f64,
    /// Seconds a keyboard-moved point keeps its "moving" look
    pub keyboard_moving_timeout: f64,
    /// Opacity of the dimming overlay outside the outline
    pub overlay_alpha: f32,
    /// Cap on undo entries; `None` keeps every entry for the session
    pub max_history: Option<usize>,
    /// Width in pixels of the strip sampled for the edge colour
    pub edge_strip_width: u32,
    /// Lighten/darken factor for the isometric side faces
    pub shade_factor: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            handle_radius: 5.0,
            stroke_width: 3.0,
            max_working_resolution: 2048,
            nudge_delta: 0.005,
            nudge_modifier_factor: 10.0,
            keyboard_moving_timeout: 0.5,
            overlay_alpha: 0.5,
            max_history: None,
            edge_strip_width: 5,
            shade_factor: 0.1,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> PersistenceResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON config file; missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> PersistenceResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Pointer distance that still grabs a handle.
    pub fn hit_radius(&self) -> f32 {
        crate::geometry::handle_hit_radius(self.handle_radius, self.stroke_width)
    }
}

//! The selection model: an outline around the photographed artwork and an
//! optional window cut out of the unwarped result.
//!
//! The two quadrilaterals live in different coordinate spaces. Outline points
//! are fractions of the source photo; window points are fractions of the
//! rectangle the outline unwarps to. They are separate types so the two can't
//! be mixed up by accident.

use serde::{Deserialize, Serialize};

use crate::error::{PersistenceError, PersistenceResult};
use crate::geometry::{Point, Quadrilateral};

/// Minimum |cross product| of consecutive sorted edges, in normalized units.
pub const MIN_CORNER_CROSS: f64 = 1e-6;
/// Minimum distance between any two points, in normalized units.
pub const MIN_POINT_DISTANCE: f64 = 1e-4;

/// Artwork boundary, normalized to the source photo.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outline(pub Quadrilateral);

/// Matte window, normalized to the outline's unwarped rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Window(pub Quadrilateral);

impl Outline {
    pub fn quad(&self) -> &Quadrilateral {
        &self.0
    }
}

impl Window {
    pub fn quad(&self) -> &Quadrilateral {
        &self.0
    }

    /// A window whose points are copied from the outline, so it starts out
    /// coincident with the frame before being dragged inward.
    pub fn coincident_with(outline: &Outline) -> Self {
        Self(outline.0)
    }
}

/// Which quadrilateral of a snapshot an edit targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Layer {
    #[default]
    Outline,
    Window,
}

impl Layer {
    /// The other layer
    pub fn toggled(self) -> Self {
        match self {
            Layer::Outline => Layer::Window,
            Layer::Window => Layer::Outline,
        }
    }
}

/// One state of the selection at a point in history.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub outline: Outline,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner: Option<Window>,
}

impl Snapshot {
    /// Wraps raw quads in their coordinate-space newtypes.
    pub fn new(outline: Quadrilateral, inner: Option<Quadrilateral>) -> Self {
        Self {
            outline: Outline(outline),
            inner: inner.map(Window),
        }
    }

    /// The quad edited on `layer`, `None` for a missing window.
    pub fn layer(&self, layer: Layer) -> Option<&Quadrilateral> {
        match layer {
            Layer::Outline => Some(&self.outline.0),
            Layer::Window => self.inner.as_ref().map(|w| &w.0),
        }
    }

    /// Mutable form of [`Snapshot::layer`].
    pub fn layer_mut(&mut self, layer: Layer) -> Option<&mut Quadrilateral> {
        match layer {
            Layer::Outline => Some(&mut self.outline.0),
            Layer::Window => self.inner.as_mut().map(|w| &mut w.0),
        }
    }

    /// Whether the outline may be composited.
    pub fn is_valid(&self) -> bool {
        is_valid_quad(&self.outline.0)
    }

    pub fn to_json(&self) -> PersistenceResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a persisted snapshot, rejecting non-finite coordinates.
    pub fn from_json(json: &str) -> PersistenceResult<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        let finite = snapshot.outline.0.is_finite()
            && snapshot.inner.is_none_or(|w| w.0.is_finite());
        if !finite {
            return Err(PersistenceError::InvalidData(
                "selection contains non-finite coordinates".to_owned(),
            ));
        }
        Ok(snapshot)
    }
}

/// Non-degeneracy check used for both stroke colouring and render gating.
///
/// After sorting into TL, TR, BR, BL the quadrilateral is valid when no two
/// points are closer than [`MIN_POINT_DISTANCE`] and every corner turns the
/// same way with a cross product of at least [`MIN_CORNER_CROSS`]. This
/// rejects zero-area, collinear, concave and self-intersecting shapes.
pub fn is_valid_quad(quad: &Quadrilateral) -> bool {
    if !quad.is_finite() {
        return false;
    }
    let p = quad.sorted().points;

    for i in 0..4 {
        for j in (i + 1)..4 {
            if crate::geometry::get_line_length(p[i], p[j]) < MIN_POINT_DISTANCE {
                return false;
            }
        }
    }

    let mut sign = 0.0_f64;
    for i in 0..4 {
        let a = p[i];
        let b = p[(i + 1) % 4];
        let c = p[(i + 2) % 4];
        let cross = cross(a, b, c);
        if cross.abs() < MIN_CORNER_CROSS {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

fn cross(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x)
}

use super::{CommandError, EditResult};
use crate::geometry::Point;
use crate::selection::{Layer, Snapshot, Window};

/// Pure edits that can be applied to a snapshot.
///
/// Every edit produces a new snapshot and leaves its input untouched, so the
/// history can apply them to the current entry in place.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Move a point to an absolute normalized position (clamped to `[0, 1]`)
    MovePoint {
        layer: Layer,
        index: usize,
        to: Point,
    },
    /// Offset a point by a normalized delta (result clamped to `[0, 1]`)
    NudgePoint {
        layer: Layer,
        index: usize,
        dx: f64,
        dy: f64,
    },
    /// Create the window layer by copying the outline's points.
    /// Leaves an existing window alone.
    EnsureWindow,
    /// Drop the window layer
    RemoveWindow,
}

impl Edit {
    pub fn apply(&self, snapshot: &Snapshot) -> EditResult {
        let mut next = *snapshot;
        match self {
            Edit::MovePoint { layer, index, to } => {
                let point = point_mut(&mut next, *layer, *index)?;
                *point = to.clamped();
            }
            Edit::NudgePoint { layer, index, dx, dy } => {
                let point = point_mut(&mut next, *layer, *index)?;
                *point = Point::new(point.x + dx, point.y + dy).clamped();
            }
            Edit::EnsureWindow => {
                if next.inner.is_none() {
                    next.inner = Some(Window::coincident_with(&next.outline));
                }
            }
            Edit::RemoveWindow => {
                next.inner = None;
            }
        }
        Ok(next)
    }
}

fn point_mut(snapshot: &mut Snapshot, layer: Layer, index: usize) -> Result<&mut Point, CommandError> {
    let quad = snapshot
        .layer_mut(layer)
        .ok_or(CommandError::MissingWindow)?;
    quad.points
        .get_mut(index)
        .ok_or(CommandError::IndexOutOfRange(index))
}

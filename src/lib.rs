#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod command;
pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod input;
pub mod perspective;
pub mod renderer;
pub mod selection;
pub mod source;
pub mod texture_manager;

pub use app::FrameApp;
pub use command::{Edit, SelectionHistory};
pub use config::EditorConfig;
pub use editor::EditorSurface;
pub use error::{CommandError, PersistenceError, RenderError, TransformError};
pub use geometry::{Point, Quadrilateral};
pub use input::{InputEvent, InputSource};
pub use perspective::PerspectiveTransform;
pub use renderer::{Canvas, CompositeRenderer, CpuSurface, DrawingSurface, RenderOutcome, TargetRect};
pub use selection::{Layer, Outline, Snapshot, Window};
pub use source::SourceImage;

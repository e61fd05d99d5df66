use thiserror::Error;

/// Errors raised while solving a perspective transform.
///
/// These indicate bad input geometry. The editor's validity check keeps
/// degenerate quadrilaterals away from the renderer, so seeing one of these
/// at render time is a bug upstream.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("perspective input contains a non-finite coordinate")]
    NonFinite,
    #[error("{side} quadrilateral is degenerate (coincident or collinear points)")]
    Degenerate { side: &'static str },
    #[error("perspective system is singular")]
    Singular,
}

/// Errors that can occur while applying an edit to a snapshot
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("point index {0} is out of range for a quadrilateral")]
    IndexOutOfRange(usize),
    #[error("the snapshot has no window layer")]
    MissingWindow,
}

/// Errors raised by the composite renderer
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("no texture is bound to the drawing surface")]
    NoTexture,
}

/// Errors that can occur while loading configuration or persisted selections
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

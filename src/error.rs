//! Error type shared by the whole crate

use std::path::PathBuf;

use thiserror::Error;

use crate::shape::{ShapeId, ShapeTag};

pub type Result<T> = std::result::Result<T, CanvasError>;

#[derive(Debug, Error)]
pub enum CanvasError {
    /// Window or rendering context could not be created. Not recoverable.
    #[error("failed to set up rendering context: {0}")]
    Setup(String),

    #[error("canvas is closed")]
    Closed,

    #[error("canvas has already been started")]
    AlreadyStarted,

    #[error("canvas has not been started")]
    NotStarted,

    #[error("index {index} is out of range for length {len}")]
    OutOfRange { index: usize, len: usize },

    #[error("shape {0} is not registered with this canvas")]
    NotRegistered(ShapeId),

    #[error("{operation} is not supported by {kind} shapes")]
    Unsupported {
        operation: &'static str,
        kind: ShapeTag,
    },

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load asset {}: {reason}", path.display())]
    Asset { path: PathBuf, reason: String },

    #[error("backend failure: {0}")]
    Backend(String),

    #[error("thread {0} panicked")]
    WorkerPanicked(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    ConfigWrite(#[from] toml::ser::Error),
}

//! Thread-safe graphics canvas
//!
//! A [`Canvas`] renders on its own thread while application threads add
//! [`Shape`]s, mutate them, and issue immediate drawing calls.

use std::sync::{Mutex, MutexGuard};

pub mod asset;
pub mod backend;
pub mod canvas;
pub mod color;
pub mod command;
pub mod config;
pub mod error;
pub mod input;
pub mod raster;
pub mod shape;
pub mod timer;
pub mod visual;
pub mod worker;

pub use crate::backend::{Backend, BackendFactory, FrameCapture, Presenter, SoftwareBackend};
pub use crate::canvas::{
    Canvas, CanvasState, CartesianBounds, CartesianCanvas, RenderPause,
};
pub use crate::color::Color;
pub use crate::command::{Command, CommandBuffer, CommandKind};
pub use crate::config::{CanvasConfig, CanvasSettings};
pub use crate::error::{CanvasError, Result};
pub use crate::input::{Action, Button, InputEvent, Key, MouseButton};
pub use crate::raster::{Pixmap, RectF};
pub use crate::shape::{Shape, ShapeId, ShapeKind, ShapeRegistry, ShapeTag};
pub use crate::timer::Timer;
pub use crate::visual::{ProgressBar, QueueLayout, TaskState, VisualTaskQueue};
pub use crate::worker::{fan_out, CancellationToken, PauseControl, Step, Worker, WorkerContext};

/// Lock `mutex`, recovering the data if another thread panicked while
/// holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

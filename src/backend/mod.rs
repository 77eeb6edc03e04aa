//! GPU submission surface
//!
//! The render thread is the only user of a [`Backend`]. Backends are built by
//! a [`BackendFactory`] that runs on the render thread itself, so window and
//! context handles never cross threads.

use std::ops::Range;

use crate::color::Color;
use crate::config::CanvasSettings;
use crate::error::Result;
use crate::input::InputEvent;
use crate::raster::{Pixmap, RectF};
use crate::shape::{Primitive, Vertex};

pub mod software;
#[cfg(feature = "wayland")]
mod pointer;
#[cfg(feature = "wayland")]
pub mod wayland;

pub use software::{FrameCapture, Presenter, SoftwareBackend};
#[cfg(feature = "wayland")]
pub use wayland::WaylandPresenter;

pub trait Backend {
    /// Framebuffer size in pixels.
    fn size(&self) -> (u32, u32);

    fn clear(&mut self, color: Color);

    /// Replace the current vertex buffer.
    fn upload_vertices(&mut self, vertices: &[Vertex]);

    /// Assemble `range` of the uploaded vertices with `mode` and draw it.
    fn draw_primitive(&mut self, mode: Primitive, range: Range<usize>) -> Result<()>;

    fn draw_image(&mut self, dest: RectF, image: &Pixmap, alpha: f32);

    fn present(&mut self) -> Result<()>;

    /// Append pending window events to `events`.
    fn poll_events(&mut self, events: &mut Vec<InputEvent>) -> Result<()>;

    /// Copy of the frame as drawn so far.
    fn read_pixels(&self) -> Pixmap;
}

pub type BackendFactory = Box<dyn FnOnce(&CanvasSettings) -> Result<Box<dyn Backend>> + Send>;

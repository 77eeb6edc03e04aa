//! Rasterising backend and the presenters it can hand frames to

use std::ops::Range;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::backend::Backend;
use crate::color::Color;
use crate::error::{CanvasError, Result};
use crate::input::InputEvent;
use crate::lock;
use crate::raster::{self, Pixmap, RectF};
use crate::shape::{Primitive, Vertex};

/// Receives finished frames.
pub trait Presenter {
    fn present(&mut self, frame: &Pixmap) -> Result<()>;

    fn poll_events(&mut self, _events: &mut Vec<InputEvent>) -> Result<()> {
        Ok(())
    }
}

/// Discards frames. Used for offscreen layers.
impl Presenter for () {
    fn present(&mut self, _frame: &Pixmap) -> Result<()> {
        Ok(())
    }
}

pub struct SoftwareBackend<P> {
    frame: Pixmap,
    vertices: Vec<Vertex>,
    presenter: P,
}

impl<P: Presenter> SoftwareBackend<P> {
    pub fn new(width: u32, height: u32, presenter: P) -> Self {
        Self {
            frame: Pixmap::new(width, height),
            vertices: Vec::new(),
            presenter,
        }
    }

    pub fn frame(&self) -> &Pixmap {
        &self.frame
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }
}

impl<P: Presenter> Backend for SoftwareBackend<P> {
    fn size(&self) -> (u32, u32) {
        (self.frame.width(), self.frame.height())
    }

    fn clear(&mut self, color: Color) {
        self.frame.fill(color);
    }

    fn upload_vertices(&mut self, vertices: &[Vertex]) {
        self.vertices.clear();
        self.vertices.extend_from_slice(vertices);
    }

    fn draw_primitive(&mut self, mode: Primitive, range: Range<usize>) -> Result<()> {
        let len = self.vertices.len();
        let slice = self
            .vertices
            .get(range.clone())
            .ok_or(CanvasError::OutOfRange {
                index: range.end,
                len,
            })?;
        raster::rasterize(&mut self.frame, mode, slice);
        Ok(())
    }

    fn draw_image(&mut self, dest: RectF, image: &Pixmap, alpha: f32) {
        raster::blit(&mut self.frame, dest, image, alpha);
    }

    fn present(&mut self) -> Result<()> {
        self.presenter.present(&self.frame)
    }

    fn poll_events(&mut self, events: &mut Vec<InputEvent>) -> Result<()> {
        self.presenter.poll_events(events)
    }

    fn read_pixels(&self) -> Pixmap {
        self.frame.clone()
    }
}

#[derive(Default)]
struct CaptureState {
    latest: Option<Pixmap>,
    presented: u64,
    events: Vec<InputEvent>,
}

/// Headless presenter. Keeps the most recent frame so tests and tools can
/// inspect it from any thread, and lets them inject input events.
#[derive(Clone, Default)]
pub struct FrameCapture {
    inner: Arc<(Mutex<CaptureState>, Condvar)>,
}

impl FrameCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> u64 {
        lock(&self.inner.0).presented
    }

    pub fn latest_frame(&self) -> Option<Pixmap> {
        lock(&self.inner.0).latest.clone()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        lock(&self.inner.0)
            .latest
            .as_ref()
            .and_then(|f| f.pixel(x, y))
            .map(Color::from_rgba8)
    }

    /// Queue an event as if the window had produced it.
    pub fn send_event(&self, event: InputEvent) {
        lock(&self.inner.0).events.push(event);
    }

    /// Block until at least `count` frames were presented in total. Returns
    /// false on timeout.
    pub fn wait_for_frames(&self, count: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (state, cond) = &*self.inner;
        let mut guard = lock(state);
        while guard.presented < count {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = match cond.wait_timeout(guard, deadline - now) {
                Ok((g, _)) => g,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }
}

impl Presenter for FrameCapture {
    fn present(&mut self, frame: &Pixmap) -> Result<()> {
        let (state, cond) = &*self.inner;
        {
            let mut guard = lock(state);
            guard.latest = Some(frame.clone());
            guard.presented += 1;
        }
        cond.notify_all();
        Ok(())
    }

    fn poll_events(&mut self, events: &mut Vec<InputEvent>) -> Result<()> {
        events.append(&mut lock(&self.inner.0).events);
        Ok(())
    }
}

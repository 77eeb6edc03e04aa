//! State shared between the canvas handle, the render thread and the
//! drawing threads

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread::{self, ThreadId};

use log::info;

use crate::asset::{FontFace, ImageCache};
use crate::canvas::clock::FrameClock;
use crate::canvas::gate::FrameGate;
use crate::canvas::lifecycle::{CanvasState, Lifecycle};
use crate::color::Color;
use crate::command::CommandBuffer;
use crate::config::CanvasSettings;
use crate::input::{Bindings, Dispatch, InputEvent};
use crate::lock;
use crate::shape::ShapeRegistry;
use crate::worker::CancellationToken;

/// Pending screenshot work for the render thread.
#[derive(Debug, Default)]
pub(crate) struct CaptureRequest {
    pub(crate) screenshot: bool,
    pub(crate) record_frames: u64,
}

impl CaptureRequest {
    /// Whether the frame being rendered now should be saved.
    pub(crate) fn take(&mut self) -> bool {
        if self.record_frames > 0 {
            self.record_frames -= 1;
            true
        } else {
            std::mem::take(&mut self.screenshot)
        }
    }
}

pub(crate) struct Shared {
    pub(crate) settings: CanvasSettings,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) token: CancellationToken,
    pub(crate) registry: ShapeRegistry,
    pub(crate) commands: CommandBuffer,
    pub(crate) clock: FrameClock,
    pub(crate) gate: FrameGate,
    pub(crate) bindings: Mutex<Bindings>,
    pub(crate) cursor: Mutex<(f64, f64)>,
    pub(crate) background: Mutex<Color>,
    pub(crate) font: Mutex<Option<FontFace>>,
    pub(crate) images: Mutex<ImageCache>,
    pub(crate) capture: Mutex<CaptureRequest>,
    pub(crate) show_fps: AtomicBool,
    pub(crate) measured_fps: Mutex<f32>,
    /// Render and draw threads started by this canvas.
    pub(crate) own_threads: Mutex<Vec<ThreadId>>,
}

impl Shared {
    pub(crate) fn state(&self) -> CanvasState {
        self.lifecycle.get()
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Request shutdown and wake every thread that could be waiting on the
    /// canvas. Safe to call any number of times from any thread.
    pub(crate) fn close(&self) {
        if let Some(previous) = self.lifecycle.begin_close() {
            info!("closing canvas (was {previous:?})");
        }
        self.token.cancel();
        self.clock.wake_all();
        self.gate.wake_all();
    }

    /// Run bindings for `events`. Called on the render thread between
    /// frames.
    pub(crate) fn dispatch_events(&self, events: &[InputEvent]) {
        if events.is_empty() {
            return;
        }
        let mut close = false;
        {
            let mut bindings = lock(&self.bindings);
            for event in events {
                match bindings.dispatch(event) {
                    Dispatch::Continue => {}
                    Dispatch::Close => close = true,
                    Dispatch::Cursor(x, y) => *lock(&self.cursor) = (x, y),
                }
            }
        }
        if close {
            self.close();
        }
    }

    /// Called first thing on every thread the canvas spawns.
    pub(crate) fn register_current_thread(&self) {
        lock(&self.own_threads).push(thread::current().id());
    }

    /// Whether the caller is one of the canvas's own threads, which must
    /// never block on joining the others.
    pub(crate) fn on_own_thread(&self) -> bool {
        let current = thread::current().id();
        lock(&self.own_threads).contains(&current)
    }

    pub(crate) fn show_fps(&self) -> bool {
        self.show_fps.load(Ordering::Relaxed)
    }
}

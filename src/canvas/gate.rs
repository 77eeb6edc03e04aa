//! Lets drawing threads hold the renderer between frames

use std::sync::{Condvar, Mutex};

use crate::lock;

#[derive(Default)]
struct GateState {
    pauses: usize,
    in_frame: bool,
}

#[derive(Default)]
pub(crate) struct FrameGate {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl FrameGate {
    fn wait<'a>(&self, guard: std::sync::MutexGuard<'a, GateState>) -> std::sync::MutexGuard<'a, GateState> {
        match self.cond.wait(guard) {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Called by the render thread before drawing. Blocks while any pause
    /// is held; false if `is_open` turned false meanwhile.
    pub(crate) fn enter_frame(&self, is_open: impl Fn() -> bool) -> bool {
        let mut state = lock(&self.state);
        while state.pauses > 0 && is_open() {
            state = self.wait(state);
        }
        if !is_open() {
            return false;
        }
        state.in_frame = true;
        true
    }

    pub(crate) fn exit_frame(&self) {
        lock(&self.state).in_frame = false;
        self.cond.notify_all();
    }

    /// Hold rendering once the frame in progress, if any, has finished.
    pub(crate) fn pause(&self) {
        let mut state = lock(&self.state);
        state.pauses += 1;
        while state.in_frame {
            state = self.wait(state);
        }
    }

    pub(crate) fn resume(&self) {
        let mut state = lock(&self.state);
        state.pauses = state.pauses.saturating_sub(1);
        self.cond.notify_all();
    }

    pub(crate) fn wake_all(&self) {
        let _state = lock(&self.state);
        self.cond.notify_all();
    }
}

/// Rendering stays stopped until every `RenderPause` is dropped.
pub struct RenderPause<'a> {
    gate: &'a FrameGate,
}

impl<'a> RenderPause<'a> {
    pub(crate) fn new(gate: &'a FrameGate) -> Self {
        gate.pause();
        Self { gate }
    }
}

impl Drop for RenderPause<'_> {
    fn drop(&mut self) {
        self.gate.resume();
    }
}

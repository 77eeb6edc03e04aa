//! Worker threads driven by an injected behaviour
//!
//! Workers stop when their [`CancellationToken`] is cancelled and park on a
//! condition variable while their [`PauseControl`] is paused. Both are shared
//! explicitly with every worker that should obey them.

use std::ops::Range;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error};

use crate::error::{CanvasError, Result};
use crate::lock;

/// How often a paused worker re-checks for cancellation.
const PAUSE_RECHECK: Duration = Duration::from_millis(20);

fn wait_timeout<'a, T>(
    cond: &Condvar,
    guard: std::sync::MutexGuard<'a, T>,
    timeout: Duration,
) -> std::sync::MutexGuard<'a, T> {
    match cond.wait_timeout(guard, timeout) {
        Ok((g, _)) => g,
        Err(poisoned) => poisoned.into_inner().0,
    }
}

#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel and wake everything sleeping on this token. Idempotent.
    pub fn cancel(&self) {
        let (flag, cond) = &*self.inner;
        *lock(flag) = true;
        cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *lock(&self.inner.0)
    }

    /// Sleep for `duration` or until cancelled. Returns true if the full
    /// duration passed without cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let (flag, cond) = &*self.inner;
        let mut cancelled = lock(flag);
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            cancelled = wait_timeout(cond, cancelled, deadline - now);
        }
        false
    }

    /// Block until cancelled.
    pub fn wait(&self) {
        let (flag, cond) = &*self.inner;
        let mut cancelled = lock(flag);
        while !*cancelled {
            cancelled = match cond.wait(cancelled) {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }
}

/// Shared pause switch. Paused workers block instead of spinning.
#[derive(Clone, Default)]
pub struct PauseControl {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl PauseControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.set(true);
    }

    pub fn resume(&self) {
        self.set(false);
    }

    /// Flip the switch and return the new paused state.
    pub fn toggle(&self) -> bool {
        let (flag, cond) = &*self.inner;
        let mut paused = lock(flag);
        *paused = !*paused;
        cond.notify_all();
        *paused
    }

    fn set(&self, value: bool) {
        let (flag, cond) = &*self.inner;
        *lock(flag) = value;
        cond.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        *lock(&self.inner.0)
    }

    /// Block while paused. Returns false if `token` was cancelled.
    pub fn wait_while_paused(&self, token: &CancellationToken) -> bool {
        let (flag, cond) = &*self.inner;
        let mut paused = lock(flag);
        while *paused {
            if token.is_cancelled() {
                return false;
            }
            paused = wait_timeout(cond, paused, PAUSE_RECHECK);
        }
        !token.is_cancelled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Stop,
}

/// What a behaviour sees on each iteration.
pub struct WorkerContext {
    id: usize,
    iteration: u64,
    token: CancellationToken,
}

impl WorkerContext {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Iterations completed before this one.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Interruptible sleep; false if cancelled meanwhile.
    pub fn sleep(&self, duration: Duration) -> bool {
        self.token.sleep(duration)
    }
}

pub struct Worker {
    id: usize,
    handle: JoinHandle<u64>,
}

impl Worker {
    /// Start a thread running `behaviour` until it returns [`Step::Stop`] or
    /// `token` is cancelled.
    pub fn spawn<F>(
        id: usize,
        name: impl Into<String>,
        token: CancellationToken,
        pause: PauseControl,
        mut behaviour: F,
    ) -> Result<Self>
    where
        F: FnMut(&WorkerContext) -> Step + Send + 'static,
    {
        let name = name.into();
        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            let mut ctx = WorkerContext {
                id,
                iteration: 0,
                token,
            };
            while !ctx.token.is_cancelled() && pause.wait_while_paused(&ctx.token) {
                if behaviour(&ctx) == Step::Stop {
                    break;
                }
                ctx.iteration += 1;
            }
            debug!("worker {name} finished after {} iterations", ctx.iteration);
            ctx.iteration
        })?;
        Ok(Self { id, handle })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker and return how many iterations it completed.
    pub fn join(self) -> Result<u64> {
        let name = self.handle.thread().name().unwrap_or("worker").to_string();
        self.handle.join().map_err(|_| {
            error!("worker {name} panicked");
            CanvasError::WorkerPanicked(name)
        })
    }
}

/// Split `range` into at most `threads` contiguous chunks and run `f` on each
/// in its own scoped thread. Returns once every chunk is done.
pub fn fan_out<F>(threads: usize, range: Range<usize>, f: F)
where
    F: Fn(usize, Range<usize>) + Sync,
{
    let threads = threads.max(1);
    let len = range.end.saturating_sub(range.start);
    if len == 0 {
        return;
    }
    let chunk = len.div_ceil(threads);
    let f = &f;
    thread::scope(|scope| {
        for t in 0..threads {
            let start = range.start + t * chunk;
            let end = (start + chunk).min(range.end);
            if start >= end {
                break;
            }
            scope.spawn(move || f(t, start..end));
        }
    });
}

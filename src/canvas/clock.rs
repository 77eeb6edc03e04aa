//! Frame counter shared by the render thread and drawing threads

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::lock;
use crate::timer::{self, Timer};

pub(crate) struct FrameClock {
    timer: Mutex<Timer>,
    frames: Mutex<u64>,
    presented: Condvar,
}

impl FrameClock {
    pub(crate) fn new(timer: Timer) -> Self {
        Self {
            timer: Mutex::new(timer),
            frames: Mutex::new(0),
            presented: Condvar::new(),
        }
    }

    pub(crate) fn frame_number(&self) -> u64 {
        *lock(&self.frames)
    }

    /// Count a presented frame and wake every thread waiting for one.
    pub(crate) fn advance(&self) -> u64 {
        let frame = {
            let mut frames = lock(&self.frames);
            *frames += 1;
            *frames
        };
        self.presented.notify_all();
        frame
    }

    /// Wake waiters without counting a frame, so they re-check `is_open`.
    pub(crate) fn wake_all(&self) {
        let _frames = lock(&self.frames);
        self.presented.notify_all();
    }

    /// Block until the next frame is presented or `is_open` turns false.
    pub(crate) fn wait_next(&self, is_open: impl Fn() -> bool) -> bool {
        let mut frames = lock(&self.frames);
        let start = *frames;
        while *frames == start && is_open() {
            frames = match self.presented.wait(frames) {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        is_open()
    }

    /// Sleep the render thread to the next period boundary. The timer lock
    /// is not held while sleeping.
    pub(crate) fn sleep_until_next(&self) {
        let deadline = lock(&self.timer).next_deadline(Instant::now());
        timer::sleep_until(deadline);
        lock(&self.timer).record_wake(Instant::now());
    }

    pub(crate) fn with_timer<R>(&self, f: impl FnOnce(&mut Timer) -> R) -> R {
        f(&mut lock(&self.timer))
    }

    pub(crate) fn period(&self) -> Duration {
        self.with_timer(|t| t.period())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn waiters_wake_on_advance() {
        let clock = Arc::new(FrameClock::new(Timer::from_fps(60).unwrap()));
        let c = Arc::clone(&clock);
        let waiter = thread::spawn(move || c.wait_next(|| true));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(clock.advance(), 1);
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn waiters_wake_on_close() {
        let clock = Arc::new(FrameClock::new(Timer::from_fps(60).unwrap()));
        let open = Arc::new(AtomicBool::new(true));
        let (c, o) = (Arc::clone(&clock), Arc::clone(&open));
        let waiter = thread::spawn(move || c.wait_next(|| o.load(Ordering::SeqCst)));
        thread::sleep(Duration::from_millis(20));
        open.store(false, Ordering::SeqCst);
        clock.wake_all();
        assert!(!waiter.join().unwrap());
        assert_eq!(clock.frame_number(), 0);
    }
}

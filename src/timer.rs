//! Frame pacing timer
//!
//! Counts elapsed periods ("reps") and sleeps a thread to the next period
//! boundary. Sleep targets are derived from the previous target, never from
//! the time the sleep was requested, so pacing does not drift.

use std::thread;
use std::time::{Duration, Instant};

use crate::error::{CanvasError, Result};

#[derive(Debug, Clone)]
pub struct Timer {
    period: Duration,
    start: Instant,
    last_target: Instant,
    last_rep: u64,
    last_wake: Option<Instant>,
    between_sleeps: Option<Duration>,
}

impl Timer {
    pub fn new(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(CanvasError::InvalidConfig(
                "timer period must be positive".into(),
            ));
        }
        let now = Instant::now();
        Ok(Self {
            period,
            start: now,
            last_target: now,
            last_rep: 0,
            last_wake: None,
            between_sleeps: None,
        })
    }

    pub fn from_fps(fps: u32) -> Result<Self> {
        if fps == 0 {
            return Err(CanvasError::InvalidConfig("fps must be positive".into()));
        }
        Self::new(Duration::from_secs(1) / fps)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whole periods elapsed since the timer was started or reset.
    pub fn reps(&self) -> u64 {
        self.reps_at(Instant::now())
    }

    fn reps_at(&self, now: Instant) -> u64 {
        (now.saturating_duration_since(self.start).as_nanos() / self.period.as_nanos()) as u64
    }

    /// Elapsed time since the timer was started or reset.
    pub fn time(&self) -> Duration {
        self.start.elapsed()
    }

    /// Wall time between the two most recent returns from a sleep, if the
    /// timer has slept at least twice.
    pub fn time_between_sleeps(&self) -> Option<Duration> {
        self.between_sleeps
    }

    /// True at most once per elapsed period boundary.
    pub fn past_period(&mut self) -> bool {
        let reps = self.reps();
        if reps > self.last_rep {
            self.last_rep = reps;
            true
        } else {
            false
        }
    }

    /// Restart counting from now. `period` replaces the current period when
    /// given; a zero period keeps the old one.
    pub fn reset(&mut self, period: Option<Duration>) {
        if let Some(p) = period.filter(|p| !p.is_zero()) {
            self.period = p;
        }
        let now = Instant::now();
        self.start = now;
        self.last_target = now;
        self.last_rep = 0;
        self.last_wake = None;
        self.between_sleeps = None;
    }

    /// Advance the schedule and return the next boundary strictly after
    /// `now`. Boundaries that were missed entirely are skipped.
    pub fn next_deadline(&mut self, now: Instant) -> Instant {
        let mut target = self.last_target + self.period;
        if target <= now {
            let behind = now.duration_since(self.last_target).as_nanos() / self.period.as_nanos();
            target = self.last_target + self.period * (behind as u32 + 1);
        }
        self.last_target = target;
        target
    }

    /// Block the calling thread until the next period boundary.
    pub fn sleep_until_next(&mut self) {
        let deadline = self.next_deadline(Instant::now());
        sleep_until(deadline);
        self.record_wake(Instant::now());
    }

    pub(crate) fn record_wake(&mut self, now: Instant) {
        if let Some(prev) = self.last_wake.replace(now) {
            self.between_sleeps = Some(now.duration_since(prev));
        }
    }

    pub fn sleep_for(duration: Duration) {
        thread::sleep(duration);
    }
}

pub(crate) fn sleep_until(deadline: Instant) {
    let now = Instant::now();
    if deadline > now {
        thread::sleep(deadline - now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_period_is_rejected() {
        assert!(matches!(
            Timer::new(Duration::ZERO),
            Err(CanvasError::InvalidConfig(_))
        ));
        assert!(Timer::from_fps(0).is_err());
    }

    #[test]
    fn deadlines_follow_previous_target() {
        let mut timer = Timer::new(Duration::from_millis(10)).unwrap();
        let base = timer.last_target;
        let first = timer.next_deadline(base);
        assert_eq!(first, base + Duration::from_millis(10));
        // Asking late in the period still lands on the boundary.
        let second = timer.next_deadline(first + Duration::from_millis(7));
        assert_eq!(second, base + Duration::from_millis(20));
    }

    #[test]
    fn missed_boundaries_are_skipped() {
        let mut timer = Timer::new(Duration::from_millis(10)).unwrap();
        let base = timer.last_target;
        let deadline = timer.next_deadline(base + Duration::from_millis(35));
        assert_eq!(deadline, base + Duration::from_millis(40));
    }

    #[test]
    fn reset_keeps_period_when_zero() {
        let mut timer = Timer::new(Duration::from_millis(5)).unwrap();
        timer.reset(Some(Duration::ZERO));
        assert_eq!(timer.period(), Duration::from_millis(5));
        timer.reset(Some(Duration::from_millis(8)));
        assert_eq!(timer.period(), Duration::from_millis(8));
        assert_eq!(timer.reps(), 0);
    }

    #[test]
    fn between_sleeps_needs_two_wakes() {
        let mut timer = Timer::new(Duration::from_millis(2)).unwrap();
        assert!(timer.time_between_sleeps().is_none());
        timer.sleep_until_next();
        assert!(timer.time_between_sleeps().is_none());
        timer.sleep_until_next();
        assert!(timer.time_between_sleeps().is_some());
    }
}

use std::sync::atomic::{AtomicU8, Ordering};

/// Externally visible canvas state. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum CanvasState {
    Created = 0,
    Started = 1,
    Running = 2,
    Closing = 3,
    Closed = 4,
}

impl CanvasState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => CanvasState::Created,
            1 => CanvasState::Started,
            2 => CanvasState::Running,
            3 => CanvasState::Closing,
            _ => CanvasState::Closed,
        }
    }

    pub fn is_open(self) -> bool {
        self < CanvasState::Closing
    }
}

pub(crate) struct Lifecycle(AtomicU8);

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(CanvasState::Created as u8))
    }

    pub(crate) fn get(&self) -> CanvasState {
        CanvasState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move from `from` to `to`; false if the state was not `from`.
    pub(crate) fn transition(&self, from: CanvasState, to: CanvasState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Request shutdown. A canvas that never started goes straight to
    /// `Closed`. Returns the state it left, or `None` if shutdown had already
    /// been requested.
    pub(crate) fn begin_close(&self) -> Option<CanvasState> {
        let mut current = self.get();
        loop {
            let next = match current {
                CanvasState::Created => CanvasState::Closed,
                CanvasState::Started | CanvasState::Running => CanvasState::Closing,
                CanvasState::Closing | CanvasState::Closed => return None,
            };
            match self.0.compare_exchange(
                current as u8,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(current),
                Err(actual) => current = CanvasState::from_u8(actual),
            }
        }
    }

    pub(crate) fn set_closed(&self) {
        self.0.store(CanvasState::Closed as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_happens_once() {
        let l = Lifecycle::new();
        assert!(l.transition(CanvasState::Created, CanvasState::Started));
        assert!(l.transition(CanvasState::Started, CanvasState::Running));
        assert_eq!(l.begin_close(), Some(CanvasState::Running));
        assert_eq!(l.begin_close(), None);
        assert_eq!(l.get(), CanvasState::Closing);
        assert!(!l.get().is_open());
    }

    #[test]
    fn unstarted_canvas_closes_immediately() {
        let l = Lifecycle::new();
        assert_eq!(l.begin_close(), Some(CanvasState::Created));
        assert_eq!(l.get(), CanvasState::Closed);
        assert!(!l.transition(CanvasState::Created, CanvasState::Started));
    }
}

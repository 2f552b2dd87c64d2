use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

/// Millisecond clock the playback loop measures elapsed time against.
pub trait TimeSource {
    fn now_ms(&self) -> f64;
}

/// Wall-clock time from [`Instant`], relative to construction.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Externally stepped time. Clones share the same reading.
#[derive(Clone, Debug, Default)]
pub struct ManualTime(Rc<Cell<f64>>);

impl ManualTime {
    pub fn new(start_ms: f64) -> Self {
        Self(Rc::new(Cell::new(start_ms)))
    }

    pub fn set(&self, ms: f64) {
        self.0.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.0.set(self.0.get() + ms);
    }
}

impl TimeSource for ManualTime {
    fn now_ms(&self) -> f64 {
        self.0.get()
    }
}

/// Identifies one requested tick. A tick delivered with any token other than the pending one is
/// stale and is ignored by the clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickToken(pub u64);

/// Host hook that calls back once per display refresh.
///
/// The host is expected to hand every requested token back to
/// [`crate::PlaybackClock::on_frame`] (or [`crate::Engine::drive_frame`]) on its next refresh
/// unless it was cancelled first.
pub trait FrameScheduler {
    fn request_frame(&self, token: TickToken);
    fn cancel_frame(&self, token: TickToken);
}

/// FIFO of requested ticks, drained by a headless host loop or by tests.
///
/// Clones share the queue.
#[derive(Clone, Debug, Default)]
pub struct FrameQueue(Rc<RefCell<VecDeque<TickToken>>>);

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&self) -> Option<TickToken> {
        self.0.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&self, token: TickToken) {
        self.0.borrow_mut().push_back(token);
    }

    fn cancel_frame(&self, token: TickToken) {
        self.0.borrow_mut().retain(|t| *t != token);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/ticker.rs"]
mod tests;

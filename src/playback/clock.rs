use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::events::hub::{EventHub, HubEvent, SubscriptionId};
use crate::playback::ticker::{FrameScheduler, TickToken, TimeSource};
use crate::timeline::store::{ElementStore, StoreEventKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Paused,
    Playing,
    /// Reached the end of the timeline; the next `play` restarts from 0.
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClockEventKind {
    Play,
    Pause,
    TimeUpdate,
    Seek,
    Ended,
    DurationUpdate,
}

/// Notifications published by [`PlaybackClock`]. Times are in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClockEvent {
    Play,
    Pause,
    TimeUpdate(f64),
    Seek(f64),
    Ended,
    DurationUpdate(f64),
}

impl HubEvent for ClockEvent {
    type Kind = ClockEventKind;

    fn kind(&self) -> ClockEventKind {
        match self {
            ClockEvent::Play => ClockEventKind::Play,
            ClockEvent::Pause => ClockEventKind::Pause,
            ClockEvent::TimeUpdate(_) => ClockEventKind::TimeUpdate,
            ClockEvent::Seek(_) => ClockEventKind::Seek,
            ClockEvent::Ended => ClockEventKind::Ended,
            ClockEvent::DurationUpdate(_) => ClockEventKind::DurationUpdate,
        }
    }
}

/// Timeline position and play/pause/ended state, advanced by host-driven ticks.
///
/// While playing, exactly one tick is outstanding with the [`FrameScheduler`]. Each tick derives
/// the current time from the [`TimeSource`] (`now - loop_start`), so dropped refreshes never
/// drift the position.
pub struct PlaybackClock {
    store: Rc<ElementStore>,
    time: Rc<dyn TimeSource>,
    scheduler: Rc<dyn FrameScheduler>,
    events: EventHub<ClockEvent>,

    state: Cell<PlaybackState>,
    current_time: Cell<f64>,
    total_duration: Cell<f64>,
    loop_start: Cell<f64>,
    resume_offset: Cell<f64>,
    pending: Cell<Option<TickToken>>,
    next_token: Cell<u64>,

    store_subs: RefCell<Vec<(StoreEventKind, SubscriptionId)>>,
}

impl PlaybackClock {
    /// Create a paused clock at 0 and subscribe it to `store` changes.
    pub fn new(
        store: Rc<ElementStore>,
        time: Rc<dyn TimeSource>,
        scheduler: Rc<dyn FrameScheduler>,
    ) -> Rc<Self> {
        let clock = Rc::new(Self {
            total_duration: Cell::new(store.max_end_time()),
            store,
            time,
            scheduler,
            events: EventHub::new(),
            state: Cell::new(PlaybackState::Paused),
            current_time: Cell::new(0.0),
            loop_start: Cell::new(0.0),
            resume_offset: Cell::new(0.0),
            pending: Cell::new(None),
            next_token: Cell::new(0),
            store_subs: RefCell::new(Vec::new()),
        });
        clock.attach_to_store();
        clock
    }

    fn attach_to_store(self: &Rc<Self>) {
        let mut subs = self.store_subs.borrow_mut();
        for kind in [
            StoreEventKind::Add,
            StoreEventKind::Update,
            StoreEventKind::Remove,
        ] {
            let weak: Weak<Self> = Rc::downgrade(self);
            let id = self.store.events().subscribe(kind, move |_| {
                if let Some(clock) = weak.upgrade() {
                    clock.refresh_duration();
                }
                Ok(())
            });
            subs.push((kind, id));
        }
    }

    pub fn events(&self) -> &EventHub<ClockEvent> {
        &self.events
    }

    pub fn current_time(&self) -> f64 {
        self.current_time.get()
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration.get()
    }

    pub fn state(&self) -> PlaybackState {
        self.state.get()
    }

    pub fn is_playing(&self) -> bool {
        self.state.get() == PlaybackState::Playing
    }

    /// Token of the tick currently outstanding with the scheduler, if any.
    pub fn pending_tick(&self) -> Option<TickToken> {
        self.pending.get()
    }

    /// Start or resume playback and run the first tick immediately.
    pub fn play(&self) {
        if self.is_playing() {
            return;
        }
        if self.current_time.get() >= self.total_duration.get() {
            self.current_time.set(0.0);
            self.resume_offset.set(0.0);
        }
        tracing::debug!(from = self.current_time.get(), "play");
        self.state.set(PlaybackState::Playing);
        self.events.publish(ClockEvent::Play);
        self.loop_start
            .set(self.time.now_ms() - self.resume_offset.get());
        self.advance();
    }

    pub fn pause(&self) {
        if !self.is_playing() {
            return;
        }
        self.halt();
    }

    pub fn toggle_play(&self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Jump to `time_ms`, clamped into `[0, total_duration]`. NaN seeks to 0.
    ///
    /// A seek while playing keeps playing from the new position; a seek after the end leaves the
    /// clock paused there.
    pub fn seek(&self, time_ms: f64) {
        let t = if time_ms.is_nan() { 0.0 } else { time_ms };
        let t = t.max(0.0).min(self.total_duration.get());
        self.current_time.set(t);
        self.resume_offset.set(t);
        match self.state.get() {
            PlaybackState::Playing => self.loop_start.set(self.time.now_ms() - t),
            PlaybackState::Ended => self.state.set(PlaybackState::Paused),
            PlaybackState::Paused => {}
        }
        tracing::debug!(time_ms = t, "seek");
        self.events.publish(ClockEvent::TimeUpdate(t));
        self.events.publish(ClockEvent::Seek(t));
    }

    /// Deliver a scheduled tick. Returns `false` when `token` is stale or the clock is not
    /// playing, in which case nothing changes.
    pub fn on_frame(&self, token: TickToken) -> bool {
        if self.pending.get() != Some(token) {
            tracing::debug!(?token, "ignoring stale tick");
            return false;
        }
        self.pending.set(None);
        if !self.is_playing() {
            return false;
        }
        self.advance();
        true
    }

    fn advance(&self) {
        if !self.is_playing() {
            return;
        }
        let elapsed = self.time.now_ms() - self.loop_start.get();
        let total = self.total_duration.get();
        if elapsed >= total {
            self.current_time.set(total);
            self.halt();
            if self.state.get() == PlaybackState::Paused {
                self.state.set(PlaybackState::Ended);
            }
            tracing::debug!(total, "playback ended");
            self.events.publish(ClockEvent::TimeUpdate(total));
            self.events.publish(ClockEvent::Ended);
            return;
        }
        self.current_time.set(elapsed);
        self.schedule();
        self.events.publish(ClockEvent::TimeUpdate(elapsed));
    }

    fn halt(&self) {
        self.state.set(PlaybackState::Paused);
        self.resume_offset.set(self.current_time.get());
        self.cancel_pending();
        self.events.publish(ClockEvent::Pause);
    }

    fn schedule(&self) {
        let token = TickToken(self.next_token.get());
        self.next_token.set(token.0 + 1);
        self.pending.set(Some(token));
        self.scheduler.request_frame(token);
    }

    fn cancel_pending(&self) {
        if let Some(token) = self.pending.take() {
            self.scheduler.cancel_frame(token);
        }
    }

    fn refresh_duration(&self) {
        let total = self.store.max_end_time();
        self.total_duration.set(total);
        self.events.publish(ClockEvent::DurationUpdate(total));
    }
}

impl Drop for PlaybackClock {
    fn drop(&mut self) {
        self.cancel_pending();
        for (kind, id) in self.store_subs.borrow_mut().drain(..) {
            self.store.events().unsubscribe(kind, id);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/clock.rs"]
mod tests;

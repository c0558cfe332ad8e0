//! Frame clock abstraction
//!
//! The clock is the platform's display-cycle callback source. The engine only
//! asks it for callbacks and for the current animation time; the host delivers
//! each requested callback back to the animation context with the frame's
//! timestamp.
//!
//! Two callbacks exist per display cycle:
//!
//! - [`CallbackKind::Animate`] advances every animation with one shared timestamp
//! - [`CallbackKind::Commit`] runs after the frame was committed, carrying the
//!   commit timestamp so start times can absorb scheduling jank

use smallvec::SmallVec;
use std::cell::Cell;

/// Kind of frame callback a clock can deliver
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// Advance animations for this frame
    Animate,
    /// The frame has been committed to the display
    Commit,
}

/// Periodic callback source driving the animation engine
///
/// Implementations only record the request; delivery happens later, from the
/// host's event loop, never re-entrantly from inside `request_callback`.
pub trait FrameClock {
    /// Ask for one callback of the given kind on the next display cycle
    fn request_callback(&self, kind: CallbackKind);

    /// Current animation time in milliseconds (monotonic)
    ///
    /// While a frame is being processed this is the frame's timestamp.
    fn now_ms(&self) -> i64;
}

/// A clock advanced by hand
///
/// Used by tests and the simulator: time only moves when told to, and
/// requested callbacks are collected as flags until taken.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Cell<i64>,
    animate_requested: Cell<bool>,
    commit_requested: Cell<bool>,
    animate_requests: Cell<u64>,
    commit_requests: Cell<u64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock whose current time starts at `now_ms`
    pub fn starting_at(now_ms: i64) -> Self {
        let clock = Self::default();
        clock.now_ms.set(now_ms);
        clock
    }

    pub fn set_now(&self, now_ms: i64) {
        self.now_ms.set(now_ms);
    }

    /// Move time forward and return the new time
    pub fn advance(&self, by_ms: i64) -> i64 {
        let now = self.now_ms.get() + by_ms;
        self.now_ms.set(now);
        now
    }

    /// Check whether a callback of this kind is outstanding
    pub fn is_requested(&self, kind: CallbackKind) -> bool {
        self.flag(kind).get()
    }

    /// Consume an outstanding request, returning whether there was one
    pub fn take_request(&self, kind: CallbackKind) -> bool {
        self.flag(kind).replace(false)
    }

    /// Outstanding requests in delivery order (animate before commit)
    pub fn pending(&self) -> SmallVec<[CallbackKind; 2]> {
        let mut pending = SmallVec::new();
        if self.animate_requested.get() {
            pending.push(CallbackKind::Animate);
        }
        if self.commit_requested.get() {
            pending.push(CallbackKind::Commit);
        }
        pending
    }

    /// Total number of requests of this kind ever made
    pub fn request_count(&self, kind: CallbackKind) -> u64 {
        match kind {
            CallbackKind::Animate => self.animate_requests.get(),
            CallbackKind::Commit => self.commit_requests.get(),
        }
    }

    fn flag(&self, kind: CallbackKind) -> &Cell<bool> {
        match kind {
            CallbackKind::Animate => &self.animate_requested,
            CallbackKind::Commit => &self.commit_requested,
        }
    }
}

impl FrameClock for ManualClock {
    fn request_callback(&self, kind: CallbackKind) {
        self.flag(kind).set(true);
        let counter = match kind {
            CallbackKind::Animate => &self.animate_requests,
            CallbackKind::Commit => &self.commit_requests,
        };
        counter.set(counter.get() + 1);
    }

    fn now_ms(&self) -> i64 {
        self.now_ms.get()
    }
}

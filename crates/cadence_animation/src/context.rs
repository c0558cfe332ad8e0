//! Animation context
//!
//! An [`AnimationContext`] bundles the scheduler, frame clock and timing
//! configuration for one thread. Installing a context makes it the thread's
//! current context; animators started on that thread attach to it. The
//! context stays installed for as long as a handle to it is alive.
//!
//! The host delivers the clock's requested callbacks through
//! [`AnimationContext::dispatch`]. With a [`ManualClock`],
//! [`AnimationContext::pump`] does the delivery in one call.

use crate::error::{AnimationError, Result};
use crate::scheduler::AnimationScheduler;
use cadence_core::{CallbackKind, FrameClock, ManualClock, TimingConfig};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

thread_local! {
    static CURRENT_CONTEXT: RefCell<Weak<ContextInner>> = RefCell::new(Weak::new());
}

pub(crate) struct ContextInner {
    pub(crate) scheduler: AnimationScheduler,
    pub(crate) config: TimingConfig,
    pub(crate) clock: Rc<dyn FrameClock>,
}

/// The calling thread's live context, if any
pub(crate) fn current_inner() -> Option<Rc<ContextInner>> {
    CURRENT_CONTEXT.with(|slot| slot.borrow().upgrade())
}

/// Per-thread owner of the animation scheduler
///
/// Cloning yields another handle to the same context.
#[derive(Clone)]
pub struct AnimationContext {
    inner: Rc<ContextInner>,
}

impl AnimationContext {
    /// Install a context on this thread using the global timing configuration
    pub fn install(clock: Rc<dyn FrameClock>) -> Result<Self> {
        Self::install_with_config(clock, TimingConfig::global().clone())
    }

    /// Install a context with its own timing configuration
    ///
    /// Fails if this thread already has a live context.
    pub fn install_with_config(clock: Rc<dyn FrameClock>, config: TimingConfig) -> Result<Self> {
        CURRENT_CONTEXT.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.upgrade().is_some() {
                return Err(AnimationError::ContextAlreadyInstalled);
            }

            let inner = Rc::new(ContextInner {
                scheduler: AnimationScheduler::new(Rc::clone(&clock)),
                config,
                clock,
            });
            *slot = Rc::downgrade(&inner);
            tracing::debug!("AnimationContext installed");
            Ok(Self { inner })
        })
    }

    /// The context installed on this thread
    pub fn current() -> Option<Self> {
        current_inner().map(|inner| Self { inner })
    }

    pub fn is_installed() -> bool {
        current_inner().is_some()
    }

    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.inner.scheduler
    }

    pub fn config(&self) -> &TimingConfig {
        &self.inner.config
    }

    pub fn now_ms(&self) -> i64 {
        self.inner.clock.now_ms()
    }

    /// Deliver a clock callback
    pub fn dispatch(&self, kind: CallbackKind, time_ms: i64) {
        match kind {
            CallbackKind::Animate => self.inner.scheduler.on_animate(time_ms),
            CallbackKind::Commit => self.inner.scheduler.commit_animation_frame(time_ms),
        }
    }

    /// Run one display cycle on a manual clock
    ///
    /// Delivers the outstanding animate callback at `frame_time_ms`, then the
    /// commit callback at `commit_time_ms`. Returns whether a frame ran.
    pub fn pump(&self, clock: &ManualClock, frame_time_ms: i64, commit_time_ms: i64) -> bool {
        clock.set_now(frame_time_ms);
        let animated = clock.take_request(CallbackKind::Animate);
        if animated {
            self.dispatch(CallbackKind::Animate, frame_time_ms);
        }

        clock.set_now(commit_time_ms);
        if clock.take_request(CallbackKind::Commit) {
            self.dispatch(CallbackKind::Commit, commit_time_ms);
        }
        animated
    }

    /// [`pump`](Self::pump) with the commit landing on the frame time
    pub fn pulse(&self, clock: &ManualClock, time_ms: i64) -> bool {
        self.pump(clock, time_ms, time_ms)
    }

    /// Number of animators currently advancing
    pub fn current_animations_count(&self) -> usize {
        self.inner.scheduler.active_count()
    }

    /// Drop every scheduled animator without notifying listeners
    pub fn clear_all_animations(&self) {
        self.inner.scheduler.clear();
    }

    pub fn last_frame_time_ms(&self) -> i64 {
        self.inner.scheduler.last_frame_time_ms()
    }
}

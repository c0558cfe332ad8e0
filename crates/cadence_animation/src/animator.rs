//! Value animators
//!
//! A [`ValueAnimator`] turns the shared frame time into progress through a
//! timed animation: it tracks when it started, which iteration it is in and
//! which direction it is playing, and emits an eased fraction to its value
//! holders on every frame.
//!
//! Animators are driven by the [`AnimationScheduler`] of the thread's
//! installed [`AnimationContext`](crate::AnimationContext). The scheduler only
//! holds weak references; an animator whose last handle is dropped silently
//! leaves the scheduler on the next frame.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --start--> (pending) --delay?--> Delayed --> Running --done--> Ended
//!   \                                      ^
//!    `--seek--> Seeked --------------------'
//! ```
//!
//! # Example
//!
//! ```ignore
//! let clock = Rc::new(ManualClock::new());
//! let context = AnimationContext::install(clock.clone())?;
//!
//! let fade = ValueAnimator::of_float(&[0.0, 1.0]);
//! fade.set_duration(250)?;
//! fade.add_update_listener(|a| println!("{:?}", a.animated_value::<f32>()));
//! fade.start()?;
//!
//! context.pulse(&clock, 0);
//! context.pulse(&clock, 125);
//! ```

use crate::context::{self, ContextInner};
use crate::easing::{Easing, Interpolator};
use crate::error::{AnimationError, Result};
use crate::listener::{AnimatorListener, ListenerId, ListenerList, UpdateListener};
use crate::scheduler::AnimationScheduler;
use crate::values::{Argb, Interpolate, PropertyValues, ValueHolder, ValueSet};
use cadence_core::{scale_ms, TimingConfig};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

/// Repeat forever
pub const INFINITE: i32 = -1;

/// Duration of a freshly created animator
pub const DEFAULT_DURATION_MS: i64 = 300;

/// What happens at the end of an iteration when repeats remain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RepeatMode {
    /// Start the next iteration from the beginning
    #[default]
    Restart,
    /// Play the next iteration in the opposite direction
    Reverse,
}

/// Where an animator is in its run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// Not running; freshly created or started but awaiting its first frame
    #[default]
    Idle,
    /// Waiting out its start delay
    Delayed,
    Running,
    /// Positioned explicitly while not running
    Seeked,
    /// Finished, cancelled or ended; ready to be started again
    Ended,
}

/// Unique identifier for an animator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimatorId(u64);

static NEXT_ANIMATOR_ID: AtomicU64 = AtomicU64::new(1);

impl AnimatorId {
    fn next() -> Self {
        Self(NEXT_ANIMATOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn to_raw(self) -> u64 {
        self.0
    }
}

/// Nominal timing configuration of an animator
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timing {
    pub duration_ms: i64,
    pub start_delay_ms: i64,
    /// Extra iterations after the first, or [`INFINITE`]
    pub repeat_count: i32,
    pub repeat_mode: RepeatMode,
}

impl Timing {
    pub fn effective_duration(&self, scale: f32) -> i64 {
        scale_ms(self.duration_ms, scale)
    }

    pub fn effective_start_delay(&self, scale: f32) -> i64 {
        scale_ms(self.start_delay_ms, scale)
    }

    pub fn is_infinite(&self) -> bool {
        self.repeat_count == INFINITE
    }

    fn has_iterations_left(&self, iteration: i32) -> bool {
        self.is_infinite() || iteration < self.repeat_count
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_DURATION_MS,
            start_delay_ms: 0,
            repeat_count: 0,
            repeat_mode: RepeatMode::Restart,
        }
    }
}

fn checked_duration(duration_ms: i64) -> Result<i64> {
    if duration_ms < 0 {
        return Err(AnimationError::NegativeDuration(duration_ms));
    }
    Ok(duration_ms)
}

fn clamped_start_delay(delay_ms: i64) -> i64 {
    if delay_ms < 0 {
        tracing::warn!("Negative start delay {}ms clamped to 0", delay_ms);
        return 0;
    }
    delay_ms
}

fn clamped_repeat_count(count: i32) -> i32 {
    if count < INFINITE {
        tracing::warn!("Repeat count {} is not valid, using 0", count);
        return 0;
    }
    count
}

// ============================================================================
// Animator State
// ============================================================================

/// Outcome of advancing the timing state to a frame time
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FrameStep {
    /// Direction-adjusted fraction, before easing
    pub fraction: f32,
    /// Repeat notifications to fire
    pub repeats: u32,
    /// All iterations are complete
    pub done: bool,
}

#[derive(Debug)]
pub(crate) struct AnimatorState {
    pub timing: Timing,
    pub lifecycle: Lifecycle,
    pub started: bool,
    pub running: bool,
    pub paused: bool,
    pub resumed: bool,
    pub playing_backwards: bool,
    pub reversing: bool,
    pub start_listeners_called: bool,
    pub started_delay: bool,
    pub start_time_ms: i64,
    pub start_time_committed: bool,
    /// Pending seek position, `-1.0` when none
    pub seek_fraction: f32,
    pub current_iteration: i32,
    pub current_fraction: f32,
    /// `-1` until the pause is observed by a frame
    pub pause_time_ms: i64,
    pub delay_start_time_ms: i64,
}

impl AnimatorState {
    fn new(timing: Timing) -> Self {
        Self {
            timing,
            lifecycle: Lifecycle::Idle,
            started: false,
            running: false,
            paused: false,
            resumed: false,
            playing_backwards: false,
            reversing: false,
            start_listeners_called: false,
            started_delay: false,
            start_time_ms: 0,
            start_time_committed: false,
            seek_fraction: -1.0,
            current_iteration: 0,
            current_fraction: 0.0,
            pause_time_ms: -1,
            delay_start_time_ms: 0,
        }
    }

    fn has_pending_seek(&self) -> bool {
        self.seek_fraction >= 0.0
    }

    /// Advance the iteration bookkeeping to `current_time`
    ///
    /// `duration` is the effective duration. Crosses every repeat boundary the
    /// elapsed time covers in one step, flipping direction by the parity of
    /// the iterations crossed in [`RepeatMode::Reverse`]. A finite animator
    /// reports one repeat per iteration crossed; an infinite one reports a
    /// single repeat for the frame.
    pub(crate) fn advance_to(&mut self, current_time: i64, duration: i64) -> FrameStep {
        let mut repeats = 0u32;
        let mut fraction = if duration > 0 {
            current_time.saturating_sub(self.start_time_ms) as f64 / duration as f64
        } else {
            1.0
        };

        if duration == 0 && !self.timing.is_infinite() {
            // Skip straight to the last iteration
            let remaining = self.timing.repeat_count - self.current_iteration;
            repeats = remaining.max(0) as u32;
            self.current_iteration = self.timing.repeat_count;
            if !self.reversing {
                self.playing_backwards = false;
            }
        }

        if fraction >= 1.0 && self.timing.has_iterations_left(self.current_iteration) {
            // Float to int casts saturate
            let mut crossed = fraction.floor() as i64;
            if self.timing.is_infinite() {
                repeats = 1;
            } else {
                crossed = crossed.min(i64::from(self.timing.repeat_count - self.current_iteration));
                repeats = crossed as u32;
            }

            if self.timing.repeat_mode == RepeatMode::Reverse && crossed % 2 == 1 {
                self.playing_backwards = !self.playing_backwards;
            }
            self.current_iteration = i64::from(self.current_iteration)
                .saturating_add(crossed)
                .min(i64::from(i32::MAX)) as i32;
            self.start_time_ms = self
                .start_time_ms
                .saturating_add(duration.saturating_mul(crossed));

            fraction = if duration > 0 {
                current_time.saturating_sub(self.start_time_ms) as f64 / duration as f64
            } else {
                0.0
            };
        }

        let done = fraction >= 1.0;
        let mut fraction = fraction.min(1.0) as f32;
        if self.playing_backwards {
            fraction = 1.0 - fraction;
        }

        FrameStep {
            fraction,
            repeats,
            done,
        }
    }

    /// Clear everything tied to the current run
    fn reset_run(&mut self) {
        self.lifecycle = Lifecycle::Ended;
        self.started = false;
        self.running = false;
        self.paused = false;
        self.resumed = false;
        self.pause_time_ms = -1;
        self.playing_backwards = false;
        self.reversing = false;
        self.start_listeners_called = false;
        self.started_delay = false;
        self.start_time_committed = false;
        self.seek_fraction = -1.0;
        self.current_iteration = 0;
    }
}

// ============================================================================
// Value Animator
// ============================================================================

pub(crate) struct AnimatorCell {
    id: AnimatorId,
    state: RefCell<AnimatorState>,
    values: RefCell<ValueSet>,
    interpolator: RefCell<Rc<dyn Interpolator>>,
    listeners: RefCell<ListenerList<dyn AnimatorListener>>,
    update_listeners: RefCell<ListenerList<UpdateListener>>,
    /// Context the animator was last started in
    context: RefCell<Weak<ContextInner>>,
}

/// A time-based animation driven by the frame clock
///
/// Cloning yields another handle to the same animator. Use
/// [`ValueAnimator::to_builder`] for an independent copy.
#[derive(Clone)]
pub struct ValueAnimator {
    cell: Rc<AnimatorCell>,
}

impl ValueAnimator {
    /// Create an animator with default timing and no values
    pub fn new() -> Self {
        Self::from_parts(
            Timing::default(),
            Vec::new(),
            None,
            ListenerList::new(),
            ListenerList::new(),
        )
    }

    /// Animate between floats
    pub fn of_float(values: &[f32]) -> Self {
        let animator = Self::new();
        animator.set_float_values(values);
        animator
    }

    /// Animate between integers (truncating)
    pub fn of_int(values: &[i32]) -> Self {
        let animator = Self::new();
        animator.set_int_values(values);
        animator
    }

    /// Animate between packed `0xAARRGGBB` colors, channel by channel
    pub fn of_argb(values: &[u32]) -> Self {
        let animator = Self::new();
        animator.set_argb_values(values);
        animator
    }

    /// Animate arbitrary value holders
    pub fn of_values(holders: Vec<Box<dyn ValueHolder>>) -> Self {
        let animator = Self::new();
        animator.set_values(holders);
        animator
    }

    pub fn builder() -> AnimatorBuilder {
        AnimatorBuilder::new()
    }

    fn from_parts(
        timing: Timing,
        holders: Vec<Box<dyn ValueHolder>>,
        interpolator: Option<Rc<dyn Interpolator>>,
        listeners: ListenerList<dyn AnimatorListener>,
        update_listeners: ListenerList<UpdateListener>,
    ) -> Self {
        let interpolator =
            interpolator.unwrap_or_else(|| Rc::new(Easing::AccelerateDecelerate));
        Self {
            cell: Rc::new(AnimatorCell {
                id: AnimatorId::next(),
                state: RefCell::new(AnimatorState::new(timing)),
                values: RefCell::new(ValueSet::new(holders)),
                interpolator: RefCell::new(interpolator),
                listeners: RefCell::new(listeners),
                update_listeners: RefCell::new(update_listeners),
                context: RefCell::new(Weak::new()),
            }),
        }
    }

    pub(crate) fn from_weak(weak: &Weak<AnimatorCell>) -> Option<Self> {
        weak.upgrade().map(|cell| Self { cell })
    }

    pub(crate) fn downgrade(&self) -> Weak<AnimatorCell> {
        Rc::downgrade(&self.cell)
    }

    /// Copy this animator's configuration into a builder
    ///
    /// Timing, interpolator, value holders and listeners are copied; run state
    /// is not.
    pub fn to_builder(&self) -> AnimatorBuilder {
        AnimatorBuilder {
            timing: self.timing(),
            holders: self.cell.values.borrow().clone_holders(),
            interpolator: Some(self.interpolator()),
            listeners: self.cell.listeners.borrow().duplicate(),
            update_listeners: self.cell.update_listeners.borrow().duplicate(),
        }
    }

    pub fn id(&self) -> AnimatorId {
        self.cell.id
    }

    /// Check whether two handles refer to the same animator
    pub fn ptr_eq(&self, other: &ValueAnimator) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    pub fn timing(&self) -> Timing {
        self.cell.state.borrow().timing
    }

    pub fn duration_ms(&self) -> i64 {
        self.cell.state.borrow().timing.duration_ms
    }

    /// Set the nominal duration; negative durations are rejected
    pub fn set_duration(&self, duration_ms: i64) -> Result<()> {
        let duration_ms = checked_duration(duration_ms)?;
        self.cell.state.borrow_mut().timing.duration_ms = duration_ms;
        Ok(())
    }

    /// Duration after applying the duration scale
    pub fn effective_duration_ms(&self) -> i64 {
        self.timing().effective_duration(self.duration_scale())
    }

    pub fn start_delay_ms(&self) -> i64 {
        self.cell.state.borrow().timing.start_delay_ms
    }

    /// Set the nominal start delay; negative delays are clamped to 0
    pub fn set_start_delay(&self, delay_ms: i64) {
        self.cell.state.borrow_mut().timing.start_delay_ms = clamped_start_delay(delay_ms);
    }

    pub fn effective_start_delay_ms(&self) -> i64 {
        self.timing().effective_start_delay(self.duration_scale())
    }

    pub fn repeat_count(&self) -> i32 {
        self.cell.state.borrow().timing.repeat_count
    }

    /// Set the number of extra iterations, or [`INFINITE`]
    pub fn set_repeat_count(&self, count: i32) {
        self.cell.state.borrow_mut().timing.repeat_count = clamped_repeat_count(count);
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.cell.state.borrow().timing.repeat_mode
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) {
        self.cell.state.borrow_mut().timing.repeat_mode = mode;
    }

    pub fn interpolator(&self) -> Rc<dyn Interpolator> {
        Rc::clone(&self.cell.interpolator.borrow())
    }

    /// Set the easing curve; `None` means linear
    pub fn set_interpolator(&self, interpolator: Option<Rc<dyn Interpolator>>) {
        *self.cell.interpolator.borrow_mut() =
            interpolator.unwrap_or_else(|| Rc::new(Easing::Linear));
    }

    /// Replace the values with floats
    ///
    /// Keeps the property name of the current first holder, if any.
    pub fn set_float_values(&self, values: &[f32]) {
        self.set_keyframes(values);
    }

    pub fn set_int_values(&self, values: &[i32]) {
        self.set_keyframes(values);
    }

    pub fn set_argb_values(&self, values: &[u32]) {
        let colors: Vec<Argb> = values.iter().map(|&value| Argb(value)).collect();
        self.set_keyframes(&colors);
    }

    fn set_keyframes<T: Interpolate>(&self, values: &[T]) {
        let name = self.cell.values.borrow().first_name().unwrap_or_default();
        self.set_values(vec![Box::new(PropertyValues::new(name, values))]);
    }

    /// Replace the value holders
    ///
    /// The new holders are initialized again before their first value.
    pub fn set_values(&self, holders: Vec<Box<dyn ValueHolder>>) {
        *self.cell.values.borrow_mut() = ValueSet::new(holders);
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    pub fn add_listener<L: AnimatorListener + 'static>(&self, listener: L) -> ListenerId {
        self.cell.listeners.borrow_mut().add(Rc::new(listener))
    }

    /// Register an already shared listener
    pub fn add_shared_listener(&self, listener: Rc<dyn AnimatorListener>) -> ListenerId {
        self.cell.listeners.borrow_mut().add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.cell.listeners.borrow_mut().remove(id)
    }

    pub fn remove_all_listeners(&self) {
        self.cell.listeners.borrow_mut().clear();
    }

    pub fn add_update_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ValueAnimator) + 'static,
    {
        self.cell.update_listeners.borrow_mut().add(Rc::new(listener))
    }

    pub fn remove_update_listener(&self, id: ListenerId) -> bool {
        self.cell.update_listeners.borrow_mut().remove(id)
    }

    pub fn remove_all_update_listeners(&self) {
        self.cell.update_listeners.borrow_mut().clear();
    }

    fn notify_listeners(&self, notify: impl Fn(&dyn AnimatorListener, &ValueAnimator)) {
        let listeners = self.cell.listeners.borrow().snapshot();
        for listener in listeners {
            notify(&*listener, self);
        }
    }

    fn notify_start_listeners(&self) {
        let first = {
            let mut state = self.cell.state.borrow_mut();
            !std::mem::replace(&mut state.start_listeners_called, true)
        };
        if first {
            self.notify_listeners(|listener, animator| listener.on_start(animator));
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn lifecycle(&self) -> Lifecycle {
        self.cell.state.borrow().lifecycle
    }

    /// Started and not yet ended, including while delayed or paused
    pub fn is_started(&self) -> bool {
        self.cell.state.borrow().started
    }

    /// Past its start delay (or started without one)
    pub fn is_running(&self) -> bool {
        let state = self.cell.state.borrow();
        state.lifecycle == Lifecycle::Running || state.running
    }

    pub fn is_paused(&self) -> bool {
        self.cell.state.borrow().paused
    }

    /// Elapsed time in the current iteration, 0 when not running or seeked
    pub fn current_play_time(&self) -> i64 {
        if !self.cell.values.borrow().is_initialized() {
            return 0;
        }
        let start_time = {
            let state = self.cell.state.borrow();
            match state.lifecycle {
                Lifecycle::Running | Lifecycle::Seeked => state.start_time_ms,
                _ => return 0,
            }
        };
        self.now_ms() - start_time
    }

    /// The eased fraction of the most recent emitted value
    pub fn animated_fraction(&self) -> f32 {
        self.cell.state.borrow().current_fraction
    }

    pub fn current_iteration(&self) -> i32 {
        self.cell.state.borrow().current_iteration
    }

    /// Most recent value of the first value holder
    pub fn animated_value<T: Any + Clone>(&self) -> Option<T> {
        self.cell
            .values
            .borrow()
            .first()
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// Most recent value of the named property
    pub fn animated_value_of<T: Any + Clone>(&self, name: &str) -> Option<T> {
        self.cell
            .values
            .borrow()
            .get(name)
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// Property names of the value holders, in order
    pub fn value_names(&self) -> Vec<String> {
        self.cell.values.borrow().names()
    }

    // ========================================================================
    // Context Lookup
    // ========================================================================

    fn context(&self) -> Option<Rc<ContextInner>> {
        self.cell
            .context
            .borrow()
            .upgrade()
            .or_else(context::current_inner)
    }

    fn duration_scale(&self) -> f32 {
        match self.context() {
            Some(context) => context.config.duration_scale(),
            None => TimingConfig::global().duration_scale(),
        }
    }

    fn now_ms(&self) -> i64 {
        self.context().map(|context| context.clock.now_ms()).unwrap_or(0)
    }

    // ========================================================================
    // Public Operations
    // ========================================================================

    /// Start playing forward
    ///
    /// Requires an [`AnimationContext`](crate::AnimationContext) on this
    /// thread. Without a start delay the initial value is emitted and start
    /// listeners fire before this returns.
    pub fn start(&self) -> Result<()> {
        self.start_with_direction(false)
    }

    /// Start playing from the end toward the beginning
    pub fn start_reversed(&self) -> Result<()> {
        self.start_with_direction(true)
    }

    fn start_with_direction(&self, playing_backwards: bool) -> Result<()> {
        let context = context::current_inner().ok_or(AnimationError::NoAnimationContext)?;
        context.scheduler.remove(self.id());
        *self.cell.context.borrow_mut() = Rc::downgrade(&context);

        let scale = context.config.duration_scale();
        let (previous, delayed) = {
            let mut state = self.cell.state.borrow_mut();
            state.reversing = playing_backwards;
            state.playing_backwards = playing_backwards;

            let timing = state.timing;
            if playing_backwards && state.has_pending_seek() {
                let seek = if state.seek_fraction == 0.0 && state.current_iteration == 0 {
                    0.0
                } else if timing.is_infinite() {
                    1.0 - state.seek_fraction % 1.0
                } else {
                    1.0 + timing.repeat_count as f32
                        - (state.current_iteration as f32 + state.seek_fraction)
                };
                state.current_iteration = seek as i32;
                state.seek_fraction = seek % 1.0;
            }

            let iteration = state.current_iteration;
            if iteration > 0
                && timing.repeat_mode == RepeatMode::Reverse
                && (timing.is_infinite() || iteration < timing.repeat_count.saturating_add(1))
            {
                // Direction follows the parity of the seeked iteration
                state.playing_backwards = if playing_backwards {
                    iteration % 2 == 0
                } else {
                    iteration % 2 != 0
                };
            }

            let previous = state.lifecycle;
            state.lifecycle = Lifecycle::Idle;
            state.started = true;
            state.started_delay = false;
            state.paused = false;
            (previous, timing.effective_start_delay(scale) > 0)
        };

        context.scheduler.add_pending(self);
        tracing::debug!(
            "Animator {:?}: start (reversed: {}, delayed: {})",
            self.id(),
            playing_backwards,
            delayed
        );

        if !delayed {
            if previous != Lifecycle::Seeked {
                self.set_current_play_time(0);
            }
            {
                let mut state = self.cell.state.borrow_mut();
                state.lifecycle = Lifecycle::Idle;
                state.running = true;
            }
            self.notify_start_listeners();
        }

        context.scheduler.schedule_animation();
        Ok(())
    }

    /// Stop immediately, leaving values where they are
    ///
    /// Fires `on_cancel` then `on_end` if the animator was started.
    pub fn cancel(&self) {
        let scheduled = self
            .context()
            .map(|context| context.scheduler.contains(self.id()))
            .unwrap_or(false);
        let (eligible, notify) = {
            let state = self.cell.state.borrow();
            let live = state.started
                || state.running
                || matches!(state.lifecycle, Lifecycle::Running | Lifecycle::Seeked);
            (scheduled || live, state.started || state.running)
        };
        if !eligible {
            return;
        }

        tracing::debug!("Animator {:?}: cancel", self.id());
        if notify {
            self.notify_start_listeners();
            self.notify_listeners(|listener, animator| listener.on_cancel(animator));
        }
        self.end_animation();
    }

    /// Jump to the final value and finish
    ///
    /// An animator that was never started is started and ended in one step.
    pub fn end(&self) {
        let context = self.context();
        let scheduled = context
            .as_ref()
            .map(|context| {
                context.scheduler.is_active(self.id()) || context.scheduler.is_pending(self.id())
            })
            .unwrap_or(false);

        if !scheduled {
            self.cell.state.borrow_mut().started_delay = false;
            self.start_animation(context.as_ref().map(|context| &context.scheduler));
            self.cell.state.borrow_mut().started = true;
        } else {
            self.init_values();
        }

        let backwards = self.cell.state.borrow().playing_backwards;
        tracing::debug!("Animator {:?}: end", self.id());
        self.animate_value(if backwards { 0.0 } else { 1.0 });
        self.end_animation();
    }

    /// Freeze progress until [`resume`](Self::resume)
    ///
    /// The paused span is excluded from elapsed time. No effect unless started.
    pub fn pause(&self) {
        let paused = {
            let mut state = self.cell.state.borrow_mut();
            if state.started && !state.paused {
                state.paused = true;
                state.pause_time_ms = -1;
                state.resumed = false;
                true
            } else {
                false
            }
        };
        if paused {
            tracing::debug!("Animator {:?}: pause", self.id());
            self.notify_listeners(|listener, animator| listener.on_pause(animator));
        }
    }

    pub fn resume(&self) {
        let resumed = {
            let mut state = self.cell.state.borrow_mut();
            if state.paused {
                state.paused = false;
                state.resumed = true;
                true
            } else {
                false
            }
        };
        if resumed {
            tracing::debug!("Animator {:?}: resume", self.id());
            self.notify_listeners(|listener, animator| listener.on_resume(animator));
        }
    }

    /// Play in the opposite direction
    ///
    /// A running animator turns around at its current position. One that is
    /// started but not yet running restarts in the opposite direction. An idle
    /// animator starts reversed.
    pub fn reverse(&self) -> Result<()> {
        let now = self.now_ms();
        let scale = self.duration_scale();
        let restart = {
            let mut state = self.cell.state.borrow_mut();
            state.playing_backwards = !state.playing_backwards;
            if state.lifecycle == Lifecycle::Running {
                let duration = state.timing.effective_duration(scale);
                let play_time = now - state.start_time_ms;
                state.start_time_ms = now - (duration - play_time);
                state.start_time_committed = true;
                state.reversing = !state.reversing;
                None
            } else if state.started {
                Some(!state.reversing)
            } else {
                Some(true)
            }
        };

        match restart {
            Some(backwards) => self.start_with_direction(backwards),
            None => {
                tracing::debug!("Animator {:?}: reversed in flight", self.id());
                Ok(())
            }
        }
    }

    /// Seek to a position in milliseconds of nominal duration
    pub fn set_current_play_time(&self, play_time_ms: i64) {
        let duration = self.duration_ms();
        let fraction = if duration > 0 {
            play_time_ms as f32 / duration as f32
        } else {
            1.0
        };
        self.set_current_fraction(fraction);
    }

    /// Seek to a fraction of the whole animation
    ///
    /// The integer part selects the iteration. Values past the last iteration
    /// clamp to its end. Emits the value at the new position; lifecycle
    /// listeners do not fire.
    pub fn set_current_fraction(&self, fraction: f32) {
        self.init_values();
        let now = self.now_ms();
        let scale = self.duration_scale();

        let emitted = {
            let mut state = self.cell.state.borrow_mut();
            let timing = state.timing;
            let mut fraction = fraction.max(0.0);
            let mut iteration = fraction as i32;

            if fraction == 1.0 {
                iteration -= 1;
            } else if fraction > 1.0 {
                if timing.is_infinite() || iteration < timing.repeat_count.saturating_add(1) {
                    if timing.repeat_mode == RepeatMode::Reverse {
                        state.playing_backwards = iteration % 2 != 0;
                    }
                    fraction %= 1.0;
                } else {
                    fraction = 1.0;
                    iteration = timing.repeat_count;
                    if timing.repeat_mode == RepeatMode::Reverse {
                        state.playing_backwards = timing.repeat_count % 2 != 0;
                    }
                }
            } else {
                state.playing_backwards = state.reversing;
            }

            state.current_iteration = iteration;
            let seek_time = (timing.effective_duration(scale) as f32 * fraction) as i64;
            state.start_time_ms = now - seek_time;
            state.start_time_committed = true;
            if state.lifecycle != Lifecycle::Running {
                state.seek_fraction = fraction;
                state.lifecycle = Lifecycle::Seeked;
            }

            if state.playing_backwards {
                1.0 - fraction
            } else {
                fraction
            }
        };

        self.animate_value(emitted);
    }

    // ========================================================================
    // Value Emission
    // ========================================================================

    fn init_values(&self) {
        if !self.cell.values.borrow().is_initialized() {
            self.with_values(ValueSet::init);
        }
    }

    /// Run holder code without keeping the value set borrowed
    fn with_values(&self, f: impl FnOnce(&mut ValueSet)) {
        let mut values = self.cell.values.replace(ValueSet::detached());
        f(&mut values);
        let mut slot = self.cell.values.borrow_mut();
        // Holders assigned meanwhile win
        if slot.is_detached() {
            *slot = values;
        }
    }

    fn animate_value(&self, fraction: f32) {
        let interpolator = self.interpolator();
        let eased = interpolator.interpolation(fraction);
        self.cell.state.borrow_mut().current_fraction = eased;
        self.with_values(|values| values.calculate(eased));

        let listeners = self.cell.update_listeners.borrow().snapshot();
        for listener in listeners {
            listener(self);
        }
    }

    // ========================================================================
    // Scheduler Hooks
    // ========================================================================

    /// Register as active and fire delayed start notifications
    pub(crate) fn start_animation(&self, scheduler: Option<&AnimationScheduler>) {
        self.init_values();
        if let Some(scheduler) = scheduler {
            scheduler.admit_active(self);
        }
        // Also covers a delay that shrank to zero after `start()`
        self.notify_start_listeners();
    }

    pub(crate) fn enter_delayed(&self) {
        let mut state = self.cell.state.borrow_mut();
        if state.lifecycle != Lifecycle::Seeked {
            state.lifecycle = Lifecycle::Delayed;
        }
    }

    pub(crate) fn mark_running(&self) {
        self.cell.state.borrow_mut().running = true;
    }

    /// Process a frame while waiting out the start delay
    ///
    /// Returns true once the delay has elapsed.
    pub(crate) fn delay_tick(&self, frame_time: i64) -> bool {
        let delay = self.effective_start_delay_ms();
        let mut state = self.cell.state.borrow_mut();
        if !state.started_delay {
            state.started_delay = true;
            state.delay_start_time_ms = frame_time;
        }

        if state.paused {
            if state.pause_time_ms < 0 {
                state.pause_time_ms = frame_time;
            }
            return false;
        } else if state.resumed {
            state.resumed = false;
            if state.pause_time_ms >= 0 {
                state.delay_start_time_ms += frame_time - state.pause_time_ms;
            }
        }

        if frame_time - state.delay_start_time_ms > delay {
            state.start_time_ms = state.delay_start_time_ms + delay;
            state.start_time_committed = true;
            state.lifecycle = if state.has_pending_seek() {
                Lifecycle::Seeked
            } else {
                Lifecycle::Running
            };
            return true;
        }
        false
    }

    /// Process one frame; returns true when the animation has finished
    pub(crate) fn do_animation_frame(&self, frame_time: i64) -> bool {
        let scale = self.duration_scale();
        let current_time = {
            let mut state = self.cell.state.borrow_mut();
            if state.lifecycle != Lifecycle::Running {
                let keep_committed = state.lifecycle == Lifecycle::Seeked;
                state.lifecycle = Lifecycle::Running;
                if state.has_pending_seek() {
                    let duration = state.timing.effective_duration(scale);
                    state.start_time_ms =
                        frame_time - (duration as f32 * state.seek_fraction) as i64;
                    state.seek_fraction = -1.0;
                } else {
                    state.start_time_ms = frame_time;
                }
                state.start_time_committed = keep_committed;
            }

            if state.paused {
                if state.pause_time_ms < 0 {
                    state.pause_time_ms = frame_time;
                }
                return false;
            } else if state.resumed {
                state.resumed = false;
                if state.pause_time_ms >= 0 {
                    state.start_time_ms += frame_time - state.pause_time_ms;
                    state.start_time_committed = false;
                }
            }

            // Never animate before the start time
            frame_time.max(state.start_time_ms)
        };

        self.animation_frame(current_time, scale)
    }

    fn animation_frame(&self, current_time: i64, scale: f32) -> bool {
        let step = {
            let mut state = self.cell.state.borrow_mut();
            let duration = state.timing.effective_duration(scale);
            state.advance_to(current_time, duration)
        };

        if step.repeats > 0 {
            for _ in 0..step.repeats {
                self.notify_listeners(|listener, animator| listener.on_repeat(animator));
            }
            if self.lifecycle() != Lifecycle::Running {
                // A repeat listener stopped or restarted us
                return false;
            }
        }

        tracing::trace!(
            "Animator {:?}: frame at {} -> {:.3}",
            self.id(),
            current_time,
            step.fraction
        );
        self.animate_value(step.fraction);
        step.done
    }

    /// Absorb the gap between the first frame and its commit
    pub(crate) fn commit_start_time(&self, adjustment: i64) {
        let mut state = self.cell.state.borrow_mut();
        if !state.start_time_committed {
            state.start_time_committed = true;
            if state.lifecycle == Lifecycle::Running && adjustment > 0 {
                state.start_time_ms += adjustment;
                tracing::trace!(
                    "Animator {:?}: start time adjusted by {}ms",
                    self.cell.id,
                    adjustment
                );
            }
        }
    }

    /// Leave the scheduler and notify `on_end`
    ///
    /// Run state is reset before listeners fire so `on_end` may restart.
    pub(crate) fn end_animation(&self) {
        if let Some(context) = self.context() {
            context.scheduler.remove(self.id());
        }

        let (notify, deferred_start) = {
            let mut state = self.cell.state.borrow_mut();
            let notify = state.started || state.running;
            let deferred_start = notify && !state.start_listeners_called;
            state.reset_run();
            (notify, deferred_start)
        };

        tracing::debug!("Animator {:?}: ended", self.id());
        if deferred_start {
            self.notify_listeners(|listener, animator| listener.on_start(animator));
        }
        if notify {
            self.notify_listeners(|listener, animator| listener.on_end(animator));
        }
    }

    /// Drop run state without notifying anyone
    pub(crate) fn detach(&self) {
        self.cell.state.borrow_mut().reset_run();
    }
}

impl Default for ValueAnimator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ValueAnimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.cell.state.borrow();
        f.debug_struct("ValueAnimator")
            .field("id", &self.cell.id)
            .field("timing", &state.timing)
            .field("lifecycle", &state.lifecycle)
            .field("iteration", &state.current_iteration)
            .field("fraction", &state.current_fraction)
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ValueAnimator`]
///
/// ```ignore
/// let pulse = ValueAnimator::builder()
///     .duration(400)
///     .repeat_count(INFINITE)
///     .repeat_mode(RepeatMode::Reverse)
///     .float_values(&[1.0, 1.2])
///     .build()?;
/// ```
pub struct AnimatorBuilder {
    timing: Timing,
    holders: Vec<Box<dyn ValueHolder>>,
    interpolator: Option<Rc<dyn Interpolator>>,
    listeners: ListenerList<dyn AnimatorListener>,
    update_listeners: ListenerList<UpdateListener>,
}

impl AnimatorBuilder {
    pub fn new() -> Self {
        Self {
            timing: Timing::default(),
            holders: Vec::new(),
            interpolator: None,
            listeners: ListenerList::new(),
            update_listeners: ListenerList::new(),
        }
    }

    /// Nominal duration; validated in [`build`](Self::build)
    pub fn duration(mut self, duration_ms: i64) -> Self {
        self.timing.duration_ms = duration_ms;
        self
    }

    pub fn start_delay(mut self, delay_ms: i64) -> Self {
        self.timing.start_delay_ms = clamped_start_delay(delay_ms);
        self
    }

    pub fn repeat_count(mut self, count: i32) -> Self {
        self.timing.repeat_count = clamped_repeat_count(count);
        self
    }

    pub fn repeat_mode(mut self, mode: RepeatMode) -> Self {
        self.timing.repeat_mode = mode;
        self
    }

    pub fn interpolator<I: Interpolator + 'static>(mut self, interpolator: I) -> Self {
        self.interpolator = Some(Rc::new(interpolator));
        self
    }

    pub fn float_values(self, values: &[f32]) -> Self {
        self.values(vec![Box::new(PropertyValues::new("", values))])
    }

    pub fn int_values(self, values: &[i32]) -> Self {
        self.values(vec![Box::new(PropertyValues::new("", values))])
    }

    pub fn argb_values(self, values: &[u32]) -> Self {
        let colors: Vec<Argb> = values.iter().map(|&value| Argb(value)).collect();
        self.values(vec![Box::new(PropertyValues::new("", &colors))])
    }

    /// Replace all value holders
    pub fn values(mut self, holders: Vec<Box<dyn ValueHolder>>) -> Self {
        self.holders = holders;
        self
    }

    /// Add one named property
    pub fn property<T: Interpolate>(mut self, values: PropertyValues<T>) -> Self {
        self.holders.push(Box::new(values));
        self
    }

    pub fn listener<L: AnimatorListener + 'static>(mut self, listener: L) -> Self {
        self.listeners.add(Rc::new(listener));
        self
    }

    pub fn on_update<F: Fn(&ValueAnimator) + 'static>(mut self, listener: F) -> Self {
        self.update_listeners.add(Rc::new(listener));
        self
    }

    pub fn build(self) -> Result<ValueAnimator> {
        checked_duration(self.timing.duration_ms)?;
        Ok(ValueAnimator::from_parts(
            self.timing,
            self.holders,
            self.interpolator,
            self.listeners,
            self.update_listeners,
        ))
    }
}

impl Default for AnimatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AnimationContext;
    use cadence_core::ManualClock;
    use std::cell::Cell;

    #[derive(Default)]
    struct Counts {
        start: Cell<u32>,
        end: Cell<u32>,
        cancel: Cell<u32>,
        repeat: Cell<u32>,
        pause: Cell<u32>,
        resume: Cell<u32>,
    }

    struct Counter(Rc<Counts>);

    impl AnimatorListener for Counter {
        fn on_start(&self, _: &ValueAnimator) {
            self.0.start.set(self.0.start.get() + 1);
        }
        fn on_end(&self, _: &ValueAnimator) {
            self.0.end.set(self.0.end.get() + 1);
        }
        fn on_cancel(&self, _: &ValueAnimator) {
            self.0.cancel.set(self.0.cancel.get() + 1);
        }
        fn on_repeat(&self, _: &ValueAnimator) {
            self.0.repeat.set(self.0.repeat.get() + 1);
        }
        fn on_pause(&self, _: &ValueAnimator) {
            self.0.pause.set(self.0.pause.get() + 1);
        }
        fn on_resume(&self, _: &ValueAnimator) {
            self.0.resume.set(self.0.resume.get() + 1);
        }
    }

    fn counted(animator: &ValueAnimator) -> Rc<Counts> {
        let counts = Rc::new(Counts::default());
        animator.add_listener(Counter(Rc::clone(&counts)));
        counts
    }

    fn setup() -> (Rc<ManualClock>, AnimationContext) {
        let clock = Rc::new(ManualClock::new());
        let context = AnimationContext::install_with_config(clock.clone(), TimingConfig::new())
            .expect("fresh thread has no context");
        (clock, context)
    }

    fn linear(values: &[f32]) -> ValueAnimator {
        let animator = ValueAnimator::of_float(values);
        animator.set_interpolator(None);
        animator
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_advance_to_crosses_repeats() {
        let mut state = AnimatorState::new(Timing {
            duration_ms: 100,
            repeat_count: 3,
            repeat_mode: RepeatMode::Reverse,
            ..Timing::default()
        });
        state.start_time_ms = 0;

        let step = state.advance_to(250, 100);
        assert_eq!(step.repeats, 2);
        assert!(!step.done);
        assert_eq!(state.current_iteration, 2);
        assert_eq!(state.start_time_ms, 200);
        // Two flips leave the direction forward
        assert_close(step.fraction, 0.5);

        let step = state.advance_to(1000, 100);
        assert_eq!(step.repeats, 1);
        assert!(step.done);
        assert_eq!(state.current_iteration, 3);
        // Iteration 3 of a reversing animation plays backwards
        assert_close(step.fraction, 0.0);
    }

    #[test]
    fn test_advance_to_huge_gap_is_one_step() {
        let mut state = AnimatorState::new(Timing {
            duration_ms: 1,
            repeat_count: INFINITE,
            ..Timing::default()
        });
        state.start_time_ms = 0;

        let step = state.advance_to(20_000_000, 1);
        assert_eq!(step.repeats, 1);
        assert!(!step.done);
        assert_eq!(state.current_iteration, 20_000_000);
        assert_eq!(state.start_time_ms, 20_000_000);
        assert_close(step.fraction, 0.0);
    }

    #[test]
    fn test_advance_to_huge_gap_reverse_parity() {
        let mut state = AnimatorState::new(Timing {
            duration_ms: 4,
            repeat_count: INFINITE,
            repeat_mode: RepeatMode::Reverse,
            ..Timing::default()
        });
        state.start_time_ms = 0;

        // 20_000_001 iterations crossed: an odd count leaves us backwards
        let step = state.advance_to(4 * 20_000_001 + 1, 4);
        assert!(state.playing_backwards);
        assert_eq!(state.current_iteration, 20_000_001);
        assert_close(step.fraction, 0.75);
    }

    #[test]
    fn test_advance_to_huge_gap_finite_caps_repeats() {
        let mut state = AnimatorState::new(Timing {
            duration_ms: 1,
            repeat_count: 1000,
            ..Timing::default()
        });
        state.start_time_ms = 0;

        let step = state.advance_to(1 << 30, 1);
        assert_eq!(step.repeats, 1000);
        assert!(step.done);
        assert_eq!(state.current_iteration, 1000);
        assert_close(step.fraction, 1.0);
    }

    #[test]
    fn test_advance_to_zero_duration() {
        let mut state = AnimatorState::new(Timing {
            duration_ms: 0,
            repeat_count: 2,
            ..Timing::default()
        });
        let step = state.advance_to(0, 0);
        assert_eq!(step.repeats, 2);
        assert!(step.done);
        assert_close(step.fraction, 1.0);
        assert_eq!(state.current_iteration, 2);
    }

    #[test]
    fn test_negative_duration_rejected() {
        let animator = ValueAnimator::new();
        assert_eq!(
            animator.set_duration(-5),
            Err(AnimationError::NegativeDuration(-5))
        );
        assert_eq!(animator.duration_ms(), DEFAULT_DURATION_MS);

        let built = ValueAnimator::builder().duration(-1).build();
        assert!(matches!(built, Err(AnimationError::NegativeDuration(-1))));
    }

    #[test]
    fn test_negative_delay_clamped() {
        let animator = ValueAnimator::new();
        animator.set_start_delay(-20);
        assert_eq!(animator.start_delay_ms(), 0);
    }

    #[test]
    fn test_start_without_context_fails() {
        let animator = ValueAnimator::of_float(&[0.0, 1.0]);
        assert_eq!(animator.start(), Err(AnimationError::NoAnimationContext));
        assert!(!animator.is_started());
    }

    #[test]
    fn test_start_emits_initial_value() {
        let (clock, _context) = setup();
        let animator = linear(&[10.0, 20.0]);
        let counts = counted(&animator);

        animator.start().unwrap();
        assert!(animator.is_started());
        assert!(animator.is_running());
        assert_eq!(counts.start.get(), 1);
        assert_eq!(animator.animated_value::<f32>(), Some(10.0));
        assert!(clock.is_requested(cadence_core::CallbackKind::Animate));
    }

    #[test]
    fn test_default_interpolator_is_accelerate_decelerate() {
        let animator = ValueAnimator::new();
        assert_close(animator.interpolator().interpolation(0.25), 0.1464466);
    }

    #[test]
    fn test_runs_to_completion() {
        let (clock, context) = setup();
        let animator = linear(&[0.0, 100.0]);
        animator.set_duration(200).unwrap();
        let counts = counted(&animator);

        animator.start().unwrap();
        context.pulse(&clock, 0);
        context.pulse(&clock, 100);
        assert_eq!(animator.animated_value::<f32>(), Some(50.0));
        assert_eq!(animator.current_play_time(), 100);

        context.pulse(&clock, 200);
        assert_eq!(animator.animated_value::<f32>(), Some(100.0));
        assert_eq!(animator.lifecycle(), Lifecycle::Ended);
        assert_eq!(counts.end.get(), 1);
        assert!(!animator.is_started());
        assert_eq!(context.current_animations_count(), 0);
    }

    #[test]
    fn test_cancel_notifies_once() {
        let (clock, context) = setup();
        let animator = linear(&[0.0, 1.0]);
        let counts = counted(&animator);

        animator.start().unwrap();
        context.pulse(&clock, 0);
        context.pulse(&clock, 100);
        animator.cancel();
        animator.cancel();

        assert_eq!(counts.start.get(), 1);
        assert_eq!(counts.cancel.get(), 1);
        assert_eq!(counts.end.get(), 1);
        assert_eq!(animator.lifecycle(), Lifecycle::Ended);
        assert!(!context.scheduler().contains(animator.id()));
    }

    #[test]
    fn test_cancel_while_delayed_fires_deferred_start() {
        let (clock, context) = setup();
        let animator = linear(&[0.0, 1.0]);
        animator.set_start_delay(100);
        let counts = counted(&animator);

        animator.start().unwrap();
        context.pulse(&clock, 0);
        assert_eq!(counts.start.get(), 0);
        assert_eq!(animator.lifecycle(), Lifecycle::Delayed);

        animator.cancel();
        assert_eq!(counts.start.get(), 1);
        assert_eq!(counts.cancel.get(), 1);
        assert_eq!(counts.end.get(), 1);
    }

    #[test]
    fn test_start_notified_when_delay_scaled_away() {
        let (clock, context) = setup();
        let animator = linear(&[0.0, 1.0]);
        animator.set_duration(100).unwrap();
        animator.set_start_delay(1);
        let counts = counted(&animator);

        animator.start().unwrap();
        assert_eq!(counts.start.get(), 0);

        // The delay is zero by the time the scheduler admits it
        context.config().set_duration_scale(0.5).unwrap();
        context.pulse(&clock, 0);
        assert!(animator.is_started());
        assert_eq!(counts.start.get(), 1);
        context.pulse(&clock, 100);
        assert_eq!(counts.start.get(), 1);
        assert_eq!(counts.end.get(), 1);
    }

    #[test]
    fn test_end_unstarted_animator() {
        let (_clock, context) = setup();
        let animator = linear(&[0.0, 8.0]);
        let counts = counted(&animator);

        animator.end();
        assert_eq!(animator.animated_value::<f32>(), Some(8.0));
        assert_eq!(counts.start.get(), 1);
        assert_eq!(counts.end.get(), 1);
        assert_eq!(context.current_animations_count(), 0);
    }

    #[test]
    fn test_end_reversed_lands_on_start() {
        let (clock, context) = setup();
        let animator = linear(&[0.0, 8.0]);
        animator.start_reversed().unwrap();
        context.pulse(&clock, 0);
        animator.end();
        assert_eq!(animator.animated_value::<f32>(), Some(0.0));
    }

    #[test]
    fn test_pause_requires_start() {
        let animator = ValueAnimator::new();
        let counts = counted(&animator);
        animator.pause();
        assert!(!animator.is_paused());
        assert_eq!(counts.pause.get(), 0);
    }

    #[test]
    fn test_pause_and_resume_shift_start() {
        let (clock, context) = setup();
        let animator = linear(&[0.0, 1.0]);
        animator.set_duration(1000).unwrap();
        let counts = counted(&animator);

        animator.start().unwrap();
        context.pulse(&clock, 0);
        context.pulse(&clock, 200);
        animator.pause();
        context.pulse(&clock, 300);
        context.pulse(&clock, 700);
        animator.resume();
        context.pulse(&clock, 800);

        // 200ms before the pause plus 100ms after the 300..800 gap
        assert_close(animator.animated_fraction(), 0.3);
        assert_eq!(counts.pause.get(), 1);
        assert_eq!(counts.resume.get(), 1);
    }

    #[test]
    fn test_reverse_in_flight_mirrors_position() {
        let (clock, context) = setup();
        let animator = linear(&[0.0, 1.0]);
        animator.set_duration(1000).unwrap();

        animator.start().unwrap();
        context.pulse(&clock, 0);
        context.pulse(&clock, 300);
        animator.reverse().unwrap();
        context.pulse(&clock, 400);
        // Turned around at 0.3, then 100ms backwards
        assert_close(animator.animated_fraction(), 0.2);

        context.pulse(&clock, 700);
        assert_close(animator.animated_fraction(), 0.0);
        assert_eq!(animator.lifecycle(), Lifecycle::Ended);
    }

    #[test]
    fn test_reverse_idle_starts_backwards() {
        let (clock, context) = setup();
        let animator = linear(&[0.0, 1.0]);
        animator.set_duration(100).unwrap();

        animator.reverse().unwrap();
        assert_eq!(animator.animated_value::<f32>(), Some(1.0));
        context.pulse(&clock, 0);
        context.pulse(&clock, 25);
        assert_close(animator.animated_fraction(), 0.75);
    }

    #[test]
    fn test_reverse_while_delayed_restarts_wait() {
        let (clock, context) = setup();
        let animator = linear(&[0.0, 1.0]);
        animator.set_duration(100).unwrap();
        animator.set_start_delay(50);
        let counts = counted(&animator);

        animator.start().unwrap();
        context.pulse(&clock, 0);
        context.pulse(&clock, 40);
        animator.reverse().unwrap();
        assert!(context.scheduler().is_pending(animator.id()));

        context.pulse(&clock, 60);
        context.pulse(&clock, 100);
        assert!(animator.is_started());
        assert_eq!(counts.end.get(), 0);
        assert_eq!(counts.cancel.get(), 0);

        context.pulse(&clock, 120);
        assert_eq!(counts.start.get(), 1);
        // Delay restarted at 60, running from 110, backwards
        assert_close(animator.animated_fraction(), 0.9);
    }

    #[test]
    fn test_seek_before_start() {
        let (clock, context) = setup();
        let animator = linear(&[0.0, 100.0]);
        animator.set_duration(1000).unwrap();

        animator.set_current_play_time(250);
        assert_eq!(animator.lifecycle(), Lifecycle::Seeked);
        assert_eq!(animator.animated_value::<f32>(), Some(25.0));

        animator.start().unwrap();
        // Seeked start keeps the seek position
        assert_eq!(animator.animated_value::<f32>(), Some(25.0));
        context.pulse(&clock, 1000);
        assert_eq!(animator.animated_value::<f32>(), Some(25.0));
        context.pulse(&clock, 1100);
        assert_eq!(animator.animated_value::<f32>(), Some(35.0));
    }

    #[test]
    fn test_seek_past_end_clamps() {
        let animator = linear(&[0.0, 1.0]);
        animator.set_repeat_count(1);
        animator.set_current_fraction(5.0);
        assert_eq!(animator.current_iteration(), 1);
        assert_close(animator.animated_fraction(), 1.0);

        animator.set_current_fraction(-3.0);
        assert_eq!(animator.current_iteration(), 0);
        assert_close(animator.animated_fraction(), 0.0);
    }

    #[test]
    fn test_seek_reverse_mode_parity() {
        let animator = linear(&[0.0, 1.0]);
        animator.set_repeat_count(3);
        animator.set_repeat_mode(RepeatMode::Reverse);
        animator.set_current_fraction(1.25);
        assert_eq!(animator.current_iteration(), 1);
        assert_close(animator.animated_fraction(), 0.75);
    }

    #[test]
    fn test_start_reversed_remaps_seek() {
        let (_clock, _context) = setup();
        let animator = linear(&[0.0, 1.0]);
        animator.set_repeat_count(1);
        animator.set_current_fraction(0.25);

        animator.start_reversed().unwrap();
        // 1 + 1 - (0 + 0.25) = 1.75 -> iteration 1 at 0.75, playing backwards
        assert_eq!(animator.current_iteration(), 1);
        let state = animator.cell.state.borrow();
        assert_close(state.seek_fraction, 0.75);
        assert!(state.playing_backwards);
    }

    #[test]
    fn test_end_listener_can_restart() {
        let (clock, context) = setup();
        let animator = linear(&[0.0, 1.0]);
        animator.set_duration(100).unwrap();
        let restarts = Rc::new(Cell::new(0));
        let seen = Rc::clone(&restarts);
        animator.add_listener(crate::AnimatorCallbacks::new().on_end(move |a| {
            if seen.get() == 0 {
                seen.set(1);
                a.start().unwrap();
            }
        }));

        animator.start().unwrap();
        context.pulse(&clock, 0);
        context.pulse(&clock, 100);
        assert_eq!(restarts.get(), 1);
        assert!(animator.is_started());
        assert!(context.scheduler().is_pending(animator.id()));
    }

    #[test]
    fn test_set_values_reinitializes() {
        let animator = linear(&[0.0, 1.0]);
        animator.set_current_fraction(0.5);
        assert_eq!(animator.animated_value::<f32>(), Some(0.5));

        animator.set_int_values(&[0, 10]);
        assert_eq!(animator.animated_value::<i32>(), None);
        animator.set_current_fraction(0.5);
        assert_eq!(animator.animated_value::<i32>(), Some(5));
        assert_eq!(animator.animated_value::<f32>(), None);
    }

    #[test]
    fn test_named_values() {
        let animator = ValueAnimator::builder()
            .property(PropertyValues::new("x", &[0.0f32, 10.0]))
            .property(PropertyValues::new("color", &[Argb(0xFF000000), Argb(0xFF0000FE)]))
            .interpolator(Easing::Linear)
            .build()
            .unwrap();
        animator.set_current_fraction(0.5);

        assert_eq!(animator.value_names(), vec!["x".to_string(), "color".to_string()]);
        assert_eq!(animator.animated_value_of::<f32>("x"), Some(5.0));
        assert_eq!(animator.animated_value_of::<Argb>("color"), Some(Argb(0xFF00007F)));
        assert_eq!(animator.animated_value_of::<f32>("missing"), None);
    }

    #[test]
    fn test_to_builder_copies_configuration() {
        let (clock, context) = setup();
        let original = ValueAnimator::builder()
            .duration(500)
            .start_delay(20)
            .repeat_count(2)
            .repeat_mode(RepeatMode::Reverse)
            .float_values(&[1.0, 2.0])
            .build()
            .unwrap();
        original.start().unwrap();
        context.pulse(&clock, 0);

        let copy = original.to_builder().build().unwrap();
        assert!(!copy.ptr_eq(&original));
        assert_ne!(copy.id(), original.id());
        assert_eq!(copy.timing(), original.timing());
        assert!(!copy.is_started());
        assert_eq!(copy.lifecycle(), Lifecycle::Idle);
        assert!(!context.scheduler().contains(copy.id()));
        assert_eq!(copy.animated_value::<f32>(), None);
    }

    #[test]
    fn test_update_listener_removal() {
        let animator = linear(&[0.0, 1.0]);
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let id = animator.add_update_listener(move |_| seen.set(seen.get() + 1));

        animator.set_current_fraction(0.2);
        assert!(animator.remove_update_listener(id));
        animator.set_current_fraction(0.4);
        assert_eq!(calls.get(), 1);
    }
}

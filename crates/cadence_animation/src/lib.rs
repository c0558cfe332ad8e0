//! Cadence Animation Engine
//!
//! Frame-synchronized value animators driven from one shared clock pulse.
//!
//! # Features
//!
//! - **Shared Frame Time**: every animator advanced in a frame sees the same time
//! - **Start Delays**: delayed animators wait in their own set until ready
//! - **Repeats**: restart or ping-pong, finite or infinite
//! - **Seeking**: jump to any play time or fraction, before or during a run
//! - **Pause, Resume, Reverse**: with paused time excluded from progress
//! - **Jank Compensation**: the first frame's start time absorbs commit lag
//! - **Re-entrant**: listeners may start or cancel animators mid-frame
//!
//! # Example
//!
//! ```
//! use cadence_animation::{AnimationContext, ValueAnimator};
//! use cadence_core::ManualClock;
//! use std::rc::Rc;
//!
//! let clock = Rc::new(ManualClock::new());
//! let context = AnimationContext::install(clock.clone()).unwrap();
//!
//! let slide = ValueAnimator::of_float(&[0.0, 200.0]);
//! slide.set_duration(100).unwrap();
//! slide.set_interpolator(None);
//! slide.start().unwrap();
//!
//! context.pulse(&clock, 0);
//! context.pulse(&clock, 100);
//! assert_eq!(slide.animated_value::<f32>(), Some(200.0));
//! ```

pub mod animator;
pub mod context;
pub mod easing;
pub mod error;
pub mod listener;
pub mod scheduler;
pub mod values;

pub use animator::{
    AnimatorBuilder, AnimatorId, Lifecycle, RepeatMode, Timing, ValueAnimator,
    DEFAULT_DURATION_MS, INFINITE,
};
pub use context::AnimationContext;
pub use easing::{Easing, Interpolator};
pub use error::{AnimationError, Result};
pub use listener::{AnimatorCallbacks, AnimatorListener, ListenerId, UpdateListener};
pub use scheduler::AnimationScheduler;
pub use values::{Argb, Evaluator, Interpolate, PropertyValues, ValueHolder};

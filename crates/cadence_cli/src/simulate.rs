//! Deterministic animator simulation
//!
//! Runs one animator against a [`ManualClock`], pulsing at a fixed frame
//! interval, and records what the animator reported on every frame.

use anyhow::{Context, Result};
use cadence_animation::{
    AnimationContext, AnimatorCallbacks, Easing, RepeatMode, ValueAnimator,
};
use cadence_core::{ManualClock, TimingConfig};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// Parameters of one simulation run
#[derive(Debug, Clone)]
pub struct Simulation {
    pub duration_ms: i64,
    pub start_delay_ms: i64,
    pub repeat_count: i32,
    pub repeat_mode: RepeatMode,
    pub duration_scale: f32,
    pub frame_interval_ms: i64,
    /// Gap between each frame and its commit
    pub commit_lag_ms: i64,
    pub easing: Easing,
    pub reverse: bool,
    pub from: f32,
    pub to: f32,
    pub max_frames: u32,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            duration_ms: 300,
            start_delay_ms: 0,
            repeat_count: 0,
            repeat_mode: RepeatMode::Restart,
            duration_scale: 1.0,
            frame_interval_ms: 16,
            commit_lag_ms: 0,
            easing: Easing::AccelerateDecelerate,
            reverse: false,
            from: 0.0,
            to: 1.0,
            max_frames: 10_000,
        }
    }
}

/// What the animator looked like after one frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameRecord {
    pub frame: u32,
    pub time_ms: i64,
    /// Eased fraction
    pub fraction: f32,
    pub value: f32,
    pub iteration: i32,
    pub lifecycle: String,
    /// Listener events fired since the previous record
    pub events: Vec<&'static str>,
}

fn record_events(animator: &ValueAnimator) -> Rc<RefCell<Vec<&'static str>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let push = |name: &'static str| {
        let events = Rc::clone(&events);
        move |_: &ValueAnimator| events.borrow_mut().push(name)
    };
    animator.add_listener(
        AnimatorCallbacks::new()
            .on_start(push("start"))
            .on_end(push("end"))
            .on_cancel(push("cancel"))
            .on_repeat(push("repeat")),
    );
    events
}

impl Simulation {
    /// Run to completion or until `max_frames`
    ///
    /// Installs a context on the calling thread for the duration of the run.
    pub fn run(&self) -> Result<Vec<FrameRecord>> {
        if self.frame_interval_ms <= 0 {
            anyhow::bail!("Frame interval must be positive, got {}", self.frame_interval_ms);
        }

        let clock = Rc::new(ManualClock::new());
        let config = TimingConfig::with_duration_scale(self.duration_scale)?;
        let context = AnimationContext::install_with_config(clock.clone(), config)
            .context("Failed to install animation context")?;

        let animator = ValueAnimator::builder()
            .duration(self.duration_ms)
            .start_delay(self.start_delay_ms)
            .repeat_count(self.repeat_count)
            .repeat_mode(self.repeat_mode)
            .interpolator(self.easing)
            .float_values(&[self.from, self.to])
            .build()?;
        let events = record_events(&animator);

        tracing::info!(
            "Simulating {}ms animation (delay {}ms, repeats {}, scale {})",
            self.duration_ms,
            self.start_delay_ms,
            self.repeat_count,
            self.duration_scale
        );

        if self.reverse {
            animator.start_reversed()?;
        } else {
            animator.start()?;
        }

        let mut records = Vec::new();
        let mut time_ms = 0;
        for frame in 0..self.max_frames {
            if !context.pump(&clock, time_ms, time_ms + self.commit_lag_ms) {
                break;
            }
            records.push(FrameRecord {
                frame,
                time_ms,
                fraction: animator.animated_fraction(),
                value: animator.animated_value::<f32>().unwrap_or(self.from),
                iteration: animator.current_iteration(),
                lifecycle: format!("{:?}", animator.lifecycle()),
                events: std::mem::take(&mut *events.borrow_mut()),
            });
            time_ms += self.frame_interval_ms;
        }

        if animator.is_started() {
            tracing::warn!("Stopped after {} frames with the animator still running", records.len());
        }
        tracing::debug!("Simulation produced {} frames", records.len());
        Ok(records)
    }
}

/// Sample an easing curve at evenly spaced points
pub fn sample_curve(easing: Easing, samples: u32) -> Vec<(f32, f32)> {
    let steps = samples.max(1);
    (0..=steps)
        .map(|i| {
            let t = i as f32 / steps as f32;
            (t, easing.apply(t))
        })
        .collect()
}

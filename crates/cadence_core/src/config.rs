//! Timing configuration
//!
//! The duration scale is a global slow-motion knob: every animator multiplies
//! its nominal duration and start delay by it. Rather than a bare static, the
//! scale lives in a [`TimingConfig`] object that execution contexts hold and
//! share; animators read it each time they need an effective duration, so a
//! change is visible on the next read.
//!
//! ```
//! use cadence_core::TimingConfig;
//!
//! let config = TimingConfig::new();
//! config.set_duration_scale(2.0).unwrap();
//! assert_eq!(config.scale_ms(300), 600);
//!
//! // Clones share the same knob
//! let shared = config.clone();
//! shared.set_duration_scale(0.5).unwrap();
//! assert_eq!(config.scale_ms(300), 150);
//! ```

use crate::error::{CoreError, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

/// Process-wide default configuration
static GLOBAL_TIMING: OnceLock<TimingConfig> = OnceLock::new();

/// Shared timing configuration
///
/// Cloning yields another handle to the same settings.
#[derive(Clone, Debug)]
pub struct TimingConfig {
    /// f32 bits of the duration scale
    duration_scale: Arc<AtomicU32>,
}

impl TimingConfig {
    /// Create an independent configuration with a scale of 1.0
    pub fn new() -> Self {
        Self {
            duration_scale: Arc::new(AtomicU32::new(1.0f32.to_bits())),
        }
    }

    /// Create an independent configuration with the given scale
    pub fn with_duration_scale(scale: f32) -> Result<Self> {
        let config = Self::new();
        config.set_duration_scale(scale)?;
        Ok(config)
    }

    /// The process-wide configuration
    ///
    /// Animation contexts use this unless they are given their own.
    pub fn global() -> &'static TimingConfig {
        GLOBAL_TIMING.get_or_init(TimingConfig::new)
    }

    pub fn duration_scale(&self) -> f32 {
        f32::from_bits(self.duration_scale.load(Ordering::Acquire))
    }

    /// Set the duration scale
    ///
    /// `0.0` makes every animation finish on its first frame. Negative or
    /// non-finite values are rejected.
    pub fn set_duration_scale(&self, scale: f32) -> Result<()> {
        if !scale.is_finite() || scale < 0.0 {
            return Err(CoreError::InvalidDurationScale(scale));
        }
        let previous = f32::from_bits(
            self.duration_scale
                .swap(scale.to_bits(), Ordering::AcqRel),
        );
        if previous != scale {
            tracing::debug!("TimingConfig: duration scale {} -> {}", previous, scale);
        }
        Ok(())
    }

    /// Apply the scale to a nominal millisecond value
    ///
    /// Truncates toward zero, like an integer cast.
    pub fn scale_ms(&self, nominal_ms: i64) -> i64 {
        scale_ms(nominal_ms, self.duration_scale())
    }

    /// Check whether two handles share the same settings
    pub fn shares_with(&self, other: &TimingConfig) -> bool {
        Arc::ptr_eq(&self.duration_scale, &other.duration_scale)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Scale a nominal millisecond value by an explicit factor
pub fn scale_ms(nominal_ms: i64, scale: f32) -> i64 {
    (nominal_ms as f32 * scale) as i64
}

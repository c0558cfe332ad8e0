//! Animatable value types
//!
//! Value holders turn the eased fraction of an animator into concrete values.
//! [`PropertyValues`] covers the common case of a named property moving through
//! evenly spaced keyframes; anything implementing [`ValueHolder`] can be
//! attached to an animator.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Trait for values that can be linearly interpolated
pub trait Interpolate: Clone + 'static {
    /// Linearly interpolate between self and other by factor t
    ///
    /// `t` is usually in `[0, 1]` but overshooting easings may push it outside.
    fn lerp(&self, other: &Self, t: f32) -> Self;
}

// ============================================================================
// Scalar Implementations
// ============================================================================

impl Interpolate for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Interpolate for f64 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t as f64
    }
}

impl Interpolate for i32 {
    /// Truncates toward zero, saturating when an easing overshoots the range
    fn lerp(&self, other: &Self, t: f32) -> Self {
        let delta = ((*other as f64 - *self as f64) * t as f64) as i64;
        i64::from(*self)
            .saturating_add(delta)
            .clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }
}

// ============================================================================
// Packed Color Implementation
// ============================================================================

/// A color packed as `0xAARRGGBB`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Argb(pub u32);

impl Argb {
    pub fn from_channels(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(u32::from_be_bytes([a, r, g, b]))
    }

    /// Channels in `[a, r, g, b]` order
    pub fn channels(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    pub fn alpha(self) -> u8 {
        self.channels()[0]
    }
}

impl Interpolate for Argb {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        let from = self.channels();
        let to = other.channels();
        let mut out = [0u8; 4];
        for i in 0..4 {
            let value = from[i] as f32 + (to[i] as f32 - from[i] as f32) * t;
            out[i] = value.round().clamp(0.0, 255.0) as u8;
        }
        Argb(u32::from_be_bytes(out))
    }
}

impl From<u32> for Argb {
    fn from(value: u32) -> Self {
        Argb(value)
    }
}

// ============================================================================
// Value Holders
// ============================================================================

/// Computes an animated value from the eased fraction
pub trait ValueHolder {
    /// Name used to look the value up on the animator
    fn property_name(&self) -> &str;

    /// One-time setup before the first value is computed
    fn init(&mut self) {}

    /// Compute the value for an eased fraction
    fn calculate_value(&mut self, fraction: f32);

    /// The most recently computed value
    fn animated_value(&self) -> Option<&dyn Any>;

    /// Copy the holder's configuration into a fresh holder
    fn clone_holder(&self) -> Box<dyn ValueHolder>;
}

/// Custom evaluator: `(fraction, start, end) -> value`
pub type Evaluator<T> = Rc<dyn Fn(f32, &T, &T) -> T>;

/// A named property animated through evenly spaced keyframes
///
/// With one keyframe the value is held constant. With two or more, the
/// fraction range `[0, 1]` is split into equal segments and each segment is
/// interpolated with [`Interpolate::lerp`] or the custom evaluator. Fractions
/// outside `[0, 1]` extrapolate from the first or last segment.
pub struct PropertyValues<T: Interpolate> {
    name: String,
    keyframes: SmallVec<[T; 2]>,
    evaluator: Option<Evaluator<T>>,
    current: Option<T>,
}

impl<T: Interpolate> PropertyValues<T> {
    pub fn new(name: impl Into<String>, keyframes: &[T]) -> Self {
        Self {
            name: name.into(),
            keyframes: keyframes.iter().cloned().collect(),
            evaluator: None,
            current: None,
        }
    }

    /// Use a custom evaluator instead of linear interpolation
    pub fn with_evaluator<F>(mut self, evaluator: F) -> Self
    where
        F: Fn(f32, &T, &T) -> T + 'static,
    {
        self.evaluator = Some(Rc::new(evaluator));
        self
    }

    pub fn keyframes(&self) -> &[T] {
        &self.keyframes
    }

    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    fn evaluate(&self, fraction: f32) -> Option<T> {
        match self.keyframes.len() {
            0 => None,
            1 => Some(self.keyframes[0].clone()),
            len => {
                let segments = len - 1;
                let scaled = fraction * segments as f32;
                let index = (scaled.floor().max(0.0) as usize).min(segments - 1);
                let local = scaled - index as f32;
                let (start, end) = (&self.keyframes[index], &self.keyframes[index + 1]);
                Some(match &self.evaluator {
                    Some(evaluator) => evaluator(local, start, end),
                    None => start.lerp(end, local),
                })
            }
        }
    }
}

impl<T: Interpolate> Clone for PropertyValues<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            keyframes: self.keyframes.clone(),
            evaluator: self.evaluator.clone(),
            current: None,
        }
    }
}

impl<T: Interpolate + fmt::Debug> fmt::Debug for PropertyValues<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyValues")
            .field("name", &self.name)
            .field("keyframes", &self.keyframes)
            .field("custom_evaluator", &self.evaluator.is_some())
            .field("current", &self.current)
            .finish()
    }
}

impl<T: Interpolate> ValueHolder for PropertyValues<T> {
    fn property_name(&self) -> &str {
        &self.name
    }

    fn init(&mut self) {
        if self.current.is_none() {
            self.current = self.keyframes.first().cloned();
        }
    }

    fn calculate_value(&mut self, fraction: f32) {
        if let Some(value) = self.evaluate(fraction) {
            self.current = Some(value);
        }
    }

    fn animated_value(&self) -> Option<&dyn Any> {
        self.current.as_ref().map(|value| value as &dyn Any)
    }

    fn clone_holder(&self) -> Box<dyn ValueHolder> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Value Set
// ============================================================================

/// The holders attached to one animator
///
/// Initialization runs once per assignment of holders.
#[derive(Default)]
pub(crate) struct ValueSet {
    holders: Vec<Box<dyn ValueHolder>>,
    by_name: FxHashMap<String, usize>,
    initialized: bool,
    /// Stand-in left behind while the real set is lent out
    detached: bool,
}

impl ValueSet {
    pub(crate) fn new(holders: Vec<Box<dyn ValueHolder>>) -> Self {
        let by_name = holders
            .iter()
            .enumerate()
            .map(|(index, holder)| (holder.property_name().to_string(), index))
            .collect();
        Self {
            holders,
            by_name,
            initialized: false,
            detached: false,
        }
    }

    pub(crate) fn detached() -> Self {
        Self {
            detached: true,
            ..Self::default()
        }
    }

    pub(crate) fn is_detached(&self) -> bool {
        self.detached
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn init(&mut self) {
        if self.initialized {
            return;
        }
        for holder in &mut self.holders {
            holder.init();
        }
        self.initialized = true;
    }

    pub(crate) fn calculate(&mut self, fraction: f32) {
        for holder in &mut self.holders {
            holder.calculate_value(fraction);
        }
    }

    pub(crate) fn first(&self) -> Option<&dyn Any> {
        self.holders.first().and_then(|holder| holder.animated_value())
    }

    pub(crate) fn get(&self, name: &str) -> Option<&dyn Any> {
        self.by_name
            .get(name)
            .and_then(|&index| self.holders[index].animated_value())
    }

    pub(crate) fn first_name(&self) -> Option<String> {
        self.holders
            .first()
            .map(|holder| holder.property_name().to_string())
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.holders
            .iter()
            .map(|holder| holder.property_name().to_string())
            .collect()
    }

    /// Fresh, uninitialized copies of every holder
    pub(crate) fn clone_holders(&self) -> Vec<Box<dyn ValueHolder>> {
        self.holders.iter().map(|holder| holder.clone_holder()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_lerp() {
        assert_eq!(0.0f32.lerp(&10.0, 0.25), 2.5);
        assert_eq!(0.0f64.lerp(&10.0, 0.5), 5.0);
        assert_eq!(0i32.lerp(&10, 0.55), 5);
        assert_eq!(10i32.lerp(&0, 0.55), 5);
    }

    #[test]
    fn test_int_lerp_saturates_on_overshoot() {
        assert_eq!((i32::MAX - 10).lerp(&i32::MAX, 1.5), i32::MAX);
        assert_eq!((i32::MIN + 10).lerp(&i32::MIN, 1.5), i32::MIN);
        assert_eq!(i32::MIN.lerp(&i32::MAX, 1.0), i32::MAX);
        assert_eq!(0i32.lerp(&100, -0.2), -20);
    }

    #[test]
    fn test_argb_lerp_per_channel() {
        let from = Argb::from_channels(255, 0, 0, 0);
        let to = Argb::from_channels(255, 200, 100, 50);
        let mid = from.lerp(&to, 0.5);
        assert_eq!(mid.channels(), [255, 100, 50, 25]);
        assert_eq!(mid.alpha(), 255);
    }

    #[test]
    fn test_keyframe_segments() {
        let mut values = PropertyValues::new("x", &[0.0f32, 10.0, 30.0]);
        values.init();
        assert_eq!(values.current(), Some(&0.0));

        values.calculate_value(0.25);
        assert_eq!(values.current(), Some(&5.0));
        values.calculate_value(0.75);
        assert_eq!(values.current(), Some(&20.0));
        values.calculate_value(1.0);
        assert_eq!(values.current(), Some(&30.0));
    }

    #[test]
    fn test_keyframe_extrapolation() {
        let mut values = PropertyValues::new("x", &[0.0f32, 10.0]);
        values.calculate_value(1.2);
        assert!((values.current().copied().unwrap() - 12.0).abs() < 1e-4);
        values.calculate_value(-0.1);
        assert!((values.current().copied().unwrap() + 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_single_keyframe_is_constant() {
        let mut values = PropertyValues::new("alpha", &[0.5f32]);
        values.calculate_value(0.8);
        assert_eq!(values.current(), Some(&0.5));
    }

    #[test]
    fn test_custom_evaluator() {
        let mut values =
            PropertyValues::new("step", &[0i32, 100]).with_evaluator(|f, a, b| if f < 0.5 { *a } else { *b });
        values.calculate_value(0.4);
        assert_eq!(values.current(), Some(&0));
        values.calculate_value(0.6);
        assert_eq!(values.current(), Some(&100));
    }

    #[test]
    fn test_value_set_lookup() {
        let mut set = ValueSet::new(vec![
            Box::new(PropertyValues::new("x", &[0.0f32, 1.0])),
            Box::new(PropertyValues::new("y", &[0i32, 10])),
        ]);
        assert!(!set.is_initialized());
        set.init();
        set.calculate(0.5);

        assert_eq!(set.first().and_then(|v| v.downcast_ref::<f32>()), Some(&0.5));
        assert_eq!(set.get("y").and_then(|v| v.downcast_ref::<i32>()), Some(&5));
        assert!(set.get("z").is_none());
        assert_eq!(set.names(), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_cloned_holders_start_fresh() {
        let mut set = ValueSet::new(vec![Box::new(PropertyValues::new("x", &[0.0f32, 1.0]))]);
        set.init();
        set.calculate(1.0);

        let copy = ValueSet::new(set.clone_holders());
        assert!(copy.first().is_none());
        assert_eq!(copy.first_name().as_deref(), Some("x"));
    }
}

//! Easing functions
//!
//! An [`Interpolator`] maps the linear fraction of an iteration to the eased
//! fraction that value holders receive. Any `Fn(f32) -> f32` closure is an
//! interpolator; [`Easing`] covers the common curves.

use std::f32::consts::PI;

/// Maps linear progress to eased progress
pub trait Interpolator {
    /// Map `input` in `[0, 1]` to the eased fraction
    ///
    /// The output may leave `[0, 1]` for overshooting curves.
    fn interpolation(&self, input: f32) -> f32;
}

impl<F> Interpolator for F
where
    F: Fn(f32) -> f32,
{
    fn interpolation(&self, input: f32) -> f32 {
        self(input)
    }
}

/// Built-in easing curves
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum Easing {
    #[default]
    Linear,
    /// Quadratic ease in
    EaseIn,
    /// Quadratic ease out
    EaseOut,
    /// Quadratic ease in-out
    EaseInOut,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    /// Cosine curve, slow at both ends
    AccelerateDecelerate,
    /// CSS-style cubic bezier through (0,0), (x1,y1), (x2,y2), (1,1)
    CubicBezier(f32, f32, f32, f32),
}

impl Easing {
    /// Evaluate the curve at `t`
    pub fn apply(&self, t: f32) -> f32 {
        match *self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => t * (2.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = 2.0 * t - 2.0;
                    0.5 * u * u * u + 1.0
                }
            }
            Easing::AccelerateDecelerate => ((t + 1.0) * PI).cos() / 2.0 + 0.5,
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier(t, x1, y1, x2, y2),
        }
    }
}

impl Interpolator for Easing {
    fn interpolation(&self, input: f32) -> f32 {
        self.apply(input)
    }
}

// ============================================================================
// Cubic Bezier
// ============================================================================

const NEWTON_ITERATIONS: usize = 8;
const NEWTON_EPSILON: f32 = 1e-6;
const BISECTION_ITERATIONS: usize = 20;

/// One axis of a bezier with endpoints at 0 and 1
fn bezier_axis(t: f32, p1: f32, p2: f32) -> f32 {
    let u = 1.0 - t;
    3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t
}

fn bezier_axis_slope(t: f32, p1: f32, p2: f32) -> f32 {
    let u = 1.0 - t;
    3.0 * u * u * p1 + 6.0 * u * t * (p2 - p1) + 3.0 * t * t * (1.0 - p2)
}

fn cubic_bezier(x: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    // Newton's method for the curve parameter, bisection when the slope is flat
    let mut t = x;
    for _ in 0..NEWTON_ITERATIONS {
        let err = bezier_axis(t, x1, x2) - x;
        if err.abs() < NEWTON_EPSILON {
            return bezier_axis(t, y1, y2);
        }
        let slope = bezier_axis_slope(t, x1, x2);
        if slope.abs() < NEWTON_EPSILON {
            break;
        }
        t -= err / slope;
    }

    let (mut lo, mut hi) = (0.0f32, 1.0f32);
    t = x;
    for _ in 0..BISECTION_ITERATIONS {
        let value = bezier_axis(t, x1, x2);
        if (value - x).abs() < NEWTON_EPSILON {
            break;
        }
        if value < x {
            lo = t;
        } else {
            hi = t;
        }
        t = (lo + hi) / 2.0;
    }
    bezier_axis(t, y1, y2)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 9] = [
        Easing::Linear,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
        Easing::EaseInCubic,
        Easing::EaseOutCubic,
        Easing::EaseInOutCubic,
        Easing::AccelerateDecelerate,
        Easing::CubicBezier(0.25, 0.1, 0.25, 1.0),
    ];

    #[test]
    fn test_endpoints() {
        for easing in ALL {
            assert!(easing.apply(0.0).abs() < 1e-4, "{:?} at 0", easing);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-4, "{:?} at 1", easing);
        }
    }

    #[test]
    fn test_accelerate_decelerate_midpoint() {
        let mid = Easing::AccelerateDecelerate.apply(0.5);
        assert!((mid - 0.5).abs() < 1e-6);
        assert!(Easing::AccelerateDecelerate.apply(0.25) < 0.25);
    }

    #[test]
    fn test_linear_bezier_is_identity() {
        let easing = Easing::CubicBezier(0.25, 0.25, 0.75, 0.75);
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            assert!((easing.apply(t) - t).abs() < 1e-3);
        }
    }

    #[test]
    fn test_closure_interpolator() {
        let step = |t: f32| if t < 0.5 { 0.0 } else { 1.0 };
        assert_eq!(step.interpolation(0.4), 0.0);
        assert_eq!(step.interpolation(0.6), 1.0);
    }
}

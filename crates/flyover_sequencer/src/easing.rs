// SPDX-License-Identifier: MIT OR Apache-2.0
//! Easing curves and interpolation primitives.
//!
//! Everything here is a pure function of its inputs. The timeline builds pose
//! sampling on top of [`lerp`] and [`lerp_angle_degrees`]; [`slerp`] is kept
//! for callers that carry orientation as a quaternion.

use serde::{Deserialize, Serialize};

/// Newton-Raphson iteration cap for the bezier solver
const BEZIER_MAX_ITERATIONS: usize = 8;

/// Stop once the curve's x is this close to the target
const BEZIER_X_EPSILON: f64 = 1e-3;

/// Derivatives smaller than this end the search instead of dividing
const BEZIER_SLOPE_EPSILON: f64 = 1e-6;

/// Quaternions closer than this (1 - |dot|) are treated as identical
const SLERP_EPSILON: f64 = 1e-6;

/// Interior control points of a CSS-style `cubic-bezier(x1, y1, x2, y2)`.
///
/// The curve endpoints are fixed at (0, 0) and (1, 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    /// First control point x
    pub x1: f64,
    /// First control point y
    pub y1: f64,
    /// Second control point x
    pub x2: f64,
    /// Second control point y
    pub y2: f64,
}

impl CubicBezier {
    /// CSS `ease`
    pub const EASE: Self = Self::new(0.42, 0.0, 0.58, 1.0);

    /// Create a curve from its two interior control points
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Control points as `[x1, y1, x2, y2]`
    pub fn to_array(self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Evaluate the timing function at progress `t`
    pub fn apply(&self, t: f64) -> f64 {
        bezier(t, self.x1, self.y1, self.x2, self.y2)
    }
}

impl Default for CubicBezier {
    fn default() -> Self {
        Self::EASE
    }
}

impl From<[f64; 4]> for CubicBezier {
    fn from(p: [f64; 4]) -> Self {
        Self::new(p[0], p[1], p[2], p[3])
    }
}

/// Easing applied to the segment that starts at a keyframe
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Easing {
    /// Constant speed
    #[default]
    Linear,
    /// Cubic acceleration
    EaseIn,
    /// Cubic deceleration
    EaseOut,
    /// Cubic acceleration then deceleration
    EaseInOut,
    /// Custom timing curve
    Bezier(CubicBezier),
}

impl Easing {
    /// Remap normalized progress through this curve
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => ease_linear(t),
            Easing::EaseIn => ease_in(t),
            Easing::EaseOut => ease_out(t),
            Easing::EaseInOut => ease_in_out(t),
            Easing::Bezier(curve) => curve.apply(t),
        }
    }

    /// Name used in project documents
    pub fn name(&self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::EaseIn => "easeIn",
            Easing::EaseOut => "easeOut",
            Easing::EaseInOut => "easeInOut",
            Easing::Bezier(_) => "bezier",
        }
    }

    /// Look up an easing by document name.
    ///
    /// `bezier` resolves to the default curve; callers override the control
    /// points afterwards when the document carries them.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(Easing::Linear),
            "easeIn" => Some(Easing::EaseIn),
            "easeOut" => Some(Easing::EaseOut),
            "easeInOut" => Some(Easing::EaseInOut),
            "bezier" => Some(Easing::Bezier(CubicBezier::default())),
            _ => None,
        }
    }
}

/// Identity curve
pub fn ease_linear(t: f64) -> f64 {
    t
}

/// `t³`
pub fn ease_in(t: f64) -> f64 {
    t * t * t
}

/// `1 - (1 - t)³`
pub fn ease_out(t: f64) -> f64 {
    let inv = 1.0 - t;
    1.0 - inv * inv * inv
}

/// Piecewise cubic, `4t³` below one half and mirrored above it
pub fn ease_in_out(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let k = -2.0 * t + 2.0;
        1.0 - k * k * k / 2.0
    }
}

/// One coordinate of a cubic bezier with endpoints 0 and 1
fn bezier_coord(u: f64, p1: f64, p2: f64) -> f64 {
    let inv = 1.0 - u;
    3.0 * inv * inv * u * p1 + 3.0 * inv * u * u * p2 + u * u * u
}

/// Derivative of [`bezier_coord`] with respect to `u`
fn bezier_slope(u: f64, p1: f64, p2: f64) -> f64 {
    let inv = 1.0 - u;
    3.0 * inv * inv * p1 + 6.0 * inv * u * (p2 - p1) + 3.0 * u * u * (1.0 - p2)
}

/// CSS-style cubic bezier timing function.
///
/// `(p1, p2)` and `(p3, p4)` are the interior control points. The curve
/// parameter is found with Newton-Raphson starting at `u = t`; a flat slope
/// ends the search early rather than dividing by it.
pub fn bezier(t: f64, p1: f64, p2: f64, p3: f64, p4: f64) -> f64 {
    let mut u = t;
    for _ in 0..BEZIER_MAX_ITERATIONS {
        let error = bezier_coord(u, p1, p3) - t;
        if error.abs() < BEZIER_X_EPSILON {
            break;
        }
        let slope = bezier_slope(u, p1, p3);
        if slope.abs() < BEZIER_SLOPE_EPSILON {
            break;
        }
        u = (u - error / slope).clamp(0.0, 1.0);
    }
    bezier_coord(u, p2, p4)
}

/// Blend `a` towards `b` by eased progress.
///
/// Written as a weighted sum so both endpoints are reproduced exactly.
pub fn lerp(a: f64, b: f64, t: f64, easing: Easing) -> f64 {
    let e = easing.apply(t);
    a * (1.0 - e) + b * e
}

/// Wrap an angle into `(-180, 180]`
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Interpolate two angles along the shortest arc.
///
/// Antipodal inputs always travel in the positive direction. The result is
/// normalized into `(-180, 180]`.
pub fn lerp_angle_degrees(a: f64, b: f64, t: f64, easing: Easing) -> f64 {
    let from = normalize_degrees(a);
    let delta = normalize_degrees(normalize_degrees(b) - from);
    normalize_degrees(from + delta * easing.apply(t))
}

/// Quaternion as `[x, y, z, w]`
pub type Quat = [f64; 4];

/// Spherical linear interpolation between two unit quaternions.
///
/// Takes the shorter arc. Nearly identical inputs return `a` untouched.
pub fn slerp(a: Quat, b: Quat, t: f64, easing: Easing) -> Quat {
    let mut dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3];

    let mut b = b;
    if dot < 0.0 {
        b = [-b[0], -b[1], -b[2], -b[3]];
        dot = -dot;
    }

    if dot > 1.0 - SLERP_EPSILON {
        return a;
    }

    let theta = dot.clamp(-1.0, 1.0).acos();
    let sin_theta = theta.sin();
    let e = easing.apply(t);
    let s0 = ((1.0 - e) * theta).sin() / sin_theta;
    let s1 = (e * theta).sin() / sin_theta;

    [
        a[0] * s0 + b[0] * s1,
        a[1] * s0 + b[1] * s1,
        a[2] * s0 + b[2] * s1,
        a[3] * s0 + b[3] * s1,
    ]
}

//! Planar vector type and angle helpers shared by the drive and runtime crates.
//!
//! Angles are radians, counter-clockwise positive, with `0` pointing along
//! `+x`.  Every angle produced by this module lies in `(-π, π]`.

use std::f64::consts::{PI, TAU};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Vector2
// ────────────────────────────────────────────────────────────────────────────

/// A 2-D vector used for translation commands and wheel geometry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The zero vector.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Unit vector pointing at `angle` radians.
    pub fn from_angle(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(cos, sin)
    }

    pub fn sqr_magnitude(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn magnitude(self) -> f64 {
        self.sqr_magnitude().sqrt()
    }

    /// Return the unit vector in the same direction, or `None` for a zero
    /// (or non-finite) vector.
    pub fn normalized(self) -> Option<Self> {
        let mag = self.magnitude();
        if mag > 0.0 && mag.is_finite() {
            Some(self * (1.0 / mag))
        } else {
            None
        }
    }

    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y
    }

    /// Rotate counter-clockwise by `theta` radians.
    pub fn rotate(self, theta: f64) -> Self {
        let (sin, cos) = theta.sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// The vector rotated by +90°.
    pub fn left_perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// The vector rotated by -90°.
    pub fn right_perpendicular(self) -> Self {
        Self::new(self.y, -self.x)
    }

    /// Direction of this vector in `(-π, π]`.  The zero vector maps to `0`.
    pub fn angle(self) -> f64 {
        normalize_angle(self.y.atan2(self.x))
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vector2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vector2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Angle helpers
// ────────────────────────────────────────────────────────────────────────────

/// Wrap `angle` into `(-π, π]`.
///
/// Non-finite input maps to `0.0` so downstream heading math stays total.
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

/// Shortest signed rotation that takes `current` onto `target`, in `(-π, π]`.
pub fn shortest_signed_delta(current: f64, target: f64) -> f64 {
    normalize_angle(target - current)
}

/// Wrap `t` into `[0, length)`.
///
/// `length` must be positive; a non-positive `length` returns `0.0`.
pub fn repeat(t: f64, length: f64) -> f64 {
    if length <= 0.0 || !t.is_finite() {
        return 0.0;
    }
    let wrapped = t.rem_euclid(length);
    // rem_euclid can round up to `length` for tiny negative inputs.
    if wrapped >= length { 0.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn normalize_angle_stays_in_half_open_range() {
        for deg in (-1440..=1440).step_by(15) {
            let a = normalize_angle(f64::from(deg).to_radians());
            assert!(a > -PI - EPS && a <= PI + EPS, "{deg}° -> {a}");
            assert!(a > -PI, "-π must map to +π, got {a} for {deg}°");
        }
    }

    #[test]
    fn normalize_angle_maps_minus_pi_to_pi() {
        assert!((normalize_angle(-PI) - PI).abs() < EPS);
        assert!((normalize_angle(PI) - PI).abs() < EPS);
        assert!((normalize_angle(3.0 * PI) - PI).abs() < EPS);
    }

    #[test]
    fn normalize_angle_handles_non_finite() {
        assert_eq!(normalize_angle(f64::NAN), 0.0);
        assert_eq!(normalize_angle(f64::INFINITY), 0.0);
    }

    #[test]
    fn shortest_delta_crosses_the_seam() {
        let from = 170f64.to_radians();
        let to = -170f64.to_radians();
        let d = shortest_signed_delta(from, to);
        assert!((d - 20f64.to_radians()).abs() < EPS);

        let back = shortest_signed_delta(to, from);
        assert!((back + 20f64.to_radians()).abs() < EPS);
    }

    #[test]
    fn repeat_wraps_into_unit_interval() {
        assert!((repeat(1.25, 1.0) - 0.25).abs() < EPS);
        assert!((repeat(-0.25, 1.0) - 0.75).abs() < EPS);
        assert_eq!(repeat(-1.0, 1.0), 0.0);
        assert_eq!(repeat(1.0, 1.0), 0.0);
        assert!(repeat(-1e-18, 1.0) < 1.0);
    }

    #[test]
    fn rotate_quarter_turn() {
        let v = Vector2::new(1.0, 0.0).rotate(PI / 2.0);
        assert!(v.x.abs() < EPS);
        assert!((v.y - 1.0).abs() < EPS);
        assert_eq!(Vector2::new(1.0, 0.0).left_perpendicular(), Vector2::new(-0.0, 1.0));
    }

    #[test]
    fn normalized_zero_vector_is_none() {
        assert!(Vector2::zero().normalized().is_none());
        let n = Vector2::new(3.0, 4.0).normalized().unwrap();
        assert!((n.magnitude() - 1.0).abs() < EPS);
    }

    #[test]
    fn from_angle_round_trips_through_angle() {
        let a = -2.5;
        assert!((Vector2::from_angle(a).angle() - a).abs() < EPS);
    }
}

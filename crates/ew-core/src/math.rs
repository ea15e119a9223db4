//! Minimal 3D vector and rotation types used for spatial state.

use std::ops::{Add, AddAssign, Mul, MulAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// A point or direction in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl Vector3 {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Create a vector from components.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared length.
    pub fn magnitude_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Length.
    pub fn magnitude(&self) -> f32 {
        self.magnitude_squared().sqrt()
    }

    /// Squared distance between two points.
    pub fn distance_squared(a: &Self, b: &Self) -> f32 {
        (*a - *b).magnitude_squared()
    }

    /// Distance between two points.
    pub fn distance(a: &Self, b: &Self) -> f32 {
        Self::distance_squared(a, b).sqrt()
    }

    /// Normalize in place. A zero vector stays zero.
    pub fn normalize(&mut self) {
        let len = self.magnitude();
        if len > f32::EPSILON {
            *self *= 1.0 / len;
        }
    }

    /// Return a normalized copy.
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Linear interpolation from `self` toward `to` by `t` in `0.0..=1.0`.
    pub fn lerp(&self, to: &Self, t: f32) -> Self {
        *self + (*to - *self) * t
    }
}

impl Add for Vector3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vector3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vector3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vector3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<f32> for Vector3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl MulAssign<f32> for Vector3 {
    fn mul_assign(&mut self, rhs: f32) {
        *self = *self * rhs;
    }
}

impl std::fmt::Display for Vector3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// Euler rotation in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// Pitch in degrees.
    pub pitch: f32,
    /// Yaw in degrees.
    pub yaw: f32,
    /// Roll in degrees.
    pub roll: f32,
}

impl Rotation {
    /// Create a rotation from pitch, yaw and roll.
    pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Wrap an angle into `(-180, 180]`.
    pub fn normalize_angle(angle: f32) -> f32 {
        let mut a = angle % 360.0;
        if a > 180.0 {
            a -= 360.0;
        } else if a <= -180.0 {
            a += 360.0;
        }
        a
    }

    /// Interpolate along the shortest arc of each axis.
    pub fn lerp(&self, to: &Self, t: f32) -> Self {
        let step = |from: f32, to: f32| from + Self::normalize_angle(to - from) * t;
        Self::new(
            step(self.pitch, to.pitch),
            step(self.yaw, to.yaw),
            step(self.roll, to.roll),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_arithmetic() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(1.0, 1.0, 1.0);
        assert_eq!(a + b, Vector3::new(2.0, 3.0, 4.0));
        assert_eq!(a - b, Vector3::new(0.0, 1.0, 2.0));
        assert_eq!(a * 2.0, Vector3::new(2.0, 4.0, 6.0));
    }

    #[test]
    fn distance_three_four_five() {
        let a = Vector3::ZERO;
        let b = Vector3::new(3.0, 4.0, 0.0);
        assert!((Vector3::distance(&a, &b) - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn normalize_zero_is_noop() {
        assert_eq!(Vector3::ZERO.normalized(), Vector3::ZERO);
        let n = Vector3::new(0.0, 10.0, 0.0).normalized();
        assert!((n.y - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn angle_wraps() {
        assert!((Rotation::normalize_angle(190.0) + 170.0).abs() < 1e-4);
        assert!((Rotation::normalize_angle(-180.0) - 180.0).abs() < 1e-4);
        assert!((Rotation::normalize_angle(540.0) - 180.0).abs() < 1e-4);
    }

    #[test]
    fn rotation_lerp_takes_short_way() {
        let from = Rotation::new(0.0, 170.0, 0.0);
        let to = Rotation::new(0.0, -170.0, 0.0);
        let mid = from.lerp(&to, 0.5);
        assert!((Rotation::normalize_angle(mid.yaw) - 180.0).abs() < 1e-3);
    }
}

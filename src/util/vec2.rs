//! Ground-plane math
//!
//! The arena is a 3D world but everything the grid and the bots reason about
//! happens on the XZ ground plane. `Vec3` only exists at the physics boundary;
//! it is projected to `Vec2` (x -> x, z -> y) as soon as it enters the core.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// 2D vector on the arena ground plane
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
    pub const ONE: Vec2 = Vec2 { x: 1.0, y: 1.0 };

    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians, counter-clockwise from +x)
    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    #[inline]
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    #[inline]
    pub fn length_sq(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self {
                x: self.x / len,
                y: self.y / len,
            }
        } else {
            Self::ZERO
        }
    }

    /// Scale down to `max` length if longer
    pub fn clamp_length(&self, max: f32) -> Self {
        let len_sq = self.length_sq();
        if len_sq > max * max {
            self.normalize() * max
        } else {
            *self
        }
    }

    #[inline]
    pub fn dot(&self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z-component). Positive when `other` lies counter-clockwise of `self`.
    #[inline]
    pub fn cross(&self, other: Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    #[inline]
    pub fn distance_to(&self, other: Vec2) -> f32 {
        (*self - other).length()
    }

    #[inline]
    pub fn distance_sq_to(&self, other: Vec2) -> f32 {
        (*self - other).length_sq()
    }

    /// Taxicab distance, used for path look-ahead
    #[inline]
    pub fn manhattan_to(&self, other: Vec2) -> f32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Signed angle from this vector to `other`, in (-PI, PI]
    pub fn angle_to(&self, other: Vec2) -> f32 {
        self.cross(other).atan2(self.dot(other))
    }

    pub fn rotate(&self, angle: f32) -> Self {
        let (sin, cos) = (angle.sin(), angle.cos());
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    /// Component-wise sign with a dead zone: each axis becomes -1, 0 or 1
    pub fn signum_outside(&self, dead_zone: f32) -> Self {
        let axis = |v: f32| {
            if v > dead_zone {
                1.0
            } else if v < -dead_zone {
                -1.0
            } else {
                0.0
            }
        };
        Self {
            x: axis(self.x),
            y: axis(self.y),
        }
    }

    /// Check if vector is approximately zero
    pub fn is_zero(&self, epsilon: f32) -> bool {
        self.x.abs() < epsilon && self.y.abs() < epsilon
    }

    /// Check if vector is approximately equal to another
    pub fn approx_eq(&self, other: Vec2, epsilon: f32) -> bool {
        (self.x - other.x).abs() < epsilon && (self.y - other.y).abs() < epsilon
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl MulAssign<f32> for Vec2 {
    fn mul_assign(&mut self, rhs: f32) {
        self.x *= rhs;
        self.y *= rhs;
    }
}

/// 3D vector as reported by the physics engine (y is up)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Lift a ground-plane point back into 3D at the given height
    #[inline]
    pub fn from_ground(ground: Vec2, height: f32) -> Self {
        Self {
            x: ground.x,
            y: height,
            z: ground.y,
        }
    }

    /// Project onto the XZ ground plane
    #[inline]
    pub fn ground(&self) -> Vec2 {
        Vec2::new(self.x, self.z)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_length() {
        assert!(approx_eq(Vec2::new(3.0, 4.0).length(), 5.0));
        assert!(approx_eq(Vec2::ZERO.length(), 0.0));
    }

    #[test]
    fn test_normalize_zero() {
        assert_eq!(Vec2::ZERO.normalize(), Vec2::ZERO);
    }

    #[test]
    fn test_cross_sign() {
        let east = Vec2::new(1.0, 0.0);
        let north = Vec2::new(0.0, 1.0);
        assert!(east.cross(north) > 0.0);
        assert!(north.cross(east) < 0.0);
    }

    #[test]
    fn test_manhattan() {
        let a = Vec2::new(1.0, 1.0);
        let b = Vec2::new(4.0, -3.0);
        assert!(approx_eq(a.manhattan_to(b), 7.0));
    }

    #[test]
    fn test_angle_to() {
        let east = Vec2::new(1.0, 0.0);
        assert!(approx_eq(east.angle_to(Vec2::new(0.0, 1.0)), PI / 2.0));
        assert!(approx_eq(east.angle_to(Vec2::new(0.0, -1.0)), -PI / 2.0));
    }

    #[test]
    fn test_rotate() {
        let rotated = Vec2::new(1.0, 0.0).rotate(PI / 2.0);
        assert!(rotated.approx_eq(Vec2::new(0.0, 1.0), EPSILON));
    }

    #[test]
    fn test_signum_outside() {
        let v = Vec2::new(0.05, -3.0).signum_outside(0.1);
        assert_eq!(v, Vec2::new(0.0, -1.0));
        let v = Vec2::new(2.0, 0.5).signum_outside(0.1);
        assert_eq!(v, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_ground_projection() {
        let v = Vec3::new(3.0, 9.0, -2.0);
        assert_eq!(v.ground(), Vec2::new(3.0, -2.0));
        assert_eq!(Vec3::from_ground(v.ground(), 9.0), v);
    }

    #[test]
    fn test_ops() {
        let mut a = Vec2::new(1.0, 2.0);
        a += Vec2::new(3.0, 4.0);
        assert_eq!(a, Vec2::new(4.0, 6.0));
        a -= Vec2::ONE;
        assert_eq!(a, Vec2::new(3.0, 5.0));
        a *= 2.0;
        assert_eq!(-a, Vec2::new(-6.0, -10.0));
    }
}

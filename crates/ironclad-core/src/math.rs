//! Planar helpers on top of `cgmath`.
//!
//! The world is y-up; tanks move on the XZ ground plane. Yaw is measured in
//! radians around the y axis with `0` facing `+Z` and positive yaw turning
//! towards `+X`.

use crate::EPSILON;
use cgmath::{InnerSpace, Vector3, Zero};
use std::f32::consts::{PI, TAU};

/// Drops the vertical component of a vector.
pub fn flatten(v: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(v.x, 0.0, v.z)
}

/// Distance between two points measured on the ground plane.
pub fn planar_distance(a: Vector3<f32>, b: Vector3<f32>) -> f32 {
    flatten(b - a).magnitude()
}

/// Normalizes `v`, returning the zero vector for degenerate input.
pub fn normalize_or_zero(v: Vector3<f32>) -> Vector3<f32> {
    let len = v.magnitude();
    if len < EPSILON {
        Vector3::zero()
    } else {
        v / len
    }
}

/// Yaw of a direction on the ground plane.
pub fn yaw_of(dir: Vector3<f32>) -> f32 {
    dir.x.atan2(dir.z)
}

/// Unit ground-plane direction for a yaw angle.
pub fn direction_from_yaw(yaw: f32) -> Vector3<f32> {
    Vector3::new(yaw.sin(), 0.0, yaw.cos())
}

/// Wraps an angle into `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let mut a = angle % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}

/// Advances `current` towards `target` by at most `max_step` radians along
/// the shorter arc.
pub fn rotate_towards(current: f32, target: f32, max_step: f32) -> f32 {
    let diff = wrap_angle(target - current);
    if diff.abs() <= max_step {
        wrap_angle(target)
    } else {
        wrap_angle(current + diff.signum() * max_step)
    }
}

/// Rotates a ground-plane vector by `angle` radians of yaw.
pub fn rotate_yaw(v: Vector3<f32>, angle: f32) -> Vector3<f32> {
    let (sin, cos) = angle.sin_cos();
    Vector3::new(v.x * cos + v.z * sin, v.y, v.z * cos - v.x * sin)
}

/// Left-hand perpendicular of a ground-plane direction.
pub fn perpendicular_left(dir: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(-dir.z, 0.0, dir.x)
}

/// Right-hand perpendicular of a ground-plane direction.
pub fn perpendicular_right(dir: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(dir.z, 0.0, -dir.x)
}

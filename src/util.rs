use std::f32::consts::{PI, TAU};

use bevy::prelude::*;

/// Critically damped approach of `current` toward `target`.
///
/// `velocity` carries the filter state between calls. The closed form is the
/// usual cubic approximation of `exp(-omega * dt)`, so the result is stable
/// for any positive `dt` and never overshoots the target.
pub fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        return current;
    }
    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);
    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let mut output = target + (change + temp) * decay;
    if (target - current > 0.0) == (output > target) {
        output = target;
        *velocity = 0.0;
    }
    if !output.is_finite() {
        *velocity = 0.0;
        return target;
    }
    output
}

/// Component-wise [`smooth_damp`] for vectors.
pub fn smooth_damp_vec3(
    current: Vec3,
    target: Vec3,
    velocity: &mut Vec3,
    smooth_time: f32,
    dt: f32,
) -> Vec3 {
    Vec3::new(
        smooth_damp(current.x, target.x, &mut velocity.x, smooth_time, dt),
        smooth_damp(current.y, target.y, &mut velocity.y, smooth_time, dt),
        smooth_damp(current.z, target.z, &mut velocity.z, smooth_time, dt),
    )
}

/// Wraps an angle in radians into `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Yaw (rotation about +Y) whose forward direction (`-Z`) points along `dir`.
///
/// Only the horizontal part of `dir` matters. Returns `None` for vectors with
/// no horizontal extent.
pub fn heading_yaw(dir: Vec3) -> Option<f32> {
    let flat = Vec2::new(dir.x, dir.z);
    if !flat.is_finite() || flat.length_squared() < 1e-12 {
        return None;
    }
    Some((-dir.x).atan2(-dir.z))
}

/// Forward direction on the horizontal plane for a yaw angle.
pub fn yaw_forward(yaw: f32) -> Vec3 {
    Quat::from_rotation_y(yaw) * Vec3::NEG_Z
}

/// Right direction on the horizontal plane for a yaw angle.
pub fn yaw_right(yaw: f32) -> Vec3 {
    Quat::from_rotation_y(yaw) * Vec3::X
}

/// Horizontal (XZ) part of a vector.
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Returns `v` if every component is finite, zero otherwise.
pub fn finite_or_zero(v: Vec3) -> Vec3 {
    if v.is_finite() {
        v
    } else {
        Vec3::ZERO
    }
}

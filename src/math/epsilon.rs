//! Tolerances and near-equality tests.
//!
//! Rotation changes are measured on the raw quaternion components
//! (x, y, z), not as an angular distance.

use glam::{Quat, Vec3, Vec4};

/// Translation tolerance, in scene units.
pub const TRANSLATION_EPSILON: f32 = 1e-5;
/// Tolerance on a single quaternion component.
pub const ROTATION_EPSILON: f32 = 1e-4;
/// Scale tolerance around 1.0.
pub const SCALE_EPSILON: f32 = 1e-5;
/// Ancestors whose scale is this close to 1 on every axis are ignored by
/// the scale corrector.
pub const SCALE_CORRECTION_SKIP: f32 = 8e-3;

/// Component-wise comparison of two vectors.
#[inline]
#[must_use]
pub fn vec3_approx_eq(a: Vec3, b: Vec3, epsilon: f32) -> bool {
    (a - b).abs().max_element() <= epsilon
}

/// Component-wise comparison of two rotations.
///
/// `q` and `-q` describe the same rotation, so `b` is flipped into the
/// hemisphere of `a` first.
#[inline]
#[must_use]
pub fn quat_approx_eq(a: Quat, b: Quat, epsilon: f32) -> bool {
    let b = if a.dot(b) < 0.0 { -b } else { b };
    (Vec4::from(a) - Vec4::from(b)).abs().max_element() <= epsilon
}

/// A translation delta that exceeds [`TRANSLATION_EPSILON`] on any axis.
#[inline]
#[must_use]
pub fn is_translated(delta: Vec3) -> bool {
    delta.abs().max_element() > TRANSLATION_EPSILON
}

/// A rotation delta whose x, y or z component exceeds [`ROTATION_EPSILON`].
#[inline]
#[must_use]
pub fn is_rotated(delta: Quat) -> bool {
    delta.xyz().abs().max_element() > ROTATION_EPSILON
}

/// A scale that differs from 1 by more than [`SCALE_EPSILON`] on any axis.
#[inline]
#[must_use]
pub fn is_scaled(scale: Vec3) -> bool {
    !vec3_approx_eq(scale, Vec3::ONE, SCALE_EPSILON)
}

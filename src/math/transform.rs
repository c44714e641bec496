use glam::{Mat4, Quat, Vec3};

use super::epsilon::{
    ROTATION_EPSILON, SCALE_EPSILON, TRANSLATION_EPSILON, quat_approx_eq, vec3_approx_eq,
};

/// A decomposed transform: position, rotation and scale (TRS).
///
/// Rotations follow glam's column-vector convention: `rotation * v` maps a
/// vector from the transform's local space into the space it is expressed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub const fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Unit-scale transform.
    #[must_use]
    pub const fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self::new(position, rotation, Vec3::ONE)
    }

    /// Decomposes a column-vector matrix.
    ///
    /// Shear is lost. A singular matrix yields an identity rotation instead
    /// of NaNs.
    #[must_use]
    pub fn from_matrix(mat: Mat4) -> Self {
        let (scale, rotation, position) = mat.to_scale_rotation_translation();
        let rotation = if rotation.is_finite() && rotation.length_squared() > 0.0 {
            rotation.normalize()
        } else {
            Quat::IDENTITY
        };
        let scale = if scale.is_finite() { scale } else { Vec3::ONE };
        Self {
            position,
            rotation,
            scale,
        }
    }

    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Maps a point from local space: `position + rotation * (scale * p)`.
    #[inline]
    #[must_use]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * (self.scale * point)
    }

    #[inline]
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Multiplies the position by `factor`, leaving rotation and scale alone.
    #[inline]
    #[must_use]
    pub fn with_position_scaled(mut self, factor: f32) -> Self {
        self.position *= factor;
        self
    }

    /// Linear interpolation of position and scale, spherical interpolation of rotation.
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            position: self.position.lerp(other.position, t),
            rotation: self.rotation.slerp(other.rotation, t),
            scale: self.scale.lerp(other.scale, t),
        }
    }

    /// Compares every channel against its own tolerance.
    #[must_use]
    pub fn approx_eq(&self, other: &Self) -> bool {
        vec3_approx_eq(self.position, other.position, TRANSLATION_EPSILON)
            && quat_approx_eq(self.rotation, other.rotation, ROTATION_EPSILON)
            && vec3_approx_eq(self.scale, other.scale, SCALE_EPSILON)
    }
}

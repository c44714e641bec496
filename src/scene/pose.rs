//! Per-kind pose lookup.
//!
//! Each node kind knows how to read its rest and current transform from the
//! host. The result is always world-space position and rotation with the
//! node's local scale.

use super::host::SceneQuery;
use super::node::{BonePose, NodeKind, ObjectPose};
use crate::errors::SceneError;
use crate::math::Transform;

/// Reads a node's transform from the host scene.
pub trait PoseProvider {
    /// The transform captured before any animation is applied.
    fn rest_transform(&self, scene: &dyn SceneQuery) -> Result<Transform, SceneError>;

    /// The transform at the host's current time.
    fn current_transform(&self, scene: &dyn SceneQuery) -> Result<Transform, SceneError>;
}

impl PoseProvider for ObjectPose {
    fn rest_transform(&self, scene: &dyn SceneQuery) -> Result<Transform, SceneError> {
        let world = scene.world_rest_transform(self.object)?.decompose();
        Ok(world.with_scale(scene.object_rest_scale(self.object)?))
    }

    fn current_transform(&self, scene: &dyn SceneQuery) -> Result<Transform, SceneError> {
        let world = scene.object_world_transform(self.object)?.decompose();
        Ok(world.with_scale(scene.object_scale(self.object)?))
    }
}

impl PoseProvider for BonePose {
    fn rest_transform(&self, scene: &dyn SceneQuery) -> Result<Transform, SceneError> {
        let owner = ObjectPose { object: self.owner }.rest_transform(scene)?;
        let bone = scene.bone_rest_matrix(self.armature, self.bone)?.decompose();
        Ok(bone_to_world(&owner, &bone))
    }

    fn current_transform(&self, scene: &dyn SceneQuery) -> Result<Transform, SceneError> {
        let owner = ObjectPose { object: self.owner }.current_transform(scene)?;
        let bone = scene
            .bone_pose_transform(self.armature, self.bone)?
            .decompose();
        Ok(bone_to_world(&owner, &bone))
    }
}

impl PoseProvider for NodeKind {
    fn rest_transform(&self, scene: &dyn SceneQuery) -> Result<Transform, SceneError> {
        match self {
            Self::Root => Ok(Transform::IDENTITY),
            Self::Object(object) => object.rest_transform(scene),
            Self::Bone(bone) => bone.rest_transform(scene),
        }
    }

    fn current_transform(&self, scene: &dyn SceneQuery) -> Result<Transform, SceneError> {
        match self {
            Self::Root => Ok(Transform::IDENTITY),
            Self::Object(object) => object.current_transform(scene),
            Self::Bone(bone) => bone.current_transform(scene),
        }
    }
}

/// Moves an armature-space bone transform into world space.
///
/// The armature object's scale is applied to the bone offset component-wise.
/// The bone keeps its own scale.
#[must_use]
pub fn bone_to_world(owner: &Transform, bone: &Transform) -> Transform {
    Transform::new(
        owner.position + owner.rotation * (owner.scale * bone.position),
        (owner.rotation * bone.rotation).normalize(),
        bone.scale,
    )
}

/// Applies the export scale factor to a position. Factors within 1e-3 of 1
/// are ignored.
#[inline]
#[must_use]
pub fn apply_export_scale(transform: Transform, factor: f32) -> Transform {
    if (factor - 1.0).abs() < 1e-3 {
        transform
    } else {
        transform.with_position_scaled(factor)
    }
}

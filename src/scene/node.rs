use glam::{Quat, Vec3};

use super::host::{ArmatureId, BoneId, ObjectId};
use crate::math::Transform;

/// A scene object turned into a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectPose {
    pub object: ObjectId,
}

/// An armature bone turned into a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BonePose {
    pub armature: ArmatureId,
    pub bone: BoneId,
    /// The armature object whose world transform carries the bone.
    pub owner: ObjectId,
}

/// What a node was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The synthetic catch-all root at index 0.
    Root,
    Object(ObjectPose),
    Bone(BonePose),
}

impl NodeKind {
    #[must_use]
    pub fn is_bone(&self) -> bool {
        matches!(self, Self::Bone(_))
    }
}

/// One exportable transform joint of the flattened hierarchy.
///
/// Created by [`NodeHierarchyBuilder`](super::NodeHierarchyBuilder); the
/// rest-pose fields are filled once by
/// [`RestPoseResolver`](super::RestPoseResolver) and never change afterwards.
#[derive(Debug, Clone)]
pub struct Node {
    /// Position in the flattened array. 0 is the catch-all root.
    pub index: u32,
    /// Nearest non-excluded ancestor, -1 for the root only.
    pub parent_index: i32,
    /// Export name.
    pub name: String,
    /// Name reported by the host.
    pub host_name: String,
    pub kind: NodeKind,
    /// For bones: index of the owning armature object's node, if that
    /// object was not excluded.
    pub armature_parent: Option<u32>,

    // === Rest pose (world space) ===
    pub rest_position_ws: Vec3,
    pub rest_rotation_ws: Quat,
    /// Local rest scale.
    pub rest_scale: Vec3,

    // === Default transform (parent space) ===
    pub default_position_ps: Vec3,
    pub default_rotation_ps: Quat,
}

impl Node {
    pub(crate) fn new(index: u32, parent_index: i32, name: String, kind: NodeKind) -> Self {
        Self {
            index,
            parent_index,
            host_name: name.clone(),
            name,
            kind,
            armature_parent: None,
            rest_position_ws: Vec3::ZERO,
            rest_rotation_ws: Quat::IDENTITY,
            rest_scale: Vec3::ONE,
            default_position_ps: Vec3::ZERO,
            default_rotation_ps: Quat::IDENTITY,
        }
    }

    /// Structural parent index, `None` for the root.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<usize> {
        usize::try_from(self.parent_index).ok()
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_index < 0
    }

    /// World-space rest transform with local rest scale.
    #[must_use]
    pub fn rest_transform(&self) -> Transform {
        Transform::new(self.rest_position_ws, self.rest_rotation_ws, self.rest_scale)
    }

    /// Parent-space default transform with local rest scale.
    #[must_use]
    pub fn default_transform(&self) -> Transform {
        Transform::new(
            self.default_position_ps,
            self.default_rotation_ps,
            self.rest_scale,
        )
    }
}

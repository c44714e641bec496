//! Scene flattening and rest-pose resolution.
//!
//! # Overview
//!
//! - [`host`]: the [`SceneQuery`] and [`TimeSource`] capabilities the host
//!   application implements.
//! - [`node`]: the flattened [`Node`] record.
//! - [`armature`]: armature bookkeeping, deduplicated by skeleton identity.
//! - [`hierarchy`]: [`NodeHierarchyBuilder`] and the [`NodeHierarchy`] arena.
//! - [`pose`]: [`PoseProvider`], implemented once per node kind.
//! - [`rest_pose`]: [`RestPoseResolver`] and the [`ScaleCorrector`].

pub mod armature;
pub mod hierarchy;
pub mod host;
pub mod node;
pub mod pose;
pub mod rest_pose;

pub use armature::{Armature, ArmatureRegistry};
pub use hierarchy::{NodeHierarchy, NodeHierarchyBuilder, CATCH_ROOT_NAME};
pub use host::{
    ArmatureId, BoneId, BoneInfo, GROUND_PROXY_NAME, NodeRef, ObjectId, SceneQuery, TimeSource,
};
pub use node::{BonePose, Node, NodeKind, ObjectPose};
pub use pose::{PoseProvider, apply_export_scale, bone_to_world};
pub use rest_pose::{RestPoseResolver, ScaleCorrector, to_parent_space};

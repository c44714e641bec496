//! Host scene capabilities.
//!
//! The baker never touches the host application directly. Everything it
//! reads goes through [`SceneQuery`], and the single piece of mutable host
//! state (the current time and the active action) goes through
//! [`TimeSource`]. Functions that sample poses take a `&mut` host so the
//! write-then-read on the time cursor is visible in their signature.

use std::fmt;

use glam::Vec3;

use crate::errors::SceneError;
use crate::math::HostMatrix;

/// Name of the object that carries ground (root) motion.
pub const GROUND_PROXY_NAME: &str = "Bounds";

macro_rules! host_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

host_id!(
    /// Host handle of a scene object.
    ObjectId
);
host_id!(
    /// Host handle of an armature (skeleton) datablock.
    ///
    /// Two objects sharing one skeleton report the same id.
    ArmatureId
);
host_id!(
    /// Host handle of a bone, unique within its armature.
    BoneId
);

/// Anything that can become a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Object(ObjectId),
    Bone { armature: ArmatureId, bone: BoneId },
}

/// One bone as enumerated by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoneInfo {
    pub id: BoneId,
    pub name: String,
    /// Parent bone, `None` for root bones of the armature.
    pub parent: Option<BoneId>,
}

/// Read access to the host scene.
///
/// All pose lookups reflect the host's current time and active action,
/// which are controlled through [`TimeSource`].
pub trait SceneQuery {
    /// Objects without a parent, in host order.
    fn root_objects(&self) -> Vec<ObjectId>;

    /// Direct children of an object, in host order.
    fn children(&self, object: ObjectId) -> Vec<ObjectId>;

    fn object_name(&self, object: ObjectId) -> String;

    /// Whether the object carries geometry. Mesh objects export under a
    /// stripped name.
    fn is_mesh(&self, _object: ObjectId) -> bool {
        false
    }

    /// The armature datablock of an armature object.
    fn armature(&self, object: ObjectId) -> Option<ArmatureId>;

    /// Every bone of an armature. Parents need not precede children.
    fn bones(&self, armature: ArmatureId) -> Vec<BoneInfo>;

    /// The bone of the parent armature this object is attached to, if any.
    fn parent_bone(&self, _object: ObjectId) -> Option<BoneId> {
        None
    }

    /// Host-side exclusion policy.
    fn is_excluded(&self, _node: NodeRef) -> bool {
        false
    }

    /// World-space matrix of the object in its rest pose.
    fn world_rest_transform(&self, object: ObjectId) -> Result<HostMatrix, SceneError>;

    /// Local scale of the object in its rest pose.
    fn object_rest_scale(&self, object: ObjectId) -> Result<Vec3, SceneError>;

    /// Rest matrix of a bone in armature space.
    fn bone_rest_matrix(&self, armature: ArmatureId, bone: BoneId)
    -> Result<HostMatrix, SceneError>;

    /// World-space matrix of the object at the current time.
    fn object_world_transform(&self, object: ObjectId) -> Result<HostMatrix, SceneError>;

    /// Local scale of the object at the current time.
    fn object_scale(&self, object: ObjectId) -> Result<Vec3, SceneError>;

    /// Posed matrix of a bone in armature space at the current time.
    fn bone_pose_transform(
        &self,
        armature: ArmatureId,
        bone: BoneId,
    ) -> Result<HostMatrix, SceneError>;

    /// Number of frames of an action, `None` if the host has no such action.
    fn action_frame_count(&self, action: &str) -> Option<u32>;

    /// Value of the object's visibility curve at `frame`, `None` if it has no
    /// such curve. Evaluated from the curve itself; the time cursor is not
    /// consulted.
    fn object_visibility(&self, _object: ObjectId, _frame: u32) -> Result<Option<f32>, SceneError> {
        Ok(None)
    }

    /// Names of the shape's IFL materials, in material order.
    fn ifl_materials(&self) -> Vec<String> {
        Vec::new()
    }

    /// Depth-first search for an object by name.
    fn find_object(&self, name: &str) -> Option<ObjectId> {
        let mut stack: Vec<ObjectId> = self.root_objects().into_iter().rev().collect();
        let mut visited = rustc_hash::FxHashSet::default();
        while let Some(object) = stack.pop() {
            if !visited.insert(object) {
                continue;
            }
            if self.object_name(object) == name {
                return Some(object);
            }
            stack.extend(self.children(object).into_iter().rev());
        }
        None
    }

    /// The object whose motion becomes ground frames.
    fn ground_proxy_object(&self) -> Option<ObjectId> {
        self.find_object(GROUND_PROXY_NAME)
    }
}

/// Control over the host's shared, mutable time cursor and pose state.
pub trait TimeSource {
    /// Moves the host to `frame`. Every pose read afterwards reflects it.
    fn set_current_time(&mut self, frame: u32) -> Result<(), SceneError>;

    /// Clears any pose left on the armature (all bones back to identity).
    fn reset_pose(&mut self, armature: ArmatureId) -> Result<(), SceneError>;

    /// Makes `action` drive the animated objects and armatures. `None` keeps
    /// whatever the host has bound.
    fn set_active_action(&mut self, action: Option<&str>) -> Result<(), SceneError>;
}

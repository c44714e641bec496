//! Shared test fixtures: an in-memory host scene and a recording writer.

#![allow(dead_code)]

use std::collections::HashMap;

use dts_baker::animation::StandaloneSequence;
use dts_baker::errors::SceneError;
use dts_baker::export::{CancelToken, Shape, ShapeWriter, WriterError};
use dts_baker::math::{HostMatrix, Transform};
use dts_baker::scene::{
    ArmatureId, BoneId, BoneInfo, Node, NodeRef, ObjectId, SceneQuery, TimeSource,
};
use glam::{Quat, Vec3};

// ============================================================================
// Helpers
// ============================================================================

pub const EPSILON: f32 = 1e-4;

pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

pub fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
}

pub fn quat_approx(a: Quat, b: Quat) -> bool {
    let b = if a.dot(b) < 0.0 { -b } else { b };
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z) && approx_eq(a.w, b.w)
}

pub fn at(x: f32, y: f32, z: f32) -> Transform {
    Transform::from_position_rotation(Vec3::new(x, y, z), Quat::IDENTITY)
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Mock scene
// ============================================================================

type Keys = HashMap<(Option<String>, u32), Transform>;

#[derive(Debug, Clone)]
pub struct MockObject {
    pub name: String,
    pub parent: Option<ObjectId>,
    pub parent_bone: Option<BoneId>,
    pub armature: Option<ArmatureId>,
    pub mesh: bool,
    pub excluded: bool,
    /// World-space rest transform.
    pub rest: Transform,
    /// Local rest scale.
    pub rest_scale: Vec3,
    /// World-space transform per (action, frame). Scale is the local scale.
    pub keys: Keys,
    /// Visibility curve, one value per frame starting at frame 1. Frames past
    /// the end hold the last value.
    pub visibility: Option<Vec<f32>>,
}

#[derive(Debug, Clone)]
pub struct MockBone {
    pub info: BoneInfo,
    pub excluded: bool,
    /// Armature-space rest transform.
    pub rest: Transform,
    /// Armature-space pose per (action, frame).
    pub keys: Keys,
}

#[derive(Debug, Clone, Default)]
pub struct MockArmature {
    pub bones: Vec<MockBone>,
}

/// In-memory host. Poses fall back from the active action's key to an
/// action-less key to the rest pose.
#[derive(Debug, Default)]
pub struct MockScene {
    pub objects: Vec<MockObject>,
    pub armatures: Vec<MockArmature>,
    pub action_frames: HashMap<String, u32>,
    pub ifl_materials: Vec<String>,

    pub current_frame: u32,
    pub active_action: Option<String>,
    pub fail_at_frame: Option<u32>,
    pub cancel_at_frame: Option<(u32, CancelToken)>,

    pub visited_frames: Vec<u32>,
    pub resets: Vec<ArmatureId>,
    pub actions_set: Vec<Option<String>>,
}

impl MockScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&mut self, name: &str, parent: Option<ObjectId>, rest: Transform) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(MockObject {
            name: name.to_string(),
            parent,
            parent_bone: None,
            armature: None,
            mesh: false,
            excluded: false,
            rest,
            rest_scale: rest.scale,
            keys: HashMap::new(),
            visibility: None,
        });
        id
    }

    pub fn id(&self, name: &str) -> ObjectId {
        let index = self
            .objects
            .iter()
            .position(|o| o.name == name)
            .expect("object exists");
        ObjectId(index as u32)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> &mut MockObject {
        &mut self.objects[id.0 as usize]
    }

    pub fn add_armature(&mut self, object: ObjectId) -> ArmatureId {
        let id = ArmatureId(self.armatures.len() as u32);
        self.armatures.push(MockArmature::default());
        self.object_mut(object).armature = Some(id);
        id
    }

    pub fn add_bone(
        &mut self,
        armature: ArmatureId,
        name: &str,
        parent: Option<BoneId>,
        rest: Transform,
    ) -> BoneId {
        let bones = &mut self.armatures[armature.0 as usize].bones;
        let id = BoneId(bones.len() as u32 + 100);
        bones.push(MockBone {
            info: BoneInfo {
                id,
                name: name.to_string(),
                parent,
            },
            excluded: false,
            rest,
            keys: HashMap::new(),
        });
        id
    }

    pub fn bone_mut(&mut self, armature: ArmatureId, bone: BoneId) -> &mut MockBone {
        self.armatures[armature.0 as usize]
            .bones
            .iter_mut()
            .find(|b| b.info.id == bone)
            .expect("bone exists")
    }

    pub fn key_object(&mut self, object: ObjectId, action: Option<&str>, frame: u32, world: Transform) {
        self.object_mut(object)
            .keys
            .insert((action.map(str::to_string), frame), world);
    }

    pub fn key_bone(
        &mut self,
        armature: ArmatureId,
        bone: BoneId,
        action: Option<&str>,
        frame: u32,
        pose: Transform,
    ) {
        self.bone_mut(armature, bone)
            .keys
            .insert((action.map(str::to_string), frame), pose);
    }

    pub fn set_visibility(&mut self, object: ObjectId, curve: &[f32]) {
        self.object_mut(object).visibility = Some(curve.to_vec());
    }

    pub fn set_action_frames(&mut self, action: &str, frames: u32) {
        self.action_frames.insert(action.to_string(), frames);
    }

    fn object(&self, id: ObjectId) -> Result<&MockObject, SceneError> {
        self.objects
            .get(id.0 as usize)
            .ok_or(SceneError::UnknownObject(id))
    }

    fn bone(&self, armature: ArmatureId, bone: BoneId) -> Result<&MockBone, SceneError> {
        self.armatures
            .get(armature.0 as usize)
            .and_then(|a| a.bones.iter().find(|b| b.info.id == bone))
            .ok_or(SceneError::UnknownBone { armature, bone })
    }

    fn key(&self, keys: &Keys) -> Option<Transform> {
        keys.get(&(self.active_action.clone(), self.current_frame))
            .or_else(|| keys.get(&(None, self.current_frame)))
            .copied()
    }
}

impl SceneQuery for MockScene {
    fn root_objects(&self) -> Vec<ObjectId> {
        (0..self.objects.len() as u32)
            .map(ObjectId)
            .filter(|&id| self.objects[id.0 as usize].parent.is_none())
            .collect()
    }

    fn children(&self, object: ObjectId) -> Vec<ObjectId> {
        (0..self.objects.len() as u32)
            .map(ObjectId)
            .filter(|&id| self.objects[id.0 as usize].parent == Some(object))
            .collect()
    }

    fn object_name(&self, object: ObjectId) -> String {
        self.object(object).map(|o| o.name.clone()).unwrap_or_default()
    }

    fn is_mesh(&self, object: ObjectId) -> bool {
        self.object(object).is_ok_and(|o| o.mesh)
    }

    fn armature(&self, object: ObjectId) -> Option<ArmatureId> {
        self.object(object).ok().and_then(|o| o.armature)
    }

    fn bones(&self, armature: ArmatureId) -> Vec<BoneInfo> {
        self.armatures
            .get(armature.0 as usize)
            .map(|a| a.bones.iter().map(|b| b.info.clone()).collect())
            .unwrap_or_default()
    }

    fn parent_bone(&self, object: ObjectId) -> Option<BoneId> {
        self.object(object).ok().and_then(|o| o.parent_bone)
    }

    fn is_excluded(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Object(id) => self.object(id).is_ok_and(|o| o.excluded),
            NodeRef::Bone { armature, bone } => self.bone(armature, bone).is_ok_and(|b| b.excluded),
        }
    }

    fn world_rest_transform(&self, object: ObjectId) -> Result<HostMatrix, SceneError> {
        Ok(HostMatrix::from_transform(&self.object(object)?.rest))
    }

    fn object_rest_scale(&self, object: ObjectId) -> Result<Vec3, SceneError> {
        Ok(self.object(object)?.rest_scale)
    }

    fn bone_rest_matrix(&self, armature: ArmatureId, bone: BoneId) -> Result<HostMatrix, SceneError> {
        Ok(HostMatrix::from_transform(&self.bone(armature, bone)?.rest))
    }

    fn object_world_transform(&self, object: ObjectId) -> Result<HostMatrix, SceneError> {
        let o = self.object(object)?;
        let world = self.key(&o.keys).unwrap_or(o.rest);
        Ok(HostMatrix::from_transform(&world))
    }

    fn object_scale(&self, object: ObjectId) -> Result<Vec3, SceneError> {
        let o = self.object(object)?;
        Ok(self.key(&o.keys).map_or(o.rest_scale, |t| t.scale))
    }

    fn bone_pose_transform(&self, armature: ArmatureId, bone: BoneId) -> Result<HostMatrix, SceneError> {
        let b = self.bone(armature, bone)?;
        Ok(HostMatrix::from_transform(&self.key(&b.keys).unwrap_or(b.rest)))
    }

    fn action_frame_count(&self, action: &str) -> Option<u32> {
        self.action_frames.get(action).copied()
    }

    fn object_visibility(&self, object: ObjectId, frame: u32) -> Result<Option<f32>, SceneError> {
        let curve = self.object(object)?.visibility.as_ref();
        Ok(curve.and_then(|c| c.get(frame.saturating_sub(1) as usize).or(c.last()).copied()))
    }

    fn ifl_materials(&self) -> Vec<String> {
        self.ifl_materials.clone()
    }
}

impl TimeSource for MockScene {
    fn set_current_time(&mut self, frame: u32) -> Result<(), SceneError> {
        if self.fail_at_frame == Some(frame) {
            return Err(SceneError::Host(format!("frame {frame} is broken")));
        }
        if let Some((at, token)) = &self.cancel_at_frame
            && *at == frame
        {
            token.cancel();
        }
        self.current_frame = frame;
        self.visited_frames.push(frame);
        Ok(())
    }

    fn reset_pose(&mut self, armature: ArmatureId) -> Result<(), SceneError> {
        self.resets.push(armature);
        Ok(())
    }

    fn set_active_action(&mut self, action: Option<&str>) -> Result<(), SceneError> {
        self.active_action = action.map(str::to_string);
        self.actions_set.push(self.active_action.clone());
        Ok(())
    }
}

// ============================================================================
// Recording writer
// ============================================================================

#[derive(Debug, Default)]
pub struct RecordingWriter {
    pub node_names: Vec<String>,
    pub shape_sequences: Vec<String>,
    pub standalone: Vec<StandaloneSequence>,
    pub translations_written: usize,
    pub fail_on_shape: bool,
    pub discarded: bool,
}

impl ShapeWriter for RecordingWriter {
    fn write_standalone(&mut self, _nodes: &[Node], sequence: &StandaloneSequence) -> Result<(), WriterError> {
        self.standalone.push(sequence.clone());
        Ok(())
    }

    fn write_shape(&mut self, shape: &Shape<'_>) -> Result<(), WriterError> {
        if self.fail_on_shape {
            return Err("disk full".into());
        }
        self.node_names = shape.nodes.iter().map(|n| n.name.clone()).collect();
        self.shape_sequences = shape.sequences.iter().map(|s| s.name.clone()).collect();
        self.translations_written = shape.tracks.node_translations.len();
        Ok(())
    }

    fn discard(&mut self) {
        self.discarded = true;
        self.standalone.clear();
    }
}

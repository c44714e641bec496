use rustc_hash::FxHashSet;

use super::host::{ArmatureId, ObjectId};

/// Bones sharing one skeleton, carried by one armature object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Armature {
    pub id: ArmatureId,
    /// The object the skeleton was first reached through.
    pub object: ObjectId,
    /// Node indices of the emitted bones, in hierarchy order.
    pub bone_nodes: Vec<u32>,
}

/// Armatures of one export, deduplicated by skeleton identity.
#[derive(Debug, Default, Clone)]
pub struct ArmatureRegistry {
    armatures: Vec<Armature>,
    seen: FxHashSet<ArmatureId>,
}

impl ArmatureRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an armature. Returns `false` if it was already known, in
    /// which case nothing changes.
    pub fn add(&mut self, id: ArmatureId, object: ObjectId) -> bool {
        if !self.seen.insert(id) {
            log::debug!("{id} already registered, ignoring duplicate");
            return false;
        }
        self.armatures.push(Armature {
            id,
            object,
            bone_nodes: Vec::new(),
        });
        true
    }

    #[must_use]
    pub fn contains(&self, id: ArmatureId) -> bool {
        self.seen.contains(&id)
    }

    #[must_use]
    pub fn get(&self, id: ArmatureId) -> Option<&Armature> {
        self.armatures.iter().find(|a| a.id == id)
    }

    pub(crate) fn push_bone_node(&mut self, id: ArmatureId, node_index: u32) {
        if let Some(armature) = self.armatures.iter_mut().find(|a| a.id == id) {
            armature.bone_nodes.push(node_index);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Armature> {
        self.armatures.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.armatures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.armatures.is_empty()
    }
}

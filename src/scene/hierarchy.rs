//! Scene flattening.
//!
//! [`NodeHierarchyBuilder`] walks the host scene depth-first and produces a
//! [`NodeHierarchy`]: an arena of [`Node`]s addressed by index, with the
//! synthetic catch-all root at index 0.
//!
//! The walk happens in two passes over an intermediate arena:
//!
//! 1. **Collect**: objects are visited from the scene roots, armature bones
//!    are inserted as a sub-tree under the object that owns the armature, and
//!    objects attached to a bone are moved under that bone.
//! 2. **Emit**: the arena is walked again with an explicit stack. Excluded
//!    entries produce no node; their children are attached to the nearest
//!    emitted ancestor, or to the catch-all root.
//!
//! Since a node is only emitted after its parent, `parent_index < index`
//! holds for every node but the root.

use std::fmt::Write as _;

use rustc_hash::{FxHashMap, FxHashSet};

use super::armature::ArmatureRegistry;
use super::host::{ArmatureId, BoneId, BoneInfo, NodeRef, ObjectId, SceneQuery};
use super::node::{BonePose, Node, NodeKind, ObjectPose};
use super::rest_pose::ScaleCorrector;
use crate::config::NodeExclusion;
use crate::diagnostics::{Diagnostic, ExportLog};
use crate::math::Transform;

/// Default name of the synthetic root node.
pub const CATCH_ROOT_NAME: &str = "Exp-Catch-Root";

/// Scratch object some hosts create while exporting. Never exported.
const TEMP_OBJECT_NAME: &str = "DTSExpObj_Tmp";

/// The flattened node array of one export.
#[derive(Debug, Clone)]
pub struct NodeHierarchy {
    nodes: Vec<Node>,
    children: Vec<Vec<u32>>,
    armatures: ArmatureRegistry,
    pub(crate) rest_resolved: bool,
}

impl NodeHierarchy {
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: the catch-all root is present even in an empty scene.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Child node indices, in emission order.
    #[must_use]
    pub fn children(&self, index: usize) -> &[u32] {
        self.children.get(index).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn armatures(&self) -> &ArmatureRegistry {
        &self.armatures
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Ancestors of a node, closest first, ending with the root.
    pub fn ancestors(&self, index: usize) -> impl Iterator<Item = &Node> {
        let mut next = self.nodes.get(index).and_then(Node::parent);
        std::iter::from_fn(move || {
            let node = self.nodes.get(next?)?;
            next = node.parent();
            Some(node)
        })
    }

    #[must_use]
    pub fn is_rest_resolved(&self) -> bool {
        self.rest_resolved
    }

    /// Rebuilds a node's world-space rest transform from the parent-space
    /// default transforms of its ancestors, re-applying ancestor scale.
    #[must_use]
    pub fn compose_default_world(&self, index: usize) -> Transform {
        let Some(node) = self.nodes.get(index) else {
            return Transform::IDENTITY;
        };
        let Some(parent_index) = node.parent() else {
            return node.rest_transform();
        };
        let parent = self.compose_default_world(parent_index);
        let offset = parent.rotation * node.default_position_ps;
        let offset = ScaleCorrector::restore(
            offset,
            self.ancestors(index)
                .map(|a| (a.rest_rotation_ws, a.rest_scale)),
        );
        Transform::new(
            parent.position + offset,
            parent.rotation * node.default_rotation_ps,
            node.rest_scale,
        )
    }

    /// Indented, human-readable listing of the hierarchy.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(0_usize, 0_usize)];
        while let Some((index, depth)) = stack.pop() {
            let Some(node) = self.nodes.get(index) else {
                continue;
            };
            let kind = match node.kind {
                NodeKind::Root => "root",
                NodeKind::Object(_) => "object",
                NodeKind::Bone(_) => "bone",
            };
            let _ = writeln!(
                out,
                "{:indent$}[{}] {} ({kind})",
                "",
                node.index,
                node.name,
                indent = depth * 2
            );
            for &child in self.children(index).iter().rev() {
                stack.push((child as usize, depth + 1));
            }
        }
        out
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }
}

/// One collected scene element, before exclusion is applied.
#[derive(Debug)]
struct Entry {
    kind: NodeKind,
    host_name: String,
    export_name: String,
    excluded: bool,
    children: Vec<usize>,
}

#[derive(Default)]
struct Collected {
    entries: Vec<Entry>,
    roots: Vec<usize>,
    armatures: ArmatureRegistry,
    bone_entries: FxHashMap<(ArmatureId, BoneId), usize>,
}

impl Collected {
    fn push(&mut self, parent: Option<usize>, entry: Entry) -> usize {
        let index = self.entries.len();
        self.entries.push(entry);
        match parent {
            Some(parent) => self.entries[parent].children.push(index),
            None => self.roots.push(index),
        }
        index
    }
}

/// Builds a [`NodeHierarchy`] from a host scene.
pub struct NodeHierarchyBuilder<'a> {
    scene: &'a dyn SceneQuery,
    exclusion: NodeExclusion,
    catch_root_name: String,
}

impl<'a> NodeHierarchyBuilder<'a> {
    #[must_use]
    pub fn new(scene: &'a dyn SceneQuery) -> Self {
        Self {
            scene,
            exclusion: NodeExclusion::default(),
            catch_root_name: CATCH_ROOT_NAME.to_string(),
        }
    }

    /// Name-based exclusion applied on top of [`SceneQuery::is_excluded`].
    #[must_use]
    pub fn with_exclusion(mut self, exclusion: NodeExclusion) -> Self {
        self.exclusion = exclusion;
        self
    }

    #[must_use]
    pub fn with_catch_root_name(mut self, name: impl Into<String>) -> Self {
        self.catch_root_name = name.into();
        self
    }

    pub fn build(&self, log: &mut ExportLog) -> NodeHierarchy {
        let collected = self.collect(log);
        let mut hierarchy = self.emit(collected);
        resolve_name_collisions(&mut hierarchy.nodes, log);
        log::debug!("Built node hierarchy with {} nodes", hierarchy.nodes.len());
        hierarchy
    }

    // ========================================================================
    // Pass 1: collect
    // ========================================================================

    fn collect(&self, log: &mut ExportLog) -> Collected {
        let scene = self.scene;
        let mut collected = Collected::default();
        let mut visited: FxHashSet<ObjectId> = FxHashSet::default();

        let mut stack: Vec<(ObjectId, Option<usize>)> = scene
            .root_objects()
            .into_iter()
            .rev()
            .map(|object| (object, None))
            .collect();

        while let Some((object, parent)) = stack.pop() {
            let host_name = scene.object_name(object);
            if !visited.insert(object) {
                log.warn(Diagnostic::RevisitedObject { name: host_name });
                continue;
            }
            if host_name == TEMP_OBJECT_NAME {
                continue;
            }

            let export_name = if scene.is_mesh(object) {
                strip_mesh_name(&host_name)
            } else {
                host_name.clone()
            };
            let excluded = scene.is_excluded(NodeRef::Object(object))
                || self.exclusion.is_banned(&export_name);

            let entry = collected.push(
                parent,
                Entry {
                    kind: NodeKind::Object(ObjectPose { object }),
                    host_name,
                    export_name,
                    excluded,
                    children: Vec::new(),
                },
            );

            let armature = scene.armature(object);
            if let Some(armature) = armature
                && collected.armatures.add(armature, object)
            {
                self.collect_bones(&mut collected, armature, object, entry);
            }

            for child in scene.children(object).into_iter().rev() {
                let attach = scene
                    .parent_bone(child)
                    .zip(armature)
                    .and_then(|(bone, armature)| {
                        collected.bone_entries.get(&(armature, bone)).copied()
                    })
                    .unwrap_or(entry);
                stack.push((child, Some(attach)));
            }
        }

        collected
    }

    fn collect_bones(
        &self,
        collected: &mut Collected,
        armature: ArmatureId,
        owner: ObjectId,
        owner_entry: usize,
    ) {
        let bones = self.scene.bones(armature);
        let known: FxHashSet<BoneId> = bones.iter().map(|b| b.id).collect();

        // Parents outside the armature are treated as missing.
        let mut by_parent: FxHashMap<Option<BoneId>, Vec<&BoneInfo>> = FxHashMap::default();
        for bone in &bones {
            let parent = bone.parent.filter(|p| known.contains(p));
            by_parent.entry(parent).or_default().push(bone);
        }

        let mut stack: Vec<(&BoneInfo, usize)> = by_parent
            .get(&None)
            .into_iter()
            .flatten()
            .rev()
            .map(|&bone| (bone, owner_entry))
            .collect();

        while let Some((bone, parent)) = stack.pop() {
            let node_ref = NodeRef::Bone {
                armature,
                bone: bone.id,
            };
            let excluded =
                self.scene.is_excluded(node_ref) || self.exclusion.is_banned(&bone.name);
            let entry = collected.push(
                Some(parent),
                Entry {
                    kind: NodeKind::Bone(BonePose {
                        armature,
                        bone: bone.id,
                        owner,
                    }),
                    host_name: bone.name.clone(),
                    export_name: bone.name.clone(),
                    excluded,
                    children: Vec::new(),
                },
            );
            collected.bone_entries.insert((armature, bone.id), entry);

            if let Some(children) = by_parent.get(&Some(bone.id)) {
                stack.extend(children.iter().rev().map(|&child| (child, entry)));
            }
        }
    }

    // ========================================================================
    // Pass 2: emit
    // ========================================================================

    fn emit(&self, collected: Collected) -> NodeHierarchy {
        let Collected {
            entries,
            roots,
            mut armatures,
            ..
        } = collected;

        let mut nodes = vec![Node::new(0, -1, self.catch_root_name.clone(), NodeKind::Root)];
        let mut children: Vec<Vec<u32>> = vec![Vec::new()];
        let mut object_nodes: FxHashMap<ObjectId, u32> = FxHashMap::default();

        // (entry, nearest emitted ancestor)
        let mut stack: Vec<(usize, u32)> = roots.iter().rev().map(|&e| (e, 0)).collect();

        while let Some((entry_index, good_parent)) = stack.pop() {
            let entry = &entries[entry_index];

            let parent_for_children = if entry.excluded {
                log::debug!("Excluding node '{}'", entry.host_name);
                good_parent
            } else {
                let index = nodes.len() as u32;
                let mut node = Node::new(
                    index,
                    good_parent as i32,
                    entry.export_name.clone(),
                    entry.kind,
                );
                node.host_name.clone_from(&entry.host_name);
                match entry.kind {
                    NodeKind::Object(ObjectPose { object }) => {
                        object_nodes.insert(object, index);
                    }
                    NodeKind::Bone(BonePose {
                        armature, owner, ..
                    }) => {
                        node.armature_parent = object_nodes.get(&owner).copied();
                        armatures.push_bone_node(armature, index);
                    }
                    NodeKind::Root => {}
                }
                children[good_parent as usize].push(index);
                children.push(Vec::new());
                nodes.push(node);
                index
            };

            stack.extend(
                entry
                    .children
                    .iter()
                    .rev()
                    .map(|&child| (child, parent_for_children)),
            );
        }

        NodeHierarchy {
            nodes,
            children,
            armatures,
            rest_resolved: false,
        }
    }
}

/// Mesh names lose everything from the first `_`, then the last `.` suffix.
#[must_use]
pub fn strip_mesh_name(name: &str) -> String {
    let head = name.split('_').next().unwrap_or(name);
    match head.rfind('.') {
        Some(dot) => head[..dot].to_string(),
        None => head.to_string(),
    }
}

/// Colliding export names fall back to host names. Host names that still
/// collide get a `(n)` suffix.
fn resolve_name_collisions(nodes: &mut [Node], log: &mut ExportLog) {
    let mut group_of: FxHashMap<&str, usize> = FxHashMap::default();
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for (i, node) in nodes.iter().enumerate() {
        let group = *group_of.entry(node.name.as_str()).or_insert_with(|| {
            groups.push((node.name.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[group].1.push(i);
    }
    groups.retain(|(_, members)| members.len() > 1);
    if groups.is_empty() {
        return;
    }

    for (_, members) in &groups {
        for &i in members {
            let host = nodes[i].host_name.clone();
            nodes[i].name = host;
        }
    }

    let mut used: FxHashSet<String> = FxHashSet::default();
    for node in nodes.iter_mut() {
        if used.insert(node.name.clone()) {
            continue;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}({n})", node.name);
            if used.insert(candidate.clone()) {
                node.name = candidate;
                break;
            }
            n += 1;
        }
    }

    for (name, members) in groups {
        log.warn(Diagnostic::NameCollisionAfterExclusion {
            name,
            resolved: members.iter().map(|&i| nodes[i].name.clone()).collect(),
        });
    }
}

//! Rest-pose resolution.
//!
//! # Overview
//!
//! [`RestPoseResolver`] runs once per export, after the hierarchy is built
//! and before any sequence is baked. For every node it stores:
//!
//! - the world-space rest transform, read through the node's
//!   [`PoseProvider`];
//! - the parent-space default transform, i.e. where the node sits relative
//!   to its structural parent when nothing is animated.
//!
//! The parent-space offset is computed with ancestor scale divided out by
//! the [`ScaleCorrector`], so every node behaves as if its parent had unit
//! scale. [`to_parent_space`] is shared with the sequence baker, which
//! converts each sampled frame the same way.

use glam::{Quat, Vec3};
use smallvec::SmallVec;

use super::hierarchy::NodeHierarchy;
use super::host::SceneQuery;
use super::node::Node;
use super::pose::{PoseProvider, apply_export_scale};
use crate::diagnostics::{Diagnostic, ExportLog};
use crate::errors::SceneError;
use crate::math::{SCALE_CORRECTION_SKIP, Transform, vec3_approx_eq};

// ============================================================================
// Scale Corrector
// ============================================================================

/// Removes accumulated ancestor scale from a world-space offset.
///
/// Ancestors are supplied closest first as `(world rotation, local scale)`.
/// Ancestors within [`SCALE_CORRECTION_SKIP`] of unit scale are skipped. The
/// remaining ones are applied farthest first: the offset is rotated into the
/// ancestor's frame, divided by its scale and rotated back.
#[derive(Debug, Default)]
pub struct ScaleCorrector {
    stack: SmallVec<[(Quat, Vec3); 8]>,
    degenerate: SmallVec<[usize; 4]>,
}

impl ScaleCorrector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correct<I>(&mut self, offset: Vec3, ancestors: I) -> Vec3
    where
        I: IntoIterator<Item = (Quat, Vec3)>,
    {
        self.stack.clear();
        self.degenerate.clear();

        for (depth, (rotation, scale)) in ancestors.into_iter().enumerate() {
            if vec3_approx_eq(scale, Vec3::ONE, SCALE_CORRECTION_SKIP) {
                continue;
            }
            let (safe, degenerate) = substitute_zero_scale(scale);
            if degenerate {
                self.degenerate.push(depth);
            }
            self.stack.push((rotation, safe.recip()));
        }

        self.stack
            .iter()
            .rev()
            .fold(offset, |v, &(rotation, inverse_scale)| {
                rotation * ((rotation.inverse() * v) * inverse_scale)
            })
    }

    /// Positions, in the ancestor sequence of the last
    /// [`correct`](Self::correct) call, of ancestors with a zero scale
    /// component.
    #[must_use]
    pub fn degenerate_ancestors(&self) -> &[usize] {
        &self.degenerate
    }

    /// Inverse of [`correct`](Self::correct): re-applies ancestor scale,
    /// closest ancestor first.
    pub fn restore<I>(offset: Vec3, ancestors: I) -> Vec3
    where
        I: IntoIterator<Item = (Quat, Vec3)>,
    {
        ancestors
            .into_iter()
            .filter(|(_, scale)| !vec3_approx_eq(*scale, Vec3::ONE, SCALE_CORRECTION_SKIP))
            .fold(offset, |v, (rotation, scale)| {
                let (safe, _) = substitute_zero_scale(scale);
                rotation * ((rotation.inverse() * v) * safe)
            })
    }
}

fn substitute_zero_scale(scale: Vec3) -> (Vec3, bool) {
    let fix = |c: f32| if c.abs() <= f32::EPSILON { 1.0 } else { c };
    let safe = Vec3::new(fix(scale.x), fix(scale.y), fix(scale.z));
    (safe, safe != scale)
}

pub(crate) fn has_zero_component(scale: Vec3) -> bool {
    substitute_zero_scale(scale).1
}

/// Node indices from `start` up to the root, closest first.
pub(crate) fn ancestor_chain(nodes: &[Node], start: usize) -> impl Iterator<Item = usize> + '_ {
    let mut next = Some(start);
    std::iter::from_fn(move || {
        let index = next?;
        next = nodes.get(index).and_then(Node::parent);
        Some(index)
    })
}

/// Nodes among the ancestors of `index` that the last [`to_parent_space`]
/// call for `index` found with a zero scale component.
pub(crate) fn degenerate_ancestor_nodes(
    nodes: &[Node],
    index: usize,
    corrector: &ScaleCorrector,
) -> SmallVec<[usize; 4]> {
    let Some(parent) = nodes[index].parent() else {
        return SmallVec::new();
    };
    if corrector.degenerate_ancestors().is_empty() {
        return SmallVec::new();
    }
    let chain: SmallVec<[usize; 16]> = ancestor_chain(nodes, parent).collect();
    corrector
        .degenerate_ancestors()
        .iter()
        .filter_map(|&depth| chain.get(depth).copied())
        .collect()
}

/// Expresses `world[index]` relative to its structural parent's entry in
/// `world`, with ancestor scale divided out of the offset.
///
/// Nodes without a parent are returned unchanged.
pub fn to_parent_space(
    nodes: &[Node],
    world: &[Transform],
    index: usize,
    corrector: &mut ScaleCorrector,
) -> Transform {
    let current = world[index];
    let Some(parent_index) = nodes[index].parent() else {
        return current;
    };
    let parent = world[parent_index];

    let offset = current.position - parent.position;
    let corrected = corrector.correct(
        offset,
        ancestor_chain(nodes, parent_index).map(|i| (world[i].rotation, world[i].scale)),
    );

    let inverse = parent.rotation.inverse();
    Transform::new(
        inverse * corrected,
        (inverse * current.rotation).normalize(),
        current.scale,
    )
}

// ============================================================================
// Rest Pose Resolver
// ============================================================================

/// Fills the rest-pose fields of every node.
pub struct RestPoseResolver<'a> {
    scene: &'a dyn SceneQuery,
    export_scale: f32,
}

impl<'a> RestPoseResolver<'a> {
    #[must_use]
    pub fn new(scene: &'a dyn SceneQuery) -> Self {
        Self {
            scene,
            export_scale: 1.0,
        }
    }

    #[must_use]
    pub fn with_export_scale(mut self, factor: f32) -> Self {
        self.export_scale = factor;
        self
    }

    /// Resolves all rest poses. Calling it again on a resolved hierarchy
    /// does nothing.
    pub fn resolve(
        &self,
        hierarchy: &mut NodeHierarchy,
        log: &mut ExportLog,
    ) -> Result<(), SceneError> {
        if hierarchy.rest_resolved {
            log::debug!("Rest poses already resolved");
            return Ok(());
        }

        let rest = hierarchy
            .nodes()
            .iter()
            .map(|node| {
                node.kind
                    .rest_transform(self.scene)
                    .map(|t| apply_export_scale(t, self.export_scale))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut corrector = ScaleCorrector::new();
        let nodes = hierarchy.nodes();
        let mut defaults = Vec::with_capacity(nodes.len());
        let mut warnings = Vec::new();
        for index in 0..nodes.len() {
            defaults.push(to_parent_space(nodes, &rest, index, &mut corrector));

            for ancestor in degenerate_ancestor_nodes(nodes, index, &corrector) {
                warnings.push(Diagnostic::DegenerateAncestorScale {
                    node: nodes[index].name.clone(),
                    ancestor: nodes[ancestor].name.clone(),
                });
            }
        }
        for warning in warnings {
            log.warn(warning);
        }

        for ((node, rest), default) in hierarchy.nodes_mut().iter_mut().zip(rest).zip(defaults) {
            node.rest_position_ws = rest.position;
            node.rest_rotation_ws = rest.rotation;
            node.rest_scale = rest.scale;
            node.default_position_ps = default.position;
            node.default_rotation_ps = default.rotation;
        }
        hierarchy.rest_resolved = true;
        Ok(())
    }
}

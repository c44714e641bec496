//! Sequence baking.
//!
//! [`SequenceBaker`] turns one [`SequenceConfig`] into a [`BakedSequence`]
//! by driving the host through the sequence's frames. Each bake runs the
//! stages of [`BakeStage`] in order:
//!
//! - **Init**: reset every armature pose, activate the sequence's action,
//!   count frames and reconcile FPS/duration.
//! - **BuildBlendBase**: blend sequences only. Sample the reference pose
//!   once per node.
//! - **SampleLoop**: for every frame, strictly increasing, move the host's
//!   time cursor, convert each node's world sample into parent space and
//!   record it. Ground frames and visibility are taken in the same pass.
//! - **Finalize**: drop channels that never moved, remove a redundant loop
//!   frame from cyclic sequences and reject sequences with no motion.
//!
//! A failing stage discards everything recorded for the sequence.

use std::fmt;

use glam::{Quat, Vec3};
use rustc_hash::FxHashSet;

use super::ground::GroundFrameSampler;
use super::sampler::PoseSampler;
use super::sequence::{BakedSequence, ChannelMask, NodeTrack};
use super::timing::{FrameSources, PlaybackTiming};
use super::visibility::VisibilityRecorder;
use crate::config::{BlendReference, IflConfig, SequenceConfig};
use crate::diagnostics::{Diagnostic, ExportLog};
use crate::errors::{BakeError, Result};
use crate::export::CancelToken;
use crate::math::{Transform, is_rotated, is_scaled, is_translated};
use crate::scene::rest_pose::{degenerate_ancestor_nodes, has_zero_component};
use crate::scene::{Node, NodeHierarchy, SceneQuery, ScaleCorrector, TimeSource, to_parent_space};

/// Stage of the per-sequence bake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeStage {
    Init,
    BuildBlendBase,
    SampleLoop,
    Finalize,
}

impl fmt::Display for BakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::BuildBlendBase => "blend base",
            Self::SampleLoop => "sampling",
            Self::Finalize => "finalize",
        })
    }
}

/// Result of a successful bake.
#[derive(Debug, Clone)]
pub enum BakeOutcome {
    Baked(BakedSequence),
    /// No channel of any node moved, and no visibility or IFL data was
    /// recorded. Nothing to export.
    Empty,
}

impl BakeOutcome {
    #[must_use]
    pub fn baked(self) -> Option<BakedSequence> {
        match self {
            Self::Baked(sequence) => Some(sequence),
            Self::Empty => None,
        }
    }
}

/// What [`BakeStage::Init`] decides.
#[derive(Debug)]
struct SequencePlan {
    sources: FrameSources,
    num_key_frames: u32,
    timing: PlaybackTiming,
    ground: Option<GroundFrameSampler>,
    visibility: Option<VisibilityRecorder>,
    matters_ifl: Vec<bool>,
}

/// Per-node recording buffers of the sample loop.
#[derive(Debug, Clone, Default)]
struct ChannelRecorder {
    translations: Vec<Vec3>,
    rotations: Vec<Quat>,
    scales: Vec<Vec3>,
    matters: ChannelMask,
}

impl ChannelRecorder {
    fn with_capacity(frames: usize) -> Self {
        Self {
            translations: Vec::with_capacity(frames),
            rotations: Vec::with_capacity(frames),
            scales: Vec::with_capacity(frames),
            matters: ChannelMask::default(),
        }
    }

    /// Records one parent-space sample. Every channel is kept; the matters
    /// flags only decide what survives [`into_track`](Self::into_track).
    ///
    /// Scale keys are stored relative to the rest scale, or to the base
    /// scale for blend sequences.
    fn record(&mut self, node: &Node, local: Transform, base: Option<&Transform>) {
        let (translation, rotation, scale, delta_translation, delta_rotation) = match base {
            None => (
                local.position,
                local.rotation,
                divide_scale(local.scale, node.rest_scale),
                local.position - node.default_position_ps,
                node.default_rotation_ps.inverse() * local.rotation,
            ),
            Some(base) => {
                let translation =
                    node.default_rotation_ps.inverse() * (local.position - base.position);
                let rotation = (base.rotation.inverse() * local.rotation).normalize();
                let scale = divide_scale(local.scale, base.scale);
                (translation, rotation, scale, translation, rotation)
            }
        };

        self.matters.translation |= is_translated(delta_translation);
        self.matters.rotation |= is_rotated(delta_rotation);
        self.matters.scale |= is_scaled(scale);

        self.translations.push(translation);
        self.rotations.push(rotation);
        self.scales.push(scale);
    }

    /// Holds the last recorded frame. Used past the end of the action.
    fn repeat_last(&mut self) {
        if let (Some(&t), Some(&r), Some(&s)) = (
            self.translations.last(),
            self.rotations.last(),
            self.scales.last(),
        ) {
            self.translations.push(t);
            self.rotations.push(r);
            self.scales.push(s);
        }
    }

    fn into_track(self) -> NodeTrack {
        NodeTrack {
            translations: self.matters.translation.then_some(self.translations),
            rotations: self.matters.rotation.then_some(self.rotations),
            scales: self.matters.scale.then_some(self.scales),
        }
    }
}

fn divide_scale(scale: Vec3, base: Vec3) -> Vec3 {
    let div = |s: f32, b: f32| if b.abs() <= f32::EPSILON { 1.0 } else { s / b };
    Vec3::new(div(scale.x, base.x), div(scale.y, base.y), div(scale.z, base.z))
}

/// Bakes sequences against a resolved [`NodeHierarchy`].
pub struct SequenceBaker<'a> {
    hierarchy: &'a NodeHierarchy,
    sampler: PoseSampler,
    cancel: Option<&'a CancelToken>,
}

impl<'a> SequenceBaker<'a> {
    #[must_use]
    pub fn new(hierarchy: &'a NodeHierarchy) -> Self {
        Self {
            hierarchy,
            sampler: PoseSampler::default(),
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_export_scale(mut self, factor: f32) -> Self {
        self.sampler = PoseSampler::new(factor);
        self
    }

    #[must_use]
    pub fn with_cancel_token(mut self, token: &'a CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Bakes one sequence.
    ///
    /// Errors are wrapped in [`BakeError::Sequence`] with the failing stage.
    /// Nothing recorded before the failure is returned.
    pub fn bake<H>(
        &self,
        host: &mut H,
        config: &SequenceConfig,
        log: &mut ExportLog,
    ) -> Result<BakeOutcome>
    where
        H: SceneQuery + TimeSource,
    {
        if !self.hierarchy.is_rest_resolved() {
            return Err(BakeError::RestPoseUnresolved);
        }

        let mut stage = BakeStage::Init;
        match self.run(host, config, log, &mut stage) {
            Ok(outcome) => Ok(outcome),
            Err(source) => Err(BakeError::Sequence {
                name: config.name.clone(),
                stage,
                source: Box::new(source),
            }),
        }
    }

    fn run<H>(
        &self,
        host: &mut H,
        config: &SequenceConfig,
        log: &mut ExportLog,
        stage: &mut BakeStage,
    ) -> Result<BakeOutcome>
    where
        H: SceneQuery + TimeSource,
    {
        log::debug!("Baking sequence '{}'", config.name);
        self.check_cancelled()?;
        let mut plan = self.init(host, config, log)?;

        *stage = BakeStage::BuildBlendBase;
        let base = match &config.blend {
            Some(reference) => Some(self.build_blend_base(host, config, reference, log)?),
            None => None,
        };

        *stage = BakeStage::SampleLoop;
        let recorders = self.sample_loop(host, config, &mut plan, base.as_deref(), log)?;

        *stage = BakeStage::Finalize;
        Ok(Self::finalize(config, plan, recorders, log))
    }

    fn check_cancelled(&self) -> Result<()> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(BakeError::Cancelled),
            _ => Ok(()),
        }
    }

    fn reset_armatures<H: TimeSource>(&self, host: &mut H) -> Result<()> {
        for armature in self.hierarchy.armatures().iter() {
            host.reset_pose(armature.id)?;
        }
        Ok(())
    }

    // ========================================================================
    // Init
    // ========================================================================

    fn init<H>(
        &self,
        host: &mut H,
        config: &SequenceConfig,
        log: &mut ExportLog,
    ) -> Result<SequencePlan>
    where
        H: SceneQuery + TimeSource,
    {
        self.reset_armatures(host)?;
        host.set_active_action(config.action.as_deref())?;

        let range = config.frame_count();
        let action = match config.action.as_deref() {
            Some(action) => match host.action_frame_count(action) {
                Some(count) if count > 0 => range.min(count),
                Some(_) => range,
                None => {
                    log.warn(Diagnostic::UnknownAction {
                        sequence: config.name.clone(),
                        action: action.to_string(),
                    });
                    range
                }
            },
            None => range,
        };

        let sources = FrameSources {
            action,
            ifl: config.ifl.as_ref().map_or(0, |ifl| ifl.total_frames()),
            visibility: config.visibility.as_ref().map_or(0, |vis| vis.frame_span()),
        };
        let num_key_frames = sources.num_key_frames();
        let timing = PlaybackTiming::reconcile(config, num_key_frames);

        let ground = if config.ground_frames == 0 {
            None
        } else if let Some(proxy) = host.ground_proxy_object() {
            Some(GroundFrameSampler::new(
                proxy,
                config.ground_frames,
                num_key_frames,
            ))
        } else {
            log.warn(Diagnostic::MissingGroundProxy {
                sequence: config.name.clone(),
            });
            None
        };

        let visibility = match &config.visibility {
            Some(vis) => Some(VisibilityRecorder::new(
                vis,
                self.hierarchy.nodes(),
                &*host,
                &config.name,
                num_key_frames,
                log,
            )?)
            .filter(|recorder| !recorder.is_empty()),
            None => None,
        };
        let matters_ifl = ifl_matters(&*host, &config.name, config.ifl.as_ref(), log);

        log::debug!(
            "Sequence '{}': {num_key_frames} frames ({sources:?}), {:.3} fps, {:.3}s",
            config.name,
            timing.fps,
            timing.duration
        );

        Ok(SequencePlan {
            sources,
            num_key_frames,
            timing,
            ground,
            visibility,
            matters_ifl,
        })
    }

    // ========================================================================
    // BuildBlendBase
    // ========================================================================

    fn build_blend_base<H>(
        &self,
        host: &mut H,
        config: &SequenceConfig,
        reference: &BlendReference,
        log: &mut ExportLog,
    ) -> Result<Vec<Transform>>
    where
        H: SceneQuery + TimeSource,
    {
        self.reset_armatures(host)?;
        host.set_active_action(Some(&reference.action))?;

        let frame_count = host.action_frame_count(&reference.action).unwrap_or(0);
        let frame = if reference.frame == 0 || reference.frame > frame_count {
            log.warn(Diagnostic::ReferencePoseOutOfRange {
                sequence: config.name.clone(),
                action: reference.action.clone(),
                frame: reference.frame,
                frame_count,
            });
            1
        } else {
            reference.frame
        };

        let nodes = self.hierarchy.nodes();
        let mut world = Vec::with_capacity(nodes.len());
        self.sampler.sample_frame(host, nodes, frame, &mut world)?;

        let mut corrector = ScaleCorrector::new();
        let base = (0..nodes.len())
            .map(|index| to_parent_space(nodes, &world, index, &mut corrector))
            .collect();

        // The reference action must not leak into the sampled frames.
        self.reset_armatures(host)?;
        host.set_active_action(config.action.as_deref())?;
        Ok(base)
    }

    // ========================================================================
    // SampleLoop
    // ========================================================================

    fn sample_loop<H>(
        &self,
        host: &mut H,
        config: &SequenceConfig,
        plan: &mut SequencePlan,
        base: Option<&[Transform]>,
        log: &mut ExportLog,
    ) -> Result<Vec<ChannelRecorder>>
    where
        H: SceneQuery + TimeSource,
    {
        let nodes = self.hierarchy.nodes();
        let frames = plan.num_key_frames as usize;
        let mut recorders = vec![ChannelRecorder::with_capacity(frames); nodes.len()];
        let mut world = Vec::with_capacity(nodes.len());
        let mut corrector = ScaleCorrector::new();
        let mut degenerate = FxHashSet::default();

        for index in 0..frames {
            self.check_cancelled()?;
            let host_frame = config.start_frame.saturating_add(index as u32);

            if index < plan.sources.action as usize {
                self.sampler.sample_frame(host, nodes, host_frame, &mut world)?;
                for (node_index, recorder) in recorders.iter_mut().enumerate() {
                    let local = to_parent_space(nodes, &world, node_index, &mut corrector);
                    for ancestor in degenerate_ancestor_nodes(nodes, node_index, &corrector) {
                        // Zero rest scales were reported when rest poses were resolved.
                        if !has_zero_component(nodes[ancestor].rest_scale)
                            && degenerate.insert((node_index, ancestor))
                        {
                            log.warn(Diagnostic::DegenerateAnimatedScale {
                                sequence: config.name.clone(),
                                node: nodes[node_index].name.clone(),
                                ancestor: nodes[ancestor].name.clone(),
                                frame: host_frame,
                            });
                        }
                    }
                    recorder.record(
                        &nodes[node_index],
                        local,
                        base.and_then(|b| b.get(node_index)),
                    );
                }
            } else {
                host.set_current_time(host_frame)?;
                for recorder in &mut recorders {
                    recorder.repeat_last();
                }
            }

            if let Some(ground) = plan.ground.as_mut() {
                ground.observe(&*host, index, &self.sampler)?;
            }
            if let Some(visibility) = plan.visibility.as_mut() {
                visibility.observe(&*host, index)?;
            }
        }

        Ok(recorders)
    }

    // ========================================================================
    // Finalize
    // ========================================================================

    fn finalize(
        config: &SequenceConfig,
        plan: SequencePlan,
        recorders: Vec<ChannelRecorder>,
        log: &mut ExportLog,
    ) -> BakeOutcome {
        let mut visibility = plan
            .visibility
            .map_or_else(|| vec![None; recorders.len()], VisibilityRecorder::finish);
        if !recorders.iter().any(|r| r.matters.any())
            && visibility.iter().all(Option::is_none)
            && !plan.matters_ifl.contains(&true)
        {
            log.warn(Diagnostic::EmptySequence {
                sequence: config.name.clone(),
            });
            return BakeOutcome::Empty;
        }

        let mut tracks: Vec<NodeTrack> =
            recorders.into_iter().map(ChannelRecorder::into_track).collect();
        let mut num_key_frames = plan.num_key_frames;

        // Only the action loops; padded frames never match the first one.
        if config.cyclic
            && num_key_frames > 1
            && plan.sources.action == num_key_frames
            && tracks.iter().all(NodeTrack::loops_seamlessly)
            && visibility.iter().flatten().all(|v| loops_seamlessly(v))
        {
            for track in &mut tracks {
                track.drop_last_frame();
            }
            for values in visibility.iter_mut().flatten() {
                values.pop();
            }
            num_key_frames -= 1;
            log::debug!(
                "Sequence '{}': last frame duplicates the first, dropped",
                config.name
            );
        }

        BakeOutcome::Baked(BakedSequence {
            name: config.name.clone(),
            num_key_frames,
            timing: plan.timing,
            priority: config.priority,
            cyclic: config.cyclic,
            blend: config.blend.is_some(),
            standalone: config.standalone,
            tracks,
            ground_frames: plan.ground.map(GroundFrameSampler::finish).unwrap_or_default(),
            trigger_markers: config.triggers.clone(),
            visibility,
            matters_ifl: plan.matters_ifl,
        })
    }
}

fn loops_seamlessly(values: &[f32]) -> bool {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) => (first - last).abs() <= f32::EPSILON,
        _ => true,
    }
}

/// Flags the shape's IFL materials animated by the sequence. Host material
/// names carry an `.ifl` suffix that the configured name may omit.
fn ifl_matters(
    scene: &dyn SceneQuery,
    sequence: &str,
    ifl: Option<&IflConfig>,
    log: &mut ExportLog,
) -> Vec<bool> {
    let materials = scene.ifl_materials();
    let Some(ifl) = ifl else {
        return vec![false; materials.len()];
    };
    let wanted = ifl.material.strip_suffix(".ifl").unwrap_or(&ifl.material);
    let matters: Vec<bool> = materials
        .iter()
        .map(|name| name.strip_suffix(".ifl").unwrap_or(name) == wanted)
        .collect();
    if !matters.contains(&true) {
        log.warn(Diagnostic::UnknownIflMaterial {
            sequence: sequence.to_string(),
            material: ifl.material.clone(),
        });
    }
    matters
}

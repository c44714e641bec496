//! Baked sequence data.

use glam::{Quat, Vec3};

use super::timing::PlaybackTiming;
use crate::config::TriggerConfig;
use crate::math::{
    ROTATION_EPSILON, SCALE_EPSILON, TRANSLATION_EPSILON, quat_approx_eq, vec3_approx_eq,
};

/// Which channels of a node are animated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelMask {
    pub translation: bool,
    pub rotation: bool,
    pub scale: bool,
}

impl ChannelMask {
    #[inline]
    #[must_use]
    pub fn any(&self) -> bool {
        self.translation || self.rotation || self.scale
    }
}

/// One frame of one node. Channels that don't matter are `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub translation: Option<Vec3>,
    pub rotation: Option<Quat>,
    pub scale: Option<Vec3>,
}

/// All frames of one node, stored per channel.
///
/// A channel that never moved has no array at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeTrack {
    pub translations: Option<Vec<Vec3>>,
    pub rotations: Option<Vec<Quat>>,
    pub scales: Option<Vec<Vec3>>,
}

impl NodeTrack {
    #[must_use]
    pub fn matters(&self) -> ChannelMask {
        ChannelMask {
            translation: self.translations.is_some(),
            rotation: self.rotations.is_some(),
            scale: self.scales.is_some(),
        }
    }

    #[must_use]
    pub fn keyframe(&self, frame: usize) -> Keyframe {
        Keyframe {
            translation: self.translations.as_ref().and_then(|v| v.get(frame).copied()),
            rotation: self.rotations.as_ref().and_then(|v| v.get(frame).copied()),
            scale: self.scales.as_ref().and_then(|v| v.get(frame).copied()),
        }
    }

    /// Number of recorded frames, 0 for a track with no channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.translations
            .as_ref()
            .map(Vec::len)
            .or_else(|| self.rotations.as_ref().map(Vec::len))
            .or_else(|| self.scales.as_ref().map(Vec::len))
            .unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First and last frame agree on every present channel.
    #[must_use]
    pub fn loops_seamlessly(&self) -> bool {
        fn ends<T: Copy>(frames: &[T]) -> Option<(T, T)> {
            Some((*frames.first()?, *frames.last()?))
        }

        let translation = self.translations.as_deref().and_then(ends).is_none_or(|(a, b)| {
            vec3_approx_eq(a, b, TRANSLATION_EPSILON)
        });
        let rotation = self
            .rotations
            .as_deref()
            .and_then(ends)
            .is_none_or(|(a, b)| quat_approx_eq(a, b, ROTATION_EPSILON));
        let scale = self
            .scales
            .as_deref()
            .and_then(ends)
            .is_none_or(|(a, b)| vec3_approx_eq(a, b, SCALE_EPSILON));
        translation && rotation && scale
    }

    pub(crate) fn drop_last_frame(&mut self) {
        if let Some(v) = self.translations.as_mut() {
            v.pop();
        }
        if let Some(v) = self.rotations.as_mut() {
            v.pop();
        }
        if let Some(v) = self.scales.as_mut() {
            v.pop();
        }
    }
}

/// A root-motion sample, relative to the first frame of the sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundFrame {
    pub translation: Vec3,
    pub rotation: Quat,
}

/// Per-frame visibility of one object, each value in `0.0..=1.0`.
pub type VisibilityTrack = Vec<f32>;

/// The output of [`SequenceBaker`](super::SequenceBaker) for one sequence.
///
/// Non-blend keyframes hold absolute parent-space translations and
/// rotations, with scales relative to the node's rest scale. Blend keyframes
/// hold deltas against the reference pose.
#[derive(Debug, Clone)]
pub struct BakedSequence {
    pub name: String,
    pub num_key_frames: u32,
    pub timing: PlaybackTiming,
    pub priority: i32,
    pub cyclic: bool,
    pub blend: bool,
    /// Extracted into its own unit instead of the shared shape.
    pub standalone: bool,
    /// Indexed by node.
    pub tracks: Vec<NodeTrack>,
    pub ground_frames: Vec<GroundFrame>,
    pub trigger_markers: Vec<TriggerConfig>,
    /// Indexed by node. Only objects with a sampled visibility curve have one.
    pub visibility: Vec<Option<VisibilityTrack>>,
    /// Indexed by the shape's IFL materials.
    pub matters_ifl: Vec<bool>,
}

impl BakedSequence {
    #[must_use]
    pub fn matters(&self, node: usize) -> ChannelMask {
        self.tracks.get(node).map(NodeTrack::matters).unwrap_or_default()
    }

    pub fn matters_translation(&self) -> impl Iterator<Item = bool> + '_ {
        self.tracks.iter().map(|t| t.translations.is_some())
    }

    pub fn matters_rotation(&self) -> impl Iterator<Item = bool> + '_ {
        self.tracks.iter().map(|t| t.rotations.is_some())
    }

    pub fn matters_scale(&self) -> impl Iterator<Item = bool> + '_ {
        self.tracks.iter().map(|t| t.scales.is_some())
    }

    pub fn matters_visibility(&self) -> impl Iterator<Item = bool> + '_ {
        self.visibility.iter().map(Option::is_some)
    }

    /// Keyframes of one node, in frame order.
    pub fn frames(&self, node: usize) -> impl Iterator<Item = Keyframe> + '_ {
        let track = self.tracks.get(node);
        (0..track.map_or(0, NodeTrack::len)).filter_map(move |f| track.map(|t| t.keyframe(f)))
    }
}

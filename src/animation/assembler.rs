//! Sequence assembly.
//!
//! # Overview
//!
//! Baked sequences share the shape's track buffers. For each sequence the
//! [`SequenceAssembler`] appends, node by node in index order, the frames of
//! every animated channel and records where its data starts:
//!
//! ```text
//! node_translations: [ seq0 node2 f0..fn | seq0 node5 f0..fn | seq1 node2 f0..fm | ... ]
//!                      ^ seq0.base_translation                ^ seq1.base_translation
//! ```
//!
//! Visibility values go to `object_states` the same way, one run of frames
//! per visibility-animated object.
//!
//! Standalone sequences are appended the same way and then split off the
//! tail of every buffer. Because nothing was appended after them, the
//! buffers and base offsets of every other sequence are untouched.

use std::ops::Range;

use glam::{Quat, Vec3};

use super::sequence::BakedSequence;
use super::timing::PlaybackTiming;
use super::triggers::{Trigger, build_triggers};

/// Flat track buffers of a shape, or of one standalone sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedTracks {
    pub node_translations: Vec<Vec3>,
    pub node_rotations: Vec<Quat>,
    pub node_aligned_scales: Vec<Vec3>,
    pub ground_translations: Vec<Vec3>,
    pub ground_rotations: Vec<Quat>,
    pub triggers: Vec<Trigger>,
    /// Per-frame visibility of animated objects.
    pub object_states: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceFlags {
    pub cyclic: bool,
    pub blend: bool,
    /// The sequence carries ground frames or triggers.
    pub make_path: bool,
    /// At least one node has an animated scale channel.
    pub aligned_scale: bool,
    /// At least one object has a visibility track.
    pub visibility: bool,
    /// At least one IFL material is animated.
    pub ifl: bool,
}

/// A sequence as laid out in a [`SharedTracks`] buffer.
///
/// A base offset is `None` when the sequence contributes nothing to that
/// buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledSequence {
    pub name: String,
    pub num_key_frames: u32,
    pub timing: PlaybackTiming,
    pub priority: i32,
    pub flags: SequenceFlags,

    pub matters_translation: Vec<bool>,
    pub matters_rotation: Vec<bool>,
    pub matters_scale: Vec<bool>,
    pub matters_visibility: Vec<bool>,
    /// Indexed by the shape's IFL materials.
    pub matters_ifl: Vec<bool>,

    pub base_translation: Option<usize>,
    pub base_rotation: Option<usize>,
    pub base_scale: Option<usize>,
    pub base_object_state: Option<usize>,

    pub first_ground_frame: Option<usize>,
    pub num_ground_frames: usize,
    pub first_trigger: Option<usize>,
    pub num_triggers: usize,
}

impl AssembledSequence {
    fn span(base: Option<usize>, matters: &[bool], frames: u32) -> Option<Range<usize>> {
        let len = matters.iter().filter(|&&m| m).count() * frames as usize;
        base.map(|b| b..b + len)
    }

    #[must_use]
    pub fn translation_range(&self) -> Option<Range<usize>> {
        Self::span(self.base_translation, &self.matters_translation, self.num_key_frames)
    }

    #[must_use]
    pub fn rotation_range(&self) -> Option<Range<usize>> {
        Self::span(self.base_rotation, &self.matters_rotation, self.num_key_frames)
    }

    #[must_use]
    pub fn scale_range(&self) -> Option<Range<usize>> {
        Self::span(self.base_scale, &self.matters_scale, self.num_key_frames)
    }

    #[must_use]
    pub fn object_state_range(&self) -> Option<Range<usize>> {
        Self::span(self.base_object_state, &self.matters_visibility, self.num_key_frames)
    }

    #[must_use]
    pub fn ground_range(&self) -> Option<Range<usize>> {
        self.first_ground_frame
            .map(|b| b..b + self.num_ground_frames)
    }

    #[must_use]
    pub fn trigger_range(&self) -> Option<Range<usize>> {
        self.first_trigger.map(|b| b..b + self.num_triggers)
    }
}

/// A sequence moved out of the shared shape, with its own buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct StandaloneSequence {
    /// Base offsets point into [`tracks`](Self::tracks).
    pub sequence: AssembledSequence,
    pub tracks: SharedTracks,
}

/// Where [`SequenceAssembler::add`] put a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceSlot {
    Shared(usize),
    Standalone(usize),
}

/// Folds baked sequences into shared track buffers.
#[derive(Debug, Default)]
pub struct SequenceAssembler {
    tracks: SharedTracks,
    sequences: Vec<AssembledSequence>,
    standalone: Vec<StandaloneSequence>,
}

impl SequenceAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, baked: BakedSequence) -> SequenceSlot {
        let standalone = baked.standalone;
        let assembled = self.append(baked);
        if standalone {
            let extracted = self.split_tail(assembled);
            log::debug!(
                "Extracted standalone sequence '{}'",
                extracted.sequence.name
            );
            self.standalone.push(extracted);
            SequenceSlot::Standalone(self.standalone.len() - 1)
        } else {
            self.sequences.push(assembled);
            SequenceSlot::Shared(self.sequences.len() - 1)
        }
    }

    #[must_use]
    pub fn tracks(&self) -> &SharedTracks {
        &self.tracks
    }

    #[must_use]
    pub fn sequences(&self) -> &[AssembledSequence] {
        &self.sequences
    }

    #[must_use]
    pub fn standalone_sequences(&self) -> &[StandaloneSequence] {
        &self.standalone
    }

    #[must_use]
    pub fn sequence(&self, name: &str) -> Option<&AssembledSequence> {
        self.sequences.iter().find(|s| s.name == name)
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn append(&mut self, baked: BakedSequence) -> AssembledSequence {
        let matters_translation: Vec<bool> = baked.matters_translation().collect();
        let matters_rotation: Vec<bool> = baked.matters_rotation().collect();
        let matters_scale: Vec<bool> = baked.matters_scale().collect();
        let matters_visibility: Vec<bool> = baked.matters_visibility().collect();

        let tracks = &mut self.tracks;
        let base_translation =
            matters_translation.contains(&true).then_some(tracks.node_translations.len());
        let base_rotation = matters_rotation.contains(&true).then_some(tracks.node_rotations.len());
        let base_scale = matters_scale.contains(&true).then_some(tracks.node_aligned_scales.len());
        let base_object_state =
            matters_visibility.contains(&true).then_some(tracks.object_states.len());

        for track in &baked.tracks {
            if let Some(frames) = &track.translations {
                tracks.node_translations.extend_from_slice(frames);
            }
            if let Some(frames) = &track.rotations {
                tracks.node_rotations.extend_from_slice(frames);
            }
            if let Some(frames) = &track.scales {
                tracks.node_aligned_scales.extend_from_slice(frames);
            }
        }

        for values in baked.visibility.iter().flatten() {
            tracks.object_states.extend_from_slice(values);
        }

        let first_ground_frame =
            (!baked.ground_frames.is_empty()).then_some(tracks.ground_translations.len());
        for frame in &baked.ground_frames {
            tracks.ground_translations.push(frame.translation);
            tracks.ground_rotations.push(frame.rotation);
        }

        let triggers = build_triggers(&baked.trigger_markers, baked.num_key_frames);
        let first_trigger = (!triggers.is_empty()).then_some(tracks.triggers.len());
        let num_triggers = triggers.len();
        tracks.triggers.extend(triggers);

        AssembledSequence {
            flags: SequenceFlags {
                cyclic: baked.cyclic,
                blend: baked.blend,
                make_path: first_ground_frame.is_some() || first_trigger.is_some(),
                aligned_scale: base_scale.is_some(),
                visibility: base_object_state.is_some(),
                ifl: baked.matters_ifl.contains(&true),
            },
            name: baked.name,
            num_key_frames: baked.num_key_frames,
            timing: baked.timing,
            priority: baked.priority,
            matters_translation,
            matters_rotation,
            matters_scale,
            matters_visibility,
            matters_ifl: baked.matters_ifl,
            base_translation,
            base_rotation,
            base_scale,
            base_object_state,
            first_ground_frame,
            num_ground_frames: baked.ground_frames.len(),
            first_trigger,
            num_triggers,
        }
    }

    /// Removes exactly the slices `sequence` contributed, which must be the
    /// last ones appended.
    fn split_tail(&mut self, mut sequence: AssembledSequence) -> StandaloneSequence {
        fn take<T>(buffer: &mut Vec<T>, range: Option<Range<usize>>) -> Vec<T> {
            match range {
                Some(range) => {
                    debug_assert_eq!(range.end, buffer.len());
                    buffer.split_off(range.start)
                }
                None => Vec::new(),
            }
        }

        let shared = &mut self.tracks;
        let ground = sequence.ground_range();
        let tracks = SharedTracks {
            node_translations: take(&mut shared.node_translations, sequence.translation_range()),
            node_rotations: take(&mut shared.node_rotations, sequence.rotation_range()),
            node_aligned_scales: take(&mut shared.node_aligned_scales, sequence.scale_range()),
            ground_translations: take(&mut shared.ground_translations, ground.clone()),
            ground_rotations: take(&mut shared.ground_rotations, ground),
            triggers: take(&mut shared.triggers, sequence.trigger_range()),
            object_states: take(&mut shared.object_states, sequence.object_state_range()),
        };

        let rebase = |base: Option<usize>| base.map(|_| 0);
        sequence.base_translation = rebase(sequence.base_translation);
        sequence.base_rotation = rebase(sequence.base_rotation);
        sequence.base_scale = rebase(sequence.base_scale);
        sequence.base_object_state = rebase(sequence.base_object_state);
        sequence.first_ground_frame = rebase(sequence.first_ground_frame);
        sequence.first_trigger = rebase(sequence.first_trigger);

        StandaloneSequence { sequence, tracks }
    }
}

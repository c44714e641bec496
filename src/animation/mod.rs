//! Sequence baking and assembly.
//!
//! # Overview
//!
//! - [`sampler`]: [`PoseSampler`] reads node transforms at a given frame.
//! - [`sequence`]: the baked [`BakedSequence`] record and its parts.
//! - [`baker`]: [`SequenceBaker`], the per-sequence state machine.
//! - [`ground`]: root-motion extraction from the ground proxy.
//! - [`timing`]: frame counts and FPS/duration reconciliation.
//! - [`triggers`]: trigger normalisation and ordering.
//! - [`visibility`]: per-object visibility curves.
//! - [`assembler`]: [`SequenceAssembler`] and the shared track buffers.

pub mod assembler;
pub mod baker;
pub mod ground;
pub mod sampler;
pub mod sequence;
pub mod timing;
pub mod triggers;
pub mod visibility;

pub use assembler::{
    AssembledSequence, SequenceAssembler, SequenceFlags, SequenceSlot, SharedTracks,
    StandaloneSequence,
};
pub use baker::{BakeOutcome, BakeStage, SequenceBaker};
pub use ground::GroundFrameSampler;
pub use sampler::PoseSampler;
pub use sequence::{BakedSequence, ChannelMask, GroundFrame, Keyframe, NodeTrack, VisibilityTrack};
pub use timing::{FrameSources, PlaybackTiming};
pub use triggers::{Trigger, build_triggers, normalized_time};
pub use visibility::VisibilityRecorder;

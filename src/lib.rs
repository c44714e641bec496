//! # DTS Baker
//!
//! Hierarchical transform resolution and animation-sequence baking for
//! Torque DTS skeletal shapes.
//!
//! # Overview
//!
//! The crate turns a host scene graph (objects, armature bones, actions)
//! into the data a DTS shape writer needs:
//!
//! 1. [`scene::NodeHierarchyBuilder`] flattens the scene into an indexed
//!    [`scene::Node`] array rooted at a synthetic catch-all node.
//! 2. [`scene::RestPoseResolver`] computes world-space rest poses and
//!    parent-space default transforms, dividing out ancestor scale.
//! 3. [`animation::SequenceBaker`] samples every configured sequence through
//!    the host's [`scene::TimeSource`] and records keyframes for the channels
//!    that actually move.
//! 4. [`animation::SequenceAssembler`] folds baked sequences into shared
//!    track buffers or extracts them as standalone units.
//!
//! [`export::ExportSession`] drives the whole pipeline and hands the result
//! to a [`export::ShapeWriter`].

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod animation;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod export;
pub mod math;
pub mod scene;

pub use animation::{
    AssembledSequence, BakeOutcome, BakedSequence, SequenceAssembler, SequenceBaker,
    SharedTracks, StandaloneSequence, Trigger,
};
pub use config::{ExportConfig, MAX_SEQUENCE_FRAMES, SequenceConfig, TimingLock};
pub use diagnostics::{Diagnostic, ExportLog};
pub use errors::{BakeError, ConfigError, Result, SceneError};
pub use export::{CancelToken, ExportSession, ShapeWriter};
pub use math::{HostMatrix, Transform};
pub use scene::{
    ArmatureId, BoneId, Node, NodeHierarchy, NodeHierarchyBuilder, NodeKind, ObjectId,
    RestPoseResolver, SceneQuery, TimeSource,
};

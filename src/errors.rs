//! Error Types
//!
//! This module defines the error types used throughout the baker.
//!
//! # Overview
//!
//! - [`SceneError`]: failures reported by a [`SceneQuery`](crate::scene::SceneQuery)
//!   or [`TimeSource`](crate::scene::TimeSource) implementation.
//! - [`ConfigError`]: configuration rejected at load time.
//! - [`BakeError`]: the error type of every fallible pipeline step.
//!
//! Conditions that only degrade the output (missing ground proxy, name
//! collisions, empty sequences, ...) are not errors. They are recorded as
//! [`Diagnostic`](crate::diagnostics::Diagnostic)s in the
//! [`ExportLog`](crate::diagnostics::ExportLog).
//!
//! # Usage
//!
//! ```rust,ignore
//! use dts_baker::errors::{BakeError, Result};
//!
//! fn bake_all() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::animation::BakeStage;
use crate::scene::{ArmatureId, BoneId, ObjectId};

/// Errors raised by the host scene.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// The host does not know the object.
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),

    /// The host does not know the bone.
    #[error("Unknown bone {bone} in armature {armature}")]
    UnknownBone {
        /// Armature that was queried
        armature: ArmatureId,
        /// The missing bone
        bone: BoneId,
    },

    /// The host has no action with this name.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Any other failure inside the host application.
    #[error("Host error: {0}")]
    Host(String),
}

/// Configuration rejected by [`ExportConfig::validate`](crate::config::ExportConfig::validate).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A sequence has no name.
    #[error("Sequence #{0} has an empty name")]
    EmptySequenceName(usize),

    /// Two sequences share a name.
    #[error("Duplicate sequence name: {0}")]
    DuplicateSequence(String),

    /// The end frame lies before the start frame.
    #[error("Sequence '{sequence}': invalid frame range {start}..={end}")]
    InvalidFrameRange {
        /// Sequence name
        sequence: String,
        /// First frame
        start: u32,
        /// Last frame
        end: u32,
    },

    /// Trigger states are numbered 1 through 32.
    #[error("Sequence '{sequence}': trigger state {state} is outside 1..=32")]
    InvalidTriggerState {
        /// Sequence name
        sequence: String,
        /// The offending state
        state: u8,
    },

    /// FPS or duration is not a positive, finite number.
    #[error("Sequence '{sequence}': {field} must be positive and finite (got {value})")]
    InvalidTiming {
        /// Sequence name
        sequence: String,
        /// Either "fps" or "duration"
        field: &'static str,
        /// The rejected value
        value: f32,
    },

    /// IFL frame holds must be at least one frame long.
    #[error("Sequence '{sequence}': IFL frame hold #{index} is zero")]
    InvalidFrameHold {
        /// Sequence name
        sequence: String,
        /// Position of the hold in the list
        index: usize,
    },

    /// A frame count exceeds [`MAX_SEQUENCE_FRAMES`](crate::config::MAX_SEQUENCE_FRAMES).
    #[error("Sequence '{sequence}': {span} spans {frames} frames, more than {limit}")]
    TooManyFrames {
        /// Sequence name
        sequence: String,
        /// Either "frame range", "IFL" or "visibility"
        span: &'static str,
        /// Requested frame count, saturated at `u32::MAX`
        frames: u32,
        /// The limit
        limit: u32,
    },

    /// The export scale must be positive and finite.
    #[error("Invalid export scale: {0}")]
    InvalidExportScale(f32),
}

/// The main error type of the baking pipeline.
#[derive(Error, Debug)]
pub enum BakeError {
    // ========================================================================
    // Host & Configuration Errors
    // ========================================================================
    /// The host scene reported a failure.
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// The configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // ========================================================================
    // Pipeline Errors
    // ========================================================================
    /// Baking was requested before rest poses were resolved.
    #[error("Rest poses have not been resolved")]
    RestPoseUnresolved,

    /// The export was cancelled through a [`CancelToken`](crate::export::CancelToken).
    #[error("Export cancelled")]
    Cancelled,

    /// Baking a sequence failed. Its partial output has been discarded.
    #[error("Sequence '{name}' failed during {stage}: {source}")]
    Sequence {
        /// Sequence name
        name: String,
        /// Baker stage in which the failure happened
        stage: BakeStage,
        /// Underlying error
        #[source]
        source: Box<BakeError>,
    },

    // ========================================================================
    // Output Errors (fatal)
    // ========================================================================
    /// The shape writer failed. The whole export is aborted.
    #[error("Shape writer error: {0}")]
    Writer(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BakeError {
    /// Returns `true` if the error, or the error it wraps, is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Sequence { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Alias for `Result<T, BakeError>`.
pub type Result<T> = std::result::Result<T, BakeError>;

//! Export & Sequence Configuration
//!
//! Typed configuration for one export. Every field has a default, and the
//! whole configuration is validated once when it is loaded.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use dts_baker::config::{ExportConfig, SequenceConfig, TimingLock};
//! use dts_baker::diagnostics::ExportLog;
//!
//! let mut log = ExportLog::new();
//! let config = ExportConfig::from_json_str(
//!     r#"{ "sequences": [ { "name": "run", "action": "Run", "end_frame": 24, "cyclic": true } ] }"#,
//!     &mut log,
//! )?;
//!
//! // Or in code
//! let mut config = ExportConfig {
//!     sequences: vec![SequenceConfig {
//!         name: "idle".into(),
//!         end_frame: 30,
//!         lock: TimingLock::Duration,
//!         duration: 1.0,
//!         ..Default::default()
//!     }],
//!     ..Default::default()
//! };
//! config.validate(&mut log)?;
//! ```

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, ExportLog};
use crate::errors::ConfigError;
use crate::scene::CATCH_ROOT_NAME;

/// Upper bound on the frames a sequence, its IFL or its visibility span may
/// cover.
pub const MAX_SEQUENCE_FRAMES: u32 = 1 << 20;

// ---------------------------------------------------------------------------
// ExportConfig
// ---------------------------------------------------------------------------

/// Settings for one export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Name of the synthetic root node. Default: `"Exp-Catch-Root"`.
    pub catch_root_name: String,
    /// Node names that are never exported, compared case-insensitively.
    /// Children of a banned node move up to its nearest exported ancestor.
    pub banned_nodes: Vec<String>,
    /// Factor applied to every position. Default: 1.0.
    pub export_scale: f32,
    /// Sequences to bake, in export order.
    pub sequences: Vec<SequenceConfig>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            catch_root_name: CATCH_ROOT_NAME.to_string(),
            banned_nodes: Vec::new(),
            export_scale: 1.0,
            sequences: Vec::new(),
        }
    }
}

impl ExportConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str, log: &mut ExportLog) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(json)?;
        config.validate(log)?;
        Ok(config)
    }

    /// Rejects invalid values. Ground-frame targets beyond the frame range
    /// are clamped with a warning.
    pub fn validate(&mut self, log: &mut ExportLog) -> Result<(), ConfigError> {
        if !self.export_scale.is_finite() || self.export_scale <= 0.0 {
            return Err(ConfigError::InvalidExportScale(self.export_scale));
        }

        let mut names = FxHashSet::default();
        for (index, sequence) in self.sequences.iter_mut().enumerate() {
            if sequence.name.is_empty() {
                return Err(ConfigError::EmptySequenceName(index));
            }
            if !names.insert(sequence.name.clone()) {
                return Err(ConfigError::DuplicateSequence(sequence.name.clone()));
            }
            sequence.validate(log)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn exclusion(&self) -> NodeExclusion {
        NodeExclusion::new(&self.banned_nodes)
    }

    pub fn enabled_sequences(&self) -> impl Iterator<Item = &SequenceConfig> {
        self.sequences.iter().filter(|s| s.enabled)
    }
}

// ---------------------------------------------------------------------------
// NodeExclusion
// ---------------------------------------------------------------------------

/// Case-insensitive set of banned node names.
#[derive(Debug, Clone, Default)]
pub struct NodeExclusion {
    banned: FxHashSet<String>,
}

impl NodeExclusion {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            banned: names.iter().map(|n| n.as_ref().to_uppercase()).collect(),
        }
    }

    #[must_use]
    pub fn is_banned(&self, name: &str) -> bool {
        !self.banned.is_empty() && self.banned.contains(&name.to_uppercase())
    }
}

// ---------------------------------------------------------------------------
// SequenceConfig
// ---------------------------------------------------------------------------

/// Which of FPS and duration the user fixed. The other one is derived from
/// the frame count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingLock {
    #[default]
    Fps,
    Duration,
}

/// The pose a blend sequence is measured against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlendReference {
    /// Action providing the reference pose.
    pub action: String,
    /// Frame of that action, 1-based. Out-of-range frames fall back to 1.
    #[serde(default = "default_reference_frame")]
    pub frame: u32,
}

fn default_reference_frame() -> u32 {
    1
}

/// A state trigger placed on a frame of the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Trigger state, 1 through 32.
    pub state: u8,
    /// 1-based frame within the sequence.
    pub frame: u32,
    /// `true` switches the state on, `false` switches it off.
    #[serde(default = "default_true")]
    pub activates: bool,
}

/// Image-file-list (texture flip-book) animation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IflConfig {
    /// Material name without the `.ifl` suffix.
    pub material: String,
    /// Frames each image is shown for.
    pub frame_holds: Vec<u32>,
}

impl IflConfig {
    #[must_use]
    pub fn total_frames(&self) -> u32 {
        self.frame_holds
            .iter()
            .fold(0u32, |total, &hold| total.saturating_add(hold))
    }
}

/// Visibility animation over an inclusive frame span.
///
/// Frames of the sequence past `end_frame` hold the value at `end_frame`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityConfig {
    pub start_frame: u32,
    pub end_frame: u32,
    /// Export names of the objects whose visibility curve is sampled.
    #[serde(default)]
    pub objects: Vec<String>,
}

impl VisibilityConfig {
    #[must_use]
    pub fn frame_span(&self) -> u32 {
        self.end_frame
            .saturating_sub(self.start_frame)
            .saturating_add(1)
    }
}

/// Settings of one sequence.
///
/// | Field           | Default | Valid range                    |
/// |-----------------|---------|--------------------------------|
/// | `start_frame`   | 1       | any                            |
/// | `end_frame`     | 2       | `>= start_frame`               |
/// | `fps`           | 25      | `> 0`, clamped to 1/3600..=255 |
/// | `duration`      | 0.08    | `> 0`, clamped to 1/255..=3600 |
/// | `ground_frames` | 0       | clamped to the frame count     |
/// | `priority`      | 0       | any                            |
///
/// The frame range, the IFL frame holds and the visibility span may each
/// cover at most [`MAX_SEQUENCE_FRAMES`] frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub name: String,
    /// Disabled sequences are not exported.
    pub enabled: bool,
    /// Action bound while sampling. `None` samples whatever the host has bound.
    pub action: Option<String>,
    /// First host frame, inclusive.
    pub start_frame: u32,
    /// Last host frame, inclusive.
    pub end_frame: u32,
    pub fps: f32,
    /// Seconds.
    pub duration: f32,
    pub lock: TimingLock,
    /// The sequence loops; a last frame equal to the first is dropped.
    pub cyclic: bool,
    /// Store deltas against this pose instead of absolute transforms.
    pub blend: Option<BlendReference>,
    /// Number of ground (root motion) frames; 0 disables them.
    pub ground_frames: u32,
    /// Write the sequence as its own unit instead of into the shape.
    pub standalone: bool,
    pub priority: i32,
    pub triggers: Vec<TriggerConfig>,
    pub ifl: Option<IflConfig>,
    pub visibility: Option<VisibilityConfig>,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            action: None,
            start_frame: 1,
            end_frame: 2,
            fps: 25.0,
            duration: 2.0 / 25.0,
            lock: TimingLock::Fps,
            cyclic: false,
            blend: None,
            ground_frames: 0,
            standalone: false,
            priority: 0,
            triggers: Vec::new(),
            ifl: None,
            visibility: None,
        }
    }
}

impl SequenceConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Frames in `start_frame..=end_frame`.
    #[must_use]
    pub fn frame_count(&self) -> u32 {
        self.end_frame
            .saturating_sub(self.start_frame)
            .saturating_add(1)
    }

    pub fn validate(&mut self, log: &mut ExportLog) -> Result<(), ConfigError> {
        if self.end_frame < self.start_frame {
            return Err(ConfigError::InvalidFrameRange {
                sequence: self.name.clone(),
                start: self.start_frame,
                end: self.end_frame,
            });
        }
        for (field, value) in [("fps", self.fps), ("duration", self.duration)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidTiming {
                    sequence: self.name.clone(),
                    field,
                    value,
                });
            }
        }
        if let Some(trigger) = self.triggers.iter().find(|t| !(1..=32).contains(&t.state)) {
            return Err(ConfigError::InvalidTriggerState {
                sequence: self.name.clone(),
                state: trigger.state,
            });
        }
        if let Some(index) = self
            .ifl
            .as_ref()
            .and_then(|ifl| ifl.frame_holds.iter().position(|&h| h == 0))
        {
            return Err(ConfigError::InvalidFrameHold {
                sequence: self.name.clone(),
                index,
            });
        }
        if let Some(vis) = &self.visibility
            && vis.end_frame < vis.start_frame
        {
            return Err(ConfigError::InvalidFrameRange {
                sequence: self.name.clone(),
                start: vis.start_frame,
                end: vis.end_frame,
            });
        }

        let spans = [
            ("frame range", Some(self.frame_count())),
            ("IFL", self.ifl.as_ref().map(IflConfig::total_frames)),
            ("visibility", self.visibility.as_ref().map(VisibilityConfig::frame_span)),
        ];
        for (span, frames) in spans {
            if let Some(frames) = frames
                && frames > MAX_SEQUENCE_FRAMES
            {
                return Err(ConfigError::TooManyFrames {
                    sequence: self.name.clone(),
                    span,
                    frames,
                    limit: MAX_SEQUENCE_FRAMES,
                });
            }
        }

        let frames = self.frame_count();
        if self.ground_frames > frames {
            log.warn(Diagnostic::GroundFramesClamped {
                sequence: self.name.clone(),
                requested: self.ground_frames,
                clamped: frames,
            });
            self.ground_frames = frames;
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

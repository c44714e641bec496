//! Export Diagnostics
//!
//! Non-fatal problems found while exporting. Each one is forwarded to the
//! `log` facade as a warning and kept in an [`ExportLog`] so the calling
//! layer can show users what is wrong with their rig.

use std::fmt;

/// A non-fatal condition encountered during export.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Ground frames were requested but the scene has no ground proxy.
    MissingGroundProxy {
        /// Sequence name
        sequence: String,
    },

    /// The blend reference frame lies outside the reference action. Frame 1 is used instead.
    ReferencePoseOutOfRange {
        /// Sequence name
        sequence: String,
        /// Reference action
        action: String,
        /// Requested 1-based frame
        frame: u32,
        /// Frames in the reference action
        frame_count: u32,
    },

    /// An ancestor rest scale has a zero component. Unit scale is substituted for it.
    DegenerateAncestorScale {
        /// Node whose offset was corrected
        node: String,
        /// Ancestor carrying the zero component
        ancestor: String,
    },

    /// An ancestor scale reached a zero component while a sequence was sampled.
    /// Unit scale is substituted for it on the affected frames.
    DegenerateAnimatedScale {
        /// Sequence name
        sequence: String,
        /// Node whose offset was corrected
        node: String,
        /// Ancestor carrying the zero component
        ancestor: String,
        /// First 1-based host frame it happened on
        frame: u32,
    },

    /// Surviving nodes share an export name.
    NameCollisionAfterExclusion {
        /// The shared name
        name: String,
        /// Names assigned to the colliding nodes, in node order
        resolved: Vec<String>,
    },

    /// No channel of the sequence ever moved. The sequence is skipped.
    EmptySequence {
        /// Sequence name
        sequence: String,
    },

    /// The ground-frame target exceeds the number of frames and was clamped.
    GroundFramesClamped {
        /// Sequence name
        sequence: String,
        /// Configured ground-frame count
        requested: u32,
        /// Count actually used
        clamped: u32,
    },

    /// The sequence names an action the host does not know.
    UnknownAction {
        /// Sequence name
        sequence: String,
        /// The missing action
        action: String,
    },

    /// A visibility-animated object is not exported or has no visibility curve.
    MissingVisibilityTrack {
        /// Sequence name
        sequence: String,
        /// Object name as configured
        object: String,
    },

    /// No IFL material of the shape matches the configured material.
    UnknownIflMaterial {
        /// Sequence name
        sequence: String,
        /// Configured material name
        material: String,
    },

    /// The scene graph reaches an object twice. The second visit is ignored.
    RevisitedObject {
        /// Object name
        name: String,
    },

    /// A sequence failed to bake and its partial output was discarded.
    SequenceFailed {
        /// Sequence name
        sequence: String,
        /// Rendered error
        reason: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingGroundProxy { sequence } => write!(
                f,
                "Sequence '{sequence}': ground frames requested but no ground proxy object found; skipping ground frames"
            ),
            Self::ReferencePoseOutOfRange {
                sequence,
                action,
                frame,
                frame_count,
            } => write!(
                f,
                "Sequence '{sequence}': reference frame {frame} is outside action '{action}' ({frame_count} frames); using frame 1"
            ),
            Self::DegenerateAncestorScale { node, ancestor } => write!(
                f,
                "Node '{node}': ancestor '{ancestor}' has a zero scale component; treating it as 1"
            ),
            Self::DegenerateAnimatedScale {
                sequence,
                node,
                ancestor,
                frame,
            } => write!(
                f,
                "Sequence '{sequence}': ancestor '{ancestor}' of node '{node}' reaches a zero scale component at frame {frame}; treating it as 1"
            ),
            Self::NameCollisionAfterExclusion { name, resolved } => write!(
                f,
                "Several nodes export as '{name}'; using {}",
                resolved.join(", ")
            ),
            Self::EmptySequence { sequence } => {
                write!(f, "Sequence '{sequence}' has no animated channels; skipping")
            }
            Self::GroundFramesClamped {
                sequence,
                requested,
                clamped,
            } => write!(
                f,
                "Sequence '{sequence}': {requested} ground frames requested, clamped to {clamped}"
            ),
            Self::UnknownAction { sequence, action } => write!(
                f,
                "Sequence '{sequence}': action '{action}' not found; using the frame range"
            ),
            Self::MissingVisibilityTrack { sequence, object } => write!(
                f,
                "Sequence '{sequence}': object '{object}' has no exported visibility curve; skipping it"
            ),
            Self::UnknownIflMaterial { sequence, material } => write!(
                f,
                "Sequence '{sequence}': no IFL material named '{material}'"
            ),
            Self::RevisitedObject { name } => {
                write!(f, "Object '{name}' is reachable twice in the scene graph; ignoring the second visit")
            }
            Self::SequenceFailed { sequence, reason } => {
                write!(f, "Sequence '{sequence}' discarded: {reason}")
            }
        }
    }
}

/// Accumulated diagnostics of one export.
#[derive(Debug, Default, Clone)]
pub struct ExportLog {
    entries: Vec<Diagnostic>,
}

impl ExportLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic and forwards it to `log::warn!`.
    pub fn warn(&mut self, diagnostic: Diagnostic) {
        log::warn!("{diagnostic}");
        self.entries.push(diagnostic);
    }

    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of recorded diagnostics matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Diagnostic) -> bool) -> usize {
        self.entries.iter().filter(|d| predicate(d)).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }
}

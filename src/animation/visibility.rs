use super::sequence::VisibilityTrack;
use crate::config::VisibilityConfig;
use crate::diagnostics::{Diagnostic, ExportLog};
use crate::errors::SceneError;
use crate::scene::{Node, NodeKind, ObjectId, SceneQuery};

/// Samples the visibility curves of the configured objects.
///
/// Sample `i` reads host frame `start_frame + i`, or `end_frame` once that
/// is passed. Values are clamped to `0.0..=1.0`.
#[derive(Debug)]
pub struct VisibilityRecorder {
    start_frame: u32,
    end_frame: u32,
    /// Indexed by node. `None` for nodes without a visibility track.
    tracks: Vec<Option<(ObjectId, Vec<f32>)>>,
}

impl VisibilityRecorder {
    /// Selects the object nodes named in `config.objects`. Names that match
    /// no exported object, and objects without a curve, are reported and
    /// skipped.
    pub fn new(
        config: &VisibilityConfig,
        nodes: &[Node],
        scene: &dyn SceneQuery,
        sequence: &str,
        num_frames: u32,
        log: &mut ExportLog,
    ) -> Result<Self, SceneError> {
        let mut tracks: Vec<Option<(ObjectId, Vec<f32>)>> = vec![None; nodes.len()];
        for name in &config.objects {
            let found = nodes.iter().enumerate().find_map(|(index, node)| match node.kind {
                NodeKind::Object(pose) if node.name == *name => Some((index, pose.object)),
                _ => None,
            });
            let track = match found {
                Some((index, object)) => scene
                    .object_visibility(object, config.start_frame)?
                    .map(|_| (index, object)),
                None => None,
            };
            match track {
                Some((index, object)) => {
                    tracks[index] = Some((object, Vec::with_capacity(num_frames as usize)));
                }
                None => log.warn(Diagnostic::MissingVisibilityTrack {
                    sequence: sequence.to_string(),
                    object: name.clone(),
                }),
            }
        }

        Ok(Self {
            start_frame: config.start_frame,
            end_frame: config.end_frame,
            tracks,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.iter().all(Option::is_none)
    }

    /// Host frame read by sample `index`.
    #[must_use]
    pub fn frame_at(&self, index: usize) -> u32 {
        let offset = u32::try_from(index).unwrap_or(u32::MAX);
        self.start_frame.saturating_add(offset).min(self.end_frame)
    }

    /// Records sample `index` of every selected object.
    pub fn observe(&mut self, scene: &dyn SceneQuery, index: usize) -> Result<(), SceneError> {
        let frame = self.frame_at(index);
        for (object, values) in self.tracks.iter_mut().flatten() {
            // A curve that vanished mid-sequence reads as fully visible.
            let value = scene.object_visibility(*object, frame)?.unwrap_or(1.0);
            values.push(value.clamp(0.0, 1.0));
        }
        Ok(())
    }

    #[must_use]
    pub fn finish(self) -> Vec<Option<VisibilityTrack>> {
        self.tracks
            .into_iter()
            .map(|track| track.map(|(_, values)| values))
            .collect()
    }
}

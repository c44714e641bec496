use super::sampler::PoseSampler;
use super::sequence::GroundFrame;
use crate::errors::SceneError;
use crate::math::Transform;
use crate::scene::{ObjectId, ObjectPose, SceneQuery};

/// Extracts ground frames from the ground proxy at evenly spaced samples.
///
/// With `n` sampled frames and a target of `t` ground frames, a ground frame
/// is taken at sample index `i` once `i >= (n / t) * (k + 1) - 1`, where `k`
/// is the number of ground frames taken so far. Never more than `t` are taken.
#[derive(Debug)]
pub struct GroundFrameSampler {
    proxy: ObjectPose,
    target: u32,
    spacing: f32,
    origin: Option<Transform>,
    frames: Vec<GroundFrame>,
}

impl GroundFrameSampler {
    #[must_use]
    pub fn new(proxy: ObjectId, target: u32, num_frames: u32) -> Self {
        let target = target.min(num_frames);
        Self {
            proxy: ObjectPose { object: proxy },
            target,
            spacing: if target == 0 {
                f32::INFINITY
            } else {
                num_frames as f32 / target as f32
            },
            origin: None,
            frames: Vec::with_capacity(target as usize),
        }
    }

    /// Whether sample `index` produces the next ground frame.
    #[must_use]
    pub fn is_due(&self, index: usize) -> bool {
        let taken = self.frames.len();
        taken < self.target as usize && index as f32 >= self.spacing * (taken + 1) as f32 - 1.0
    }

    /// Called once per sample, after the host has been moved to the frame.
    /// Sample 0 fixes the origin all ground frames are relative to.
    pub fn observe(
        &mut self,
        scene: &dyn SceneQuery,
        index: usize,
        sampler: &PoseSampler,
    ) -> Result<(), SceneError> {
        if index == 0 {
            self.origin = Some(sampler.read(scene, &self.proxy)?);
        }
        if !self.is_due(index) {
            return Ok(());
        }
        let current = sampler.read(scene, &self.proxy)?;
        let origin = self.origin.unwrap_or(current);
        self.frames.push(GroundFrame {
            translation: current.position - origin.position,
            rotation: (origin.rotation.inverse() * current.rotation).normalize(),
        });
        Ok(())
    }

    #[must_use]
    pub fn finish(self) -> Vec<GroundFrame> {
        self.frames
    }
}

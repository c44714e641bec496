//! Frame counts and playback timing.

use crate::config::{SequenceConfig, TimingLock};

pub const MIN_FPS: f32 = 1.0 / 3600.0;
pub const MAX_FPS: f32 = 255.0;
pub const MIN_DURATION: f32 = 1.0 / 255.0;
pub const MAX_DURATION: f32 = 3600.0;

/// Frames implied by each animation source of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameSources {
    /// Frames covered by the action (or the frame range without one).
    pub action: u32,
    /// Sum of the IFL frame holds.
    pub ifl: u32,
    /// Length of the visibility track span.
    pub visibility: u32,
}

impl FrameSources {
    /// Frames a sequence needs to cover every source.
    #[must_use]
    pub fn num_key_frames(&self) -> u32 {
        self.action.max(self.ifl).max(self.visibility)
    }
}

/// Reconciled playback speed of a sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackTiming {
    pub fps: f32,
    /// Seconds.
    pub duration: f32,
}

impl PlaybackTiming {
    /// Derives the unlocked value from the locked one.
    #[must_use]
    pub fn reconcile(config: &SequenceConfig, frames: u32) -> Self {
        let frames = frames.max(1) as f32;
        match config.lock {
            TimingLock::Fps => {
                let fps = config.fps.clamp(MIN_FPS, MAX_FPS);
                Self {
                    fps,
                    duration: (frames / fps).clamp(MIN_DURATION, MAX_DURATION),
                }
            }
            TimingLock::Duration => {
                let duration = config.duration.clamp(MIN_DURATION, MAX_DURATION);
                Self {
                    fps: (frames / duration).clamp(MIN_FPS, MAX_FPS),
                    duration,
                }
            }
        }
    }
}

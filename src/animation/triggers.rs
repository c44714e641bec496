use crate::config::TriggerConfig;

/// A state change fired at a point of a sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trigger {
    /// 1 through 32.
    pub state: u8,
    /// Position in the sequence, 0 to 1.
    pub time: f32,
    pub activates: bool,
    /// The state is switched both on and off within the sequence, so the
    /// change must be undone when the sequence plays backwards.
    pub reverses: bool,
}

/// Maps a 1-based frame onto 0..=1. Frames at or before the first map to 0.
#[must_use]
pub fn normalized_time(frame: u32, num_frames: u32) -> f32 {
    if frame <= 1 || num_frames <= 1 {
        0.0
    } else {
        ((frame - 1) as f32 / (num_frames - 1) as f32).min(1.0)
    }
}

/// Builds the trigger list of a sequence, latest first.
#[must_use]
pub fn build_triggers(markers: &[TriggerConfig], num_frames: u32) -> Vec<Trigger> {
    let mut sorted: Vec<&TriggerConfig> = markers.iter().collect();
    sorted.sort_by(|a, b| b.frame.cmp(&a.frame));

    sorted
        .into_iter()
        .map(|marker| Trigger {
            state: marker.state,
            time: normalized_time(marker.frame, num_frames),
            activates: marker.activates,
            reverses: markers
                .iter()
                .any(|other| other.state == marker.state && other.activates != marker.activates),
        })
        .collect()
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag that aborts an export before the next frame is sampled.
///
/// Clones share the flag, so one clone can be handed to a UI thread while
/// the export runs.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clears the flag so the export can be resumed.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

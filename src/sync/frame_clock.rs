//! Monotonic frame counter shared by all threads requesting descriptor sets.

use std::sync::atomic::{AtomicU64, Ordering};

/// Frame counter supplied by the renderer once per frame. The clock never moves backwards, all set recency
/// and recycling decisions rely on that.
#[derive(Debug, Default)]
pub struct FrameClock {
    frame: AtomicU64,
}

impl FrameClock {
    /// Create a new clock starting at frame zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current frame.
    pub fn current(&self) -> u64 {
        self.frame.load(Ordering::Acquire)
    }

    /// Move on to the next frame and return it.
    pub fn advance(&self) -> u64 {
        self.frame.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Mirror an externally supplied frame counter. Values lower than the current frame are ignored.
    pub fn set(&self, frame: u64) {
        let previous = self.frame.fetch_max(frame, Ordering::AcqRel);
        if frame < previous {
            warn!("Frame counter moved backwards from {previous} to {frame}, ignoring.");
        }
    }
}

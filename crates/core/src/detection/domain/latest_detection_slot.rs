use std::sync::{Arc, Mutex, MutexGuard};

use crate::shared::bounding_box::BoundingBox;

/// Outcome of one asynchronous detection, as delivered to the result callback.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveDetection {
    pub frame_index: usize,
    pub timestamp_ms: i64,
    pub outcome: Result<Vec<BoundingBox>, String>,
}

impl LiveDetection {
    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }
}

#[derive(Default)]
struct SlotState {
    sequence: u64,
    latest: Option<LiveDetection>,
}

/// Single-writer / single-reader hand-off of the most recent live detection.
///
/// The detection worker publishes through [`LatestDetectionSlot::publish`]
/// while the render loop reads with [`LatestDetectionSlot::latest`]. Each
/// publish bumps a sequence number so the reader can tell a fresh result
/// from the one it already applied.
#[derive(Clone, Default)]
pub struct LatestDetectionSlot {
    inner: Arc<Mutex<SlotState>>,
}

impl LatestDetectionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored detection.
    pub fn publish(&self, detection: LiveDetection) {
        let mut state = self.lock();
        state.sequence += 1;
        state.latest = Some(detection);
    }

    /// Returns the sequence number and a copy of the latest detection, or
    /// `None` if nothing has been published yet.
    pub fn latest(&self) -> Option<(u64, LiveDetection)> {
        let state = self.lock();
        state.latest.clone().map(|d| (state.sequence, d))
    }

    /// Callback suitable for registering with a live-stream detector.
    pub fn publisher(&self) -> Box<dyn Fn(LiveDetection) + Send + 'static> {
        let slot = self.clone();
        Box::new(move |detection| slot.publish(detection))
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // SlotState is only ever written whole, so a poisoned lock still
        // holds a consistent value.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

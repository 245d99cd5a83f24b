//! Schedule - "Call me again next frame"
//!
//! The animator never owns a display loop. It asks its scheduler for one
//! more frame and the host (a webview's `requestAnimationFrame`, or a test)
//! calls back with a timestamp.

use serde::{Deserialize, Serialize};

/// Handle for an outstanding frame request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameId(pub u64);

pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameId;
    fn cancel_frame(&mut self, id: FrameId);
}

/// Keeps at most one outstanding request. The host polls `pending()` to
/// decide whether to deliver another frame.
#[derive(Debug, Default)]
pub struct PendingFrame {
    next_id: u64,
    pending: Option<FrameId>,
    requested: u64,
}

impl PendingFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<FrameId> {
        self.pending
    }

    /// Total frames requested since creation
    pub fn requested(&self) -> u64 {
        self.requested
    }
}

impl FrameScheduler for PendingFrame {
    fn request_frame(&mut self) -> FrameId {
        self.next_id += 1;
        self.requested += 1;
        let id = FrameId(self.next_id);
        self.pending = Some(id);
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        if self.pending == Some(id) {
            self.pending = None;
        }
    }
}

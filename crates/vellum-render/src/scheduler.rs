//! Frame-coalesced flush scheduling.
//!
//! Many commands can arrive between two frames; only one flush may run
//! per frame tick. Critical and high priorities flush immediately, the
//! rest set a single frame-request flag the host's frame pump consumes.

use vellum_core::Priority;

/// What the caller should do with the command it just queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushDecision {
    /// Flush synchronously, the work must preempt the next frame.
    Immediate,
    /// A frame callback was requested; flush happens in `begin_frame`.
    Scheduled,
    /// A frame request was already pending; nothing to do.
    AlreadyScheduled,
}

#[derive(Debug, Default)]
pub struct RenderScheduler {
    frame_requested: bool,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a flush at the given priority.
    pub fn request(&mut self, priority: Priority) -> FlushDecision {
        if priority >= Priority::High {
            return FlushDecision::Immediate;
        }
        if self.frame_requested {
            FlushDecision::AlreadyScheduled
        } else {
            self.frame_requested = true;
            FlushDecision::Scheduled
        }
    }

    /// Consume the pending frame request. Returns true when a flush is
    /// due this frame.
    pub fn begin_frame(&mut self) -> bool {
        std::mem::take(&mut self.frame_requested)
    }

    pub fn is_frame_requested(&self) -> bool {
        self.frame_requested
    }
}

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// The host's per-frame scheduling primitive.
///
/// `request_frame` asks the host to call the renderer's `on_frame` at its next frame opportunity.
pub trait FrameRequester: Send + Sync {
    fn request_frame(&self);
}

/// Requester for hosts that drive frames unconditionally.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRequester;

impl FrameRequester for NoopRequester {
    fn request_frame(&self) {}
}

/// Latching frame request flag a host event loop can poll.
#[derive(Clone, Debug, Default)]
pub struct FrameSignal {
    requested: Arc<AtomicBool>,
    requests: Arc<AtomicUsize>,
}

impl FrameSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Consume the pending request, if any.
    pub fn take(&self) -> bool {
        self.requested.swap(false, Ordering::AcqRel)
    }

    /// Total requests received.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Acquire)
    }
}

impl FrameRequester for FrameSignal {
    fn request_frame(&self) {
        self.requests.fetch_add(1, Ordering::AcqRel);
        self.requested.store(true, Ordering::Release);
    }
}

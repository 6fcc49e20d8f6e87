use crossbeam_channel::{Sender, TrySendError};

use crate::foundation::{
    core::{ElementId, Rect},
    error::ScopeResult,
};

/// One visibility notification for one element.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VisibilityEntry {
    pub element: ElementId,
    /// Bounding box in viewport coordinates at notification time.
    pub rect: Rect,
    pub is_intersecting: bool,
}

impl VisibilityEntry {
    /// The rect, if the element intersects the viewport with a non-zero area.
    pub fn resolved_rect(&self) -> Option<Rect> {
        (self.is_intersecting && !self.rect.is_empty()).then_some(self.rect)
    }
}

/// Push side of a visibility subscription.
///
/// At most one burst can be outstanding: [`NotificationSink::deliver`] blocks the calling handler
/// until the consumer has claimed the previous burst.
#[derive(Clone, Debug)]
pub struct NotificationSink {
    tx: Sender<Vec<VisibilityEntry>>,
}

impl NotificationSink {
    pub(crate) fn new(tx: Sender<Vec<VisibilityEntry>>) -> Self {
        Self { tx }
    }

    /// Deliver a burst, waiting while a previous burst is unclaimed.
    ///
    /// Returns `false` once the consuming side is gone; the source should stop delivering.
    pub fn deliver(&self, entries: Vec<VisibilityEntry>) -> bool {
        self.tx.send(entries).is_ok()
    }

    /// Deliver without waiting. A burst that cannot be buffered right now is handed back.
    pub fn try_deliver(&self, entries: Vec<VisibilityEntry>) -> Result<(), Vec<VisibilityEntry>> {
        match self.tx.try_send(entries) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(entries)) | Err(TrySendError::Disconnected(entries)) => {
                Err(entries)
            }
        }
    }
}

/// Live subscription. Dropping it unsubscribes.
pub struct ObserverHandle {
    disconnect: Option<Box<dyn FnOnce() + Send>>,
}

impl ObserverHandle {
    pub fn new(disconnect: impl FnOnce() + Send + 'static) -> Self {
        Self {
            disconnect: Some(Box::new(disconnect)),
        }
    }

    pub fn noop() -> Self {
        Self { disconnect: None }
    }

    pub fn disconnect(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(f) = self.disconnect.take() {
            f();
        }
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("connected", &self.disconnect.is_some())
            .finish()
    }
}

/// A push-based viewport-visibility notification source.
///
/// Implementations report every observed element at least once (intersecting or not), pushing
/// bursts through `sink` from whatever thread the host delivers notifications on.
pub trait VisibilitySource {
    fn observe(&mut self, elements: &[ElementId], sink: NotificationSink)
    -> ScopeResult<ObserverHandle>;
}

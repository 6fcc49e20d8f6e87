use crossbeam_channel::{Receiver, TryRecvError};

use crate::{
    foundation::{core::ElementId, error::ScopeResult},
    visibility::{
        batch::BatchState,
        source::{NotificationSink, ObserverHandle, VisibilityEntry, VisibilitySource},
    },
};

/// Outcome of a non-blocking poll on [`BatchedVisibility`].
#[derive(Clone, Debug, PartialEq)]
pub enum BatchPoll {
    /// A batch of newly seen elements.
    Ready(Vec<VisibilityEntry>),
    /// Nothing new yet; the subscription is still open.
    Pending,
    /// Every element reported, or the source went away.
    Done,
}

/// Pull-based, single-use sequence of visibility batches for a fixed element set.
///
/// Wraps a push source behind a capacity-1 channel, so the source's handler is held back while a
/// burst waits to be claimed. Each element is yielded at most once. The sequence ends after every
/// element has reported (the subscription is dropped before the final batch is returned) or when
/// the source disconnects.
pub struct BatchedVisibility {
    state: BatchState,
    rx: Option<Receiver<Vec<VisibilityEntry>>>,
    handle: Option<ObserverHandle>,
    batches: usize,
}

impl BatchedVisibility {
    pub fn observe(source: &mut dyn VisibilitySource, elements: &[ElementId]) -> ScopeResult<Self> {
        let state = BatchState::new(elements);
        if state.is_done() {
            return Ok(Self {
                state,
                rx: None,
                handle: None,
                batches: 0,
            });
        }

        let (tx, rx) = crossbeam_channel::bounded(1);
        let unique: Vec<ElementId> = {
            let mut seen = std::collections::HashSet::with_capacity(elements.len());
            elements.iter().copied().filter(|e| seen.insert(*e)).collect()
        };
        let handle = source.observe(&unique, NotificationSink::new(tx))?;
        tracing::trace!(elements = unique.len(), "visibility subscription opened");

        Ok(Self {
            state,
            rx: Some(rx),
            handle: Some(handle),
            batches: 0,
        })
    }

    /// Batches yielded so far.
    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn is_done(&self) -> bool {
        self.rx.is_none()
    }

    fn finish(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.disconnect();
        }
        self.rx = None;
    }
}

impl BatchedVisibility {
    /// Claim the next batch if one is ready, without waiting.
    ///
    /// Raw bursts holding nothing new are consumed and skipped, so one call may free the source
    /// handler several times.
    pub fn try_next(&mut self) -> BatchPoll {
        loop {
            let Some(rx) = self.rx.as_ref() else {
                return BatchPoll::Done;
            };
            if self.state.is_done() {
                self.finish();
                return BatchPoll::Done;
            }
            match rx.try_recv() {
                Ok(burst) => {
                    if let Some(batch) = self.claim(burst) {
                        return BatchPoll::Ready(batch);
                    }
                }
                Err(TryRecvError::Empty) => return BatchPoll::Pending,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected();
                    return BatchPoll::Done;
                }
            }
        }
    }

    fn claim(&mut self, burst: Vec<VisibilityEntry>) -> Option<Vec<VisibilityEntry>> {
        let batch = self.state.admit(burst)?;
        if self.state.is_done() {
            self.finish();
        }
        self.batches += 1;
        Some(batch)
    }

    fn disconnected(&mut self) {
        tracing::trace!(
            seen = self.state.seen_count(),
            targets = self.state.target_count(),
            "visibility source disconnected before every element reported"
        );
        self.finish();
    }
}

/// Blocking iteration: each `next` waits for the source. Use [`BatchedVisibility::try_next`] on
/// threads that must not stall.
impl Iterator for BatchedVisibility {
    type Item = Vec<VisibilityEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rx = self.rx.as_ref()?;
            if self.state.is_done() {
                self.finish();
                return None;
            }

            let Ok(burst) = rx.recv() else {
                self.disconnected();
                return None;
            };

            if let Some(batch) = self.claim(burst) {
                return Some(batch);
            }
        }
    }
}

impl Drop for BatchedVisibility {
    fn drop(&mut self) {
        self.finish();
    }
}

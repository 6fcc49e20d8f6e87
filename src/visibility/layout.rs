use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    foundation::{
        core::{ElementId, Rect},
        error::{ScopeError, ScopeResult},
    },
    visibility::source::{NotificationSink, ObserverHandle, VisibilityEntry, VisibilitySource},
};

/// Visibility source backed by a fixed element layout and viewport.
///
/// Notifications are pushed from a helper thread in bursts of `burst_size`, the way a host
/// observer reports asynchronously. Elements missing from the layout report as non-intersecting
/// with an empty rect.
#[derive(Clone, Debug)]
pub struct LayoutVisibility {
    layout: HashMap<ElementId, Rect>,
    viewport: Rect,
    burst_size: usize,
}

impl LayoutVisibility {
    pub fn new(viewport: Rect) -> Self {
        Self {
            layout: HashMap::new(),
            viewport,
            burst_size: 16,
        }
    }

    pub fn with_burst_size(mut self, burst_size: usize) -> Self {
        self.burst_size = burst_size.max(1);
        self
    }

    pub fn place(&mut self, element: ElementId, rect: Rect) {
        self.layout.insert(element, rect);
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    /// Shift every placed element, as content does when the viewport scrolls.
    pub fn scroll_content(&mut self, dx: f64, dy: f64) {
        for rect in self.layout.values_mut() {
            *rect = rect.translate(dx, dy);
        }
    }

    pub fn entry_for(&self, element: ElementId) -> VisibilityEntry {
        match self.layout.get(&element) {
            Some(rect) => {
                let overlap = rect.to_kurbo().intersect(self.viewport.to_kurbo());
                VisibilityEntry {
                    element,
                    rect: *rect,
                    is_intersecting: !rect.is_empty() && overlap.area() > 0.0,
                }
            }
            None => VisibilityEntry {
                element,
                rect: Rect::ZERO,
                is_intersecting: false,
            },
        }
    }
}

impl VisibilitySource for LayoutVisibility {
    fn observe(
        &mut self,
        elements: &[ElementId],
        sink: NotificationSink,
    ) -> ScopeResult<ObserverHandle> {
        let entries: Vec<VisibilityEntry> = elements.iter().map(|e| self.entry_for(*e)).collect();
        let burst_size = self.burst_size;
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();

        std::thread::Builder::new()
            .name("renderscope-layout-observer".to_string())
            .spawn(move || {
                for burst in entries.chunks(burst_size) {
                    if flag.load(Ordering::Acquire) || !sink.deliver(burst.to_vec()) {
                        break;
                    }
                }
            })
            .map_err(|e| ScopeError::visibility(format!("failed to spawn observer thread: {e}")))?;

        Ok(ObserverHandle::new(move || {
            cancelled.store(true, Ordering::Release);
        }))
    }
}

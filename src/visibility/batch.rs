use std::collections::HashSet;

use crate::{foundation::core::ElementId, visibility::source::VisibilityEntry};

/// Seen-set bookkeeping for one resolver pass.
///
/// Each target is admitted at most once; entries for elements outside the target set are ignored.
/// The pass is done once every target has been seen.
#[derive(Debug)]
pub struct BatchState {
    targets: HashSet<ElementId>,
    seen: HashSet<ElementId>,
}

impl BatchState {
    pub fn new(elements: &[ElementId]) -> Self {
        let targets: HashSet<ElementId> = elements.iter().copied().collect();
        let seen = HashSet::with_capacity(targets.len());
        Self { targets, seen }
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn is_done(&self) -> bool {
        self.seen.len() >= self.targets.len()
    }

    /// Filter a raw burst down to newly seen targets. `None` when nothing new arrived.
    pub fn admit(&mut self, burst: Vec<VisibilityEntry>) -> Option<Vec<VisibilityEntry>> {
        let fresh: Vec<VisibilityEntry> = burst
            .into_iter()
            .filter(|e| self.targets.contains(&e.element) && self.seen.insert(e.element))
            .collect();
        (!fresh.is_empty()).then_some(fresh)
    }
}

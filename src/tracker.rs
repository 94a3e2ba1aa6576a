//! Change accumulation during a write window.

use crate::ChangeEvent;
use std::collections::HashSet;

/// Accumulates change events during a write window.
///
/// Events are kept in emission order. A duplicate of an already-recorded
/// event (same scope, element, attribute and kind) is dropped, so one batch
/// carries each distinct change once no matter how many times it was
/// emitted inside the window.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    events: Vec<ChangeEvent>,
    seen: HashSet<ChangeEvent>,
}

impl ChangeTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event, collapsing duplicates. The first occurrence fixes
    /// the position in the batch.
    pub fn record(&mut self, event: ChangeEvent) {
        if self.seen.insert(event.clone()) {
            self.events.push(event);
        }
    }

    /// Events recorded so far in the open window.
    pub fn pending(&self) -> &[ChangeEvent] {
        &self.events
    }

    /// Whether any events are pending.
    pub fn has_pending(&self) -> bool {
        !self.events.is_empty()
    }

    /// Take the accumulated batch, leaving the tracker empty.
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        self.seen.clear();
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Id;

    #[test]
    fn duplicates_collapse_keeping_first_position() {
        let mut tracker = ChangeTracker::new();
        tracker.record(ChangeEvent::updated("people", Id::from(1)));
        tracker.record(ChangeEvent::updated("people", Id::from(2)));
        tracker.record(ChangeEvent::updated("people", Id::from(1)));

        let batch = tracker.drain();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].element_id, Some(Id::from(1)));
        assert_eq!(batch[1].element_id, Some(Id::from(2)));
    }

    #[test]
    fn distinct_kinds_are_distinct_events() {
        let mut tracker = ChangeTracker::new();
        tracker.record(ChangeEvent::created("people", Id::from(1)));
        tracker.record(ChangeEvent::updated("people", Id::from(1)));
        assert_eq!(tracker.pending().len(), 2);
    }

    #[test]
    fn drain_resets_dedup_window() {
        let mut tracker = ChangeTracker::new();
        tracker.record(ChangeEvent::updated("people", Id::from(1)));
        assert_eq!(tracker.drain().len(), 1);
        assert!(!tracker.has_pending());

        // The same event in a later window is recorded again.
        tracker.record(ChangeEvent::updated("people", Id::from(1)));
        assert_eq!(tracker.drain().len(), 1);
    }
}

// src/services/dedup.rs

//! Suppression of redelivered geofence events.

use crate::models::GeofenceEventKind;

/// Drops an event whose canonical message equals the last one processed.
///
/// A single slot is kept for all regions: an entry into A followed by a
/// dwell in B are both admitted, only back-to-back identical messages are not.
#[derive(Debug, Default)]
pub struct EventDeduplicator {
    last_message: Option<String>,
}

impl EventDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the event should be processed.
    pub fn admit(&mut self, kind: GeofenceEventKind, name: &str, id: &str) -> bool {
        self.admit_message(kind.message(name, id))
    }

    pub fn admit_message(&mut self, message: String) -> bool {
        if self.last_message.as_deref() == Some(message.as_str()) {
            log::debug!("Duplicate geofence event dropped: {}", message);
            return false;
        }
        self.last_message = Some(message);
        true
    }

    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use GeofenceEventKind::*;

    #[test]
    fn consecutive_duplicate_is_dropped() {
        let mut dedup = EventDeduplicator::new();
        assert!(dedup.admit(Entry, "Cafe", "a1"));
        assert!(!dedup.admit(Entry, "Cafe", "a1"));
        assert_eq!(dedup.last_message(), Some("Entered Cafe (a1)"));
    }

    #[test]
    fn slot_is_shared_across_regions() {
        let mut dedup = EventDeduplicator::new();
        assert!(dedup.admit(Entry, "Cafe", "a1"));
        assert!(dedup.admit(Dwell, "Bar", "b2"));
        // a1 entry is no longer the last message, so a redelivery passes
        assert!(dedup.admit(Entry, "Cafe", "a1"));
    }

    #[test]
    fn different_kinds_for_same_region_pass() {
        let mut dedup = EventDeduplicator::new();
        assert!(dedup.admit(Entry, "Cafe", "a1"));
        assert!(dedup.admit(Dwell, "Cafe", "a1"));
        assert!(dedup.admit(Exit, "Cafe", "a1"));
        assert!(!dedup.admit(Exit, "Cafe", "a1"));
    }
}

// src/services/geofence.rs

//! Geofence event handling.
//!
//! Bridges region monitor callbacks to the visit registry: each event is
//! checked against the deduplicator, then routed to the matching registry
//! operation. Monitor errors are logged and otherwise ignored.

use std::sync::Mutex;

use crate::models::{GeofenceError, GeofenceEvent, GeofenceEventKind};
use crate::services::{ArticleRegistry, EventDeduplicator};

/// Receiver of region monitor callbacks.
pub trait GeofenceObserver: Send + Sync {
    fn on_entry(&self, event: &GeofenceEvent);
    fn on_dwell(&self, event: &GeofenceEvent);
    fn on_exit(&self, event: &GeofenceEvent);
    fn on_error(&self, error: &GeofenceError);
}

/// Dispatch an event to the observer callback for its kind.
pub fn dispatch(observer: &dyn GeofenceObserver, event: &GeofenceEvent) {
    match event.kind {
        GeofenceEventKind::Entry => observer.on_entry(event),
        GeofenceEventKind::Dwell => observer.on_dwell(event),
        GeofenceEventKind::Exit => observer.on_exit(event),
    }
}

/// Observer that keeps the visit registry in step with geofence events.
pub struct GeofenceHandler {
    dedup: Mutex<EventDeduplicator>,
    registry: ArticleRegistry,
}

impl GeofenceHandler {
    pub fn new(registry: ArticleRegistry) -> Self {
        Self {
            dedup: Mutex::new(EventDeduplicator::new()),
            registry,
        }
    }

    pub fn registry(&self) -> &ArticleRegistry {
        &self.registry
    }

    fn admit(&self, event: &GeofenceEvent) -> bool {
        let message = event.message();
        let admitted = self
            .dedup
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .admit_message(message.clone());
        if admitted {
            log::info!("{}", message);
        }
        admitted
    }
}

impl GeofenceObserver for GeofenceHandler {
    fn on_entry(&self, event: &GeofenceEvent) {
        if !self.admit(event) {
            return;
        }
        self.registry.record_entry_at(&event.region, event.at);
    }

    fn on_dwell(&self, event: &GeofenceEvent) {
        if !self.admit(event) {
            return;
        }
        self.registry.record_dwell_at(&event.region.id, event.at);
    }

    fn on_exit(&self, event: &GeofenceEvent) {
        if !self.admit(event) {
            return;
        }
        self.registry.record_exit_at(&event.region.id, event.at);
    }

    fn on_error(&self, error: &GeofenceError) {
        log::warn!("Geofencing error: {}", error);
    }
}

// src/services/monitor.rs

//! Region monitoring.
//!
//! `RegionMonitor` is the seam to whatever detects entry, dwell and exit.
//! `LocalGeofencing` implements it in-process with point-in-polygon tests
//! against each location update; it backs location replay and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use geo::Area;

use crate::error::{AppError, Result};
use crate::models::{Coordinate, GeofenceError, GeofenceEvent, GeofenceEventKind, Region};
use crate::services::geofence::{GeofenceObserver, dispatch};

/// A service that watches regions and reports transitions to observers.
pub trait RegionMonitor: Send + Sync {
    /// Start monitoring a region. Replaces a region with the same id.
    fn add_region(&self, region: Region) -> Result<()>;

    /// Stop monitoring every region.
    fn clear(&self);

    /// Regions currently monitored, in registration order.
    fn regions(&self) -> Vec<Region>;

    fn add_observer(&self, observer: Arc<dyn GeofenceObserver>);

    /// Feed a location sample and return the events it produced.
    fn update_location(&self, at: Coordinate, time: DateTime<Utc>) -> Vec<GeofenceEvent>;
}

#[derive(Debug, Clone, Copy)]
struct Presence {
    entered_at: DateTime<Utc>,
    dwell_reported: bool,
}

#[derive(Default)]
struct MonitorState {
    regions: Vec<Region>,
    presence: HashMap<String, Presence>,
}

/// In-process region monitor.
pub struct LocalGeofencing {
    default_dwell: Duration,
    state: Mutex<MonitorState>,
    observers: RwLock<Vec<Arc<dyn GeofenceObserver>>>,
}

impl LocalGeofencing {
    /// Create a monitor; regions without their own dwell time use `default_dwell`.
    pub fn new(default_dwell: Duration) -> Self {
        Self {
            default_dwell,
            state: Mutex::new(MonitorState::default()),
            observers: RwLock::new(Vec::new()),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn observers(&self) -> Vec<Arc<dyn GeofenceObserver>> {
        self.observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn report_error(&self, error: GeofenceError) {
        for observer in self.observers() {
            observer.on_error(&error);
        }
    }

    /// Compute transitions for one location sample.
    fn transitions(&self, at: Coordinate, time: DateTime<Utc>) -> Vec<GeofenceEvent> {
        let mut state = self.lock_state();
        let MonitorState { regions, presence } = &mut *state;
        let mut events = Vec::new();

        for region in regions.iter() {
            let inside = region.contains(at);
            let dwell = region.dwell_time().unwrap_or(self.default_dwell);

            match (inside, presence.get_mut(&region.id)) {
                (true, None) => {
                    events.push(GeofenceEvent::new(GeofenceEventKind::Entry, region.clone(), time));
                    let mut entered = Presence {
                        entered_at: time,
                        dwell_reported: false,
                    };
                    if dwell.is_zero() {
                        entered.dwell_reported = true;
                        events.push(GeofenceEvent::new(GeofenceEventKind::Dwell, region.clone(), time));
                    }
                    presence.insert(region.id.clone(), entered);
                }
                (true, Some(present)) => {
                    let inside_for = (time - present.entered_at).to_std().unwrap_or_default();
                    if !present.dwell_reported && inside_for >= dwell {
                        present.dwell_reported = true;
                        events.push(GeofenceEvent::new(GeofenceEventKind::Dwell, region.clone(), time));
                    }
                }
                (false, Some(_)) => {
                    presence.remove(&region.id);
                    events.push(GeofenceEvent::new(GeofenceEventKind::Exit, region.clone(), time));
                }
                (false, None) => {}
            }
        }
        events
    }
}

impl RegionMonitor for LocalGeofencing {
    fn add_region(&self, region: Region) -> Result<()> {
        if region.polygon.exterior().0.len() < 4 || region.polygon.unsigned_area() <= 0.0 {
            let error = GeofenceError::new("region has a degenerate polygon", Some(region.id.clone()));
            self.report_error(error.clone());
            return Err(AppError::validation(error.to_string()));
        }

        let mut state = self.lock_state();
        match state.regions.iter_mut().find(|r| r.id == region.id) {
            Some(existing) => *existing = region,
            None => {
                log::debug!("Monitoring region {} ({})", region.name(), region.id);
                state.regions.push(region);
            }
        }
        Ok(())
    }

    fn clear(&self) {
        let mut state = self.lock_state();
        state.regions.clear();
        state.presence.clear();
    }

    fn regions(&self) -> Vec<Region> {
        self.lock_state().regions.clone()
    }

    fn add_observer(&self, observer: Arc<dyn GeofenceObserver>) {
        self.observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(observer);
    }

    fn update_location(&self, at: Coordinate, time: DateTime<Utc>) -> Vec<GeofenceEvent> {
        // Observers run after the state lock is released
        let events = self.transitions(at, time);
        if !events.is_empty() {
            let observers = self.observers();
            for event in &events {
                for observer in &observers {
                    dispatch(observer.as_ref(), event);
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use geo::polygon;
    use crate::models::property;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl GeofenceObserver for Recorder {
        fn on_entry(&self, event: &GeofenceEvent) {
            self.seen.lock().unwrap().push(format!("entry:{}", event.region.id));
        }
        fn on_dwell(&self, event: &GeofenceEvent) {
            self.seen.lock().unwrap().push(format!("dwell:{}", event.region.id));
        }
        fn on_exit(&self, event: &GeofenceEvent) {
            self.seen.lock().unwrap().push(format!("exit:{}", event.region.id));
        }
        fn on_error(&self, error: &GeofenceError) {
            self.seen.lock().unwrap().push(format!("error:{}", error.message));
        }
    }

    fn square(id: &str, x0: f64) -> Region {
        Region::new(
            id,
            geo::polygon![
                (x: x0, y: 0.0),
                (x: x0 + 1.0, y: 0.0),
                (x: x0 + 1.0, y: 1.0),
                (x: x0, y: 1.0)
            ],
        )
        .with_property(property::NAME, id)
    }

    #[test]
    fn entry_dwell_exit_sequence() {
        let monitor = LocalGeofencing::new(Duration::from_secs(60));
        let recorder = Arc::new(Recorder::default());
        monitor.add_observer(recorder.clone());
        monitor.add_region(square("a1", 0.0)).unwrap();

        let t0 = Utc::now();
        let inside = Coordinate::new(0.5, 0.5);
        let outside = Coordinate::new(5.0, 5.0);

        assert_eq!(monitor.update_location(outside, t0).len(), 0);
        assert_eq!(monitor.update_location(inside, t0).len(), 1);
        assert!(monitor.update_location(inside, t0 + TimeDelta::seconds(30)).is_empty());
        assert_eq!(monitor.update_location(inside, t0 + TimeDelta::seconds(61)).len(), 1);
        assert!(monitor.update_location(inside, t0 + TimeDelta::seconds(120)).is_empty());
        assert_eq!(monitor.update_location(outside, t0 + TimeDelta::seconds(130)).len(), 1);

        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec!["entry:a1", "dwell:a1", "exit:a1"]
        );
    }

    #[test]
    fn region_dwell_time_overrides_default() {
        let monitor = LocalGeofencing::new(Duration::from_secs(3600));
        let mut region = square("a1", 0.0);
        region.set_number(property::DWELL_TIME, 0);
        monitor.add_region(region).unwrap();

        let events = monitor.update_location(Coordinate::new(0.5, 0.5), Utc::now());
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![GeofenceEventKind::Entry, GeofenceEventKind::Dwell]);
    }

    #[test]
    fn moving_between_regions() {
        let monitor = LocalGeofencing::new(Duration::from_secs(60));
        monitor.add_region(square("a1", 0.0)).unwrap();
        monitor.add_region(square("b2", 2.0)).unwrap();

        let t0 = Utc::now();
        monitor.update_location(Coordinate::new(0.5, 0.5), t0);
        let events = monitor.update_location(Coordinate::new(2.5, 0.5), t0 + TimeDelta::seconds(5));
        let summary: Vec<_> = events
            .iter()
            .map(|e| format!("{}:{}", e.kind, e.region.id))
            .collect();
        assert_eq!(summary, vec!["exit:a1", "entry:b2"]);
    }

    #[test]
    fn degenerate_region_reports_error() {
        let monitor = LocalGeofencing::new(Duration::from_secs(60));
        let recorder = Arc::new(Recorder::default());
        monitor.add_observer(recorder.clone());

        let flat = Region::new(
            "flat",
            geo::polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0)],
        );
        assert!(monitor.add_region(flat).is_err());
        assert!(monitor.regions().is_empty());
        assert_eq!(recorder.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn re_adding_replaces_and_clear_forgets() {
        let monitor = LocalGeofencing::new(Duration::from_secs(60));
        monitor.add_region(square("a1", 0.0)).unwrap();
        monitor.add_region(square("a1", 3.0)).unwrap();
        assert_eq!(monitor.regions().len(), 1);
        assert!(monitor.regions()[0].contains(Coordinate::new(3.5, 0.5)));

        monitor.clear();
        assert!(monitor.regions().is_empty());
        assert!(monitor.update_location(Coordinate::new(3.5, 0.5), Utc::now()).is_empty());
    }
}

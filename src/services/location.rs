// src/services/location.rs

//! Location sources and route points.

use std::sync::Mutex;

use crate::models::Coordinate;

#[derive(Debug, Default)]
struct Points {
    replayed: Option<Coordinate>,
    device: Option<Coordinate>,
    selected: Option<Coordinate>,
    start: Option<Coordinate>,
    end: Option<Coordinate>,
}

/// Start and end points of a route being planned.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RoutePoints {
    pub start: Option<Coordinate>,
    pub end: Option<Coordinate>,
}

/// Tracks where the user is and which points they picked on the map.
pub struct LocationTracker {
    default_location: Coordinate,
    points: Mutex<Points>,
}

impl LocationTracker {
    pub fn new(default_location: Coordinate) -> Self {
        Self {
            default_location,
            points: Mutex::new(Points::default()),
        }
    }

    fn points(&self) -> std::sync::MutexGuard<'_, Points> {
        self.points.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn default_location(&self) -> Coordinate {
        self.default_location
    }

    /// Latest simulated location.
    pub fn set_replayed(&self, at: Coordinate) {
        self.points().replayed = Some(at);
    }

    /// Latest location reported by the device, if it has one.
    pub fn set_device(&self, at: Option<Coordinate>) {
        self.points().device = at;
    }

    /// Best known location: replayed, then device, then route start, then route end.
    pub fn last_location(&self) -> Option<Coordinate> {
        let points = self.points();
        points
            .replayed
            .or(points.device)
            .or(points.start)
            .or(points.end)
    }

    pub fn last_location_or_default(&self) -> Coordinate {
        self.last_location().unwrap_or(self.default_location)
    }

    /// Remember a point picked on the map.
    pub fn select_point(&self, at: Coordinate) {
        self.points().selected = Some(at);
    }

    pub fn selected_point(&self) -> Option<Coordinate> {
        self.points().selected
    }

    /// Drop the picked point without using it.
    pub fn clear_selection(&self) {
        self.points().selected = None;
    }

    /// Use the picked point, if any, as route start.
    pub fn set_start_point(&self) -> RoutePoints {
        let mut points = self.points();
        if let Some(selected) = points.selected.take() {
            points.start = Some(selected);
        }
        RoutePoints {
            start: points.start,
            end: points.end,
        }
    }

    /// Use the picked point, if any, as route end.
    pub fn set_end_point(&self) -> RoutePoints {
        let mut points = self.points();
        if let Some(selected) = points.selected.take() {
            points.end = Some(selected);
        }
        RoutePoints {
            start: points.start,
            end: points.end,
        }
    }

    pub fn route_points(&self) -> RoutePoints {
        let points = self.points();
        RoutePoints {
            start: points.start,
            end: points.end,
        }
    }

    /// Forget the picked, start and end points.
    pub fn clear_points(&self) {
        let mut points = self.points();
        points.selected = None;
        points.start = None;
        points.end = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> LocationTracker {
        LocationTracker::new(Coordinate::new(139.76, 35.68))
    }

    #[test]
    fn fallback_chain_order() {
        let tracker = tracker();
        assert_eq!(tracker.last_location(), None);
        assert_eq!(tracker.last_location_or_default(), Coordinate::new(139.76, 35.68));

        tracker.select_point(Coordinate::new(4.0, 4.0));
        tracker.set_end_point();
        assert_eq!(tracker.last_location(), Some(Coordinate::new(4.0, 4.0)));

        tracker.select_point(Coordinate::new(3.0, 3.0));
        tracker.set_start_point();
        assert_eq!(tracker.last_location(), Some(Coordinate::new(3.0, 3.0)));

        tracker.set_device(Some(Coordinate::new(2.0, 2.0)));
        assert_eq!(tracker.last_location(), Some(Coordinate::new(2.0, 2.0)));

        tracker.set_replayed(Coordinate::new(1.0, 1.0));
        assert_eq!(tracker.last_location(), Some(Coordinate::new(1.0, 1.0)));
    }

    #[test]
    fn start_without_selection_keeps_previous() {
        let tracker = tracker();
        tracker.select_point(Coordinate::new(1.0, 1.0));
        let points = tracker.set_start_point();
        assert_eq!(points.start, Some(Coordinate::new(1.0, 1.0)));
        assert_eq!(points.end, None);
        assert_eq!(tracker.selected_point(), None);

        let points = tracker.set_start_point();
        assert_eq!(points.start, Some(Coordinate::new(1.0, 1.0)));
    }

    #[test]
    fn clear_points_forgets_route() {
        let tracker = tracker();
        tracker.select_point(Coordinate::new(1.0, 1.0));
        tracker.set_start_point();
        tracker.select_point(Coordinate::new(2.0, 2.0));
        tracker.set_end_point();

        tracker.clear_points();
        assert_eq!(tracker.route_points(), RoutePoints::default());
        assert_eq!(tracker.last_location(), None);
    }
}

// src/services/navigation.rs

//! Route planning and simulated location replay.
//!
//! A replay walks the route geometry at a fixed speed, emitting one sample per
//! interval. Each sample becomes the tracker's replayed location, is fed to
//! the region monitor with a timestamp advanced by the interval, and moves the
//! camera. Samples carry synthetic time, so dwell detection does not depend on
//! wall-clock pacing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use geo::line_measures::{Bearing, LengthMeasurable};
use geo::{Haversine, InterpolatableLine, LineString};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::{Coordinate, GeofenceEvent, LocationConfig, Route};
use crate::services::{LocationTracker, MapApi, MapSurface, RegionMonitor, StateStore};

/// Routing profile used for navigation.
pub const NAVIGATION_PROFILE: &str = "walking";

/// Result of a replay run.
#[derive(Debug, Default)]
pub struct ReplayOutcome {
    /// Samples fed to the monitor
    pub samples: usize,
    /// Geofence events produced, in order
    pub events: Vec<GeofenceEvent>,
    /// Stopped before the last sample
    pub cancelled: bool,
}

/// Pacing of a replay run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayOptions {
    /// Metres per second along the route
    pub speed_mps: f64,
    /// Time between samples
    pub interval: Duration,
    /// Sleep `interval` between samples
    pub realtime: bool,
    /// Time of the first sample
    pub start_time: Option<DateTime<Utc>>,
}

impl ReplayOptions {
    pub fn from_config(config: &LocationConfig) -> Self {
        Self {
            speed_mps: config.replay_speed_mps,
            interval: Duration::from_secs(config.replay_interval_secs),
            realtime: false,
            start_time: None,
        }
    }

    fn stride_metres(&self) -> f64 {
        self.speed_mps * self.interval.as_secs_f64()
    }
}

/// Points along a line every `stride` metres, always ending on the last vertex.
pub fn sample_line(coordinates: &[Coordinate], stride: f64) -> Vec<Coordinate> {
    match coordinates {
        [] => return Vec::new(),
        [only] => return vec![*only],
        _ => {}
    }

    let line: LineString<f64> = coordinates
        .iter()
        .map(|c| (c.longitude, c.latitude))
        .collect();
    let length = line.length(&Haversine);
    let last = coordinates[coordinates.len() - 1];
    if stride <= 0.0 || length <= stride {
        return vec![coordinates[0], last];
    }

    let steps = (length / stride).ceil() as usize;
    let mut samples: Vec<Coordinate> = (0..steps)
        .filter_map(|i| {
            let fraction = (i as f64 * stride / length).min(1.0);
            line.point_at_ratio_from_start(&Haversine, fraction)
                .map(Coordinate::from)
        })
        .collect();
    samples.push(last);
    samples
}

/// Plans routes between picked points and replays them.
pub struct NavigationService {
    api: Arc<dyn MapApi>,
    store: Arc<StateStore>,
    tracker: Arc<LocationTracker>,
    monitor: Arc<dyn RegionMonitor>,
    map: Arc<dyn MapSurface>,
    route: Mutex<Option<Route>>,
    playback: Mutex<CancellationToken>,
}

impl NavigationService {
    pub fn new(
        api: Arc<dyn MapApi>,
        store: Arc<StateStore>,
        tracker: Arc<LocationTracker>,
        monitor: Arc<dyn RegionMonitor>,
        map: Arc<dyn MapSurface>,
    ) -> Self {
        Self {
            api,
            store,
            tracker,
            monitor,
            map,
            route: Mutex::new(None),
            playback: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn tracker(&self) -> &Arc<LocationTracker> {
        &self.tracker
    }

    pub fn route(&self) -> Option<Route> {
        self.route
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_route(&self, route: Option<Route>) {
        *self.route.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = route;
    }

    // --- Point selection ---

    /// Long click on the map: remember the point and open the location panel.
    pub fn select_point(&self, at: Coordinate) {
        self.tracker.select_point(at);
        self.map.add_annotation(at, "holder", "");
        self.store.set_show_location_panel(true);
    }

    /// Close the location panel without using the picked point.
    pub fn dismiss_selection(&self) {
        self.tracker.clear_selection();
        self.store.set_show_location_panel(false);
    }

    /// Use the picked point as start and fetch a route if both ends are set.
    pub async fn set_start_point(&self) -> Option<Route> {
        let points = self.tracker.set_start_point();
        if let Some(start) = points.start {
            self.map.add_annotation(start, "start", "");
        }
        self.store.set_show_location_panel(false);
        self.fetch_route(points.start, points.end).await
    }

    /// Use the picked point as end and fetch a route if both ends are set.
    pub async fn set_end_point(&self) -> Option<Route> {
        let points = self.tracker.set_end_point();
        if let Some(end) = points.end {
            self.map.add_annotation(end, "end", "");
        }
        self.store.set_show_location_panel(false);
        self.fetch_route(points.start, points.end).await
    }

    /// Point the camera at the best known location.
    pub fn snap_to_current(&self) {
        self.map
            .update_camera(self.tracker.last_location_or_default(), None);
    }

    // --- Routing ---

    /// Request a route; does nothing unless both points are present.
    ///
    /// Navigation readiness drops while the request is in flight and comes
    /// back only when a route arrives. Failures are logged.
    pub async fn fetch_route(
        &self,
        start: Option<Coordinate>,
        end: Option<Coordinate>,
    ) -> Option<Route> {
        let (Some(start), Some(end)) = (start, end) else {
            return None;
        };

        self.store.set_navigation_ready(false);
        let Some(route) = self.api.directions(NAVIGATION_PROFILE, start, end).await else {
            log::error!("Route request failed for {} -> {}", start, end);
            return None;
        };

        log::info!(
            "Route ready: {:.0} m, {:.0} s, {} points",
            route.distance,
            route.duration,
            route.coordinates.len()
        );
        self.map.add_route_line(&route);
        self.set_route(Some(route.clone()));
        self.store.set_navigation_ready(true);
        Some(route)
    }

    /// Use an already known route for replay.
    pub fn load_route(&self, route: Route) {
        self.map.add_route_line(&route);
        self.set_route(Some(route));
        self.store.set_navigation_ready(true);
    }

    // --- Replay ---

    /// Replay the current route.
    pub async fn replay(&self, options: ReplayOptions) -> Result<ReplayOutcome> {
        let route = self
            .route()
            .ok_or_else(|| AppError::replay("no route to replay"))?;
        self.replay_track(&route.coordinates, options).await
    }

    /// Replay an arbitrary track.
    pub async fn replay_track(
        &self,
        coordinates: &[Coordinate],
        options: ReplayOptions,
    ) -> Result<ReplayOutcome> {
        if options.speed_mps <= 0.0 || options.interval.is_zero() {
            return Err(AppError::replay("replay speed and interval must be positive"));
        }
        if coordinates.is_empty() {
            return Err(AppError::replay("track has no coordinates"));
        }

        let token = {
            let mut playback = self
                .playback
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            playback.cancel();
            *playback = CancellationToken::new();
            playback.clone()
        };

        let samples = sample_line(coordinates, options.stride_metres());
        let step = TimeDelta::from_std(options.interval)
            .map_err(|e| AppError::replay(e.to_string()))?;
        let mut time = options.start_time.unwrap_or_else(Utc::now);
        let mut outcome = ReplayOutcome::default();

        log::debug!("Replaying {} samples", samples.len());
        for (i, sample) in samples.iter().enumerate() {
            if token.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            self.tracker.set_replayed(*sample);
            outcome.events.extend(self.monitor.update_location(*sample, time));
            let bearing = samples
                .get(i + 1)
                .map(|next| Haversine.bearing(sample.to_point(), next.to_point()));
            self.map.update_camera(*sample, bearing);
            outcome.samples += 1;
            time += step;

            if options.realtime && i + 1 < samples.len() {
                tokio::select! {
                    _ = token.cancelled() => {
                        outcome.cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(options.interval) => {}
                }
            }
        }

        Ok(outcome)
    }

    /// Stop replay, drop the route and the picked points, close the panel.
    pub fn stop(&self) {
        self.playback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .cancel();
        self.set_route(None);
        self.store.set_navigation_ready(false);
        self.tracker.clear_points();
        self.store.set_show_location_panel(false);
    }
}

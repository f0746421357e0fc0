// src/pipeline/session.rs

//! Explicitly constructed service context.
//!
//! A `Session` owns one instance of every service and wires the geofence
//! handler into the region monitor. Nothing is process-global; two sessions
//! never share state.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::models::{Config, Coordinate};
use crate::services::{
    ArticleRegistry, GeofenceHandler, HttpMapApi, LocalGeofencing, LocationTracker, MapApi,
    NavigationService, OverlayCollector, RegionMonitor, ReplayOptions, SearchService, StateStore,
};
use crate::storage::{SessionSnapshot, SessionStorage};

pub struct Session {
    config: Config,
    store: Arc<StateStore>,
    handler: Arc<GeofenceHandler>,
    monitor: Arc<LocalGeofencing>,
    map: Arc<OverlayCollector>,
    tracker: Arc<LocationTracker>,
    search: SearchService,
    navigation: NavigationService,
}

impl Session {
    /// Build a session on top of the given remote API.
    pub fn new(config: Config, api: Arc<dyn MapApi>) -> Self {
        let store = Arc::new(StateStore::new());
        let handler = Arc::new(GeofenceHandler::new(ArticleRegistry::new(Arc::clone(&store))));

        let dwell = Duration::from_secs(u64::from(config.geofence.dwell_time_minutes) * 60);
        let monitor = Arc::new(LocalGeofencing::new(dwell));
        monitor.add_observer(handler.clone());

        let map = Arc::new(OverlayCollector::new());
        let tracker = Arc::new(LocationTracker::new(config.location.default_coordinate()));

        let search = SearchService::new(
            Arc::clone(&api),
            monitor.clone(),
            map.clone(),
            Arc::clone(&tracker),
            config.search.clone(),
            config.geofence.dwell_time_minutes,
        );
        let navigation = NavigationService::new(
            api,
            Arc::clone(&store),
            Arc::clone(&tracker),
            monitor.clone(),
            map.clone(),
        );

        Self {
            config,
            store,
            handler,
            monitor,
            map,
            tracker,
            search,
            navigation,
        }
    }

    /// Build a session talking to the configured HTTP endpoints.
    pub fn from_config(config: Config) -> Result<Self> {
        let api = Arc::new(HttpMapApi::new(&config.api)?);
        Ok(Self::new(config, api))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn registry(&self) -> &ArticleRegistry {
        self.handler.registry()
    }

    pub fn monitor(&self) -> &Arc<LocalGeofencing> {
        &self.monitor
    }

    pub fn region_count(&self) -> usize {
        self.monitor.regions().len()
    }

    pub fn map(&self) -> &Arc<OverlayCollector> {
        &self.map
    }

    pub fn tracker(&self) -> &Arc<LocationTracker> {
        &self.tracker
    }

    pub fn search(&self) -> &SearchService {
        &self.search
    }

    pub fn navigation(&self) -> &NavigationService {
        &self.navigation
    }

    /// Treat `at` as the device location and centre the camera on it.
    pub fn locate(&self, at: Coordinate) {
        self.tracker.set_device(Some(at));
        self.navigation.snap_to_current();
    }

    pub fn replay_options(&self) -> ReplayOptions {
        ReplayOptions::from_config(&self.config.location)
    }

    /// Write visits, regions and overlays.
    pub async fn save(&self, storage: &dyn SessionStorage) -> Result<()> {
        storage
            .write_snapshot(&SessionSnapshot::capture(&self.store))
            .await?;
        storage.write_regions(&self.monitor.regions()).await?;
        storage
            .write_overlays(&self.map.to_feature_collection())
            .await?;
        Ok(())
    }

    /// Cancel pending work and stop monitoring.
    pub fn shutdown(&self) {
        self.search.cancel();
        self.navigation.stop();
        self.monitor.clear();
        log::debug!("Session shut down with {} visits", self.registry().len());
    }
}

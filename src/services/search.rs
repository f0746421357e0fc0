// src/services/search.rs

//! Place search adapter.
//!
//! Turns a free-text or category search into map overlays and monitored
//! regions. Each place not shown before gets an isochrone lookup; its
//! contours become regions tagged with the place's name, address, id and a
//! random fill colour.
//!
//! A place id is claimed in the shown set before its lookup starts and
//! released again if the lookup fails or the search is cancelled, so two
//! overlapping searches never show the same place twice. Starting a search
//! cancels the one in flight.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures::stream::{self, StreamExt};
use geojson::{FeatureCollection, JsonObject, JsonValue};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::{
    Coordinate, PlaceResult, Region, Rgb, SearchConfig, polygon_from_geometry, property,
};
use crate::services::{LocationTracker, MapApi, MapSurface, RegionMonitor};

/// Counters for one search run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Places returned by the remote search
    pub found: usize,
    /// Places drawn with an isochrone
    pub shown: usize,
    /// Places already shown or filtered out
    pub skipped: usize,
    /// Places whose isochrone lookup failed
    pub failed: usize,
    /// Regions handed to the monitor
    pub regions: usize,
    /// A newer search took over before this one finished
    pub cancelled: bool,
}

/// Build monitorable regions from an isochrone response.
///
/// Every Polygon or LineString contour becomes a region with a fresh UUID.
/// The contour's own properties are kept as text, `extra` is layered on top,
/// and the dwell time is set in minutes.
pub fn regions_from_isochrone(
    isochrone: &FeatureCollection,
    extra: &JsonObject,
    dwell_minutes: u32,
) -> Vec<Region> {
    isochrone
        .features
        .iter()
        .filter_map(|feature| {
            let geometry = feature.geometry.as_ref()?;
            let Some(polygon) = polygon_from_geometry(&geometry.value) else {
                log::debug!("Skipping isochrone feature without a usable contour");
                return None;
            };

            let mut region = Region::new(Uuid::new_v4().to_string(), polygon);
            for (key, value) in feature.properties.iter().flatten() {
                let text = match value {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                };
                region.set_string(key, text);
            }
            region.properties.extend(extra.clone());
            region.set_number(property::DWELL_TIME, dwell_minutes);
            Some(region)
        })
        .collect()
}

/// Runs place searches against the remote API.
pub struct SearchService {
    api: Arc<dyn MapApi>,
    monitor: Arc<dyn RegionMonitor>,
    map: Arc<dyn MapSurface>,
    tracker: Arc<LocationTracker>,
    config: SearchConfig,
    dwell_minutes: u32,
    shown: Mutex<HashSet<String>>,
    current: Mutex<CancellationToken>,
}

impl SearchService {
    pub fn new(
        api: Arc<dyn MapApi>,
        monitor: Arc<dyn RegionMonitor>,
        map: Arc<dyn MapSurface>,
        tracker: Arc<LocationTracker>,
        config: SearchConfig,
        dwell_minutes: u32,
    ) -> Self {
        Self {
            api,
            monitor,
            map,
            tracker,
            config,
            dwell_minutes,
            shown: Mutex::new(HashSet::new()),
            current: Mutex::new(CancellationToken::new()),
        }
    }

    fn shown_set(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.shown.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim a place id; `false` when it is already shown or claimed.
    fn claim(&self, id: &str) -> bool {
        self.shown_set().insert(id.to_string())
    }

    fn release(&self, id: &str) {
        self.shown_set().remove(id);
    }

    pub fn is_shown(&self, id: &str) -> bool {
        self.shown_set().contains(id)
    }

    pub fn shown_count(&self) -> usize {
        self.shown_set().len()
    }

    /// Cancel the search in flight, if any.
    pub fn cancel(&self) {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .cancel();
    }

    /// Cancel the running search and hand out a token for a new one.
    fn begin(&self) -> CancellationToken {
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        current.cancel();
        *current = CancellationToken::new();
        current.clone()
    }

    fn proximity(&self) -> Option<Coordinate> {
        let proximity = self.tracker.last_location();
        if proximity.is_none() {
            log::warn!("No known location to search around");
        }
        proximity
    }

    /// Free-text search near the last known location.
    ///
    /// Places without an id are always shown; the rest only once.
    pub async fn forward_search(&self, query: &str, icon: &str) -> SearchOutcome {
        let token = self.begin();
        let mut outcome = SearchOutcome::default();
        let Some(proximity) = self.proximity() else {
            return outcome;
        };

        let country = self.api.reverse_country(proximity).await.unwrap_or_default();
        let Some(places) = self
            .api
            .forward_search(query, proximity, &country, self.config.result_limit)
            .await
        else {
            return outcome;
        };
        outcome.found = places.len();
        if token.is_cancelled() {
            outcome.cancelled = true;
            return outcome;
        }

        let fresh: Vec<PlaceResult> = places
            .into_iter()
            .filter(|place| match &place.mapbox_id {
                Some(id) => self.claim(id),
                None => true,
            })
            .collect();
        outcome.skipped = outcome.found - fresh.len();
        if fresh.is_empty() {
            return outcome;
        }

        let layer = FeatureCollection {
            bbox: None,
            features: fresh.iter().map(PlaceResult::to_feature).collect(),
            foreign_members: None,
        };
        self.map
            .add_symbol_layer(&Uuid::new_v4().to_string(), &layer, icon);

        self.show_isochrones(fresh, &token, &mut outcome).await;
        log::info!(
            "Search '{}': {} found, {} shown, {} skipped, {} failed",
            query,
            outcome.found,
            outcome.shown,
            outcome.skipped,
            outcome.failed
        );
        outcome
    }

    /// Category search near the last known location.
    ///
    /// Only places whose name starts with `name` but is not exactly `name` are
    /// shown, each as a labelled marker with its isochrone.
    pub async fn discover(&self, category: &str, name: &str, icon: &str) -> SearchOutcome {
        let token = self.begin();
        let mut outcome = SearchOutcome::default();
        let Some(proximity) = self.proximity() else {
            return outcome;
        };

        let Some(places) = self
            .api
            .category_search(category, proximity, self.config.discover_limit)
            .await
        else {
            log::error!("Category search '{}' failed", category);
            return outcome;
        };
        outcome.found = places.len();
        if token.is_cancelled() {
            outcome.cancelled = true;
            return outcome;
        }

        let mut fresh = Vec::new();
        for place in places {
            let Some(id) = place.mapbox_id.as_deref() else {
                outcome.skipped += 1;
                continue;
            };
            if !place.name.starts_with(name) || place.name == name || !self.claim(id) {
                outcome.skipped += 1;
                continue;
            }
            self.map.add_annotation(place.coordinate, icon, &place.name);
            fresh.push(place);
        }

        self.show_isochrones(fresh, &token, &mut outcome).await;
        log::info!(
            "Discover '{}' ({}): {} found, {} shown, {} skipped, {} failed",
            category,
            name,
            outcome.found,
            outcome.shown,
            outcome.skipped,
            outcome.failed
        );
        outcome
    }

    /// Look up isochrones concurrently and apply each result as it arrives.
    async fn show_isochrones(
        &self,
        places: Vec<PlaceResult>,
        token: &CancellationToken,
        outcome: &mut SearchOutcome,
    ) {
        let mut pending: HashSet<String> =
            places.iter().filter_map(|p| p.mapbox_id.clone()).collect();

        let api = self.api.as_ref();
        let profile = self.config.isochrone_profile.as_str();
        let contours = self.config.contour_minutes.as_slice();
        let mut lookups = stream::iter(places)
            .map(|place| async move {
                let isochrone = api.isochrone(profile, place.coordinate, contours).await;
                (place, isochrone)
            })
            .buffer_unordered(self.config.max_concurrent.max(1));

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    outcome.cancelled = true;
                    break;
                }
                next = lookups.next() => {
                    let Some((place, isochrone)) = next else { break };
                    if let Some(id) = &place.mapbox_id {
                        pending.remove(id);
                    }
                    match isochrone {
                        Some(isochrone) => {
                            outcome.shown += 1;
                            outcome.regions += self.apply_isochrone(&place, &isochrone);
                        }
                        None => {
                            outcome.failed += 1;
                            if let Some(id) = &place.mapbox_id {
                                self.release(id);
                            }
                        }
                    }
                }
            }
        }

        for id in pending {
            self.release(&id);
        }
    }

    /// Draw the first contour and register every contour as a region.
    fn apply_isochrone(&self, place: &PlaceResult, isochrone: &FeatureCollection) -> usize {
        let fill = Rgb::random();
        let outline = isochrone
            .features
            .first()
            .and_then(|f| f.geometry.as_ref())
            .and_then(|g| polygon_from_geometry(&g.value));
        if let Some(polygon) = outline {
            self.map.add_polygon(&polygon, fill, self.config.fill_opacity);
        }

        let mut extra = JsonObject::new();
        extra.insert(property::NAME.into(), JsonValue::from(place.name.as_str()));
        if let Some(address) = &place.address {
            extra.insert(property::ADDRESS.into(), JsonValue::from(address.as_str()));
        }
        if let Some(id) = &place.mapbox_id {
            extra.insert(property::MAPBOX_ID.into(), JsonValue::from(id.as_str()));
        }
        extra.insert(property::GEOFENCE_COLOR.into(), JsonValue::from(fill.to_hex()));

        let mut added = 0;
        for region in regions_from_isochrone(isochrone, &extra, self.dwell_minutes) {
            let id = region.id.clone();
            match self.monitor.add_region(region) {
                Ok(()) => added += 1,
                Err(e) => log::warn!("Region {} for {} not monitored: {}", id, place.name, e),
            }
        }
        added
    }
}

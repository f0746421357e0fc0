//! Search, route and replay through a whole session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use geofencing::models::{Config, Coordinate, PlaceResult, Route};
use geofencing::pipeline::{Session, run_replay, run_route, run_search};
use geofencing::services::{MapApi, ReplayOptions};
use geofencing::storage::{LocalStorage, SessionStorage};
use geojson::FeatureCollection;
use serde_json::json;
use tempfile::TempDir;

const CAFE: Coordinate = Coordinate {
    longitude: 139.700,
    latitude: 35.600,
};
const BAR: Coordinate = Coordinate {
    longitude: 139.750,
    latitude: 35.650,
};

/// Square isochrones around every lookup point and a straight route.
struct FakeApi;

#[async_trait]
impl MapApi for FakeApi {
    async fn isochrone(&self, _: &str, at: Coordinate, _: &[u32]) -> Option<FeatureCollection> {
        let (x, y, d) = (at.longitude, at.latitude, 0.001);
        serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"contour": 3},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[x - d, y - d], [x + d, y - d], [x + d, y + d], [x - d, y + d], [x - d, y - d]]]
                }
            }]
        }))
        .ok()
    }

    async fn forward_search(
        &self,
        _: &str,
        _: Coordinate,
        _: &str,
        _: usize,
    ) -> Option<Vec<PlaceResult>> {
        Some(vec![
            PlaceResult {
                mapbox_id: Some("cafe".into()),
                name: "Cafe".into(),
                address: Some("1 Main St".into()),
                coordinate: CAFE,
            },
            PlaceResult {
                mapbox_id: Some("bar".into()),
                name: "Bar".into(),
                address: None,
                coordinate: BAR,
            },
        ])
    }

    async fn reverse_country(&self, _: Coordinate) -> Option<String> {
        Some("jp".into())
    }

    async fn category_search(&self, _: &str, _: Coordinate, _: usize) -> Option<Vec<PlaceResult>> {
        None
    }

    async fn directions(&self, _: &str, from: Coordinate, to: Coordinate) -> Option<Route> {
        Some(Route {
            coordinates: vec![from, to],
            distance: 1800.0,
            duration: 1300.0,
        })
    }
}

fn options() -> ReplayOptions {
    ReplayOptions {
        speed_mps: 1.0,
        interval: Duration::from_secs(1),
        realtime: false,
        start_time: Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()),
    }
}

#[tokio::test]
async fn route_through_searched_place_records_visit() {
    let dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(dir.path());
    let session = Session::new(Config::default(), Arc::new(FakeApi));

    let found = run_search(&session, &storage, "coffee", "cafe", CAFE)
        .await
        .unwrap();
    assert_eq!(found.shown, 2);
    assert_eq!(session.region_count(), 2);

    let outcome = run_route(
        &session,
        &storage,
        Coordinate::new(139.690, 35.600),
        Coordinate::new(139.710, 35.600),
        Vec::new(),
        options(),
    )
    .await
    .unwrap();
    assert!(!outcome.cancelled);
    assert!(outcome.samples > 1000);

    assert_eq!(session.registry().len(), 1);
    let visit = session.store().articles()[0].clone();
    assert_eq!(visit.title, "Cafe");
    assert_eq!(visit.address, "1 Main St");
    assert!(visit.has_dwelled());
    assert!(visit.has_exited());

    let key = format!("{}-0", visit.id);
    assert!(session.store().dwelled_times().contains_key(&key));
    assert!(session.store().exited_times().contains_key(&key));

    let snapshot = storage.load_snapshot().await.unwrap().unwrap();
    assert_eq!(snapshot.count, 1);
    assert_eq!(snapshot.visits[0].id, visit.id);
    assert_eq!(storage.load_regions().await.unwrap().len(), 2);
    assert!(storage.path("overlays.geojson").exists());

    session.shutdown();
    assert!(!session.store().navigation_ready());
}

#[tokio::test]
async fn replay_from_saved_regions() {
    let dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(dir.path());

    let first = Session::new(Config::default(), Arc::new(FakeApi));
    run_search(&first, &storage, "coffee", "cafe", CAFE)
        .await
        .unwrap();
    let regions = storage.load_regions().await.unwrap();
    assert_eq!(regions.len(), 2);

    // Walk through the bar twice; the second pass is a new occurrence.
    let track = vec![
        Coordinate::new(139.740, 35.650),
        Coordinate::new(139.760, 35.650),
        Coordinate::new(139.740, 35.650),
    ];
    let second = Session::new(Config::default(), Arc::new(FakeApi));
    let outcome = run_replay(&second, &storage, regions, &track, options())
        .await
        .unwrap();
    assert!(!outcome.events.is_empty());

    let visits = second.store().articles();
    assert_eq!(visits.len(), 2);
    assert!(visits.iter().all(|v| v.title == "Bar"));
    assert_eq!(visits[0].id, visits[1].id);

    let id = &visits[0].id;
    assert!(second.store().exited_times().contains_key(&format!("{}-0", id)));
    assert!(second.store().exited_times().contains_key(&format!("{}-1", id)));
    assert!(first.store().articles().is_empty());
}

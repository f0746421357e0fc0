//! HttpMapApi against a local HTTP server.

use std::sync::{Arc, Mutex};

use geofencing::models::{ApiConfig, Coordinate};
use geofencing::services::{HttpMapApi, MapApi};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve canned responses keyed by path prefix; record request targets.
async fn serve() -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf[read..]).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => read += n,
                    }
                }
                let request = String::from_utf8_lossy(&buf[..read]).to_string();
                let target = request
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .unwrap_or("/")
                    .to_string();
                log.lock().unwrap().push(target.clone());

                let (status, body) = respond(&target);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}", addr), seen)
}

fn respond(target: &str) -> (&'static str, String) {
    if target.starts_with("/isochrone/v1/mapbox/walking/") {
        let body = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"contour": 3},
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]
                }
            }]
        });
        ("200 OK", body.to_string())
    } else if target.starts_with("/search/geocode/v6/reverse") {
        let body = json!({
            "features": [{"properties": {"context": {"country": {"country_code": "JP"}}}}]
        });
        ("200 OK", body.to_string())
    } else if target.starts_with("/search/searchbox/v1/forward") {
        let body = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [139.7, 35.6]},
                "properties": {"mapbox_id": "m1", "name": "Cafe", "address": "1 Main St"}
            }]
        });
        ("200 OK", body.to_string())
    } else if target.starts_with("/directions/v5/mapbox/walking/") {
        let body = json!({
            "routes": [{
                "geometry": {"coordinates": [[139.7, 35.6], [139.71, 35.61]]},
                "distance": 1400.0,
                "duration": 1000.0
            }]
        });
        ("200 OK", body.to_string())
    } else {
        ("404 Not Found", json!({"message": "Not Found"}).to_string())
    }
}

fn api(base_url: String) -> HttpMapApi {
    let config = ApiConfig {
        base_url,
        access_token: "pk.test".into(),
        timeout_secs: 5,
        ..ApiConfig::default()
    };
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    HttpMapApi::with_client(client, &config).unwrap()
}

#[tokio::test]
async fn isochrone_is_parsed() {
    let (base, seen) = serve().await;
    let api = api(base);

    let isochrone = api
        .isochrone("walking", Coordinate::new(139.7, 35.6), &[3, 5])
        .await
        .unwrap();
    assert_eq!(isochrone.features.len(), 1);

    let target = seen.lock().unwrap()[0].clone();
    assert!(target.starts_with("/isochrone/v1/mapbox/walking/139.7,35.6?"));
    assert!(target.contains("contours_minutes=3%2C5"));
    assert!(target.ends_with("access_token=pk.test"));
}

#[tokio::test]
async fn forward_search_uses_country_and_limit() {
    let (base, seen) = serve().await;
    let api = api(base);

    let country = api.reverse_country(Coordinate::new(139.7, 35.6)).await;
    assert_eq!(country.as_deref(), Some("jp"));

    let places = api
        .forward_search("7-Eleven", Coordinate::new(139.7, 35.6), "jp", 10)
        .await
        .unwrap();
    assert_eq!(places.len(), 1);
    assert_eq!(places[0].mapbox_id.as_deref(), Some("m1"));

    let target = seen.lock().unwrap()[1].clone();
    assert!(target.contains("q=7-Eleven"));
    assert!(target.contains("country=jp"));
    assert!(target.contains("limit=10"));
}

#[tokio::test]
async fn directions_return_route() {
    let (base, _) = serve().await;
    let route = api(base)
        .directions("walking", Coordinate::new(139.7, 35.6), Coordinate::new(139.71, 35.61))
        .await
        .unwrap();
    assert_eq!(route.coordinates.len(), 2);
    assert_eq!(route.distance, 1400.0);
}

#[tokio::test]
async fn non_success_status_is_no_result() {
    let (base, _) = serve().await;
    let places = api(base)
        .category_search("coffee", Coordinate::new(139.7, 35.6), 100)
        .await;
    assert!(places.is_none());
}

#[tokio::test]
async fn unreachable_server_is_no_result() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = api(format!("http://{}", addr));
    assert!(api.reverse_country(Coordinate::new(0.0, 0.0)).await.is_none());
}

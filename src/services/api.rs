// src/services/api.rs

//! Remote map endpoints.
//!
//! Isochrone, forward search, category search, reverse geocoding and
//! directions. Every call degrades to `None` on transport failure, non-2xx
//! status or an unreadable body; callers skip the dependent work for that
//! item only.

use async_trait::async_trait;
use geojson::FeatureCollection;
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ApiConfig, Coordinate, PlaceResult, Route};
use crate::utils::http::{create_async_client, fetch_json};

/// Remote lookups used by search and navigation.
#[async_trait]
pub trait MapApi: Send + Sync {
    /// Reachable-area contours around `at`.
    async fn isochrone(
        &self,
        profile: &str,
        at: Coordinate,
        contours_minutes: &[u32],
    ) -> Option<FeatureCollection>;

    /// Free-text place search near `proximity`, restricted to `country` when non-empty.
    async fn forward_search(
        &self,
        query: &str,
        proximity: Coordinate,
        country: &str,
        limit: usize,
    ) -> Option<Vec<PlaceResult>>;

    /// Lower-case ISO country code at `at`.
    async fn reverse_country(&self, at: Coordinate) -> Option<String>;

    /// Places of a category near `proximity`.
    async fn category_search(
        &self,
        category: &str,
        proximity: Coordinate,
        limit: usize,
    ) -> Option<Vec<PlaceResult>>;

    /// Route geometry between two points.
    async fn directions(&self, profile: &str, from: Coordinate, to: Coordinate) -> Option<Route>;
}

/// `MapApi` over HTTP.
pub struct HttpMapApi {
    client: reqwest::Client,
    base_url: Url,
    access_token: String,
    language: String,
}

impl HttpMapApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = create_async_client(config)?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: reqwest::Client, config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::config(format!(
                "api.base_url cannot be a base: {}",
                config.base_url
            )));
        }
        if config.access_token.is_empty() {
            log::warn!("No access token configured; remote calls will likely be rejected");
        }
        Ok(Self {
            client,
            base_url,
            access_token: config.access_token.clone(),
            language: config.language.clone(),
        })
    }

    /// Build an endpoint URL from path segments and query pairs.
    ///
    /// The access token is appended last.
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("access_token", &self.access_token);
        }
        url
    }

    async fn get(&self, name: &str, url: Url) -> Option<Value> {
        match fetch_json(&self.client, url).await {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                log::warn!("{} request returned no result", name);
                None
            }
            Err(e) => {
                log::warn!("{} request failed: {}", name, e);
                None
            }
        }
    }
}

#[async_trait]
impl MapApi for HttpMapApi {
    async fn isochrone(
        &self,
        profile: &str,
        at: Coordinate,
        contours_minutes: &[u32],
    ) -> Option<FeatureCollection> {
        let contours = contours_minutes
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let url = self.endpoint(
            &["isochrone", "v1", "mapbox", profile, at.to_string().as_str()],
            &[("contours_minutes", contours.as_str())],
        );
        let value = self.get("isochrone", url).await?;
        match FeatureCollection::try_from(value) {
            Ok(collection) => Some(collection),
            Err(e) => {
                log::warn!("isochrone response is not a feature collection: {}", e);
                None
            }
        }
    }

    async fn forward_search(
        &self,
        query: &str,
        proximity: Coordinate,
        country: &str,
        limit: usize,
    ) -> Option<Vec<PlaceResult>> {
        let proximity = proximity.to_string();
        let limit = limit.to_string();
        let mut params = vec![("q", query), ("proximity", proximity.as_str())];
        if !country.is_empty() {
            params.push(("country", country));
        }
        params.push(("language", self.language.as_str()));
        params.push(("limit", limit.as_str()));

        let url = self.endpoint(&["search", "searchbox", "v1", "forward"], &params);
        let value = self.get("forward search", url).await?;
        Some(parse_places(&value))
    }

    async fn reverse_country(&self, at: Coordinate) -> Option<String> {
        let longitude = at.longitude.to_string();
        let latitude = at.latitude.to_string();
        let url = self.endpoint(
            &["search", "geocode", "v6", "reverse"],
            &[("longitude", longitude.as_str()), ("latitude", latitude.as_str())],
        );
        let value = self.get("reverse geocode", url).await?;
        parse_country(&value)
    }

    async fn category_search(
        &self,
        category: &str,
        proximity: Coordinate,
        limit: usize,
    ) -> Option<Vec<PlaceResult>> {
        let proximity = proximity.to_string();
        let limit = limit.to_string();
        let url = self.endpoint(
            &["search", "searchbox", "v1", "category", category],
            &[
                ("proximity", proximity.as_str()),
                ("limit", limit.as_str()),
                ("language", self.language.as_str()),
            ],
        );
        let value = self.get("category search", url).await?;
        Some(parse_places(&value))
    }

    async fn directions(&self, profile: &str, from: Coordinate, to: Coordinate) -> Option<Route> {
        let waypoints = format!("{};{}", from, to);
        let url = self.endpoint(
            &["directions", "v5", "mapbox", profile, waypoints.as_str()],
            &[
                ("geometries", "geojson"),
                ("overview", "full"),
                ("alternatives", "false"),
            ],
        );
        let value = self.get("directions", url).await?;
        let route = parse_route(&value);
        if route.is_none() {
            log::warn!("directions response has no usable route");
        }
        route
    }
}

/// Read place results from a search feature collection.
///
/// Features without a name or a usable coordinate are skipped. The address is
/// `address`, falling back to `full_address`.
pub fn parse_places(value: &Value) -> Vec<PlaceResult> {
    let Some(features) = value.get("features").and_then(Value::as_array) else {
        return Vec::new();
    };

    features
        .iter()
        .filter_map(|feature| {
            let props = feature.get("properties")?;
            let name = props.get("name")?.as_str()?.to_string();
            let coordinate = feature
                .pointer("/geometry/coordinates")
                .and_then(position)
                .or_else(|| {
                    let c = props.get("coordinates")?;
                    Some(Coordinate::new(
                        c.get("longitude")?.as_f64()?,
                        c.get("latitude")?.as_f64()?,
                    ))
                })?;
            let text = |key: &str| {
                props
                    .get(key)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            };

            Some(PlaceResult {
                mapbox_id: text("mapbox_id"),
                name,
                address: text("address").or_else(|| text("full_address")),
                coordinate,
            })
        })
        .collect()
}

/// Country code of the first reverse-geocoded feature, lower-cased.
pub fn parse_country(value: &Value) -> Option<String> {
    value
        .pointer("/features/0/properties/context/country/country_code")
        .and_then(Value::as_str)
        .map(str::to_lowercase)
}

/// First route of a directions response.
pub fn parse_route(value: &Value) -> Option<Route> {
    let route = value.pointer("/routes/0")?;
    let coordinates = route
        .pointer("/geometry/coordinates")?
        .as_array()?
        .iter()
        .map(position)
        .collect::<Option<Vec<_>>>()?;
    if coordinates.len() < 2 {
        return None;
    }

    Some(Route {
        coordinates,
        distance: route.get("distance").and_then(Value::as_f64).unwrap_or(0.0),
        duration: route.get("duration").and_then(Value::as_f64).unwrap_or(0.0),
    })
}

fn position(value: &Value) -> Option<Coordinate> {
    let array = value.as_array()?;
    Coordinate::from_position(&array.iter().map(Value::as_f64).collect::<Option<Vec<_>>>()?)
}

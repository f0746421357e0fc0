// src/models/place.rs

//! Search results and routes returned by remote endpoints.

use geojson::{Feature, JsonObject, JsonValue};
use serde::{Deserialize, Serialize};

use crate::models::Coordinate;

/// A place returned by forward search or category discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceResult {
    /// Provider identifier, used to avoid showing a place twice
    pub mapbox_id: Option<String>,
    pub name: String,
    pub address: Option<String>,
    pub coordinate: Coordinate,
}

impl PlaceResult {
    /// Point feature with `mapbox_id`, `name` and `address` properties.
    pub fn to_feature(&self) -> Feature {
        let mut properties = JsonObject::new();
        if let Some(id) = &self.mapbox_id {
            properties.insert("mapbox_id".into(), JsonValue::from(id.as_str()));
        }
        properties.insert("name".into(), JsonValue::from(self.name.as_str()));
        if let Some(address) = &self.address {
            properties.insert("address".into(), JsonValue::from(address.as_str()));
        }
        Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::from(&geo::Geometry::Point(
                self.coordinate.to_point(),
            ))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// A walking route between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub coordinates: Vec<Coordinate>,
    /// Metres
    pub distance: f64,
    /// Seconds
    pub duration: f64,
}

impl Route {
    pub fn start(&self) -> Option<Coordinate> {
        self.coordinates.first().copied()
    }

    pub fn end(&self) -> Option<Coordinate> {
        self.coordinates.last().copied()
    }
}

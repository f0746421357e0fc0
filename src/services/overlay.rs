// src/services/overlay.rs

//! Map overlay surface.
//!
//! `MapSurface` is what search and navigation draw on. `OverlayCollector`
//! records every overlay as a GeoJSON feature so a CLI run can write them out.

use std::sync::Mutex;

use geo::{LineString, Polygon};
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};

use crate::models::{Coordinate, Rgb, Route};

/// Drawing and camera operations on a map.
pub trait MapSurface: Send + Sync {
    /// Add a layer of point features rendered with `icon`.
    fn add_symbol_layer(&self, layer_id: &str, places: &FeatureCollection, icon: &str);

    /// Add a single labelled marker.
    fn add_annotation(&self, at: Coordinate, icon: &str, label: &str);

    /// Add a filled polygon.
    fn add_polygon(&self, polygon: &Polygon<f64>, fill: Rgb, opacity: f64);

    fn add_route_line(&self, route: &Route);

    fn update_camera(&self, center: Coordinate, bearing: Option<f64>);
}

/// Overlay kinds as written to the `overlay` property.
pub mod kind {
    pub const SYMBOL: &str = "symbol";
    pub const ANNOTATION: &str = "annotation";
    pub const POLYGON: &str = "polygon";
    pub const ROUTE: &str = "route";
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub center: Coordinate,
    pub bearing: Option<f64>,
}

/// `MapSurface` that keeps overlays in memory.
#[derive(Default)]
pub struct OverlayCollector {
    features: Mutex<Vec<Feature>>,
    camera: Mutex<Option<CameraState>>,
}

impl OverlayCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, geometry: geo::Geometry<f64>, properties: JsonObject) {
        let feature = Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::from(&geometry)),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        };
        self.features
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(feature);
    }

    pub fn features(&self) -> Vec<Feature> {
        self.features
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Overlays with the given `overlay` kind.
    pub fn of_kind(&self, overlay: &str) -> Vec<Feature> {
        self.features()
            .into_iter()
            .filter(|f| {
                f.property("overlay").and_then(JsonValue::as_str) == Some(overlay)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.features
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn camera(&self) -> Option<CameraState> {
        *self.camera.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.features(),
            foreign_members: None,
        }
    }
}

fn props(overlay: &str) -> JsonObject {
    let mut properties = JsonObject::new();
    properties.insert("overlay".into(), JsonValue::from(overlay));
    properties
}

impl MapSurface for OverlayCollector {
    fn add_symbol_layer(&self, layer_id: &str, places: &FeatureCollection, icon: &str) {
        for place in &places.features {
            let Some(geometry) = place
                .geometry
                .as_ref()
                .and_then(|g| geo::Geometry::<f64>::try_from(g.clone()).ok())
            else {
                continue;
            };
            let mut properties = place.properties.clone().unwrap_or_default();
            properties.extend(props(kind::SYMBOL));
            properties.insert("layer".into(), JsonValue::from(layer_id));
            properties.insert("icon".into(), JsonValue::from(icon));
            self.push(geometry, properties);
        }
    }

    fn add_annotation(&self, at: Coordinate, icon: &str, label: &str) {
        let mut properties = props(kind::ANNOTATION);
        properties.insert("icon".into(), JsonValue::from(icon));
        properties.insert("label".into(), JsonValue::from(label));
        self.push(geo::Geometry::Point(at.to_point()), properties);
    }

    fn add_polygon(&self, polygon: &Polygon<f64>, fill: Rgb, opacity: f64) {
        let mut properties = props(kind::POLYGON);
        properties.insert("fill".into(), JsonValue::from(fill.to_hex()));
        properties.insert("fill-opacity".into(), JsonValue::from(opacity));
        self.push(geo::Geometry::Polygon(polygon.clone()), properties);
    }

    fn add_route_line(&self, route: &Route) {
        let line: LineString<f64> = route
            .coordinates
            .iter()
            .map(|c| (c.longitude, c.latitude))
            .collect();
        let mut properties = props(kind::ROUTE);
        properties.insert("distance".into(), JsonValue::from(route.distance));
        properties.insert("duration".into(), JsonValue::from(route.duration));
        self.push(geo::Geometry::LineString(line), properties);
    }

    fn update_camera(&self, center: Coordinate, bearing: Option<f64>) {
        *self.camera.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) =
            Some(CameraState { center, bearing });
    }
}

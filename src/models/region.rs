// src/models/region.rs

//! Monitorable regions and their property bag.

use std::time::Duration;

use geo::{Coord, LineString, Polygon};
use geojson::{Feature, JsonObject, JsonValue, feature::Id};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Coordinate, Rgb};

/// Property keys carried by regions.
pub mod property {
    pub const NAME: &str = "name";
    pub const ADDRESS: &str = "address";
    pub const MAPBOX_ID: &str = "mapboxId";
    pub const GEOFENCE_COLOR: &str = "geofenceColor";
    /// Dwell time in minutes, numeric.
    pub const DWELL_TIME: &str = "MBX_GEOFENCE_DWELL_TIME";
}

/// A geographic area registered for entry/dwell/exit monitoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub polygon: Polygon<f64>,
    #[serde(default)]
    pub properties: JsonObject,
}

impl Region {
    pub fn new(id: impl Into<String>, polygon: Polygon<f64>) -> Self {
        Self {
            id: id.into(),
            polygon,
            properties: JsonObject::new(),
        }
    }

    /// Builder-style string property.
    pub fn with_property(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_string(key, value);
        self
    }

    pub fn set_string(&mut self, key: &str, value: impl Into<String>) {
        self.properties
            .insert(key.to_string(), JsonValue::String(value.into()));
    }

    pub fn set_number(&mut self, key: &str, value: u32) {
        self.properties.insert(key.to_string(), JsonValue::from(value));
    }

    /// A property rendered as plain text; strings are not quoted.
    pub fn string_property(&self, key: &str) -> Option<String> {
        self.properties.get(key).and_then(|value| match value {
            JsonValue::Null => None,
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
    }

    pub fn name(&self) -> String {
        self.string_property(property::NAME).unwrap_or_default()
    }

    pub fn address(&self) -> String {
        self.string_property(property::ADDRESS).unwrap_or_default()
    }

    /// Colour assigned when the region was created, if it parses.
    pub fn geofence_color(&self) -> Option<Rgb> {
        self.string_property(property::GEOFENCE_COLOR)
            .and_then(|hex| Rgb::parse_hex(&hex))
    }

    /// Highlight colour for visits: the assigned colour, else one derived from the id.
    pub fn highlight_color(&self) -> Rgb {
        self.geofence_color()
            .unwrap_or_else(|| Rgb::derive(&self.id))
    }

    /// Dwell time carried by the region, if any.
    pub fn dwell_time(&self) -> Option<Duration> {
        let minutes = match self.properties.get(property::DWELL_TIME)? {
            JsonValue::Number(n) => n.as_f64()?,
            JsonValue::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        if !minutes.is_finite() || minutes < 0.0 {
            return None;
        }
        Duration::try_from_secs_f64(minutes * 60.0).ok()
    }

    pub fn contains(&self, coordinate: Coordinate) -> bool {
        use geo::Contains;
        self.polygon.contains(&coordinate.to_point())
    }

    /// Render as a GeoJSON feature.
    pub fn to_feature(&self) -> Feature {
        let geometry = geojson::Geometry::from(&geo::Geometry::Polygon(self.polygon.clone()));
        Feature {
            bbox: None,
            geometry: Some(geometry),
            id: Some(Id::String(self.id.clone())),
            properties: Some(self.properties.clone()),
            foreign_members: None,
        }
    }

    /// Read a region back from a GeoJSON feature with a Polygon or LineString geometry.
    pub fn from_feature(feature: Feature) -> Result<Self> {
        let id = match feature.id {
            Some(Id::String(s)) => s,
            Some(Id::Number(n)) => n.to_string(),
            None => return Err(AppError::geojson("region feature has no id")),
        };
        let geometry = feature
            .geometry
            .ok_or_else(|| AppError::geojson(format!("region {id} has no geometry")))?;
        let polygon = polygon_from_geometry(&geometry.value)
            .ok_or_else(|| AppError::geojson(format!("region {id} is not a polygon")))?;

        Ok(Self {
            id,
            polygon,
            properties: feature.properties.unwrap_or_default(),
        })
    }
}

/// Build a polygon from a Polygon geometry, or close a LineString contour into one.
///
/// Returns `None` for other geometry types and for rings with fewer than three positions.
pub fn polygon_from_geometry(value: &geojson::Value) -> Option<Polygon<f64>> {
    match value {
        geojson::Value::Polygon(rings) => {
            let mut rings = rings.iter().map(|ring| ring_from_positions(ring));
            let exterior = rings.next()??;
            let interiors = rings.collect::<Option<Vec<_>>>()?;
            Some(Polygon::new(exterior, interiors))
        }
        geojson::Value::LineString(positions) => {
            Some(Polygon::new(ring_from_positions(positions)?, vec![]))
        }
        _ => None,
    }
}

fn ring_from_positions(positions: &[Vec<f64>]) -> Option<LineString<f64>> {
    let coords = positions
        .iter()
        .map(|p| Coordinate::from_position(p).map(|c| Coord { x: c.longitude, y: c.latitude }))
        .collect::<Option<Vec<_>>>()?;
    if coords.len() < 3 {
        return None;
    }
    // Polygon::new closes the ring
    Some(LineString::new(coords))
}

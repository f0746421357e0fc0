// src/models/mod.rs

//! Domain models for the geofencing application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod coordinate;
mod event;
mod place;
mod region;
mod visit;

// Re-export all public types
pub use config::{
    ApiConfig, Config, GeofenceConfig, LocationConfig, LoggingConfig, SearchConfig,
};
pub use coordinate::{Coordinate, Rgb};
pub use event::{GeofenceError, GeofenceEvent, GeofenceEventKind};
pub use place::{PlaceResult, Route};
pub use region::{Region, polygon_from_geometry, property};
pub use visit::{VisitRecord, occurrence_key};

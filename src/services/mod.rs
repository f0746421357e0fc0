//! Service layer for the geofencing application.
//!
//! This module contains the logic for:
//! - Observable session state (`StateStore`)
//! - Geofence event handling (`EventDeduplicator`, `ArticleRegistry`, `GeofenceHandler`)
//! - Region monitoring (`RegionMonitor`, `LocalGeofencing`)
//! - Remote lookups and place search (`MapApi`, `SearchService`)
//! - Map overlays, location and navigation replay

pub mod api;
mod dedup;
pub mod geofence;
mod location;
pub mod monitor;
pub mod navigation;
pub mod overlay;
mod registry;
pub mod search;
mod state;

pub use api::{HttpMapApi, MapApi};
pub use dedup::EventDeduplicator;
pub use geofence::{GeofenceHandler, GeofenceObserver};
pub use location::{LocationTracker, RoutePoints};
pub use monitor::{LocalGeofencing, RegionMonitor};
pub use navigation::{NavigationService, ReplayOptions, ReplayOutcome};
pub use overlay::{MapSurface, OverlayCollector};
pub use registry::ArticleRegistry;
pub use search::{SearchOutcome, SearchService};
pub use state::{StateStore, TimeMap, VisibilityMap, VisitList};

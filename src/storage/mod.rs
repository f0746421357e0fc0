//! Storage abstractions for session output.
//!
//! A CLI run leaves its results on disk:
//!
//! ```text
//! {root}/
//! ├── visits.json        # Visit records and dwell/exit time maps
//! ├── regions.geojson    # Monitored regions as polygon features
//! └── overlays.geojson   # Everything drawn on the map
//! ```

pub mod local;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Region, VisitRecord};
use crate::services::StateStore;

pub use local::LocalStorage;

/// Metadata about a storage write operation.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// Key written, relative to the storage root
    pub key: String,
    /// Number of records or features written
    pub count: usize,
    /// Timestamp of the write
    pub timestamp: DateTime<Utc>,
}

/// Contents of `visits.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// ISO 8601 timestamp of the snapshot
    pub updated_at: DateTime<Utc>,
    /// Number of visit records
    pub count: usize,
    /// Visit records, most recent first
    pub visits: Vec<VisitRecord>,
    /// Occurrence key to dwell time
    pub dwelled_times: HashMap<String, String>,
    /// Occurrence key to exit time
    pub exited_times: HashMap<String, String>,
}

impl SessionSnapshot {
    /// Copy the current state of a store.
    pub fn capture(store: &StateStore) -> Self {
        let visits = store.articles().as_ref().clone();
        Self {
            updated_at: Utc::now(),
            count: visits.len(),
            visits,
            dwelled_times: store.dwelled_times().as_ref().clone(),
            exited_times: store.exited_times().as_ref().clone(),
        }
    }
}

/// Trait for session output backends.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn write_snapshot(&self, snapshot: &SessionSnapshot) -> Result<WriteMetadata>;

    async fn load_snapshot(&self) -> Result<Option<SessionSnapshot>>;

    /// Write regions as a polygon feature collection.
    async fn write_regions(&self, regions: &[Region]) -> Result<WriteMetadata>;

    /// Load regions written by `write_regions`; empty when none exist.
    async fn load_regions(&self) -> Result<Vec<Region>>;

    async fn write_overlays(&self, overlays: &FeatureCollection) -> Result<WriteMetadata>;
}

// src/models/event.rs

//! Region monitoring events.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Region;

/// Kind of transition reported for a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeofenceEventKind {
    Entry,
    Dwell,
    Exit,
}

impl GeofenceEventKind {
    /// Canonical log line for an event on a region.
    pub fn message(&self, name: &str, id: &str) -> String {
        match self {
            GeofenceEventKind::Entry => format!("Entered {name} ({id})"),
            GeofenceEventKind::Dwell => format!("Dwelling in {name} ({id})"),
            GeofenceEventKind::Exit => format!("Exited {name} ({id})"),
        }
    }
}

impl fmt::Display for GeofenceEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GeofenceEventKind::Entry => "entry",
            GeofenceEventKind::Dwell => "dwell",
            GeofenceEventKind::Exit => "exit",
        };
        f.write_str(s)
    }
}

/// An entry, dwell or exit on a monitored region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceEvent {
    pub kind: GeofenceEventKind,
    pub region: Region,
    pub at: DateTime<Utc>,
}

impl GeofenceEvent {
    pub fn new(kind: GeofenceEventKind, region: Region, at: DateTime<Utc>) -> Self {
        Self { kind, region, at }
    }

    pub fn message(&self) -> String {
        self.kind.message(&self.region.name(), &self.region.id)
    }
}

/// Error reported by a region monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeofenceError {
    pub message: String,
    #[serde(default)]
    pub region_id: Option<String>,
}

impl GeofenceError {
    pub fn new(message: impl Into<String>, region_id: Option<String>) -> Self {
        Self {
            message: message.into(),
            region_id,
        }
    }
}

impl fmt::Display for GeofenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region_id {
            Some(id) => write!(f, "{} (region {})", self.message, id),
            None => f.write_str(&self.message),
        }
    }
}

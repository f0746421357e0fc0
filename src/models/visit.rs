// src/models/visit.rs

//! Place visit record.

use serde::{Deserialize, Serialize};

use crate::models::{Region, Rgb};

/// One visit to a geofenced region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    /// Session-unique sequence number, also the visibility key
    pub seq: u64,

    /// Identifier of the region that was entered
    pub id: String,

    /// Region display name
    pub title: String,

    /// Region address
    pub address: String,

    /// Local time of entry
    pub entered_time: String,

    /// `{id}-{occurrence}` of the exit attributed to this record
    #[serde(default)]
    pub exited_key: String,

    #[serde(default)]
    pub exited_time: String,

    /// `{id}-{occurrence}` of the dwell attributed to this record
    #[serde(default)]
    pub dwelled_key: String,

    #[serde(default)]
    pub dwelled_time: String,

    /// Pulse and highlight colour
    pub color: Rgb,
}

impl VisitRecord {
    /// New record for an entry into `region`.
    pub fn entered(seq: u64, region: &Region, entered_time: impl Into<String>) -> Self {
        Self {
            seq,
            id: region.id.clone(),
            title: region.name(),
            address: region.address(),
            entered_time: entered_time.into(),
            exited_key: String::new(),
            exited_time: String::new(),
            dwelled_key: String::new(),
            dwelled_time: String::new(),
            color: region.highlight_color(),
        }
    }

    pub fn has_exited(&self) -> bool {
        !self.exited_key.is_empty()
    }

    pub fn has_dwelled(&self) -> bool {
        !self.dwelled_key.is_empty()
    }

    /// Format for display using a template.
    ///
    /// Supported placeholders: `{id}`, `{title}`, `{address}`, `{entered}`, `{dwelled}`, `{exited}`.
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{id}", &self.id)
            .replace("{title}", &self.title)
            .replace("{address}", &self.address)
            .replace("{entered}", &self.entered_time)
            .replace("{dwelled}", &self.dwelled_time)
            .replace("{exited}", &self.exited_time)
    }
}

/// Composite key tying a dwell/exit timestamp to one visit of a region.
pub fn occurrence_key(id: &str, occurrence: usize) -> String {
    format!("{id}-{occurrence}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use crate::models::property;

    #[test]
    fn entered_copies_region_metadata() {
        let region = crate::models::Region::new(
            "a1",
            geo::polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)],
        )
        .with_property(property::NAME, "Cafe")
        .with_property(property::ADDRESS, "1 Main St")
        .with_property(property::GEOFENCE_COLOR, "#00FF00");

        let record = VisitRecord::entered(3, &region, "2024/01/01 10:00:00");
        assert_eq!(record.seq, 3);
        assert_eq!(record.title, "Cafe");
        assert_eq!(record.address, "1 Main St");
        assert_eq!(record.color, Rgb::new(0, 255, 0));
        assert!(!record.has_exited());
        assert!(!record.has_dwelled());
        assert_eq!(record.format("{title} @ {entered}"), "Cafe @ 2024/01/01 10:00:00");
        assert_eq!(record.format("{title} ({id})"), "Cafe (a1)");
    }

    #[test]
    fn occurrence_key_format() {
        assert_eq!(occurrence_key("a1", 0), "a1-0");
    }
}

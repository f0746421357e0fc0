// src/pipeline/replay.rs

//! Track replay against a set of regions.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::{Coordinate, Region};
use crate::pipeline::Session;
use crate::services::{RegionMonitor, ReplayOptions, ReplayOutcome};
use crate::storage::SessionStorage;
use crate::storage::local::read_feature_collection;
use crate::utils::log;

/// Read regions from a GeoJSON feature collection.
pub async fn load_regions(path: impl AsRef<Path>) -> Result<Vec<Region>> {
    let collection = read_feature_collection(path).await?;
    collection
        .features
        .into_iter()
        .map(Region::from_feature)
        .collect()
}

/// Read a track from the first LineString in a GeoJSON feature collection.
pub async fn load_track(path: impl AsRef<Path>) -> Result<Vec<Coordinate>> {
    let collection = read_feature_collection(path.as_ref()).await?;
    collection
        .features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .find_map(|g| match &g.value {
            geojson::Value::LineString(positions) => Some(
                positions
                    .iter()
                    .filter_map(|p| Coordinate::from_position(p))
                    .collect::<Vec<_>>(),
            ),
            _ => None,
        })
        .filter(|track| track.len() >= 2)
        .ok_or_else(|| {
            AppError::replay(format!(
                "no LineString track in {}",
                path.as_ref().display()
            ))
        })
}

/// Summarize a finished replay.
pub(crate) fn report(session: &Session, outcome: &ReplayOutcome) {
    for visit in session.store().articles().iter().rev() {
        log::sub_item(&visit.format("{title} ({id}): in {entered}, dwell {dwelled}, out {exited}"));
    }
    log::summary(
        "Replay",
        &[
            ("Samples", outcome.samples.to_string()),
            ("Events", outcome.events.len().to_string()),
            ("Visits", session.registry().len().to_string()),
            ("Cancelled", outcome.cancelled.to_string()),
        ],
    );
}

/// Monitor `regions`, replay `track`, then save the session.
pub async fn run_replay(
    session: &Session,
    storage: &dyn SessionStorage,
    regions: Vec<Region>,
    track: &[Coordinate],
    options: ReplayOptions,
) -> Result<ReplayOutcome> {
    log::header("Replay");

    log::step(1, 3, "Registering regions");
    let total = regions.len();
    for region in regions {
        if let Err(e) = session.monitor().add_region(region) {
            log::warn(&format!("Region skipped: {}", e));
        }
    }
    log::sub_item(&format!(
        "{} of {} regions monitored",
        session.region_count(),
        total
    ));

    log::step(2, 3, "Replaying track");
    let outcome = session.navigation().replay_track(track, options).await?;

    log::step(3, 3, "Saving session");
    session.save(storage).await?;

    report(session, &outcome);
    Ok(outcome)
}

// src/pipeline/route.rs

//! Route planning and replay through monitored regions.

use crate::error::{AppError, Result};
use crate::models::{Coordinate, Region};
use crate::pipeline::Session;
use crate::services::{RegionMonitor, ReplayOptions, ReplayOutcome};
use crate::storage::SessionStorage;
use crate::utils::log;

/// Fetch a walking route between two points and replay it.
///
/// `regions` are monitored in addition to any the session already has.
pub async fn run_route(
    session: &Session,
    storage: &dyn SessionStorage,
    from: Coordinate,
    to: Coordinate,
    regions: Vec<Region>,
    options: ReplayOptions,
) -> Result<ReplayOutcome> {
    from.validate()?;
    to.validate()?;
    log::header(&format!("Route: {} -> {}", from, to));

    for region in regions {
        if let Err(e) = session.monitor().add_region(region) {
            log::warn(&format!("Region skipped: {}", e));
        }
    }

    log::step(1, 3, "Fetching route");
    let navigation = session.navigation();
    navigation.select_point(from);
    navigation.set_start_point().await;
    navigation.select_point(to);
    let route = navigation
        .set_end_point()
        .await
        .ok_or_else(|| AppError::api("directions", "no route returned"))?;
    log::sub_item(&format!(
        "{:.0} m, {:.0} s, {} points",
        route.distance,
        route.duration,
        route.coordinates.len()
    ));

    log::step(2, 3, "Replaying route");
    let outcome = navigation.replay(options).await?;

    log::step(3, 3, "Saving session");
    session.save(storage).await?;

    super::replay::report(session, &outcome);
    Ok(outcome)
}

// src/pipeline/search.rs

//! Place search runs.

use crate::error::Result;
use crate::models::Coordinate;
use crate::pipeline::Session;
use crate::services::SearchOutcome;
use crate::storage::SessionStorage;
use crate::utils::log;

fn report(title: &str, session: &Session, outcome: &SearchOutcome) {
    log::summary(
        title,
        &[
            ("Found", outcome.found.to_string()),
            ("Shown", outcome.shown.to_string()),
            ("Skipped", outcome.skipped.to_string()),
            ("Failed", outcome.failed.to_string()),
            ("Regions", session.region_count().to_string()),
            ("Overlays", session.map().len().to_string()),
        ],
    );
}

/// Free-text search around `at`, then save regions and overlays.
pub async fn run_search(
    session: &Session,
    storage: &dyn SessionStorage,
    query: &str,
    icon: &str,
    at: Coordinate,
) -> Result<SearchOutcome> {
    at.validate()?;
    log::header(&format!("Search: {}", query));

    log::step(1, 2, "Searching places and isochrones");
    session.locate(at);
    let outcome = session.search().forward_search(query, icon).await;

    log::step(2, 2, "Saving regions and overlays");
    session.save(storage).await?;

    report("Search", session, &outcome);
    Ok(outcome)
}

/// Category search around `at` filtered by brand name, then save.
pub async fn run_discover(
    session: &Session,
    storage: &dyn SessionStorage,
    category: &str,
    name: &str,
    icon: &str,
    at: Coordinate,
) -> Result<SearchOutcome> {
    at.validate()?;
    log::header(&format!("Discover: {} ({})", category, name));

    log::step(1, 2, "Discovering places and isochrones");
    session.locate(at);
    let outcome = session.search().discover(category, name, icon).await;

    log::step(2, 2, "Saving regions and overlays");
    session.save(storage).await?;

    report("Discover", session, &outcome);
    Ok(outcome)
}

// src/pipeline/validate.rs

use std::path::Path;

use crate::error::Result;
use crate::models::Config;
use crate::utils::log;

/// Load and validate a configuration file, printing the effective values.
pub fn run_validate(path: &Path) -> Result<Config> {
    log::header("Validate configuration");

    let config = Config::load(path)?;
    if let Err(e) = config.validate() {
        log::warn(&format!("Config validation failed: {}", e));
        return Err(e);
    }

    log::info(&format!("Config OK: {}", path.display()));
    log::sub_item(&format!("Base URL: {}", config.api.base_url));
    log::sub_item(&format!(
        "Access token: {}",
        if config.api.access_token.is_empty() {
            "missing"
        } else {
            "set"
        }
    ));
    log::sub_item(&format!(
        "Isochrone: {} {:?} min",
        config.search.isochrone_profile, config.search.contour_minutes
    ));
    log::sub_item(&format!(
        "Dwell time: {} min",
        config.geofence.dwell_time_minutes
    ));
    log::sub_item(&format!(
        "Replay: {} m/s every {} s",
        config.location.replay_speed_mps, config.location.replay_interval_secs
    ));
    Ok(config)
}

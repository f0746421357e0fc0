//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Coordinate;

/// Environment variable that overrides `api.access_token`.
pub const ACCESS_TOKEN_ENV: &str = "MAPBOX_ACCESS_TOKEN";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote endpoint settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Place search and isochrone settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Region monitoring settings
    #[serde(default)]
    pub geofence: GeofenceConfig,

    /// Location and replay settings
    #[serde(default)]
    pub location: LocationConfig,

    /// Console logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            let mut config = Self::default();
            config.apply_env();
            config
        })
    }

    /// Take the access token from the environment when it is set.
    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.api.access_token = token;
            }
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(AppError::validation("api.base_url is empty"));
        }
        url::Url::parse(&self.api.base_url)?;
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        if self.search.contour_minutes.is_empty() {
            return Err(AppError::validation("search.contour_minutes is empty"));
        }
        if self.search.contour_minutes.contains(&0) {
            return Err(AppError::validation(
                "search.contour_minutes entries must be > 0",
            ));
        }
        if self.search.max_concurrent == 0 {
            return Err(AppError::validation("search.max_concurrent must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.search.fill_opacity) {
            return Err(AppError::validation(
                "search.fill_opacity must be within 0..=1",
            ));
        }
        if self.location.replay_speed_mps <= 0.0 {
            return Err(AppError::validation(
                "location.replay_speed_mps must be > 0",
            ));
        }
        if self.location.replay_interval_secs == 0 {
            return Err(AppError::validation(
                "location.replay_interval_secs must be > 0",
            ));
        }
        self.location.default_coordinate().validate()?;
        Ok(())
    }
}

/// Remote endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL for the isochrone, search, geocoding and directions endpoints
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Access token appended to every request
    #[serde(default)]
    pub access_token: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Language used for search results
    #[serde(default = "defaults::language")]
    pub language: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            access_token: String::new(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            language: defaults::language(),
        }
    }
}

/// Place search and isochrone settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Routing profile for isochrone lookups
    #[serde(default = "defaults::isochrone_profile")]
    pub isochrone_profile: String,

    /// Contour sizes in minutes
    #[serde(default = "defaults::contour_minutes")]
    pub contour_minutes: Vec<u32>,

    /// Result limit for forward search
    #[serde(default = "defaults::result_limit")]
    pub result_limit: usize,

    /// Result limit for category discovery
    #[serde(default = "defaults::discover_limit")]
    pub discover_limit: usize,

    /// Maximum concurrent isochrone lookups per search
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Opacity of isochrone polygon overlays
    #[serde(default = "defaults::fill_opacity")]
    pub fill_opacity: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            isochrone_profile: defaults::isochrone_profile(),
            contour_minutes: defaults::contour_minutes(),
            result_limit: defaults::result_limit(),
            discover_limit: defaults::discover_limit(),
            max_concurrent: defaults::max_concurrent(),
            fill_opacity: defaults::fill_opacity(),
        }
    }
}

/// Region monitoring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeofenceConfig {
    /// Minutes inside a region before a dwell event fires
    #[serde(default = "defaults::dwell_time_minutes")]
    pub dwell_time_minutes: u32,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            dwell_time_minutes: defaults::dwell_time_minutes(),
        }
    }
}

/// Location and replay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Longitude used when no location is known yet
    #[serde(default = "defaults::longitude")]
    pub default_longitude: f64,

    /// Latitude used when no location is known yet
    #[serde(default = "defaults::latitude")]
    pub default_latitude: f64,

    /// Replay speed in metres per second
    #[serde(default = "defaults::replay_speed")]
    pub replay_speed_mps: f64,

    /// Seconds between replayed location samples
    #[serde(default = "defaults::replay_interval")]
    pub replay_interval_secs: u64,
}

impl LocationConfig {
    pub fn default_coordinate(&self) -> Coordinate {
        Coordinate::new(self.default_longitude, self.default_latitude)
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            default_longitude: defaults::longitude(),
            default_latitude: defaults::latitude(),
            replay_speed_mps: defaults::replay_speed(),
            replay_interval_secs: defaults::replay_interval(),
        }
    }
}

/// Console logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level for console reports (debug, info, warn, error)
    #[serde(default = "defaults::level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::level(),
        }
    }
}

mod defaults {
    // Api defaults
    pub fn base_url() -> String {
        "https://api.mapbox.com".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; geofencing/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn language() -> String {
        "en".into()
    }

    // Search defaults
    pub fn isochrone_profile() -> String {
        "walking".into()
    }
    pub fn contour_minutes() -> Vec<u32> {
        vec![3]
    }
    pub fn result_limit() -> usize {
        10
    }
    pub fn discover_limit() -> usize {
        100
    }
    pub fn max_concurrent() -> usize {
        5
    }
    pub fn fill_opacity() -> f64 {
        0.6
    }

    // Geofence defaults
    pub fn dwell_time_minutes() -> u32 {
        1
    }

    // Location defaults (Tokyo Station)
    pub fn longitude() -> f64 {
        139.76571635075032
    }
    pub fn latitude() -> f64 {
        35.68151427068749
    }
    pub fn replay_speed() -> f64 {
        1.4
    }
    pub fn replay_interval() -> u64 {
        1
    }

    // Logging defaults
    pub fn level() -> String {
        "info".into()
    }
}

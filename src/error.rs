// src/error.rs

//! Unified error handling for the geofencing application.

use std::fmt;

use thiserror::Error;

/// Result type alias for geofencing operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// GeoJSON document could not be interpreted
    #[error("GeoJSON error: {0}")]
    GeoJson(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Remote endpoint returned something unusable
    #[error("API error for {endpoint}: {message}")]
    Api { endpoint: String, message: String },

    /// Location replay could not be built
    #[error("Replay error: {0}")]
    Replay(String),
}

impl AppError {
    /// Create a GeoJSON interpretation error.
    pub fn geojson(message: impl fmt::Display) -> Self {
        Self::GeoJson(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an API error with the endpoint it came from.
    pub fn api(endpoint: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Api {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// Create a replay error.
    pub fn replay(message: impl Into<String>) -> Self {
        Self::Replay(message.into())
    }
}

//! Utility functions and helpers.

pub mod http;
pub mod log;

use chrono::{DateTime, Local, Utc};

/// Timestamp layout shown on visit records.
pub const TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Format a UTC instant as a local timestamp string.
pub fn format_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format(TIME_FORMAT).to_string()
}

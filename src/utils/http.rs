// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::ApiConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &ApiConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a URL and parse the body as JSON when the status is 2xx.
///
/// Returns `Ok(None)` for any other status.
pub async fn fetch_json(client: &reqwest::Client, url: url::Url) -> Result<Option<serde_json::Value>> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        log::debug!("HTTP {} from {}", status, response.url().path());
        return Ok(None);
    }
    let body = response.bytes().await?;
    Ok(Some(serde_json::from_slice(&body)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_from_default_config() {
        assert!(create_async_client(&ApiConfig::default()).is_ok());
    }
}

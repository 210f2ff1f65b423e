//! HTTP match data provider backed by The Blue Alliance API
//!
//! Requests are paced so that consecutive calls are at least
//! `request_delay` apart, however many callers share the provider.

use crate::config::ProviderSettings;
use crate::error::{RatingError, Result};
use crate::provider::tba::{TbaEvent, TbaMatch};
use crate::provider::MatchDataProvider;
use crate::types::MatchRecord;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

const AUTH_HEADER: &str = "X-TBA-Auth-Key";
const BODY_SNIPPET_LEN: usize = 300;

/// Match data provider that talks to TBA over HTTPS
pub struct HttpMatchProvider {
    http: Client,
    base_url: String,
    auth_key: Option<String>,
    request_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl HttpMatchProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .user_agent(concat!("alliance-rating/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RatingError::Configuration {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            auth_key: settings.auth_key.clone(),
            request_delay: Duration::from_millis(settings.request_delay_ms),
            last_request: Mutex::new(None),
        })
    }

    /// Wait until the pacing window since the previous request has passed
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.request_delay;
            if Instant::now() < ready_at {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let auth_key = self
            .auth_key
            .as_deref()
            .ok_or_else(|| RatingError::Configuration {
                message: "TBA API key not configured".to_string(),
            })?;

        self.pace().await;

        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .header(AUTH_HEADER, auth_key)
            .send()
            .await
            .map_err(|e| RatingError::provider(format!("Request to {} failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(BODY_SNIPPET_LEN).collect();
            warn!("TBA returned {} for {}", status, path);
            return Err(RatingError::provider(format!(
                "TBA API request failed (status {}) for {}: {}",
                status.as_u16(),
                path,
                snippet
            ))
            .into());
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RatingError::provider(format!("Unexpected response for {}: {}", path, e)).into())
    }
}

#[async_trait]
impl MatchDataProvider for HttpMatchProvider {
    async fn event_matches(&self, event_key: &str) -> Result<Vec<MatchRecord>> {
        let matches: Vec<TbaMatch> = self
            .get_json(&format!("/event/{}/matches/simple", event_key))
            .await?;
        debug!("Fetched {} matches for {}", matches.len(), event_key);
        Ok(matches.into_iter().map(TbaMatch::into_record).collect())
    }

    async fn season_events(&self, year: i32) -> Result<Vec<String>> {
        let events: Vec<TbaEvent> = self.get_json(&format!("/events/{}/simple", year)).await?;
        Ok(events
            .into_iter()
            .map(|event| event.key)
            .filter(|key| !key.trim().is_empty())
            .collect())
    }

    fn name(&self) -> &'static str {
        "tba-http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;

    fn settings(base_url: &str, auth_key: Option<&str>) -> ProviderSettings {
        ProviderSettings {
            base_url: base_url.to_string(),
            auth_key: auth_key.map(str::to_string),
            request_delay_ms: 50,
            timeout_seconds: 1,
        }
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider = HttpMatchProvider::new(&settings("https://example.test/api/v3/", Some("k"))).unwrap();
        assert_eq!(provider.base_url, "https://example.test/api/v3");
    }

    #[tokio::test]
    async fn test_missing_auth_key_is_configuration_error() {
        let provider = HttpMatchProvider::new(&settings("http://127.0.0.1:9", None)).unwrap();
        let err = provider.event_matches("2024casj").await.unwrap_err();
        assert!(matches!(classify(&err), Some(RatingError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_provider_error() {
        // Port 9 (discard) is closed on loopback, so the connection is refused
        let provider = HttpMatchProvider::new(&settings("http://127.0.0.1:9", Some("k"))).unwrap();
        let err = provider.season_events(2024).await.unwrap_err();
        let classified = classify(&err).unwrap();
        assert!(matches!(classified, RatingError::Provider { .. }));
        assert!(classified.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_paced() {
        let provider = HttpMatchProvider::new(&settings("http://127.0.0.1:9", Some("k"))).unwrap();

        let start = Instant::now();
        provider.pace().await;
        provider.pace().await;
        provider.pace().await;

        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}

//! Live StopMonitoring HTTP client.
//!
//! Fetches the current predictions for one stop from the 511.org open data
//! API. Requests carry a timeout so a stalled network call degrades to a
//! failed fetch instead of holding up the display loop.

use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use super::error::FeedError;
use super::{FeedSource, Payload};

/// Default base URL for the 511.org open data API.
pub const DEFAULT_BASE_URL: &str = "https://api.511.org";

/// Default transit agency (San Francisco MUNI).
pub const DEFAULT_AGENCY: &str = "SF";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the live feed client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveFeedConfig {
    /// API key for authentication
    pub api_key: String,
    /// Transit agency code
    pub agency: String,
    /// Stop to monitor
    pub stop_code: String,
    /// Base URL for the API
    pub base_url: String,
    /// Upper bound on a single fetch
    pub timeout: Duration,
}

impl LiveFeedConfig {
    /// Create a new config for the given key and stop.
    pub fn new(api_key: impl Into<String>, stop_code: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            agency: DEFAULT_AGENCY.to_string(),
            stop_code: stop_code.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the agency code.
    pub fn with_agency(mut self, agency: impl Into<String>) -> Self {
        self.agency = agency.into();
        self
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the fetch timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// StopMonitoring API client.
#[derive(Debug, Clone)]
pub struct LiveFeedClient {
    http: reqwest::Client,
    url: String,
    query: [(&'static str, String); 4],
    timeout: Duration,
}

impl LiveFeedClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LiveFeedConfig) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            url: format!(
                "{}/transit/StopMonitoring",
                config.base_url.trim_end_matches('/')
            ),
            query: [
                ("api_key", config.api_key),
                ("agency", config.agency),
                ("stopCode", config.stop_code),
                ("format", "json".to_string()),
            ],
            timeout: config.timeout,
        })
    }

    /// Fetch the raw StopMonitoring document.
    pub async fn fetch(&self) -> Result<String, FeedError> {
        let response = self
            .http
            .get(&self.url)
            .query(&self.query)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(FeedError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FeedError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::ApiError {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        debug!(bytes = body.len(), "fetched stop monitoring payload");
        Ok(body)
    }

    fn classify(&self, err: reqwest::Error) -> FeedError {
        if err.is_timeout() {
            FeedError::Timeout(self.timeout)
        } else {
            FeedError::Http(err)
        }
    }

    /// The endpoint this client polls.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FeedSource for LiveFeedClient {
    async fn next_payload(&mut self) -> Result<Option<Payload>, FeedError> {
        let body = self.fetch().await?;
        Ok(Some(Payload {
            body,
            received_at: Utc::now(),
            entry: None,
        }))
    }
}

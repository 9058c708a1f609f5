//! Sleeper HTTP client.
//!
//! Issues one GET per call and classifies the outcome. No caching,
//! throttling or retrying happens here; see `crate::facade`.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use reqwest::Url;
use reqwest::header::{CACHE_CONTROL, EXPIRES, HeaderMap, HeaderName};
use serde_json::Value;
use tracing::debug;

use super::endpoint::Endpoint;
use super::error::UpstreamError;
use super::freshness::{Freshness, UpstreamResponse};

/// Default base URL for the Sleeper API.
pub const DEFAULT_BASE_URL: &str = "https://api.sleeper.app/v1";

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Something that can answer a Sleeper GET with a JSON body.
pub trait Upstream: Send + Sync + 'static {
    fn fetch(
        &self,
        endpoint: &Endpoint,
    ) -> impl Future<Output = Result<UpstreamResponse, UpstreamError>> + Send;
}

/// Configuration for the Sleeper client.
#[derive(Debug, Clone)]
pub struct SleeperConfig {
    /// Base URL for the API, without a trailing slash
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl SleeperConfig {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for SleeperConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleeper API client.
#[derive(Debug, Clone)]
pub struct SleeperClient {
    http: reqwest::Client,
    base_url: Url,
}

impl SleeperClient {
    /// Create a new Sleeper client with the given configuration.
    pub fn new(config: SleeperConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("sleeper-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::transport(format!("failed to build HTTP client: {e}")))?;

        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                UpstreamError::transport(format!("invalid base URL {:?}", config.base_url))
            })?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Full URL for an endpoint. Each parameter is percent-encoded as a
    /// single path segment.
    fn url(&self, endpoint: &Endpoint) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| UpstreamError::transport(format!("base URL {} has no path", self.base_url)))?
            .pop_if_empty()
            .extend(endpoint.segments());
        Ok(url)
    }
}

impl Upstream for SleeperClient {
    async fn fetch(&self, endpoint: &Endpoint) -> Result<UpstreamResponse, UpstreamError> {
        let url = self.url(endpoint)?;
        debug!(endpoint = endpoint.name(), %url, "upstream request");

        let response = self.http.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(endpoint = endpoint.name(), %status, error = %e, "could not read error body");
                    String::new()
                }
            };
            return Err(UpstreamError::status(status.as_u16(), &body));
        }

        let headers = response.headers();
        let freshness = Freshness::from_headers(
            header(headers, CACHE_CONTROL),
            header(headers, EXPIRES),
            Utc::now(),
        );

        let body = response.text().await?;

        let value: Value =
            serde_json::from_str(&body).map_err(|e| UpstreamError::parse(e.to_string(), &body))?;

        // Sleeper answers unknown users and leagues with 200 and a `null` body
        if value.is_null() {
            return Err(UpstreamError::status(404, &body));
        }

        Ok(UpstreamResponse::new(value).with_freshness(freshness))
    }
}

fn header(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

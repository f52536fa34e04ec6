//! Plain-HTTP fetch backend built on reqwest
//!
//! Classifies transport and status-level failures into the retry
//! taxonomy: 5xx and connection faults are transient, HTTP 429 is an
//! explicit throttle (with its Retry-After hint when parseable), and
//! remaining 4xx are definitive rejections.

use crate::fetch::{FetchError, FetchResponse, Fetcher};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;

/// Builds the HTTP client used for board fetches
///
/// The user agent comes from configuration so operators can identify
/// their crawler to board owners.
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher backend for plain (non-rendered) HTTP requests
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        _ready_marker: Option<&str>,
    ) -> Result<FetchResponse, FetchError> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => return Err(classify_transport_error(url, &e)),
        };

        let status = response.status();
        let final_url = response.url().to_string();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::Throttled {
                url: url.to_string(),
                retry_after: parse_retry_after(response.headers()),
            });
        }

        if status.is_server_error() {
            return Err(FetchError::Transient {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        if !status.is_success() {
            return Err(FetchError::Rejected {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        match response.text().await {
            Ok(body) => Ok(FetchResponse {
                final_url,
                status: status.as_u16(),
                body,
            }),
            Err(e) => Err(FetchError::Transient {
                url: url.to_string(),
                message: format!("body read failed: {}", e),
            }),
        }
    }
}

/// Maps a reqwest transport error into the retry taxonomy
fn classify_transport_error(url: &str, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Transient {
            url: url.to_string(),
            message: "request timeout".to_string(),
        }
    } else if error.is_connect() {
        FetchError::Transient {
            url: url.to_string(),
            message: "connection failed".to_string(),
        }
    } else if error.is_builder() || error.is_redirect() {
        FetchError::Invalid {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        // Remaining request-phase faults (resets, broken pipes) are
        // connection-level and worth another attempt
        FetchError::Transient {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Extracts a Retry-After hint, seconds form only
///
/// HTTP-date Retry-After values are rare on board APIs and are treated as
/// absent; the executor then falls back to its own backoff.
fn parse_retry_after(headers: &header::HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

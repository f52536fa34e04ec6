//! Fetching with failure classification, rate limiting, and retries
//!
//! This module owns the boundary between the polling core and the
//! network. Transports (a plain HTTP client, a rendered-page browser
//! backend) sit behind the `Fetcher` trait so the limiter, retry, and
//! breaker accounting stay transport-agnostic. Errors are classified at
//! the boundary: only transient faults and explicit throttle signals are
//! ever retried.

mod client;
mod executor;

pub use client::{build_http_client, HttpFetcher};
pub use executor::{FetchExecutor, RetryConfig};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Classified failure of a single fetch attempt
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection-level fault or 5xx; worth retrying
    #[error("transient error fetching {url}: {message}")]
    Transient { url: String, message: String },

    /// Explicit throttle signal (HTTP 429), with the server's
    /// Retry-After hint when one was sent
    #[error("throttled by {url}")]
    Throttled {
        url: String,
        retry_after: Option<Duration>,
    },

    /// Definitive HTTP rejection (4xx other than 429); not retried
    #[error("request rejected for {url} (HTTP {status})")]
    Rejected { url: String, status: u16 },

    /// The request could not be constructed or dispatched at all
    #[error("invalid request for {url}: {message}")]
    Invalid { url: String, message: String },
}

impl FetchError {
    /// Whether the executor may retry after this failure
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Throttled { .. })
    }

    /// The URL this failure occurred for
    pub fn url(&self) -> &str {
        match self {
            Self::Transient { url, .. }
            | Self::Throttled { url, .. }
            | Self::Rejected { url, .. }
            | Self::Invalid { url, .. } => url,
        }
    }
}

/// Terminal failure of a logical fetch, after the retry budget is spent
///
/// Carries the domain so the caller can decide whether to escalate to the
/// circuit breaker; the executor never escalates on its own.
#[derive(Debug, Error)]
#[error("giving up on {url} after {attempts} attempt(s): {source}")]
pub struct ScrapeFailure {
    pub url: String,
    pub domain: String,
    pub attempts: u32,
    #[source]
    pub source: FetchError,
}

/// Successful fetch result
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Final URL after any redirects
    pub final_url: String,

    /// HTTP status code
    pub status: u16,

    /// Response body
    pub body: String,
}

/// One-fetch capability implemented by each transport backend
///
/// `ready_marker` is a CSS selector that rendered-page backends wait for
/// before capturing the DOM; plain HTTP backends ignore it.
#[async_trait]
pub trait Fetcher {
    async fn fetch(
        &self,
        url: &str,
        ready_marker: Option<&str>,
    ) -> std::result::Result<FetchResponse, FetchError>;
}

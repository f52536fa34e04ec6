//! Bounded-retry wrapper around a single logical fetch
//!
//! The executor owns the per-attempt ritual: wait out the rate limiter,
//! dispatch through the `Fetcher` backend, and report the attempt back to
//! the limiter whatever the outcome. Transient faults and throttle
//! signals are retried with capped exponential backoff; everything else
//! propagates immediately. Exhausting the budget yields a
//! `ScrapeFailure`; escalation to the circuit breaker is left to the
//! caller.

use crate::fetch::{FetchError, FetchResponse, Fetcher, ScrapeFailure};
use crate::limiter::RateLimiter;
use crate::url::domain_of;
use std::time::{Duration, Instant};

/// Retry budget and backoff shape for one logical fetch
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Backoff before the second attempt; doubles per retry
    pub base_backoff: Duration,

    /// Ceiling on any single backoff, including server Retry-After hints
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    pub fn with_backoff(max_attempts: u32, base_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts,
            base_backoff,
            max_backoff,
        }
    }

    /// Backoff after the given failed attempt (1-based)
    fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << (attempt - 1).min(16);
        (self.base_backoff * factor).min(self.max_backoff)
    }

    /// Delay before the next attempt, honoring a throttle hint if present
    ///
    /// A server-supplied Retry-After takes precedence over the computed
    /// backoff but is still clamped to `max_backoff`: an unbounded
    /// server-controlled sleep inside a sequential batch would stall
    /// every remaining source.
    fn delay_after(&self, error: &FetchError, attempt: u32) -> Duration {
        match error {
            FetchError::Throttled {
                retry_after: Some(hint),
                ..
            } => (*hint).min(self.max_backoff),
            _ => self.backoff_for(attempt),
        }
    }
}

/// Executes logical fetches with rate limiting and bounded retries
pub struct FetchExecutor<F> {
    fetcher: F,
    config: RetryConfig,
}

impl<F: Fetcher> FetchExecutor<F> {
    pub fn new(fetcher: F, config: RetryConfig) -> Self {
        Self { fetcher, config }
    }

    /// Fetches `url`, retrying transient failures within the budget
    ///
    /// Every attempt waits out the limiter first and is recorded with the
    /// limiter afterwards, success or not. Throttle responses always
    /// count as limiter failures so the adaptive delay stretches even
    /// when a later retry succeeds.
    pub async fn execute(
        &self,
        url: &str,
        ready_marker: Option<&str>,
        limiter: &mut RateLimiter,
    ) -> Result<FetchResponse, ScrapeFailure> {
        let domain = match domain_of(url) {
            Some(d) => d,
            None => {
                return Err(ScrapeFailure {
                    url: url.to_string(),
                    domain: String::new(),
                    attempts: 0,
                    source: FetchError::Invalid {
                        url: url.to_string(),
                        message: "URL has no host".to_string(),
                    },
                })
            }
        };

        let mut last_error = None;

        for attempt in 1..=self.config.max_attempts {
            let wait = limiter.should_wait(&domain, Instant::now());
            if wait > Duration::ZERO {
                tracing::info!(
                    "Rate limiting: waiting {:.2}s for {}",
                    wait.as_secs_f64(),
                    domain
                );
                tokio::time::sleep(wait).await;
            }

            match self.fetcher.fetch(url, ready_marker).await {
                Ok(response) => {
                    limiter.record_request(&domain, true, Instant::now());
                    if attempt > 1 {
                        tracing::debug!("Fetch succeeded for {} on attempt {}", url, attempt);
                    }
                    return Ok(response);
                }
                Err(error) => {
                    limiter.record_request(&domain, false, Instant::now());

                    if !error.is_retryable() {
                        return Err(ScrapeFailure {
                            url: url.to_string(),
                            domain,
                            attempts: attempt,
                            source: error,
                        });
                    }

                    tracing::warn!(
                        "Attempt {}/{} failed for {}: {}",
                        attempt,
                        self.config.max_attempts,
                        url,
                        error
                    );

                    if attempt < self.config.max_attempts {
                        let delay = self.config.delay_after(&error, attempt);
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(error);
                }
            }
        }

        let source = last_error.unwrap_or(FetchError::Transient {
            url: url.to_string(),
            message: "no attempts were made".to_string(),
        });
        Err(ScrapeFailure {
            url: url.to_string(),
            domain,
            attempts: self.config.max_attempts,
            source,
        })
    }
}

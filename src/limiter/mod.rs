//! Adaptive per-domain rate limiter
//!
//! Every outbound request is gated twice: a hard ceiling on requests per
//! trailing 60s window, and a minimum inter-request delay that stretches
//! (up to 2x) while a domain is failing. Callers ask `should_wait` before
//! dispatching and report every attempt through `record_request`; if every
//! caller honors the returned wait, no domain ever sees more than its
//! configured rate in any trailing window.

mod domain;

pub use domain::{DomainRateState, RateLimitConfig, WINDOW};

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Rate limiter covering all domains the process talks to
///
/// State is per-domain and lazily created. The limiter never sleeps and
/// never errors; it only computes waits and records history, leaving the
/// actual suspension to the caller.
///
/// # Example
///
/// ```
/// use boardwatch::limiter::{RateLimitConfig, RateLimiter};
/// use std::time::Instant;
///
/// let mut limiter = RateLimiter::new(RateLimitConfig::default());
/// let wait = limiter.should_wait("boards.example.com", Instant::now());
/// assert!(wait.is_zero());
/// ```
pub struct RateLimiter {
    default_config: RateLimitConfig,
    overrides: HashMap<String, RateLimitConfig>,
    domains: HashMap<String, DomainRateState>,
}

impl RateLimiter {
    /// Creates a limiter with the given process-wide defaults
    pub fn new(default_config: RateLimitConfig) -> Self {
        Self {
            default_config,
            overrides: HashMap::new(),
            domains: HashMap::new(),
        }
    }

    /// Installs a per-domain override
    ///
    /// Subsequent waits for `domain` use this config instead of the
    /// process-wide defaults.
    pub fn configure_domain(&mut self, domain: &str, config: RateLimitConfig) {
        tracing::info!(
            "Configured rate limit for {}: {} req/min, {}ms min delay",
            domain,
            config.requests_per_minute,
            config.min_delay_ms
        );
        self.overrides.insert(domain.to_string(), config);
    }

    /// Returns the effective config for a domain
    pub fn config_for(&self, domain: &str) -> &RateLimitConfig {
        self.overrides.get(domain).unwrap_or(&self.default_config)
    }

    /// Computes how long the caller must wait before requesting `domain`
    ///
    /// Window entries older than 60s are evicted first. A full window
    /// yields the time until the oldest entry ages out; otherwise the
    /// remaining (failure-scaled) minimum delay applies. Zero means the
    /// request may go out now.
    pub fn should_wait(&mut self, domain: &str, now: Instant) -> Duration {
        let config = self
            .overrides
            .get(domain)
            .unwrap_or(&self.default_config)
            .clone();
        let state = self.domains.entry(domain.to_string()).or_default();

        state.evict_expired(now);

        if let Some(wait) = state.time_until_window_slot(&config, now) {
            return wait;
        }

        state
            .min_delay_remaining(&config, now)
            .unwrap_or(Duration::ZERO)
    }

    /// Convenience wrapper over `should_wait` using the current time
    pub fn should_wait_now(&mut self, domain: &str) -> Duration {
        self.should_wait(domain, Instant::now())
    }

    /// Records a dispatched request and its outcome for `domain`
    pub fn record_request(&mut self, domain: &str, success: bool, now: Instant) {
        let state = self.domains.entry(domain.to_string()).or_default();
        state.record(success, now);
    }

    /// Current consecutive-failure streak for a domain
    pub fn failure_streak(&self, domain: &str) -> u32 {
        self.domains
            .get(domain)
            .map(|s| s.failure_streak)
            .unwrap_or(0)
    }

    /// Number of requests recorded for a domain in its current window
    ///
    /// Entries older than 60s may still be counted until the next
    /// `should_wait` evicts them; this is a debugging/reporting view, not
    /// a gate.
    pub fn recent_requests(&self, domain: &str) -> usize {
        self.domains.get(domain).map(|s| s.window_len()).unwrap_or(0)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

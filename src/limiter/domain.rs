use serde::Deserialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Width of the trailing window that request counts are bounded over
pub const WINDOW: Duration = Duration::from_secs(60);

/// Per-domain rate limit settings
///
/// Unconfigured domains fall back to the process-wide defaults; stricter
/// limits can be installed per domain via `RateLimiter::configure_domain`.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests dispatched in any trailing 60s window
    #[serde(rename = "requests-per-minute", default = "default_rpm")]
    pub requests_per_minute: u32,

    /// Minimum delay between consecutive requests (milliseconds)
    #[serde(rename = "min-delay-ms", default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
}

fn default_rpm() -> u32 {
    30
}

fn default_min_delay_ms() -> u64 {
    2000
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_rpm(),
            min_delay_ms: default_min_delay_ms(),
        }
    }
}

impl RateLimitConfig {
    /// Minimum inter-request delay as a Duration
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }
}

/// Tracks the request history of a single domain
///
/// Holds the trailing-window timestamps used for hard ceiling checks, the
/// last request time used for minimum-delay spacing, and the consecutive
/// failure streak that scales the adaptive delay. Created lazily on the
/// first request to a domain; lives only for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct DomainRateState {
    /// Timestamps of requests inside the trailing window, oldest first
    window: VecDeque<Instant>,

    /// Timestamp of the most recent request
    pub last_request: Option<Instant>,

    /// Consecutive failed requests; decremented (not zeroed) on success
    pub failure_streak: u32,
}

impl DomainRateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops window entries older than 60s relative to `now`
    pub fn evict_expired(&mut self, now: Instant) {
        while let Some(&oldest) = self.window.front() {
            if now.duration_since(oldest) >= WINDOW {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    /// Number of requests currently inside the trailing window
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Time until the oldest window entry ages out, if the window is full
    ///
    /// Callers must evict expired entries first. Returns None while the
    /// window has capacity for another request.
    pub fn time_until_window_slot(&self, config: &RateLimitConfig, now: Instant) -> Option<Duration> {
        if self.window.len() < config.requests_per_minute as usize {
            return None;
        }
        let oldest = *self.window.front()?;
        Some(WINDOW.saturating_sub(now.duration_since(oldest)))
    }

    /// Remaining minimum-delay wait, scaled by the failure streak
    ///
    /// The base delay grows by 20% per consecutive failure, capped at 2x,
    /// so a flaky domain is approached more gently without ever doubling
    /// beyond the configured ceiling.
    pub fn min_delay_remaining(&self, config: &RateLimitConfig, now: Instant) -> Option<Duration> {
        let last = self.last_request?;
        let multiplier = if self.failure_streak > 0 {
            (1.0 + self.failure_streak as f64 * 0.2).min(2.0)
        } else {
            1.0
        };
        let min_wait = config.min_delay().mul_f64(multiplier);
        let elapsed = now.duration_since(last);
        if elapsed < min_wait {
            Some(min_wait - elapsed)
        } else {
            None
        }
    }

    /// Records a dispatched request and its outcome
    ///
    /// Failures deepen the streak; a success only walks it back by one.
    /// Full recovery of the adaptive delay takes consecutive successes.
    pub fn record(&mut self, success: bool, now: Instant) {
        self.window.push_back(now);
        self.last_request = Some(now);
        if success {
            self.failure_streak = self.failure_streak.saturating_sub(1);
        } else {
            self.failure_streak += 1;
        }
    }
}

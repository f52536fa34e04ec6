//! Per-source circuit breaker
//!
//! The rate limiter paces individual requests; this breaker decides
//! whether a whole source is worth attempting at all this cycle. Repeated
//! cycle-level failures open the circuit for an exponentially growing
//! cooling-off period so one dead board cannot eat the polling window.
//! A single recorded success closes the circuit immediately.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Backoff settings for the circuit breaker
#[derive(Debug, Clone, Deserialize)]
pub struct BreakerConfig {
    /// Cooling-off period after the first failure (seconds)
    #[serde(rename = "base-delay-secs", default = "default_base_delay")]
    pub base_delay_secs: u64,

    /// Exponent cap: delays stop doubling after this many failures
    #[serde(rename = "cap-exponent", default = "default_cap_exponent")]
    pub cap_exponent: u32,

    /// Hard ceiling on any cooling-off period (seconds)
    #[serde(rename = "max-delay-secs", default = "default_max_delay")]
    pub max_delay_secs: u64,
}

fn default_base_delay() -> u64 {
    30
}

fn default_cap_exponent() -> u32 {
    4
}

fn default_max_delay() -> u64 {
    300
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: default_base_delay(),
            cap_exponent: default_cap_exponent(),
            max_delay_secs: default_max_delay(),
        }
    }
}

impl BreakerConfig {
    /// Cooling-off period after the given consecutive-failure count
    ///
    /// base * 2^min(failures - 1, cap_exponent), clamped to max_delay.
    fn cooldown(&self, failures: u32) -> Duration {
        debug_assert!(failures > 0);
        let exponent = (failures - 1).min(self.cap_exponent).min(32);
        let raw = self.base_delay_secs.saturating_mul(1u64 << exponent);
        Duration::from_secs(raw.min(self.max_delay_secs))
    }
}

#[derive(Debug, Default)]
struct BreakerState {
    failures: u32,
    skip_until: Option<Instant>,
}

/// Cycle-level skip decisions for every domain the poller touches
///
/// Independent of the rate limiter's per-request failure streaks: the
/// breaker counts whole-source outcomes and its skip window is cleared
/// only by an explicit recorded success.
pub struct CircuitBreaker {
    config: BreakerConfig,
    domains: HashMap<String, BreakerState>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            domains: HashMap::new(),
        }
    }

    /// Records a cycle-level failure and opens the circuit
    ///
    /// Returns the cooling-off period applied.
    pub fn record_failure(&mut self, domain: &str, now: Instant) -> Duration {
        let state = self.domains.entry(domain.to_string()).or_default();
        state.failures += 1;
        let cooldown = self.config.cooldown(state.failures);
        state.skip_until = Some(now + cooldown);
        tracing::warn!(
            "Failure #{} for {}, backing off {}s",
            state.failures,
            domain,
            cooldown.as_secs()
        );
        cooldown
    }

    /// Records a success, unconditionally closing the circuit
    pub fn record_success(&mut self, domain: &str) {
        if let Some(state) = self.domains.remove(domain) {
            if state.failures > 0 {
                tracing::info!("Source recovered: {}", domain);
            }
        }
    }

    /// Whether the domain should be skipped this cycle
    pub fn should_skip(&self, domain: &str, now: Instant) -> bool {
        self.domains
            .get(domain)
            .and_then(|s| s.skip_until)
            .map(|until| now < until)
            .unwrap_or(false)
    }

    /// Convenience wrapper over `should_skip` using the current time
    pub fn should_skip_now(&self, domain: &str) -> bool {
        self.should_skip(domain, Instant::now())
    }

    /// Consecutive cycle-level failures recorded for a domain
    pub fn failure_count(&self, domain: &str) -> u32 {
        self.domains.get(domain).map(|s| s.failures).unwrap_or(0)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_by_default() {
        let breaker = CircuitBreaker::default();
        assert!(!breaker.should_skip("a.test", Instant::now()));
        assert_eq!(breaker.failure_count("a.test"), 0);
    }

    #[test]
    fn test_failure_opens_circuit() {
        let mut breaker = CircuitBreaker::default();
        let now = Instant::now();

        let cooldown = breaker.record_failure("a.test", now);
        assert_eq!(cooldown, Duration::from_secs(30));
        assert!(breaker.should_skip("a.test", now));
        assert!(breaker.should_skip("a.test", now + Duration::from_secs(29)));
        assert!(!breaker.should_skip("a.test", now + Duration::from_secs(30)));
    }

    #[test]
    fn test_cooldown_grows_exponentially_to_cap() {
        let mut breaker = CircuitBreaker::default();
        let now = Instant::now();

        let cooldowns: Vec<u64> = (0..6)
            .map(|_| breaker.record_failure("a.test", now).as_secs())
            .collect();
        // 30, 60, 120, 240, then 480 raw clamps to 300 and stays there
        assert_eq!(cooldowns, vec![30, 60, 120, 240, 300, 300]);
    }

    #[test]
    fn test_fifth_failure_skips_for_exactly_five_minutes() {
        let mut breaker = CircuitBreaker::default();
        let now = Instant::now();

        for _ in 0..5 {
            breaker.record_failure("a.test", now);
        }
        assert_eq!(breaker.failure_count("a.test"), 5);
        assert!(breaker.should_skip("a.test", now + Duration::from_secs(299)));
        assert!(!breaker.should_skip("a.test", now + Duration::from_secs(300)));
    }

    #[test]
    fn test_success_closes_circuit_regardless_of_depth() {
        let mut breaker = CircuitBreaker::default();
        let now = Instant::now();

        for _ in 0..4 {
            breaker.record_failure("a.test", now);
        }
        assert!(breaker.should_skip("a.test", now));

        breaker.record_success("a.test");
        assert!(!breaker.should_skip("a.test", now));
        assert_eq!(breaker.failure_count("a.test"), 0);

        // The next failure starts from the base delay again
        let cooldown = breaker.record_failure("a.test", now);
        assert_eq!(cooldown, Duration::from_secs(30));
    }

    #[test]
    fn test_success_on_unknown_domain_is_a_noop() {
        let mut breaker = CircuitBreaker::default();
        breaker.record_success("never-seen.test");
        assert_eq!(breaker.failure_count("never-seen.test"), 0);
    }

    #[test]
    fn test_domains_tracked_independently() {
        let mut breaker = CircuitBreaker::default();
        let now = Instant::now();

        breaker.record_failure("a.test", now);
        assert!(breaker.should_skip("a.test", now));
        assert!(!breaker.should_skip("b.test", now));
    }

    #[test]
    fn test_custom_config() {
        let mut breaker = CircuitBreaker::new(BreakerConfig {
            base_delay_secs: 10,
            cap_exponent: 2,
            max_delay_secs: 35,
        });
        let now = Instant::now();

        let cooldowns: Vec<u64> = (0..4)
            .map(|_| breaker.record_failure("a.test", now).as_secs())
            .collect();
        // 10, 20, then 40 raw clamps to 35; exponent capped afterwards
        assert_eq!(cooldowns, vec![10, 20, 35, 35]);
    }
}

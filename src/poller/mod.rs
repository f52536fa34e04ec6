//! Polling cycle orchestration
//!
//! One cycle walks the configured sources sequentially: circuit-breaker
//! gate, rate-limited fetch with retries, listing extraction, store
//! upsert, and finally the outcome recorded back into the breaker. A
//! skipped or failing source never aborts the batch; whatever remains
//! still runs.

use crate::boards::parse_listing;
use crate::breaker::CircuitBreaker;
use crate::config::{Config, SourceEntry};
use crate::fetch::{FetchExecutor, Fetcher};
use crate::limiter::RateLimiter;
use crate::storage::JobStore;
use crate::url::domain_of;
use chrono::Utc;
use std::time::Instant;
use url::Url;

/// Counters describing one polling cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Sources actually fetched this cycle
    pub sources_polled: usize,

    /// Sources skipped by the circuit breaker
    pub sources_skipped: usize,

    /// Postings seen across all listings, new or not
    pub jobs_seen: usize,

    /// Postings not previously in the store
    pub new_jobs: usize,

    /// Sources that failed to fetch or parse
    pub errors: usize,
}

/// Runs one polling cycle over the configured sources
///
/// Sources beyond `max_sources_per_run` are deferred to a later cycle.
/// Fetch failures and parse failures both count as cycle-level failures
/// for the source's domain; the breaker decides whether the source is
/// attempted again next cycle.
pub async fn poll_sources<F: Fetcher>(
    config: &Config,
    executor: &FetchExecutor<F>,
    limiter: &mut RateLimiter,
    breaker: &mut CircuitBreaker,
    store: &mut JobStore,
) -> PollReport {
    tracing::info!("Starting polling cycle ({} sources)", config.sources.len());
    let mut report = PollReport::default();

    for source in config
        .sources
        .iter()
        .take(config.scraping.max_sources_per_run)
    {
        let domain = match domain_of(&source.url) {
            Some(d) => d,
            None => {
                tracing::warn!("Source {} has no usable domain: {}", source.id, source.url);
                report.errors += 1;
                continue;
            }
        };

        if breaker.should_skip(&domain, Instant::now()) {
            tracing::warn!(
                "Skipping {} due to {} consecutive failures",
                source.id,
                breaker.failure_count(&domain)
            );
            report.sources_skipped += 1;
            continue;
        }

        tracing::info!("Polling {} ({})", source.id, source.url);
        report.sources_polled += 1;

        match poll_one(source, executor, limiter, store).await {
            Ok((seen, new)) => {
                breaker.record_success(&domain);
                report.jobs_seen += seen;
                report.new_jobs += new;
                tracing::info!("Completed {}: {} postings, {} new", source.id, seen, new);
            }
            Err(e) => {
                breaker.record_failure(&domain, Instant::now());
                report.errors += 1;
                tracing::error!("Polling failed for {}: {}", source.id, e);
            }
        }
    }

    tracing::info!(
        "Polling cycle completed: {} polled, {} skipped, {} postings ({} new), {} errors",
        report.sources_polled,
        report.sources_skipped,
        report.jobs_seen,
        report.new_jobs,
        report.errors
    );
    report
}

/// Fetches and ingests a single source's listing
async fn poll_one<F: Fetcher>(
    source: &SourceEntry,
    executor: &FetchExecutor<F>,
    limiter: &mut RateLimiter,
    store: &mut JobStore,
) -> crate::Result<(usize, usize)> {
    let response = executor
        .execute(&source.url, source.ready_marker.as_deref(), limiter)
        .await?;

    let board_url = Url::parse(&source.url)?;
    let selectors = source.selectors.clone().unwrap_or_default();
    let postings = parse_listing(&response.body, &board_url, &source.id, &selectors)?;

    let now = Utc::now();
    let mut new_jobs = 0;
    for posting in &postings {
        if store.get_job_by_hash(&posting.hash)?.is_none() {
            new_jobs += 1;
            tracing::info!("  New job: {} ({})", posting.title, posting.location);
        }
        store.upsert_posting(posting, now)?;
    }

    Ok((postings.len(), new_jobs))
}

/// Installs the configured per-domain rate limit overrides
pub fn apply_rate_limit_overrides(limiter: &mut RateLimiter, config: &Config) {
    for entry in &config.rate_limits {
        limiter.configure_domain(&entry.domain, entry.limits.clone());
    }
}

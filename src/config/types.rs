use crate::boards::SelectorConfig;
use crate::breaker::BreakerConfig;
use crate::limiter::RateLimitConfig;
use crate::resilience::BackupConfig;
use serde::Deserialize;

/// Main configuration structure for boardwatch
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub scraping: ScrapingConfig,

    #[serde(default, rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub breaker: BreakerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub sources: Vec<SourceEntry>,

    #[serde(default, rename = "rate-limits")]
    pub rate_limits: Vec<DomainRateLimit>,
}

/// Scraping behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapingConfig {
    /// User agent sent with every board request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Cap on sources polled in a single cycle
    #[serde(rename = "max-sources-per-run", default = "default_max_sources")]
    pub max_sources_per_run: usize,

    /// Per-attempt request timeout (seconds)
    #[serde(rename = "timeout-seconds", default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Attempts per logical fetch, including the first
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_user_agent() -> String {
    "boardwatch/0.1".to_string()
}

fn default_max_sources() -> usize {
    10
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            max_sources_per_run: default_max_sources(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

/// Durable store paths
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite job store
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Directory for log files
    #[serde(rename = "log-dir", default = "default_log_dir")]
    pub log_dir: String,

    /// Path to the single-instance lock file
    #[serde(rename = "lock-path", default = "default_lock_path")]
    pub lock_path: String,
}

fn default_database_path() -> String {
    "data/jobs.sqlite".to_string()
}

fn default_log_dir() -> String {
    "data/logs".to_string()
}

fn default_lock_path() -> String {
    "data/boardwatch.lock".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_dir: default_log_dir(),
            lock_path: default_lock_path(),
        }
    }
}

/// One configured job board source
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    /// Short identifier; doubles as the company name on extracted postings
    pub id: String,

    /// Listing page URL
    pub url: String,

    /// CSS selector a rendered-page backend waits for before capture
    #[serde(rename = "ready-marker", default)]
    pub ready_marker: Option<String>,

    /// Listing extraction selectors; defaults fit simple list markup
    #[serde(default)]
    pub selectors: Option<SelectorConfig>,
}

/// Per-domain rate limit override entry
#[derive(Debug, Clone, Deserialize)]
pub struct DomainRateLimit {
    /// Domain the override applies to
    pub domain: String,

    #[serde(flatten)]
    pub limits: RateLimitConfig,
}

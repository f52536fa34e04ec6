//! Boardwatch: a resilient job-board polling agent
//!
//! This crate implements the machinery that lets a periodic job-board
//! crawler survive the real world: per-domain rate limiting, bounded
//! retries with failure classification, per-source circuit breaking,
//! store snapshot/restore, single-instance locking, and startup
//! self-healing.

pub mod boards;
pub mod breaker;
pub mod config;
pub mod fetch;
pub mod limiter;
pub mod poller;
pub mod resilience;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for boardwatch operations
#[derive(Debug, Error)]
pub enum BoardwatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Scrape failure: {0}")]
    Scrape(#[from] fetch::ScrapeFailure),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Listing parse error: {0}")]
    Parse(#[from] boards::ParseError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for boardwatch operations
pub type Result<T> = std::result::Result<T, BoardwatchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use breaker::{BreakerConfig, CircuitBreaker};
pub use config::Config;
pub use fetch::{FetchExecutor, Fetcher, HttpFetcher, RetryConfig};
pub use limiter::{RateLimitConfig, RateLimiter};
pub use resilience::{DatabaseGuardian, ProcessLock, StartupReport};
pub use crate::url::extract_domain;

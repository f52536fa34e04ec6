//! Configuration module for boardwatch
//!
//! Handles loading, parsing, and validating TOML configuration files,
//! including per-source entries and per-domain rate limit overrides.

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, DomainRateLimit, ScrapingConfig, SourceEntry, StorageConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

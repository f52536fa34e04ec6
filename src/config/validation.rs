use crate::config::types::{Config, DomainRateLimit, ScrapingConfig, SourceEntry, StorageConfig};
use crate::limiter::RateLimitConfig;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraping(&config.scraping)?;
    validate_rate_limit("rate-limit", &config.rate_limit)?;
    validate_storage(&config.storage)?;
    validate_backup(config)?;
    validate_breaker(config)?;
    validate_sources(&config.sources)?;
    validate_rate_limit_overrides(&config.rate_limits)?;
    Ok(())
}

fn validate_scraping(config: &ScrapingConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.max_sources_per_run < 1 {
        return Err(ConfigError::Validation(
            "max-sources-per-run must be >= 1".to_string(),
        ));
    }

    if config.timeout_seconds < 1 {
        return Err(ConfigError::Validation(
            "timeout-seconds must be >= 1".to_string(),
        ));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(
            "max-retries must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_rate_limit(context: &str, config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.requests_per_minute < 1 {
        return Err(ConfigError::Validation(format!(
            "{}: requests-per-minute must be >= 1, got {}",
            context, config.requests_per_minute
        )));
    }
    Ok(())
}

fn validate_storage(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.lock_path.is_empty() {
        return Err(ConfigError::Validation(
            "lock-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_backup(config: &Config) -> Result<(), ConfigError> {
    let backup = &config.backup;
    if backup.enabled {
        if backup.backup_dir.is_empty() {
            return Err(ConfigError::Validation(
                "backup-dir cannot be empty when backups are enabled".to_string(),
            ));
        }
        if backup.max_backups < 1 {
            return Err(ConfigError::Validation(
                "max-backups must be >= 1".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_breaker(config: &Config) -> Result<(), ConfigError> {
    let breaker = &config.breaker;
    if breaker.base_delay_secs < 1 {
        return Err(ConfigError::Validation(
            "base-delay-secs must be >= 1".to_string(),
        ));
    }
    if breaker.max_delay_secs < breaker.base_delay_secs {
        return Err(ConfigError::Validation(format!(
            "max-delay-secs ({}) must be >= base-delay-secs ({})",
            breaker.max_delay_secs, breaker.base_delay_secs
        )));
    }
    Ok(())
}

fn validate_sources(sources: &[SourceEntry]) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for source in sources {
        if source.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source id cannot be empty".to_string(),
            ));
        }

        if !seen_ids.insert(source.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source id '{}'",
                source.id
            )));
        }

        let parsed = Url::parse(&source.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("source '{}': {} ({})", source.id, source.url, e))
        })?;

        if parsed.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "source '{}': URL has no host: {}",
                source.id, source.url
            )));
        }
    }

    Ok(())
}

fn validate_rate_limit_overrides(overrides: &[DomainRateLimit]) -> Result<(), ConfigError> {
    for entry in overrides {
        if entry.domain.trim().is_empty() {
            return Err(ConfigError::Validation(
                "rate-limits entry has an empty domain".to_string(),
            ));
        }
        validate_rate_limit(&format!("rate-limits for {}", entry.domain), &entry.limits)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::Config;

    fn base_config() -> Config {
        Config {
            sources: vec![SourceEntry {
                id: "acme".to_string(),
                url: "https://boards.example.com/acme".to_string(),
                ready_marker: None,
                selectors: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn test_empty_user_agent_rejected() {
        let mut config = base_config();
        config.scraping.user_agent = "  ".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let mut config = base_config();
        config.scraping.max_retries = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_rpm_rejected() {
        let mut config = base_config();
        config.rate_limit.requests_per_minute = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_source_without_host_rejected() {
        let mut config = base_config();
        config.sources[0].url = "file:///tmp/listing.html".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_duplicate_source_ids_rejected() {
        let mut config = base_config();
        config.sources.push(config.sources[0].clone());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_breaker_max_below_base_rejected() {
        let mut config = base_config();
        config.breaker.base_delay_secs = 60;
        config.breaker.max_delay_secs = 30;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_override_with_empty_domain_rejected() {
        let mut config = base_config();
        config.rate_limits.push(DomainRateLimit {
            domain: "".to_string(),
            limits: RateLimitConfig::default(),
        });
        assert!(validate(&config).is_err());
    }
}

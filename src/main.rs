//! Boardwatch main entry point
//!
//! Command-line agent that polls configured job boards with rate
//! limiting, retries, and circuit breaking, guarded by a single-instance
//! lock and startup self-healing.

use anyhow::{bail, Context};
use boardwatch::config::{load_config, Config};
use boardwatch::fetch::{build_http_client, HttpFetcher, RetryConfig};
use boardwatch::poller::{apply_rate_limit_overrides, poll_sources};
use boardwatch::resilience::{run_startup_checks, DatabaseGuardian, ProcessLock, StartupReport};
use boardwatch::storage::JobStore;
use boardwatch::{CircuitBreaker, FetchExecutor, RateLimiter};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Boardwatch: a resilient job-board polling agent
#[derive(Parser, Debug)]
#[command(name = "boardwatch")]
#[command(version)]
#[command(about = "Polls job boards without tripping rate limits or losing data", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// The mode to run the agent in
    #[arg(long, value_enum)]
    mode: Mode,

    /// Days of job history to keep in cleanup mode
    #[arg(long, default_value_t = 90)]
    cleanup_days: u32,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Poll all configured sources once
    Poll,
    /// Report store integrity and startup status
    Health,
    /// Create a manual backup
    Backup,
    /// Restore the store from the latest backup
    Restore,
    /// Remove old jobs from the store
    Cleanup,
    /// Show store statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) if cli.mode == Mode::Health => {
            // Health mode still reports on a broken deployment
            tracing::warn!("Configuration invalid, using defaults for health check: {}", e);
            Config::default()
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // One live instance at a time; the guard releases on every exit path
    let lock = ProcessLock::new(&config.storage.lock_path);
    let _guard = match lock.guard() {
        Some(guard) => guard,
        None => bail!("Another instance is already running"),
    };

    let guardian = DatabaseGuardian::new(&config.storage.database_path, config.backup.clone());

    let db_parent = Path::new(&config.storage.database_path)
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let log_dir = PathBuf::from(&config.storage.log_dir);
    let required_dirs = [db_parent.as_path(), log_dir.as_path()];

    let startup = run_startup_checks(&guardian, &required_dirs, &cli.config);
    if startup.has_issues() {
        tracing::warn!("Startup issues detected but continuing");
    }

    let result = match cli.mode {
        Mode::Poll => handle_poll(&config).await,
        Mode::Health => handle_health(&guardian, &startup),
        Mode::Backup => handle_backup(&guardian),
        Mode::Restore => handle_restore(&guardian),
        Mode::Cleanup => handle_cleanup(&config, cli.cleanup_days),
        Mode::Stats => handle_stats(&config),
    };

    if let Err(e) = &result {
        // Last-ditch snapshot so the failure state is recoverable
        if guardian.create_backup("emergency").is_some() {
            tracing::info!("Emergency database backup created");
        }
        tracing::error!("Run failed: {}", e);
    } else {
        tracing::info!("Boardwatch completed successfully ({:?} mode)", cli.mode);
    }

    result
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("boardwatch=info,warn"),
            1 => EnvFilter::new("boardwatch=debug,info"),
            2 => EnvFilter::new("boardwatch=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles poll mode: one cycle over all configured sources
async fn handle_poll(config: &Config) -> anyhow::Result<()> {
    if config.sources.is_empty() {
        bail!("No sources configured");
    }

    let client = build_http_client(
        &config.scraping.user_agent,
        Duration::from_secs(config.scraping.timeout_seconds),
    )
    .context("Failed to build HTTP client")?;

    let executor = FetchExecutor::new(
        HttpFetcher::new(client),
        RetryConfig::new(config.scraping.max_retries),
    );

    let mut limiter = RateLimiter::new(config.rate_limit.clone());
    apply_rate_limit_overrides(&mut limiter, config);
    let mut breaker = CircuitBreaker::new(config.breaker.clone());

    let mut store = JobStore::new(Path::new(&config.storage.database_path))
        .context("Failed to open job store")?;

    let report = poll_sources(config, &executor, &mut limiter, &mut breaker, &mut store).await;

    println!(
        "Polled {} source(s): {} postings ({} new), {} skipped, {} errors",
        report.sources_polled,
        report.jobs_seen,
        report.new_jobs,
        report.sources_skipped,
        report.errors
    );

    Ok(())
}

/// Handles health mode: prints the integrity and startup reports
fn handle_health(guardian: &DatabaseGuardian, startup: &StartupReport) -> anyhow::Result<()> {
    let integrity = guardian.check_integrity();

    println!("=== Boardwatch Health Report ===\n");
    println!("Store: {}", guardian.db_path().display());
    println!("  Readable: {}", integrity.readable);
    println!("  Healthy:  {}", integrity.healthy);
    println!("  Tables:   {}", integrity.table_count);
    println!("  Jobs:     {}", integrity.job_count);
    for error in &integrity.errors {
        println!("  Error: {}", error);
    }

    println!("\nStartup checks:");
    println!("  Directories ready: {}", startup.directories_ready);
    println!("  Database healthy:  {}", startup.database_healthy);
    println!("  Backup created:    {}", startup.backup_created);
    println!("  Config valid:      {}", startup.config_valid);
    for issue in &startup.issues_found {
        println!("  Issue: {}", issue);
    }
    for action in &startup.actions_taken {
        println!("  Action: {}", action);
    }

    match guardian.latest_backup() {
        Some(path) => println!("\nLatest backup: {}", path.display()),
        None => println!("\nLatest backup: none"),
    }

    Ok(())
}

/// Handles backup mode: creates a manual snapshot
fn handle_backup(guardian: &DatabaseGuardian) -> anyhow::Result<()> {
    match guardian.create_backup("manual") {
        Some(path) => {
            println!("Backup created: {}", path.display());
            Ok(())
        }
        None => bail!("Backup was not created (store missing or backups disabled)"),
    }
}

/// Handles restore mode: restores from the latest backup
fn handle_restore(guardian: &DatabaseGuardian) -> anyhow::Result<()> {
    if guardian.restore_from_backup(None) {
        println!("Store restored from latest backup");
        Ok(())
    } else {
        bail!("Restore failed; check logs for details")
    }
}

/// Handles cleanup mode: prunes old jobs
fn handle_cleanup(config: &Config, days: u32) -> anyhow::Result<()> {
    let mut store = JobStore::new(Path::new(&config.storage.database_path))
        .context("Failed to open job store")?;
    let deleted = store.cleanup_old_jobs(days, Utc::now())?;
    println!("Removed {} job(s) older than {} days", deleted, days);
    Ok(())
}

/// Handles stats mode: prints store counters
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let store = JobStore::new(Path::new(&config.storage.database_path))
        .context("Failed to open job store")?;
    let stats = store.store_stats(Utc::now())?;

    println!("Store: {}\n", config.storage.database_path);
    println!("Total jobs:        {}", stats.total_jobs);
    println!("New in last 24h:   {}", stats.recent_jobs_24h);
    println!("High score (>0.8): {}", stats.high_score_jobs);

    Ok(())
}

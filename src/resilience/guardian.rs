//! Store snapshot, integrity checking, and restore
//!
//! The guardian never propagates errors: backup failures must not abort
//! a polling run, and integrity problems are reported, not thrown. Every
//! snapshot goes through SQLite's online backup API so a half-written
//! page can never be captured, and retention keeps only the newest
//! `max_backups` artifacts.

use chrono::Local;
use rusqlite::backup::Backup;
use rusqlite::Connection;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const BACKUP_PREFIX: &str = "jobs_backup_";

/// Configuration for backup operations
#[derive(Debug, Clone, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(rename = "backup-dir", default = "default_backup_dir")]
    pub backup_dir: String,

    #[serde(rename = "max-backups", default = "default_max_backups")]
    pub max_backups: usize,

    #[serde(rename = "backup-interval-hours", default = "default_interval_hours")]
    pub backup_interval_hours: u64,

    #[serde(rename = "auto-backup-on-startup", default = "default_enabled")]
    pub auto_backup_on_startup: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_backup_dir() -> String {
    "data/backups".to_string()
}

fn default_max_backups() -> usize {
    7
}

fn default_interval_hours() -> u64 {
    24
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            backup_dir: default_backup_dir(),
            max_backups: default_max_backups(),
            backup_interval_hours: default_interval_hours(),
            auto_backup_on_startup: default_enabled(),
        }
    }
}

/// Outcome of a structural store inspection
///
/// `readable` means the engine could actually read the file; `healthy`
/// additionally requires a clean integrity check and a countable jobs
/// table. An unreadable store is the only state that triggers automatic
/// restore at startup.
#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    pub healthy: bool,
    pub readable: bool,
    pub table_count: u64,
    pub job_count: u64,
    pub errors: Vec<String>,
}

/// Handles store backup, recovery, and corruption detection
pub struct DatabaseGuardian {
    db_path: PathBuf,
    config: BackupConfig,
}

impl DatabaseGuardian {
    pub fn new(db_path: impl Into<PathBuf>, config: BackupConfig) -> Self {
        let guardian = Self {
            db_path: db_path.into(),
            config,
        };
        if guardian.config.enabled {
            if let Err(e) = std::fs::create_dir_all(&guardian.config.backup_dir) {
                tracing::warn!(
                    "Failed to create backup directory {}: {}",
                    guardian.config.backup_dir,
                    e
                );
            }
        }
        guardian
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Creates a reason-tagged snapshot of the store
    ///
    /// Uses SQLite's online backup API rather than a file copy, so the
    /// snapshot is structurally consistent even if the store was open.
    /// Returns the artifact path, or None on any failure; backup
    /// problems never abort the caller.
    pub fn create_backup(&self, reason: &str) -> Option<PathBuf> {
        if !self.config.enabled || !self.db_path.exists() {
            return None;
        }

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let name = format!("{}{}_{}.sqlite", BACKUP_PREFIX, timestamp, reason);
        let backup_path = Path::new(&self.config.backup_dir).join(name);

        match self.run_backup(&backup_path) {
            Ok(()) => {
                tracing::info!("Database backup created: {}", backup_path.display());
                self.cleanup_old_backups();
                Some(backup_path)
            }
            Err(e) => {
                tracing::error!("Failed to create database backup: {}", e);
                // Do not leave a partial artifact behind
                let _ = std::fs::remove_file(&backup_path);
                None
            }
        }
    }

    fn run_backup(&self, backup_path: &Path) -> Result<(), rusqlite::Error> {
        let src = Connection::open(&self.db_path)?;
        let mut dst = Connection::open(backup_path)?;
        let backup = Backup::new(&src, &mut dst)?;
        backup.run_to_completion(64, Duration::from_millis(50), None)
    }

    /// Restores the primary store from a backup artifact
    ///
    /// With no artifact given, the most recently modified one is used.
    /// The current store, if present, is first snapshotted under the
    /// `pre_restore` reason so a bad restore is itself recoverable.
    pub fn restore_from_backup(&self, backup: Option<&Path>) -> bool {
        let chosen = match backup {
            Some(path) => path.to_path_buf(),
            None => match self.latest_backup() {
                Some(path) => path,
                None => {
                    tracing::error!("No backup available for restore");
                    return false;
                }
            },
        };

        if !chosen.exists() {
            tracing::error!("Backup artifact does not exist: {}", chosen.display());
            return false;
        }

        if self.db_path.exists() {
            self.create_backup("pre_restore");
        }

        match std::fs::copy(&chosen, &self.db_path) {
            Ok(_) => {
                tracing::info!("Database restored from {}", chosen.display());
                true
            }
            Err(e) => {
                tracing::error!("Failed to restore from {}: {}", chosen.display(), e);
                false
            }
        }
    }

    /// Inspects the store for corruption and structural problems
    ///
    /// Never panics or returns Err: every failure mode becomes an error
    /// entry in the report.
    pub fn check_integrity(&self) -> IntegrityReport {
        let mut report = IntegrityReport::default();

        if !self.db_path.exists() {
            report.errors.push("Database file does not exist".to_string());
            return report;
        }

        let conn = match Connection::open(&self.db_path) {
            Ok(conn) => conn,
            Err(e) => {
                report
                    .errors
                    .push(format!("Database connection failed: {}", e));
                return report;
            }
        };

        // Basic connectivity: can the engine actually read the file?
        match conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
            [],
            |row| row.get::<_, i64>(0),
        ) {
            Ok(tables) => {
                report.readable = true;
                report.table_count = tables as u64;
            }
            Err(e) => {
                report
                    .errors
                    .push(format!("Database connection failed: {}", e));
                return report;
            }
        }

        match conn.query_row("PRAGMA integrity_check", [], |row| row.get::<_, String>(0)) {
            Ok(result) if result == "ok" => {}
            Ok(result) => report
                .errors
                .push(format!("Integrity check failed: {}", result)),
            Err(e) => report
                .errors
                .push(format!("Integrity check failed: {}", e)),
        }

        match conn.query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get::<_, i64>(0)) {
            Ok(jobs) => report.job_count = jobs as u64,
            Err(e) => report.errors.push(format!("Failed to count jobs: {}", e)),
        }

        report.healthy = report.errors.is_empty();
        report
    }

    /// Creates a backup if the schedule calls for one
    ///
    /// An "initial" backup when none exists, a "scheduled" one when the
    /// newest artifact is older than the configured interval, otherwise
    /// nothing. Returns whether a backup was created.
    pub fn auto_backup_if_needed(&self) -> bool {
        if !self.config.enabled || !self.config.auto_backup_on_startup {
            return false;
        }

        let latest = match self.latest_backup() {
            Some(path) => path,
            None => return self.create_backup("initial").is_some(),
        };

        let interval = Duration::from_secs(self.config.backup_interval_hours * 3600);
        let age = artifact_mtime(&latest)
            .and_then(|mtime| SystemTime::now().duration_since(mtime).ok())
            .unwrap_or(Duration::ZERO);

        if age > interval {
            return self.create_backup("scheduled").is_some();
        }

        false
    }

    /// The most recently modified backup artifact, if any
    pub fn latest_backup(&self) -> Option<PathBuf> {
        self.list_backups()
            .into_iter()
            .max_by_key(|path| artifact_mtime(path).unwrap_or(SystemTime::UNIX_EPOCH))
    }

    /// Deletes oldest backups beyond the retention limit
    fn cleanup_old_backups(&self) {
        let mut backups = self.list_backups();
        if backups.len() <= self.config.max_backups {
            return;
        }

        backups.sort_by_key(|path| artifact_mtime(path).unwrap_or(SystemTime::UNIX_EPOCH));

        let excess = backups.len() - self.config.max_backups;
        for backup in backups.into_iter().take(excess) {
            match std::fs::remove_file(&backup) {
                Ok(()) => tracing::debug!("Removed old backup: {}", backup.display()),
                Err(e) => {
                    tracing::warn!("Failed to remove old backup {}: {}", backup.display(), e)
                }
            }
        }
    }

    fn list_backups(&self) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.config.backup_dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.starts_with(BACKUP_PREFIX) && name.ends_with(".sqlite"))
                    .unwrap_or(false)
            })
            .collect()
    }
}

fn artifact_mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

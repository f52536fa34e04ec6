//! SQLite job store implementation

use crate::boards::JobPosting;
use crate::storage::schema::initialize_schema;
use crate::storage::{JobRecord, StorageResult, StoreStats};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend for job postings
pub struct JobStore {
    conn: Connection,
}

impl JobStore {
    /// Opens or creates the job store at the given path
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory store (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Inserts a new posting or refreshes an existing one by hash
    ///
    /// Re-sighting an existing posting bumps `last_seen`, `times_seen`,
    /// and `updated_at`; the original `created_at` is preserved so the
    /// digest window stays meaningful. Returns the row id.
    pub fn upsert_posting(
        &mut self,
        posting: &JobPosting,
        now: DateTime<Utc>,
    ) -> StorageResult<i64> {
        let timestamp = now.to_rfc3339();

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM jobs WHERE hash = ?1",
                params![posting.hash],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            self.conn.execute(
                "UPDATE jobs SET last_seen = ?1, updated_at = ?1,
                 times_seen = times_seen + 1 WHERE id = ?2",
                params![timestamp, id],
            )?;
            tracing::debug!("Refreshed existing job: {}", posting.title);
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO jobs (hash, title, url, company, location, description,
             created_at, updated_at, last_seen)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?7)",
            params![
                posting.hash,
                posting.title,
                posting.url,
                posting.company,
                posting.location,
                posting.description,
                timestamp,
            ],
        )?;
        tracing::debug!("Added new job: {}", posting.title);
        Ok(self.conn.last_insert_rowid())
    }

    /// Looks up a job by its content hash
    pub fn get_job_by_hash(&self, hash: &str) -> StorageResult<Option<JobRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, hash, title, url, company, location, description,
                 score, score_reasons, created_at, updated_at, last_seen, times_seen
                 FROM jobs WHERE hash = ?1",
                params![hash],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Total number of stored jobs
    pub fn count_jobs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Store counters for the stats mode and health reporting
    pub fn store_stats(&self, now: DateTime<Utc>) -> StorageResult<StoreStats> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?;

        let cutoff = (now - Duration::hours(24)).to_rfc3339();
        let recent: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE created_at >= ?1",
            params![cutoff],
            |row| row.get(0),
        )?;

        let high_score: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM jobs WHERE score >= 0.8", [], |row| {
                row.get(0)
            })?;

        Ok(StoreStats {
            total_jobs: total as u64,
            recent_jobs_24h: recent as u64,
            high_score_jobs: high_score as u64,
        })
    }

    /// Deletes jobs first seen more than `days_to_keep` days ago
    ///
    /// Returns the number of rows removed.
    pub fn cleanup_old_jobs(&mut self, days_to_keep: u32, now: DateTime<Utc>) -> StorageResult<usize> {
        let cutoff = (now - Duration::days(days_to_keep as i64)).to_rfc3339();
        let deleted = self.conn.execute(
            "DELETE FROM jobs WHERE created_at < ?1",
            params![cutoff],
        )?;
        tracing::info!("Cleaned up {} jobs older than {} days", deleted, days_to_keep);
        Ok(deleted)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobRecord> {
    Ok(JobRecord {
        id: row.get(0)?,
        hash: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
        company: row.get(4)?,
        location: row.get(5)?,
        description: row.get(6)?,
        score: row.get(7)?,
        score_reasons: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        last_seen: row.get(11)?,
        times_seen: row.get(12)?,
    })
}

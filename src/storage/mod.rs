//! Durable job store
//!
//! SQLite-backed persistence for job postings keyed by content hash.
//! Scoring columns exist in the schema but are written by the external
//! scoring collaborator; this module only tracks sightings, timestamps,
//! and retention.

mod schema;
mod sqlite;

pub use schema::initialize_schema;
pub use sqlite::JobStore;

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Job not found: {0}")]
    JobNotFound(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A job row as persisted in the store
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: i64,
    pub hash: String,
    pub title: String,
    pub url: String,
    pub company: String,
    pub location: String,
    pub description: Option<String>,
    pub score: f64,
    pub score_reasons: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub last_seen: String,
    pub times_seen: u32,
}

/// Store counters used by the stats mode and health reporting
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total_jobs: u64,
    pub recent_jobs_24h: u64,
    pub high_score_jobs: u64,
}

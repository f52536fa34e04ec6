//! Job posting model and listing extraction
//!
//! Board-specific parser suites live outside this crate; the core only
//! needs a posting model, a stable content hash for deduplication, and
//! one reference adapter (`parse_listing`) that turns a listing page into
//! postings via configurable CSS selectors.

mod selector;

pub use selector::{parse_listing, SelectorConfig};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from listing extraction
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid CSS selector '{0}'")]
    Selector(String),
}

/// A single job posting as seen on a board
#[derive(Debug, Clone, PartialEq)]
pub struct JobPosting {
    /// Stable content hash; the dedup key in the store
    pub hash: String,
    pub title: String,
    pub url: String,
    pub company: String,
    pub location: String,
    pub description: String,
}

/// Computes a stable content hash for a job
///
/// Company, title, and the first 250 characters of the description are
/// lowercased and stripped of all whitespace before hashing, so cosmetic
/// reformatting on the board does not produce a "new" job.
pub fn job_content_hash(company: &str, title: &str, description: &str) -> String {
    let norm_company = normalize(company);
    let norm_title = normalize(title);
    let norm_desc: String = normalize(description).chars().take(250).collect();

    let mut hasher = Sha256::new();
    hasher.update(norm_company.as_bytes());
    hasher.update(norm_title.as_bytes());
    hasher.update(norm_desc.as_bytes());
    hex::encode(hasher.finalize())
}

fn normalize(text: &str) -> String {
    text.to_lowercase().split_whitespace().collect()
}

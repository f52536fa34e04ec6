//! Selector-driven listing adapter
//!
//! A generic extraction path for boards without a dedicated parser: pick
//! posting rows with a CSS selector, then pull title, location, and link
//! out of each row. Rows missing a title or link are skipped rather than
//! failing the whole listing.

use crate::boards::{job_content_hash, JobPosting, ParseError};
use scraper::{Html, Selector};
use serde::Deserialize;
use url::Url;

/// CSS selectors describing a listing page's structure
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Selector matching one posting row
    #[serde(default = "default_row")]
    pub row: String,

    /// Selector for the title element within a row
    #[serde(default = "default_title")]
    pub title: String,

    /// Selector for the location element within a row, if the board has one
    #[serde(default)]
    pub location: Option<String>,

    /// Selector for the posting link within a row
    #[serde(default = "default_link")]
    pub link: String,
}

fn default_row() -> String {
    "li.job".to_string()
}

fn default_title() -> String {
    ".job-title".to_string()
}

fn default_link() -> String {
    "a".to_string()
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            row: default_row(),
            title: default_title(),
            location: Some(".job-location".to_string()),
            link: default_link(),
        }
    }
}

/// Parses a listing page into job postings
///
/// Relative posting links are resolved against `board_url`. Location
/// falls back to a placeholder when the board does not expose one on the
/// listing page; the content hash is derived from title and location so
/// it stays stable without a description fetch.
///
/// # Arguments
///
/// * `html` - The listing page markup
/// * `board_url` - The listing URL, used to resolve relative links
/// * `company` - Company name stamped on each extracted posting
/// * `selectors` - CSS selectors describing the listing structure
///
/// # Returns
///
/// * `Ok(Vec<JobPosting>)` - Extracted postings (possibly empty)
/// * `Err(ParseError)` - A selector failed to compile
pub fn parse_listing(
    html: &str,
    board_url: &Url,
    company: &str,
    selectors: &SelectorConfig,
) -> Result<Vec<JobPosting>, ParseError> {
    let row_sel = compile(&selectors.row)?;
    let title_sel = compile(&selectors.title)?;
    let link_sel = compile(&selectors.link)?;
    let location_sel = selectors
        .location
        .as_deref()
        .map(compile)
        .transpose()?;

    let document = Html::parse_document(html);
    let mut postings = Vec::new();

    for row in document.select(&row_sel) {
        let title = match row.select(&title_sel).next() {
            Some(el) => element_text(&el),
            None => continue,
        };
        let href = match row
            .select(&link_sel)
            .next()
            .and_then(|el| el.value().attr("href"))
        {
            Some(href) => href,
            None => continue,
        };
        if title.is_empty() {
            continue;
        }

        let url = match board_url.join(href) {
            Ok(resolved) => resolved.to_string(),
            Err(_) => {
                tracing::debug!("Skipping posting with unresolvable link: {}", href);
                continue;
            }
        };

        let location = location_sel
            .as_ref()
            .and_then(|sel| row.select(sel).next())
            .map(|el| element_text(&el))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "See description".to_string());

        let description_stub = format!("{} {}", title, location);
        let hash = job_content_hash(company, &title, &description_stub);

        postings.push(JobPosting {
            hash,
            title,
            url,
            company: company.to_string(),
            location,
            description: String::new(),
        });
    }

    Ok(postings)
}

fn compile(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|_| ParseError::Selector(selector.to_string()))
}

fn element_text(element: &scraper::ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

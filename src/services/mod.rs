//! Source scrapers and the source registry.
//!
//! - `SourceScraper`: the contract every source implements
//! - `HtmlListingScraper`: selector-driven scraper for listing + detail pages
//! - `SourceRegistry`: source id to scraper mapping, built once at startup

mod listing;
pub mod parse;
mod registry;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::models::ProgramEntry;
use crate::pipeline::RunBudget;

pub use listing::HtmlListingScraper;
pub use registry::SourceRegistry;

/// Summary of one scrape of one source.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeOutcome {
    /// Parsed entries in listing order
    pub entries: Vec<ProgramEntry>,

    /// Entry-level parse faults that were skipped
    pub skipped_entries: Vec<String>,

    /// Detail pages that were due
    pub detail_total: usize,

    /// Detail pages that failed to load or parse
    pub detail_failures: usize,

    /// Detail pages not attempted because the run budget ran out
    pub detail_skipped: usize,

    /// Indices into `entries` whose detail page was not applied
    pub degraded: Vec<usize>,
}

impl ScrapeOutcome {
    /// Outcome holding only listing entries.
    pub fn from_entries(entries: Vec<ProgramEntry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }
}

/// A programme source.
#[async_trait]
pub trait SourceScraper: Send + Sync {
    /// Stable identifier, used as registry and storage key.
    fn source_id(&self) -> &str;

    fn display_name(&self) -> &str;

    fn source_url(&self) -> &str;

    /// Fetch and parse the source's current listing.
    ///
    /// Fails with `AppError::Fetch` when the listing cannot be retrieved and
    /// `AppError::Parse` when its structure is unrecognisable. Faults in
    /// single entries or detail pages are absorbed into the outcome.
    async fn scrape(&self, budget: &RunBudget) -> Result<ScrapeOutcome>;
}

//! Error taxonomy for the odds retrieval pipeline.
//!
//! Page-level failures (`Navigation`, `Parse`) are recoverable: the collector
//! records them on the affected race and keeps going. `Discovery` means the
//! day's race list could not be built at all and the run cannot proceed.

use chrono::NaiveDate;
use thiserror::Error;

use crate::scraper::parsers::PageKind;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The page could not be reached or did not finish loading in time.
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The page loaded but its expected structure is missing. Usually means
    /// the site layout drifted; retrying will not help.
    #[error("{kind} page not recognized: {reason}")]
    Parse { kind: PageKind, reason: String },

    /// The schedule page for the day could not be turned into a race list.
    #[error("race discovery failed for {date}: {source}")]
    Discovery {
        date: NaiveDate,
        #[source]
        source: Box<ScrapeError>,
    },
}

impl ScrapeError {
    pub fn navigation(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn parse(kind: PageKind, reason: impl Into<String>) -> Self {
        Self::Parse {
            kind,
            reason: reason.into(),
        }
    }

    pub fn discovery(date: NaiveDate, source: ScrapeError) -> Self {
        Self::Discovery {
            date,
            source: Box::new(source),
        }
    }
}

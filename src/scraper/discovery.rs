//! Race discovery: turn a date into the list of races to collect.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::ScrapeError;
use crate::scraper::parsers::RaceListParser;
use crate::scraper::{schedule_url, PageFetcher, WaitFor};
use crate::types::RaceId;

/// Discovers the day's races from the odds index page.
pub struct RaceDiscovery<'a> {
    fetcher: &'a dyn PageFetcher,
}

impl<'a> RaceDiscovery<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher) -> Self {
        Self { fetcher }
    }

    /// Fetch and parse the schedule. An empty list is a valid no-racing day;
    /// any fetch or parse failure is fatal for the run and comes back as
    /// `ScrapeError::Discovery`.
    pub async fn discover(&self, date: NaiveDate) -> Result<Vec<RaceId>, ScrapeError> {
        let url = schedule_url(date);
        debug!("fetching odds index: {}", url);

        let html = self
            .fetcher
            .fetch(&url, WaitFor::Selector("#contents"))
            .await
            .map_err(|e| ScrapeError::discovery(date, e))?;

        let races =
            RaceListParser::parse(&html, date).map_err(|e| ScrapeError::discovery(date, e))?;

        info!("discovered {} races for {}", races.len(), date);
        Ok(races)
    }
}

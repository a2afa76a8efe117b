//! Race list parser for jra.go.jp
//!
//! Parses the odds index page to find which races run on a date.
//! URL: https://www.jra.go.jp/keiba/odds/index.html?date=YYYYMMDD

use chrono::NaiveDate;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::warn;

use crate::error::ScrapeError;
use crate::scraper::parsers::PageKind;
use crate::types::{RaceId, Track};

/// Parser for the odds index (schedule) page
pub struct RaceListParser;

impl RaceListParser {
    /// Extract every race offered for the date.
    ///
    /// Meeting blocks appear in document order; races within a block are
    /// returned in ascending race number. An index page with no meeting
    /// blocks is a valid no-racing day and yields an empty list.
    pub fn parse(html: &str, date: NaiveDate) -> Result<Vec<RaceId>, ScrapeError> {
        let document = Html::parse_document(html);

        // The page body always sits inside #contents; its absence means a
        // blank or redesigned page rather than a quiet day.
        let contents_selector = Selector::parse("#contents").unwrap();
        if document.select(&contents_selector).next().is_none() {
            return Err(ScrapeError::parse(
                PageKind::RaceList,
                "odds index container #contents not found",
            ));
        }

        let block_selector = Selector::parse(".kaisai, div[class*='kaisai']").unwrap();
        let link_selector = Selector::parse("a").unwrap();
        let track_re =
            Regex::new(r"(札幌|函館|福島|新潟|東京|中山|中京|京都|阪神|小倉)").unwrap();
        let race_no_re = Regex::new(r"(\d{1,2})\s*R").unwrap();

        let mut races = Vec::new();
        for block in document.select(&block_selector) {
            let block_text = block.text().collect::<String>();
            let track = match track_re
                .find(&block_text)
                .and_then(|m| m.as_str().parse::<Track>().ok())
            {
                Some(track) => track,
                None => {
                    warn!("skipping meeting block without a recognized course name");
                    continue;
                }
            };

            let mut numbers: Vec<u8> = Vec::new();
            for link in block.select(&link_selector) {
                let text = link.text().collect::<String>();
                if let Some(caps) = race_no_re.captures(&text) {
                    if let Ok(number) = caps[1].parse::<u8>() {
                        if (1..=12).contains(&number) && !numbers.contains(&number) {
                            numbers.push(number);
                        }
                    }
                }
            }

            numbers.sort_unstable();
            for number in numbers {
                let race = RaceId::new(date, track, number);
                if !races.contains(&race) {
                    races.push(race);
                }
            }
        }

        Ok(races)
    }
}

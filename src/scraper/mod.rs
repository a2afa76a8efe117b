//! Web scraper module for jra.go.jp
//!
//! Provides browser automation, HTML parsing, race discovery and the
//! concurrent day collector.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScrapeError;
use crate::types::RaceId;

pub mod browser;
pub mod collector;
pub mod discovery;
pub mod parsers;
pub mod rate_limiter;

pub use browser::Browser;
pub use collector::{CancelFlag, OddsCollector};
pub use discovery::RaceDiscovery;
pub use rate_limiter::RateLimiter;

/// Base URL for jra.go.jp
pub const BASE_URL: &str = "https://www.jra.go.jp";

/// What to wait for after navigation before the DOM is read. The odds pages
/// fill their tables in by script, so an immediate read sees empty markup.
#[derive(Debug, Clone)]
pub enum WaitFor {
    /// Fixed settle delay.
    Settle(Duration),
    /// Poll until the selector matches, bounded by the navigation timeout.
    Selector(&'static str),
}

/// A source of rendered page markup. The production implementation drives a
/// headless browser; tests substitute an in-memory map.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, wait: WaitFor) -> Result<String, ScrapeError>;
}

/// Build odds index (schedule) URL for a date
/// URL: https://www.jra.go.jp/keiba/odds/index.html?date=YYYYMMDD
pub fn schedule_url(date: chrono::NaiveDate) -> String {
    format!(
        "{}/keiba/odds/index.html?date={}",
        BASE_URL,
        date.format("%Y%m%d")
    )
}

/// Build win/place (単勝・複勝) odds URL for a race
/// URL: https://www.jra.go.jp/keiba/odds/tanpuku.html?race_id=RACEID
pub fn win_place_url(race: &RaceId) -> String {
    format!("{}/keiba/odds/tanpuku.html?race_id={}", BASE_URL, race.code())
}

/// Build quinella (馬連) odds URL for a race
/// URL: https://www.jra.go.jp/keiba/odds/umaren.html?race_id=RACEID
pub fn quinella_url(race: &RaceId) -> String {
    format!("{}/keiba/odds/umaren.html?race_id={}", BASE_URL, race.code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Track;
    use chrono::NaiveDate;

    #[test]
    fn test_schedule_url() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 11).unwrap();
        assert_eq!(
            schedule_url(date),
            "https://www.jra.go.jp/keiba/odds/index.html?date=20260111"
        );
    }

    #[test]
    fn test_odds_urls() {
        let race = RaceId::new(
            NaiveDate::from_ymd_opt(2026, 1, 11).unwrap(),
            Track::Nakayama,
            11,
        );
        assert_eq!(
            win_place_url(&race),
            "https://www.jra.go.jp/keiba/odds/tanpuku.html?race_id=202601110611"
        );
        assert_eq!(
            quinella_url(&race),
            "https://www.jra.go.jp/keiba/odds/umaren.html?race_id=202601110611"
        );
    }
}

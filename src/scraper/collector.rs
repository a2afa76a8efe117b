//! Concurrent per-race odds collection.
//!
//! Fans the discovered races out over a bounded worker pool. Each race costs
//! two page fetches (win/place, then quinella); a failed page is recorded on
//! the race and never aborts the day.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::scraper::parsers::{OddsTableParser, RaceHeader};
use crate::scraper::{quinella_url, win_place_url, PageFetcher, RateLimiter, WaitFor};
use crate::types::{FetchStatus, OddsEntry, RaceId, RaceOdds};

/// Cooperative cancellation handle. Once raised, no further race starts;
/// races already in flight run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Collects odds for a set of races against one page source.
pub struct OddsCollector<'a> {
    fetcher: &'a dyn PageFetcher,
    limiter: RateLimiter,
    semaphore: Arc<Semaphore>,
    settle: Duration,
    cancel: CancelFlag,
}

impl<'a> OddsCollector<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, config: &ScraperConfig) -> Self {
        Self {
            fetcher,
            limiter: RateLimiter::from_config(config),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_races.max(1))),
            settle: Duration::from_millis(config.settle_ms),
            cancel: CancelFlag::new(),
        }
    }

    /// Handle for requesting cancellation from outside the run.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Fetch every race, at most `max_concurrent_races` in flight at once.
    ///
    /// Records come back in the order the races were given, regardless of
    /// completion order. `on_progress` fires once per attempted race with a
    /// strictly increasing completed count; races skipped after cancellation
    /// are omitted from both the records and the count.
    pub async fn collect<F>(&self, races: &[RaceId], on_progress: F) -> Vec<RaceOdds>
    where
        F: Fn(usize, usize, &RaceId) + Send + Sync,
    {
        let total = races.len();
        if total == 0 {
            return Vec::new();
        }

        // Serializes the counter bump and the callback together.
        let completed = Mutex::new(0usize);
        let completed = &completed;
        let on_progress = &on_progress;

        let tasks = races.iter().map(|race| {
            let race = *race;
            async move {
                let _permit = self.semaphore.acquire().await.unwrap();
                if self.cancel.is_cancelled() {
                    debug!("cancelled, not starting {}", race);
                    return None;
                }

                let record = self.collect_race(&race).await;

                {
                    let mut done = completed.lock().unwrap();
                    *done += 1;
                    on_progress(*done, total, &race);
                }

                Some(record)
            }
        });

        join_all(tasks).await.into_iter().flatten().collect()
    }

    /// Fetch and parse both odds pages for one race. Never fails; page
    /// errors end up in the record's status and error text.
    async fn collect_race(&self, race: &RaceId) -> RaceOdds {
        let mut header = RaceHeader::default();
        let mut entries: Vec<OddsEntry> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        let mut pages_ok = 0usize;

        self.limiter.acquire().await;
        match self.fetch_win_place(race).await {
            Ok((page_header, mut page_entries)) => {
                header = page_header;
                entries.append(&mut page_entries);
                pages_ok += 1;
            }
            Err(e) => {
                warn!("{}: win/place page failed: {}", race, e);
                errors.push(e.to_string());
            }
        }

        self.limiter.acquire().await;
        match self.fetch_quinella(race).await {
            Ok(mut page_entries) => {
                entries.append(&mut page_entries);
                pages_ok += 1;
            }
            Err(e) => {
                warn!("{}: quinella page failed: {}", race, e);
                errors.push(e.to_string());
            }
        }

        let status = if errors.is_empty() {
            FetchStatus::Ok
        } else if pages_ok > 0 {
            FetchStatus::Partial
        } else {
            FetchStatus::Failed
        };

        debug!(
            "{}: {} entries, status {:?}",
            race,
            entries.len(),
            status
        );

        RaceOdds {
            race: *race,
            race_name: header.race_name,
            post_time: header.post_time,
            entries,
            status,
            error: if errors.is_empty() {
                None
            } else {
                Some(errors.join("; "))
            },
        }
    }

    async fn fetch_win_place(
        &self,
        race: &RaceId,
    ) -> Result<(RaceHeader, Vec<OddsEntry>), ScrapeError> {
        let url = win_place_url(race);
        let html = self
            .fetcher
            .fetch(&url, WaitFor::Settle(self.settle))
            .await?;
        OddsTableParser::parse_win_place(&html)
    }

    async fn fetch_quinella(&self, race: &RaceId) -> Result<Vec<OddsEntry>, ScrapeError> {
        let url = quinella_url(race);
        let html = self
            .fetcher
            .fetch(&url, WaitFor::Settle(self.settle))
            .await?;
        OddsTableParser::parse_quinella(&html)
    }
}

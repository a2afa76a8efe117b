//! CLI commands for jra-odds.
//!
//! Supports a full-day collection run and a single-race lookup.

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::aggregate::aggregate;
use crate::config::AppConfig;
use crate::export;
use crate::retry::{with_retries, RetryPolicy};
use crate::scraper::{Browser, OddsCollector, RaceDiscovery};
use crate::types::{BetType, DayDataset, OddsEntry, RaceId, RaceOdds, Track};

#[derive(Parser)]
#[command(name = "jra-odds")]
#[command(version, about = "Fetch, aggregate and export JRA odds for a race day", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect every race for a date and export the day's odds
    Day {
        /// Date to collect (YYYY-MM-DD)
        #[arg(value_name = "DATE")]
        date: NaiveDate,

        /// Cap on concurrently fetched races
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Output directory (default from config)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Also write one CSV per track
        #[arg(long)]
        csv: bool,
    },

    /// Collect a single race and print its odds
    Race {
        /// Date of the race (YYYY-MM-DD)
        #[arg(value_name = "DATE")]
        date: NaiveDate,

        /// Course name (e.g. 中山) or course code (1-10)
        #[arg(value_name = "TRACK")]
        track: Track,

        /// Race number (1-12)
        #[arg(value_name = "NUMBER")]
        number: u8,

        /// Write the race as JSON into this directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Collect a full day and write the export files.
pub async fn run_day(
    date: NaiveDate,
    concurrency: Option<usize>,
    out: Option<PathBuf>,
    with_csv: bool,
) -> anyhow::Result<()> {
    let mut config = AppConfig::load()?;
    if let Some(cap) = concurrency {
        config.scraper.max_concurrent_races = cap;
    }
    let out_dir = out.unwrap_or_else(|| PathBuf::from(&config.export.out_dir));

    eprintln!("Launching browser...");
    let browser = with_retries(&RetryPolicy::browser_launch(), "browser launch", || {
        Browser::launch(&config.scraper)
    })
    .await?;

    let outcome = collect_day(&browser, &config, date).await;

    // The browser goes down before results are handled, on every exit path.
    if let Err(e) = browser.close().await {
        warn!("browser shutdown: {}", e);
    }

    let dataset = outcome?;
    print_day_summary(&dataset);

    let written = export::write_day_exports(&dataset, &out_dir, with_csv)?;
    for path in written {
        println!("wrote {}", path.display());
    }

    Ok(())
}

async fn collect_day(
    browser: &Browser,
    config: &AppConfig,
    date: NaiveDate,
) -> anyhow::Result<DayDataset> {
    let discovery = RaceDiscovery::new(browser);
    let races = discovery.discover(date).await?;
    if races.is_empty() {
        eprintln!("No meetings on {}", date);
        return Ok(aggregate(date, 0, Vec::new()));
    }

    eprintln!("{} races to fetch", races.len());
    let collector = OddsCollector::new(browser, &config.scraper);

    // Ctrl-C stops scheduling new races; in-flight ones finish.
    let cancel = collector.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancellation requested; finishing in-flight races");
            cancel.cancel();
        }
    });

    let total = races.len();
    let records = collector
        .collect(&races, |done, of, race| {
            eprintln!("[{}/{}] {}", done, of, race);
        })
        .await;

    Ok(aggregate(date, total, records))
}

/// Collect one race, print its odds, optionally write it as JSON.
pub async fn run_race(
    date: NaiveDate,
    track: Track,
    number: u8,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = AppConfig::load()?;
    config.scraper.max_concurrent_races = 1;

    let race = RaceId::new(date, track, number);
    eprintln!("Fetching {}...", race);

    let browser = with_retries(&RetryPolicy::browser_launch(), "browser launch", || {
        Browser::launch(&config.scraper)
    })
    .await?;

    let records = {
        let collector = OddsCollector::new(&browser, &config.scraper);
        collector.collect(&[race], |_, _, _| {}).await
    };

    if let Err(e) = browser.close().await {
        warn!("browser shutdown: {}", e);
    }

    let record = records
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no record produced for {}", race))?;

    print_race(&record);

    if let Some(dir) = out {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating export directory {}", dir.display()))?;
        let path = dir.join(format!("odds_{}.json", record.race.code()));
        std::fs::write(&path, export::race_to_json(&record)?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("wrote {}", path.display());
    }

    Ok(())
}

fn print_day_summary(dataset: &DayDataset) {
    println!("Date: {}", dataset.date);
    println!(
        "Races attempted: {}/{}",
        dataset.progress.completed, dataset.progress.total
    );
    for summary in &dataset.tracks {
        println!(
            "  {}: {} ok, {} partial or failed",
            summary.track, summary.races_fetched, summary.races_failed
        );
    }
}

/// Print one race's odds in table form.
fn print_race(record: &RaceOdds) {
    println!("Race: {}", record.race);
    if let Some(name) = &record.race_name {
        println!("Name: {}", name);
    }
    if let Some(time) = &record.post_time {
        println!("Post time: {}", time);
    }
    println!("Status: {}", record.status);
    if let Some(error) = &record.error {
        println!("Errors: {}", error);
    }
    println!();

    print_entries("Win (単勝)", record.entries_of(BetType::Win));
    print_entries("Place (複勝)", record.entries_of(BetType::Place));
    print_entries("Quinella (馬連)", record.entries_of(BetType::Quinella));
}

fn print_entries<'a>(title: &str, entries: impl Iterator<Item = &'a OddsEntry>) {
    let entries: Vec<_> = entries.collect();
    if entries.is_empty() {
        return;
    }
    println!("=== {} ===", title);
    for entry in entries {
        let odds = match entry.odds {
            Some(odds) => format!("{:.1}", odds),
            None => "-".to_string(),
        };
        match entry.rank {
            Some(rank) => println!("  {:>5}: {:>8}  (pop. {})", entry.selection, odds, rank),
            None => println!("  {:>5}: {:>8}", entry.selection, odds),
        }
    }
    println!();
}

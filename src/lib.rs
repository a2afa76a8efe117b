//! JRA day-odds retrieval pipeline.
//!
//! Given a date, discovers which races run, fetches each race's win/place
//! and quinella odds pages through a headless browser, and aggregates the
//! parsed entries into one exportable day dataset.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod retry;
pub mod scraper;
pub mod types;

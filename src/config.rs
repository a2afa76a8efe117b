//! Configuration for the odds retrieval run.

use serde::{Deserialize, Serialize};

/// Scraper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Run Chrome headless.
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Explicit Chrome executable; platform default when unset.
    #[serde(default)]
    pub chrome_path: Option<String>,
    /// Hard cap on one page navigation, seconds.
    #[serde(default = "default_nav_timeout_secs")]
    pub nav_timeout_secs: u64,
    /// Delay after navigation before reading the DOM, milliseconds. The odds
    /// tables are filled in by script after the initial load.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// How many races may be in flight at once.
    #[serde(default = "default_max_concurrent_races")]
    pub max_concurrent_races: usize,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Jitter band added between page requests, seconds.
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: f64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: f64,
}

fn default_headless() -> bool {
    true
}

fn default_nav_timeout_secs() -> u64 {
    30
}

fn default_settle_ms() -> u64 {
    1500
}

fn default_max_concurrent_races() -> usize {
    3
}

fn default_requests_per_minute() -> u32 {
    30
}

fn default_min_delay_secs() -> f64 {
    1.0
}

fn default_max_delay_secs() -> f64 {
    3.0
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            chrome_path: None,
            nav_timeout_secs: default_nav_timeout_secs(),
            settle_ms: default_settle_ms(),
            max_concurrent_races: default_max_concurrent_races(),
            requests_per_minute: default_requests_per_minute(),
            min_delay_secs: default_min_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory the JSON/CSV files are written to.
    #[serde(default = "default_out_dir")]
    pub out_dir: String,
}

fn default_out_dir() -> String {
    "data/odds".to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl AppConfig {
    /// Load configuration from environment and config file
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (JRAODDS_SCRAPER__HEADLESS, etc.)
            .add_source(
                config::Environment::with_prefix("JRAODDS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = AppConfig::default();
        assert!(config.scraper.headless);
        assert!(config.scraper.max_concurrent_races >= 1);
        assert!(config.scraper.min_delay_secs <= config.scraper.max_delay_secs);
        assert_eq!(config.export.out_dir, "data/odds");
    }
}

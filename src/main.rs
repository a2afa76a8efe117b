//! jra-odds
//!
//! CLI for retrieving JRA win/place/quinella odds for a race day.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jra_odds::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging; stdout stays clean for results.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jra_odds=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Day {
            date,
            concurrency,
            out,
            csv,
        } => cli::run_day(date, concurrency, out, csv).await,
        Commands::Race {
            date,
            track,
            number,
            out,
        } => cli::run_race(date, track, number, out).await,
    }
}

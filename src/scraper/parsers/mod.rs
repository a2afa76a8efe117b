//! HTML parsers for jra.go.jp odds pages.
//!
//! Each parser takes rendered markup and owns the page's layout contract:
//! - Odds index (schedule) page -> race list
//! - Win/place (単勝・複勝) page -> header + single-horse odds
//! - Quinella (馬連) page -> pair odds

pub mod odds_table;
pub mod race_list;

pub use odds_table::{OddsTableParser, RaceHeader};
pub use race_list::RaceListParser;

use std::fmt;

/// Which page layout a parser expects. Carried in parse errors so a layout
/// drift names the page that broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    RaceList,
    WinPlaceOdds,
    QuinellaOdds,
}

impl PageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageKind::RaceList => "race list",
            PageKind::WinPlaceOdds => "win/place odds",
            PageKind::QuinellaOdds => "quinella odds",
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

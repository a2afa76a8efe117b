//! Domain types for a day of JRA odds: races, entries, per-track summaries.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// JRA racecourse. Variant order matches the official course codes 01-10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Track {
    #[serde(rename = "札幌")]
    Sapporo,
    #[serde(rename = "函館")]
    Hakodate,
    #[serde(rename = "福島")]
    Fukushima,
    #[serde(rename = "新潟")]
    Niigata,
    #[serde(rename = "東京")]
    Tokyo,
    #[serde(rename = "中山")]
    Nakayama,
    #[serde(rename = "中京")]
    Chukyo,
    #[serde(rename = "京都")]
    Kyoto,
    #[serde(rename = "阪神")]
    Hanshin,
    #[serde(rename = "小倉")]
    Kokura,
}

impl Track {
    pub const ALL: [Track; 10] = [
        Track::Sapporo,
        Track::Hakodate,
        Track::Fukushima,
        Track::Niigata,
        Track::Tokyo,
        Track::Nakayama,
        Track::Chukyo,
        Track::Kyoto,
        Track::Hanshin,
        Track::Kokura,
    ];

    /// Official JRA course code (01-10).
    pub fn code(&self) -> u8 {
        match self {
            Track::Sapporo => 1,
            Track::Hakodate => 2,
            Track::Fukushima => 3,
            Track::Niigata => 4,
            Track::Tokyo => 5,
            Track::Nakayama => 6,
            Track::Chukyo => 7,
            Track::Kyoto => 8,
            Track::Hanshin => 9,
            Track::Kokura => 10,
        }
    }

    /// Course name as printed on JRA pages.
    pub fn name(&self) -> &'static str {
        match self {
            Track::Sapporo => "札幌",
            Track::Hakodate => "函館",
            Track::Fukushima => "福島",
            Track::Niigata => "新潟",
            Track::Tokyo => "東京",
            Track::Nakayama => "中山",
            Track::Chukyo => "中京",
            Track::Kyoto => "京都",
            Track::Hanshin => "阪神",
            Track::Kokura => "小倉",
        }
    }

    pub fn from_code(code: u8) -> Option<Track> {
        Track::ALL.get(code.checked_sub(1)? as usize).copied()
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Track {
    type Err = String;

    /// Accepts the Japanese course name (中山) or the course code (6).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(track) = Track::ALL.iter().find(|t| t.name() == s) {
            return Ok(*track);
        }
        if let Ok(code) = s.parse::<u8>() {
            if let Some(track) = Track::from_code(code) {
                return Ok(track);
            }
        }
        Err(format!("unknown track: {s}"))
    }
}

/// Identifies one race: date, course and race number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RaceId {
    pub date: NaiveDate,
    pub track: Track,
    pub number: u8,
}

impl RaceId {
    pub fn new(date: NaiveDate, track: Track, number: u8) -> Self {
        Self {
            date,
            track,
            number,
        }
    }

    /// Compact id used in URLs and file names, e.g. "202601110611"
    /// (date + course code + race number).
    pub fn code(&self) -> String {
        format!(
            "{}{:02}{:02}",
            self.date.format("%Y%m%d"),
            self.track.code(),
            self.number
        )
    }
}

impl fmt::Display for RaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}R", self.date, self.track, self.number)
    }
}

/// Bet type covered by the two odds pages per race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetType {
    /// 単勝
    Win,
    /// 複勝
    Place,
    /// 馬連
    Quinella,
}

impl BetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetType::Win => "win",
            BetType::Place => "place",
            BetType::Quinella => "quinella",
        }
    }
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the odds apply to: a single horse or an unordered pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    Single(u8),
    Pair(u8, u8),
}

impl Selection {
    /// Unordered pair, stored with the lower horse number first so that
    /// (7, 3) and (3, 7) are the same selection.
    pub fn pair(a: u8, b: u8) -> Self {
        if a <= b {
            Selection::Pair(a, b)
        } else {
            Selection::Pair(b, a)
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Single(n) => write!(f, "{n}"),
            Selection::Pair(a, b) => write!(f, "{a}-{b}"),
        }
    }
}

/// One odds figure for one selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsEntry {
    pub bet_type: BetType,
    pub selection: Selection,
    /// Decimal odds; absent when the runner is scratched (取消/除外) or the
    /// figure is not displayed yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odds: Option<f64>,
    /// Popularity rank as shown on the win/place page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
}

impl OddsEntry {
    pub fn win(horse: u8, odds: Option<f64>, rank: Option<u32>) -> Self {
        Self {
            bet_type: BetType::Win,
            selection: Selection::Single(horse),
            odds,
            rank,
        }
    }

    pub fn place(horse: u8, odds: Option<f64>) -> Self {
        Self {
            bet_type: BetType::Place,
            selection: Selection::Single(horse),
            odds,
            rank: None,
        }
    }

    pub fn quinella(a: u8, b: u8, odds: Option<f64>) -> Self {
        Self {
            bet_type: BetType::Quinella,
            selection: Selection::pair(a, b),
            odds,
            rank: None,
        }
    }
}

/// Outcome of fetching one race's odds pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    /// Every page parsed.
    Ok,
    /// At least one page parsed, at least one failed.
    Partial,
    /// No page produced entries.
    Failed,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStatus::Ok => "ok",
            FetchStatus::Partial => "partial",
            FetchStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything retrieved for one race.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceOdds {
    pub race: RaceId,
    pub race_name: Option<String>,
    /// Post time "HH:MM" from the race header, when present.
    pub post_time: Option<String>,
    pub entries: Vec<OddsEntry>,
    pub status: FetchStatus,
    /// Joined page errors for partial/failed races.
    pub error: Option<String>,
}

impl RaceOdds {
    pub fn entries_of(&self, bet_type: BetType) -> impl Iterator<Item = &OddsEntry> {
        self.entries.iter().filter(move |e| e.bet_type == bet_type)
    }
}

/// All races collected for one course, in race-number order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSummary {
    pub track: Track,
    pub races_fetched: usize,
    pub races_failed: usize,
    pub races: Vec<RaceOdds>,
}

impl TrackSummary {
    pub fn new(track: Track) -> Self {
        Self {
            track,
            races_fetched: 0,
            races_failed: 0,
            races: Vec::new(),
        }
    }
}

/// How far the run got: attempted races out of discovered races. The two
/// differ when the run is cancelled mid-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// The full result of one day run, ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct DayDataset {
    pub date: NaiveDate,
    /// Per-track summaries in discovery order.
    pub tracks: Vec<TrackSummary>,
    pub progress: Progress,
}

impl DayDataset {
    pub fn races_fetched(&self) -> usize {
        self.tracks.iter().map(|t| t.races_fetched).sum()
    }

    pub fn races_failed(&self) -> usize {
        self.tracks.iter().map(|t| t.races_failed).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_selection_is_order_insensitive() {
        assert_eq!(Selection::pair(7, 3), Selection::pair(3, 7));
        assert_eq!(Selection::pair(7, 3), Selection::Pair(3, 7));
        assert_eq!(Selection::pair(3, 7).to_string(), "3-7");
    }

    #[test]
    fn test_selection_serializes_untagged() {
        let single = serde_json::to_string(&Selection::Single(4)).unwrap();
        assert_eq!(single, "4");
        let pair = serde_json::to_string(&Selection::pair(9, 2)).unwrap();
        assert_eq!(pair, "[2,9]");
    }

    #[test]
    fn test_track_from_str() {
        assert_eq!("中山".parse::<Track>().unwrap(), Track::Nakayama);
        assert_eq!("6".parse::<Track>().unwrap(), Track::Nakayama);
        assert_eq!("10".parse::<Track>().unwrap(), Track::Kokura);
        assert!("中央".parse::<Track>().is_err());
        assert!("11".parse::<Track>().is_err());
    }

    #[test]
    fn test_race_id_code() {
        let race = RaceId::new(
            NaiveDate::from_ymd_opt(2026, 1, 11).unwrap(),
            Track::Nakayama,
            11,
        );
        assert_eq!(race.code(), "202601110611");
        assert_eq!(race.to_string(), "2026-01-11 中山11R");
    }
}

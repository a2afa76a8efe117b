//! Day-level aggregation: group per-race records under their tracks.

use chrono::NaiveDate;

use crate::types::{DayDataset, FetchStatus, Progress, RaceOdds, TrackSummary};

/// Build the day dataset from collected records.
///
/// Tracks appear in the order their first race appears in `records`, which
/// the collector keeps equal to discovery order. `total_races` is the
/// discovered count; fewer records than that means the run was cut short.
pub fn aggregate(date: NaiveDate, total_races: usize, records: Vec<RaceOdds>) -> DayDataset {
    let completed = records.len();
    let mut tracks: Vec<TrackSummary> = Vec::new();

    for record in records {
        let idx = match tracks.iter().position(|t| t.track == record.race.track) {
            Some(idx) => idx,
            None => {
                tracks.push(TrackSummary::new(record.race.track));
                tracks.len() - 1
            }
        };
        let summary = &mut tracks[idx];
        match record.status {
            FetchStatus::Ok => summary.races_fetched += 1,
            FetchStatus::Partial | FetchStatus::Failed => summary.races_failed += 1,
        }
        summary.races.push(record);
    }

    DayDataset {
        date,
        tracks,
        progress: Progress {
            completed,
            total: total_races,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RaceId, Track};

    fn record(track: Track, number: u8, status: FetchStatus) -> RaceOdds {
        RaceOdds {
            race: RaceId::new(
                NaiveDate::from_ymd_opt(2026, 1, 11).unwrap(),
                track,
                number,
            ),
            race_name: None,
            post_time: None,
            entries: Vec::new(),
            status,
            error: None,
        }
    }

    #[test]
    fn test_groups_by_track_in_first_seen_order() {
        let records = vec![
            record(Track::Nakayama, 1, FetchStatus::Ok),
            record(Track::Nakayama, 2, FetchStatus::Ok),
            record(Track::Hanshin, 1, FetchStatus::Ok),
            record(Track::Nakayama, 3, FetchStatus::Ok),
        ];
        let date = NaiveDate::from_ymd_opt(2026, 1, 11).unwrap();
        let dataset = aggregate(date, 4, records);

        assert_eq!(dataset.tracks.len(), 2);
        assert_eq!(dataset.tracks[0].track, Track::Nakayama);
        assert_eq!(dataset.tracks[0].races.len(), 3);
        assert_eq!(dataset.tracks[1].track, Track::Hanshin);
        assert_eq!(dataset.tracks[1].races.len(), 1);
    }

    #[test]
    fn test_counts_split_ok_from_partial_and_failed() {
        let records = vec![
            record(Track::Tokyo, 1, FetchStatus::Ok),
            record(Track::Tokyo, 2, FetchStatus::Partial),
            record(Track::Tokyo, 3, FetchStatus::Failed),
        ];
        let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let dataset = aggregate(date, 3, records);

        assert_eq!(dataset.tracks[0].races_fetched, 1);
        assert_eq!(dataset.tracks[0].races_failed, 2);
        assert_eq!(dataset.races_fetched(), 1);
        assert_eq!(dataset.races_failed(), 2);
    }

    #[test]
    fn test_cancelled_run_keeps_discovered_total() {
        let records = vec![record(Track::Kyoto, 1, FetchStatus::Ok)];
        let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let dataset = aggregate(date, 24, records);

        assert_eq!(dataset.progress.completed, 1);
        assert_eq!(dataset.progress.total, 24);
    }

    #[test]
    fn test_empty_day() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let dataset = aggregate(date, 0, Vec::new());

        assert!(dataset.tracks.is_empty());
        assert_eq!(dataset.progress, Progress {
            completed: 0,
            total: 0
        });
    }
}

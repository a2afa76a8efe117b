//! Export shapes: lossless JSON for the day, one display CSV per track.
//!
//! JSON is the record of truth and round-trips back into a `DayDataset`.
//! CSV is a viewing convenience: failed races are dropped, partial races
//! keep whatever entries were obtained.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{
    DayDataset, FetchStatus, OddsEntry, Progress, RaceId, RaceOdds, Track, TrackSummary,
};

/// Serialize the full dataset, tracks keyed by course name in discovery
/// order.
pub fn to_json(dataset: &DayDataset) -> Result<Vec<u8>> {
    let doc = DayJson::from_dataset(dataset);
    Ok(serde_json::to_vec_pretty(&doc)?)
}

/// Rebuild a dataset from `to_json` output. Per-track counts are recomputed
/// from race statuses rather than trusted from the document.
pub fn from_json(bytes: &[u8]) -> Result<DayDataset> {
    let doc: DayJson = serde_json::from_slice(bytes)?;
    doc.into_dataset()
}

/// Serialize one race on its own, for single-race runs.
pub fn race_to_json(record: &RaceOdds) -> Result<Vec<u8>> {
    let doc = SingleRaceJson {
        date: record.race.date,
        track: record.race.track.name(),
        race: RaceJson::from_record(record),
    };
    Ok(serde_json::to_vec_pretty(&doc)?)
}

/// Flat per-track table: one row per entry of every non-failed race.
pub fn to_csv(dataset: &DayDataset, track: Track) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["raceNumber", "betType", "selection", "odds", "rank"])?;

    if let Some(summary) = dataset.tracks.iter().find(|t| t.track == track) {
        for race in &summary.races {
            if race.status == FetchStatus::Failed {
                continue;
            }
            for entry in &race.entries {
                writer.write_record([
                    race.race.number.to_string(),
                    entry.bet_type.to_string(),
                    entry.selection.to_string(),
                    entry.odds.map(|o| format!("{o:.1}")).unwrap_or_default(),
                    entry.rank.map(|r| r.to_string()).unwrap_or_default(),
                ])?;
            }
        }
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("finalize csv buffer: {}", e))
}

/// Write the day's files: always the JSON document, plus one CSV per track
/// with exportable rows when `with_csv` is set. Returns the paths written.
pub fn write_day_exports(dataset: &DayDataset, dir: &Path, with_csv: bool) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating export directory {}", dir.display()))?;

    let stamp = dataset.date.format("%Y%m%d");
    let mut written = Vec::new();

    let json_path = dir.join(format!("daily_odds_{}.json", stamp));
    fs::write(&json_path, to_json(dataset)?)
        .with_context(|| format!("writing {}", json_path.display()))?;
    written.push(json_path);

    if with_csv {
        for summary in &dataset.tracks {
            let has_rows = summary
                .races
                .iter()
                .any(|r| r.status != FetchStatus::Failed && !r.entries.is_empty());
            if !has_rows {
                continue;
            }
            let csv_path = dir.join(format!("{}_odds_{}.csv", summary.track, stamp));
            fs::write(&csv_path, to_csv(dataset, summary.track)?)
                .with_context(|| format!("writing {}", csv_path.display()))?;
            written.push(csv_path);
        }
    }

    Ok(written)
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DayJson {
    date: NaiveDate,
    progress: Progress,
    #[serde(with = "track_map")]
    tracks: Vec<(String, TrackJson)>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackJson {
    // Informational for consumers; import recomputes from race statuses.
    #[serde(default)]
    races_fetched: usize,
    #[serde(default)]
    races_failed: usize,
    races: Vec<RaceJson>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RaceJson {
    race_number: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    race_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    post_time: Option<String>,
    status: FetchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    entries: Vec<OddsEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SingleRaceJson<'a> {
    date: NaiveDate,
    track: &'a str,
    #[serde(flatten)]
    race: RaceJson,
}

impl DayJson {
    fn from_dataset(dataset: &DayDataset) -> Self {
        Self {
            date: dataset.date,
            progress: dataset.progress,
            tracks: dataset
                .tracks
                .iter()
                .map(|summary| {
                    (
                        summary.track.name().to_string(),
                        TrackJson {
                            races_fetched: summary.races_fetched,
                            races_failed: summary.races_failed,
                            races: summary.races.iter().map(RaceJson::from_record).collect(),
                        },
                    )
                })
                .collect(),
        }
    }

    fn into_dataset(self) -> Result<DayDataset> {
        let date = self.date;
        let mut tracks = Vec::with_capacity(self.tracks.len());
        for (name, track_json) in self.tracks {
            let track: Track = name
                .parse()
                .map_err(|e| anyhow::anyhow!("unrecognized track key in document: {e}"))?;
            let mut summary = TrackSummary::new(track);
            for race_json in track_json.races {
                let record = race_json.into_record(date, track);
                match record.status {
                    FetchStatus::Ok => summary.races_fetched += 1,
                    FetchStatus::Partial | FetchStatus::Failed => summary.races_failed += 1,
                }
                summary.races.push(record);
            }
            tracks.push(summary);
        }
        Ok(DayDataset {
            date,
            tracks,
            progress: self.progress,
        })
    }
}

impl RaceJson {
    fn from_record(record: &RaceOdds) -> Self {
        Self {
            race_number: record.race.number,
            race_name: record.race_name.clone(),
            post_time: record.post_time.clone(),
            status: record.status,
            error: record.error.clone(),
            entries: record.entries.clone(),
        }
    }

    fn into_record(self, date: NaiveDate, track: Track) -> RaceOdds {
        RaceOdds {
            race: RaceId::new(date, track, self.race_number),
            race_name: self.race_name,
            post_time: self.post_time,
            entries: self.entries,
            status: self.status,
            error: self.error,
        }
    }
}

/// JSON object keyed by track name, document order preserved on both paths.
mod track_map {
    use super::TrackJson;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(tracks: &[(String, TrackJson)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(tracks.len()))?;
        for (name, track) in tracks {
            map.serialize_entry(name, track)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, TrackJson)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TrackMapVisitor;

        impl<'de> Visitor<'de> for TrackMapVisitor {
            type Value = Vec<(String, TrackJson)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of track name to track summary")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut tracks = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry()? {
                    tracks.push(entry);
                }
                Ok(tracks)
            }
        }

        deserializer.deserialize_map(TrackMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn race_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 11).unwrap()
    }

    fn sample_dataset() -> DayDataset {
        let nakayama_1 = RaceOdds {
            race: RaceId::new(race_day(), Track::Nakayama, 1),
            race_name: Some("3歳未勝利".to_string()),
            post_time: Some("10:10".to_string()),
            entries: vec![
                OddsEntry::win(1, Some(2.1), Some(1)),
                OddsEntry::win(3, None, None),
                OddsEntry::place(1, Some(1.2)),
                OddsEntry::quinella(3, 1, Some(15.2)),
            ],
            status: FetchStatus::Ok,
            error: None,
        };
        let nakayama_2 = RaceOdds {
            race: RaceId::new(race_day(), Track::Nakayama, 2),
            race_name: None,
            post_time: None,
            entries: Vec::new(),
            status: FetchStatus::Failed,
            error: Some("navigation to https://example/odds failed: timeout".to_string()),
        };
        let tokyo_5 = RaceOdds {
            race: RaceId::new(race_day(), Track::Tokyo, 5),
            race_name: Some("4歳以上1勝クラス".to_string()),
            post_time: Some("12:25".to_string()),
            entries: vec![
                OddsEntry::win(7, Some(3.3), Some(1)),
                OddsEntry::place(7, Some(1.5)),
            ],
            status: FetchStatus::Partial,
            error: Some("quinella odds page not recognized: ul.umaren_list not found".to_string()),
        };

        crate::aggregate::aggregate(race_day(), 3, vec![nakayama_1, nakayama_2, tokyo_5])
    }

    #[test]
    fn test_json_round_trip() {
        let dataset = sample_dataset();
        let bytes = to_json(&dataset).unwrap();
        let restored = from_json(&bytes).unwrap();
        assert_eq!(restored, dataset);
    }

    #[test]
    fn test_json_track_keys_in_discovery_order() {
        let bytes = to_json(&sample_dataset()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let nakayama = text.find("\"中山\"").unwrap();
        let tokyo = text.find("\"東京\"").unwrap();
        assert!(nakayama < tokyo);
    }

    #[test]
    fn test_json_shape() {
        let bytes = to_json(&sample_dataset()).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(doc["date"], "2026-01-11");
        assert_eq!(doc["progress"]["completed"], 3);
        assert_eq!(doc["progress"]["total"], 3);

        assert_eq!(doc["tracks"]["中山"]["racesFetched"], 1);
        assert_eq!(doc["tracks"]["中山"]["racesFailed"], 1);

        let races = &doc["tracks"]["中山"]["races"];
        assert_eq!(races[0]["raceNumber"], 1);
        assert_eq!(races[0]["status"], "ok");
        assert_eq!(races[0]["entries"][0]["betType"], "win");
        assert_eq!(races[0]["entries"][0]["selection"], 1);
        assert_eq!(races[0]["entries"][0]["odds"], 2.1);
        // Scratched entry keeps its row but has no odds key
        assert_eq!(races[0]["entries"][1]["selection"], 3);
        assert!(races[0]["entries"][1].get("odds").is_none());
        // Quinella selection is the normalized pair
        assert_eq!(
            races[0]["entries"][3]["selection"],
            serde_json::json!([1, 3])
        );
        assert_eq!(races[1]["status"], "failed");
        assert!(races[1]["error"].as_str().unwrap().contains("timeout"));
    }

    #[test]
    fn test_from_json_recomputes_counts() {
        let dataset = sample_dataset();

        // Counts in the document are informational; tampering with them
        // does not survive import.
        let text = String::from_utf8(to_json(&dataset).unwrap())
            .unwrap()
            .replace("\"racesFetched\": 1", "\"racesFetched\": 99");
        let restored = from_json(text.as_bytes()).unwrap();

        assert_eq!(restored.tracks[0].races_fetched, 1);
        assert_eq!(restored.tracks[0].races_failed, 1);
        assert_eq!(restored.tracks[1].races_fetched, 0);
        assert_eq!(restored.tracks[1].races_failed, 1);
    }

    #[test]
    fn test_csv_drops_failed_races_keeps_partial_rows() {
        let dataset = sample_dataset();

        let nakayama = String::from_utf8(to_csv(&dataset, Track::Nakayama).unwrap()).unwrap();
        let lines: Vec<&str> = nakayama.lines().collect();
        assert_eq!(lines[0], "raceNumber,betType,selection,odds,rank");
        assert_eq!(lines[1], "1,win,1,2.1,1");
        assert_eq!(lines[2], "1,win,3,,");
        assert_eq!(lines[3], "1,place,1,1.2,");
        assert_eq!(lines[4], "1,quinella,1-3,15.2,");
        // Failed race 2 contributes nothing
        assert_eq!(lines.len(), 5);

        let tokyo = String::from_utf8(to_csv(&dataset, Track::Tokyo).unwrap()).unwrap();
        assert_eq!(tokyo.lines().count(), 3);
    }

    #[test]
    fn test_csv_unknown_track_is_header_only() {
        let dataset = sample_dataset();
        let kyoto = String::from_utf8(to_csv(&dataset, Track::Kyoto).unwrap()).unwrap();
        assert_eq!(kyoto.lines().count(), 1);
    }

    #[test]
    fn test_write_day_exports() {
        let dir = std::env::temp_dir().join(format!(
            "jra_odds_export_test_{}_{}",
            std::process::id(),
            race_day().format("%Y%m%d")
        ));
        let _ = fs::remove_dir_all(&dir);

        let dataset = sample_dataset();
        let written = write_day_exports(&dataset, &dir, true).unwrap();

        assert_eq!(written.len(), 3);
        assert!(dir.join("daily_odds_20260111.json").exists());
        assert!(dir.join("中山_odds_20260111.csv").exists());
        assert!(dir.join("東京_odds_20260111.csv").exists());

        let restored = from_json(&fs::read(dir.join("daily_odds_20260111.json")).unwrap()).unwrap();
        assert_eq!(restored, dataset);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_race_to_json() {
        let dataset = sample_dataset();
        let record = &dataset.tracks[1].races[0];
        let doc: serde_json::Value =
            serde_json::from_slice(&race_to_json(record).unwrap()).unwrap();

        assert_eq!(doc["date"], "2026-01-11");
        assert_eq!(doc["track"], "東京");
        assert_eq!(doc["raceNumber"], 5);
        assert_eq!(doc["status"], "partial");
        assert_eq!(doc["entries"].as_array().unwrap().len(), 2);
    }
}

//! Odds table parsers for jra.go.jp
//!
//! Parses the two odds pages fetched per race:
//! - Win/place (単勝・複勝): https://www.jra.go.jp/keiba/odds/tanpuku.html?race_id=RACEID
//! - Quinella (馬連): https://www.jra.go.jp/keiba/odds/umaren.html?race_id=RACEID

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::ScrapeError;
use crate::scraper::parsers::PageKind;
use crate::types::OddsEntry;

/// Race name and post time from the shared page header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaceHeader {
    pub race_name: Option<String>,
    /// "HH:MM", zero padded.
    pub post_time: Option<String>,
}

/// Parser for the per-race odds pages
pub struct OddsTableParser;

impl OddsTableParser {
    /// Parse the 単勝・複勝 page: race header plus win and place odds for
    /// every listed horse.
    ///
    /// Scratched runners (取消/除外) stay in the list with no odds. Place
    /// odds are quoted as a min-max band; the midpoint is recorded. Entries
    /// come back grouped: all win odds first, then all place odds, each in
    /// table row order.
    pub fn parse_win_place(html: &str) -> Result<(RaceHeader, Vec<OddsEntry>), ScrapeError> {
        let document = Html::parse_document(html);

        let table_selector = Selector::parse("table.tanpuku").unwrap();
        let table = document
            .select(&table_selector)
            .next()
            .ok_or_else(|| ScrapeError::parse(PageKind::WinPlaceOdds, "table.tanpuku not found"))?;

        let row_selector = Selector::parse("tbody tr").unwrap();
        let num_selector = Selector::parse("td.num").unwrap();
        let win_selector = Selector::parse("td.odds_tan").unwrap();
        let place_selector = Selector::parse("td.odds_fuku").unwrap();
        let min_selector = Selector::parse("span.min").unwrap();
        let max_selector = Selector::parse("span.max").unwrap();
        let rank_selector = Selector::parse("td.pop").unwrap();

        let mut seen: Vec<u8> = Vec::new();
        let mut wins: Vec<OddsEntry> = Vec::new();
        let mut places: Vec<OddsEntry> = Vec::new();

        for row in table.select(&row_selector) {
            // Rows without a horse number are headers or filler.
            let horse = match row
                .select(&num_selector)
                .next()
                .and_then(|cell| cell_text(&cell).parse::<u8>().ok())
            {
                Some(n) if (1..=18).contains(&n) => n,
                _ => continue,
            };
            if seen.contains(&horse) {
                continue;
            }
            seen.push(horse);

            let win_odds = row
                .select(&win_selector)
                .next()
                .and_then(|cell| parse_odds_value(&cell_text(&cell)));

            let rank = row
                .select(&rank_selector)
                .next()
                .and_then(|cell| cell_text(&cell).parse::<u32>().ok());

            let place_odds = row.select(&place_selector).next().and_then(|cell| {
                let min = cell
                    .select(&min_selector)
                    .next()
                    .and_then(|span| parse_odds_value(&cell_text(&span)));
                let max = cell
                    .select(&max_selector)
                    .next()
                    .and_then(|span| parse_odds_value(&cell_text(&span)));
                match (min, max) {
                    // Midpoint of the quoted band, kept to two decimals.
                    (Some(lo), Some(hi)) => Some((((lo + hi) / 2.0) * 100.0).round() / 100.0),
                    (Some(lo), None) => Some(lo),
                    _ => parse_odds_value(&cell_text(&cell)),
                }
            });

            wins.push(OddsEntry::win(horse, win_odds, rank));
            places.push(OddsEntry::place(horse, place_odds));
        }

        let mut entries = wins;
        entries.append(&mut places);

        Ok((Self::parse_header(&document), entries))
    }

    /// Parse the 馬連 page: one entry per quoted pair across every axis
    /// table, pairs stored lower horse number first, first occurrence wins.
    pub fn parse_quinella(html: &str) -> Result<Vec<OddsEntry>, ScrapeError> {
        let document = Html::parse_document(html);

        let list_selector = Selector::parse("ul.umaren_list").unwrap();
        let mut blocks = document.select(&list_selector).peekable();
        if blocks.peek().is_none() {
            return Err(ScrapeError::parse(
                PageKind::QuinellaOdds,
                "ul.umaren_list not found",
            ));
        }

        let item_selector = Selector::parse("li").unwrap();
        let caption_selector = Selector::parse("caption").unwrap();
        let row_selector = Selector::parse("tbody tr").unwrap();
        let th_selector = Selector::parse("th").unwrap();
        let td_selector = Selector::parse("td").unwrap();

        let mut entries: Vec<OddsEntry> = Vec::new();
        for block in blocks {
            for item in block.select(&item_selector) {
                // Each axis table is captioned with its first horse.
                let first = match item
                    .select(&caption_selector)
                    .next()
                    .and_then(|cap| cell_text(&cap).parse::<u8>().ok())
                {
                    Some(n) if (1..=18).contains(&n) => n,
                    _ => continue,
                };

                for row in item.select(&row_selector) {
                    let second = match row
                        .select(&th_selector)
                        .next()
                        .and_then(|cell| cell_text(&cell).parse::<u8>().ok())
                    {
                        Some(n) if (1..=18).contains(&n) => n,
                        _ => continue,
                    };
                    if second == first {
                        continue;
                    }

                    let odds = row
                        .select(&td_selector)
                        .next()
                        .and_then(|cell| parse_odds_value(&cell_text(&cell)));

                    let entry = OddsEntry::quinella(first, second, odds);
                    if !entries.iter().any(|e| e.selection == entry.selection) {
                        entries.push(entry);
                    }
                }
            }
        }

        Ok(entries)
    }

    /// Race name and post time. Both are best effort; an odds page without
    /// its header still yields entries.
    fn parse_header(document: &Html) -> RaceHeader {
        let title_selector = Selector::parse("div.race_header div.cell.title strong").unwrap();
        let time_selector = Selector::parse("div.race_header div.cell.time strong").unwrap();
        let time_re = Regex::new(r"(\d{1,2})時(\d{1,2})分").unwrap();

        let race_name = document
            .select(&title_selector)
            .next()
            .map(|elem| cell_text(&elem))
            .filter(|name| !name.is_empty());

        let post_time = document.select(&time_selector).next().and_then(|elem| {
            let text = cell_text(&elem);
            time_re
                .captures(&text)
                .map(|caps| format!("{:0>2}:{:0>2}", &caps[1], &caps[2]))
        });

        RaceHeader {
            race_name,
            post_time,
        }
    }
}

/// Joined, trimmed text of an element.
fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Parse one odds figure. Scratched markers (取消/除外/中止), placeholder
/// dashes and out-of-range junk come back as None.
fn parse_odds_value(text: &str) -> Option<f64> {
    let cleaned = text.trim().replace(',', "");
    if cleaned.is_empty()
        || cleaned.contains("取消")
        || cleaned.contains("除外")
        || cleaned.contains("中止")
        || cleaned.chars().all(|c| c == '-' || c == '―' || c == '－')
    {
        return None;
    }
    let cleaned = cleaned.trim_end_matches('倍').trim();
    match cleaned.parse::<f64>() {
        Ok(odds) if (1.0..100000.0).contains(&odds) => Some(odds),
        _ => None,
    }
}

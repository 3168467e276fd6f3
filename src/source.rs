// 📥 Statistics Source - raw season rows from the external provider
//
// The import command fetches everything it needs up front, before opening a
// unit of work. `CsvSource` reads one directory per season:
//
//   <root>/<year>/teams.csv   rank,school
//   <root>/<year>/games.csv   week,date,winner,winner_points,home_marker,loser,loser_points,notes
//
// `home_marker` is "@" when the winner played away and "N" for a neutral
// site. Team names may carry a poll prefix such as "(3) Clemson".

use crate::error::{Error, Result};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

// ============================================================================
// CORE TYPES
// ============================================================================

/// One FBS team listed for the season
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRow {
    pub rank: u32,
    pub school: String,
}

/// One game as the provider reports it, winner first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRow {
    pub week: u32,
    pub date: String,
    pub winner: String,
    pub winner_points: Option<u32>,
    #[serde(default)]
    pub home_marker: String,
    pub loser: String,
    pub loser_points: Option<u32>,
    #[serde(default)]
    pub notes: String,
}

impl GameRow {
    /// Winner and loser names with any poll ranking prefix removed
    pub fn teams(&self) -> (&str, &str) {
        (strip_poll_rank(&self.winner), strip_poll_rank(&self.loser))
    }

    /// True when the winner column names the away team
    pub fn winner_was_away(&self) -> bool {
        self.home_marker.trim() == "@"
    }

    pub fn parsed_date(&self) -> Result<NaiveDate> {
        parse_date(&self.date)
    }

    pub fn is_canceled(&self) -> bool {
        self.winner_points.is_none()
            && self.loser_points.is_none()
            && self.notes.to_lowercase().contains("cancel")
    }
}

pub trait StatisticsSource {
    /// Short label for log lines
    fn name(&self) -> &str;

    fn teams(&self, year: u32) -> Result<Vec<TeamRow>>;

    fn games(&self, year: u32) -> Result<Vec<GameRow>>;
}

// ============================================================================
// CSV SOURCE
// ============================================================================

#[derive(Debug, Clone)]
pub struct CsvSource {
    root: PathBuf,
}

impl CsvSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CsvSource { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_rows<T>(&self, year: u32, file_name: &str) -> Result<Vec<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let path = self.root.join(year.to_string()).join(file_name);
        let file = File::open(&path).map_err(|err| Error::Source {
            message: format!("cannot open {}: {}", path.display(), err),
        })?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut rows = Vec::new();
        for result in reader.deserialize() {
            rows.push(result?);
        }

        tracing::debug!(path = %path.display(), rows = rows.len(), "read statistics file");
        Ok(rows)
    }
}

impl StatisticsSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn teams(&self, year: u32) -> Result<Vec<TeamRow>> {
        self.read_rows(year, "teams.csv")
    }

    fn games(&self, year: u32) -> Result<Vec<GameRow>> {
        self.read_rows(year, "games.csv")
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// "(12) Oregon" -> "Oregon"
pub fn strip_poll_rank(name: &str) -> &str {
    let trimmed = name.trim();
    match trimmed.strip_prefix('(').and_then(|rest| rest.split_once(')')) {
        Some((rank, rest)) if rank.chars().all(|c| c.is_ascii_digit()) => rest.trim(),
        _ => trimmed,
    }
}

/// Accepts "2023-09-02" and "Sep 2, 2023"
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%b %d, %Y"))
        .map_err(|_| Error::Source {
            message: format!("unrecognized date: {:?}", text),
        })
}

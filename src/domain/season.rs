// 🏈 Season - identity keyed by year

use super::events::SeasonCreated;
use super::ids::SeasonId;
use super::UnknownVariant;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// SEASON SECTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeasonSection {
    Preseason,
    RegularSeason,
    Postseason,
}

impl SeasonSection {
    pub const ALL: [SeasonSection; 3] = [
        SeasonSection::Preseason,
        SeasonSection::RegularSeason,
        SeasonSection::Postseason,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeasonSection::Preseason => "PRESEASON",
            SeasonSection::RegularSeason => "REGULAR_SEASON",
            SeasonSection::Postseason => "POSTSEASON",
        }
    }
}

impl fmt::Display for SeasonSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeasonSection {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SeasonSection::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("season section", s))
    }
}

// ============================================================================
// SEASON
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    pub year: u32,
}

impl Season {
    pub fn new(id: SeasonId, year: u32) -> Self {
        Season { id, year }
    }

    pub(crate) fn created(&self) -> SeasonCreated {
        SeasonCreated {
            id: self.id,
            year: self.year,
        }
    }
}

impl From<&SeasonCreated> for Season {
    fn from(event: &SeasonCreated) -> Self {
        Season::new(event.id, event.year)
    }
}

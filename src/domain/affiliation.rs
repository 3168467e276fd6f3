// Affiliation - which subdivision a team played in for one season

use super::events::AffiliationCreated;
use super::ids::{AffiliationId, SeasonId, TeamId};
use super::UnknownVariant;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// SUBDIVISION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Subdivision {
    /// Football Bowl Subdivision (top tier)
    #[serde(rename = "FBS")]
    Fbs,

    /// Football Championship Subdivision
    #[serde(rename = "FCS")]
    Fcs,
}

impl Subdivision {
    pub const ALL: [Subdivision; 2] = [Subdivision::Fbs, Subdivision::Fcs];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subdivision::Fbs => "FBS",
            Subdivision::Fcs => "FCS",
        }
    }
}

impl fmt::Display for Subdivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subdivision {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Subdivision::ALL
            .into_iter()
            .find(|subdivision| subdivision.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("subdivision", s))
    }
}

// ============================================================================
// AFFILIATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affiliation {
    pub id: AffiliationId,
    pub season_id: SeasonId,
    pub team_id: TeamId,
    pub subdivision: Subdivision,
}

impl Affiliation {
    pub fn new(
        id: AffiliationId,
        season_id: SeasonId,
        team_id: TeamId,
        subdivision: Subdivision,
    ) -> Self {
        Affiliation {
            id,
            season_id,
            team_id,
            subdivision,
        }
    }

    pub(crate) fn created(&self) -> AffiliationCreated {
        AffiliationCreated {
            id: self.id,
            season_id: self.season_id,
            team_id: self.team_id,
            subdivision: self.subdivision,
        }
    }
}

impl From<&AffiliationCreated> for Affiliation {
    fn from(event: &AffiliationCreated) -> Self {
        Affiliation::new(event.id, event.season_id, event.team_id, event.subdivision)
    }
}

// Team records - cumulative wins/losses per season week

use super::events::TeamRecordCalculated;
use super::ids::{SeasonId, TeamId, TeamRecordId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecordValue {
    pub team_id: TeamId,
    pub wins: u32,
    pub losses: u32,
}

impl TeamRecordValue {
    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }

    pub fn win_percentage(&self) -> f64 {
        match self.games() {
            0 => 0.0,
            games => f64::from(self.wins) / f64::from(games),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: TeamRecordId,
    pub season_id: SeasonId,
    /// None = season-final record
    pub week: Option<u32>,
    pub values: Vec<TeamRecordValue>,
}

impl TeamRecord {
    pub fn value_of(&self, team_id: TeamId) -> Option<&TeamRecordValue> {
        self.values.iter().find(|value| value.team_id == team_id)
    }

    pub(crate) fn calculated(&self) -> TeamRecordCalculated {
        TeamRecordCalculated {
            id: self.id,
            season_id: self.season_id,
            week: self.week,
            values: self.values.clone(),
        }
    }
}

impl From<&TeamRecordCalculated> for TeamRecord {
    fn from(event: &TeamRecordCalculated) -> Self {
        TeamRecord {
            id: event.id,
            season_id: event.season_id,
            week: event.week,
            values: event.values.clone(),
        }
    }
}

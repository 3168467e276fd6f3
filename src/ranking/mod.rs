// 🏈 Ranking Services - pure calculations over one season snapshot
//
// Every service reads a `SeasonData` and returns drafts; nothing here touches
// storage. The calculate command persists each draft through the unit of
// work, one Calculated event per draft.
//
// Performance rankings: SRS, Colley Matrix, Simultaneous Wins
// Derived rankings:     Overall / Past / Future SoS, Game Strength
// Records:              cumulative wins and losses per week

pub mod colley;
pub mod game_strength;
pub mod linalg;
pub mod record;
pub mod season_data;
pub mod simultaneous_wins;
pub mod srs;
pub mod strength_of_schedule;

#[cfg(test)]
pub(crate) mod testing;

pub use colley::ColleyMatrixRankingService;
pub use game_strength::GameStrengthRankingService;
pub use record::TeamRecordService;
pub use season_data::SeasonData;
pub use simultaneous_wins::SimultaneousWinsRankingService;
pub use srs::SrsRankingService;
pub use strength_of_schedule::StrengthOfScheduleRankingService;

use crate::domain::{rank_values, GameId, RankingValue, TeamId, TeamRecordValue};
use chrono::NaiveDate;
use std::collections::BTreeMap;

// ============================================================================
// DRAFTS
// ============================================================================

/// A calculated ranking that has not been persisted yet
#[derive(Debug, Clone, PartialEq)]
pub struct RankingDraft<T> {
    pub name: String,
    pub week: Option<u32>,
    pub values: Vec<RankingValue<T>>,
}

pub type TeamRankingDraft = RankingDraft<TeamId>;
pub type GameRankingDraft = RankingDraft<GameId>;

impl<T: PartialEq> RankingDraft<T> {
    pub fn value_of(&self, subject: &T) -> Option<f64> {
        self.values
            .iter()
            .find(|value| &value.id == subject)
            .map(|value| value.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRecordDraft {
    pub week: Option<u32>,
    pub values: Vec<TeamRecordValue>,
}

/// Rank team values, breaking ties on team name
pub fn team_ranking(
    data: &SeasonData,
    name: &str,
    week: Option<u32>,
    values: BTreeMap<TeamId, f64>,
) -> TeamRankingDraft {
    let entries = values
        .into_iter()
        .map(|(team_id, value)| (team_id, data.team_name(team_id).to_string(), value))
        .collect();

    RankingDraft {
        name: name.to_string(),
        week,
        values: rank_values(entries),
    }
}

/// Rank game values, breaking ties on date then home and away team names
pub fn game_ranking(
    data: &SeasonData,
    name: &str,
    week: Option<u32>,
    values: BTreeMap<GameId, f64>,
) -> GameRankingDraft {
    let entries = values
        .into_iter()
        .filter_map(|(game_id, value)| {
            let game = data.games.get(&game_id)?;
            let key: (NaiveDate, String, String) = (
                game.date,
                data.team_name(game.home_team_id).to_string(),
                data.team_name(game.away_team_id).to_string(),
            );
            Some((game_id, key, value))
        })
        .collect();

    RankingDraft {
        name: name.to_string(),
        week,
        values: rank_values(entries),
    }
}

// 📜 Events - immutable facts, one per domain operation
//
// Payloads carry identifiers and primitive values only; an event never
// points at a live aggregate. The closed `Event` enum is what travels on the
// buses and what the storage projections match on.

use super::affiliation::Subdivision;
use super::ids::{AffiliationId, GameId, RankingId, SeasonId, TeamId, TeamRecordId};
use super::ranking::RankingValue;
use super::record::TeamRecordValue;
use super::season::SeasonSection;
use crate::validation::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonCreated {
    pub id: SeasonId,
    pub year: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamCreated {
    pub id: TeamId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffiliationCreated {
    pub id: AffiliationId,
    pub season_id: SeasonId,
    pub team_id: TeamId,
    pub subdivision: Subdivision,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameCreated {
    pub id: GameId,
    pub season_id: SeasonId,
    pub week: u32,
    pub date: NaiveDate,
    pub season_section: SeasonSection,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRescheduled {
    pub id: GameId,
    pub season_id: SeasonId,
    pub old_week: u32,
    pub old_date: NaiveDate,
    pub week: u32,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameCanceled {
    pub id: GameId,
    pub season_id: SeasonId,
    pub week: u32,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameCompleted {
    pub id: GameId,
    pub season_id: SeasonId,
    pub week: u32,
    pub date: NaiveDate,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home_team_score: u32,
    pub away_team_score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameNotesUpdated {
    pub id: GameId,
    pub season_id: SeasonId,
    pub old_notes: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecordCalculated {
    pub id: TeamRecordId,
    pub season_id: SeasonId,
    pub week: Option<u32>,
    pub values: Vec<TeamRecordValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRankingCalculated {
    pub id: RankingId,
    pub name: String,
    pub season_id: SeasonId,
    pub week: Option<u32>,
    pub values: Vec<RankingValue<TeamId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRankingCalculated {
    pub id: RankingId,
    pub name: String,
    pub season_id: SeasonId,
    pub week: Option<u32>,
    pub values: Vec<RankingValue<GameId>>,
}

// ============================================================================
// EVENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    SeasonCreated(SeasonCreated),
    TeamCreated(TeamCreated),
    AffiliationCreated(AffiliationCreated),
    GameCreated(GameCreated),
    GameRescheduled(GameRescheduled),
    GameCanceled(GameCanceled),
    GameCompleted(GameCompleted),
    GameNotesUpdated(GameNotesUpdated),
    TeamRecordCalculated(TeamRecordCalculated),
    TeamRankingCalculated(TeamRankingCalculated),
    GameRankingCalculated(GameRankingCalculated),
    /// A data finding from the validation service (operator review only)
    ValidationFailed(ValidationError),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::SeasonCreated(_) => "SeasonCreated",
            Event::TeamCreated(_) => "TeamCreated",
            Event::AffiliationCreated(_) => "AffiliationCreated",
            Event::GameCreated(_) => "GameCreated",
            Event::GameRescheduled(_) => "GameRescheduled",
            Event::GameCanceled(_) => "GameCanceled",
            Event::GameCompleted(_) => "GameCompleted",
            Event::GameNotesUpdated(_) => "GameNotesUpdated",
            Event::TeamRecordCalculated(_) => "TeamRecordCalculated",
            Event::TeamRankingCalculated(_) => "TeamRankingCalculated",
            Event::GameRankingCalculated(_) => "GameRankingCalculated",
            Event::ValidationFailed(_) => "ValidationFailed",
        }
    }

    /// Game the event mutates, for events that change an existing game
    pub fn mutated_game(&self) -> Option<GameId> {
        match self {
            Event::GameRescheduled(e) => Some(e.id),
            Event::GameCanceled(e) => Some(e.id),
            Event::GameCompleted(e) => Some(e.id),
            Event::GameNotesUpdated(e) => Some(e.id),
            _ => None,
        }
    }
}

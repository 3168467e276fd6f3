// 🏈 Game - the only aggregate with a lifecycle
//
// SCHEDULED is the initial state; COMPLETED and CANCELED are terminal.
//
//   reschedule(week, date)   SCHEDULED -> SCHEDULED
//   cancel()                 SCHEDULED -> CANCELED
//   complete(home, away)     SCHEDULED -> COMPLETED
//   update_notes(text)       any state
//
// Every operation first decides (checks the transition, builds the event) and
// then applies the event to itself, so the in-memory projection and the
// domain mutation share one code path.

use super::events::{GameCanceled, GameCompleted, GameCreated, GameNotesUpdated, GameRescheduled};
use super::ids::{GameId, SeasonId, TeamId};
use super::season::SeasonSection;
use super::UnknownVariant;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// GAME STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Scheduled,
    Completed,
    Canceled,
}

impl GameStatus {
    pub const ALL: [GameStatus; 3] = [
        GameStatus::Scheduled,
        GameStatus::Completed,
        GameStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Scheduled => "SCHEDULED",
            GameStatus::Completed => "COMPLETED",
            GameStatus::Canceled => "CANCELED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameStatus::Scheduled)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("game status", s))
    }
}

// ============================================================================
// STATUS ERRORS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOperation {
    Reschedule,
    Cancel,
    Complete,
}

impl fmt::Display for GameOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GameOperation::Reschedule => "reschedule",
            GameOperation::Cancel => "cancel",
            GameOperation::Complete => "complete",
        })
    }
}

/// Illegal state transition: carries the attempted operation and current status
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot {operation} game {game_id}: game is {status}")]
pub struct GameStatusError {
    pub game_id: GameId,
    pub operation: GameOperation,
    pub status: GameStatus,
}

// ============================================================================
// NATURAL KEY
// ============================================================================

/// (season, week, unordered team pair)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GameKey {
    pub season_id: SeasonId,
    pub week: u32,
    first_team_id: TeamId,
    second_team_id: TeamId,
}

impl GameKey {
    pub fn new(season_id: SeasonId, week: u32, team1_id: TeamId, team2_id: TeamId) -> Self {
        let (first_team_id, second_team_id) = if team1_id <= team2_id {
            (team1_id, team2_id)
        } else {
            (team2_id, team1_id)
        };

        GameKey {
            season_id,
            week,
            first_team_id,
            second_team_id,
        }
    }

    pub fn teams(&self) -> (TeamId, TeamId) {
        (self.first_team_id, self.second_team_id)
    }
}

impl fmt::Display for GameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "season {} week {} ({} vs {})",
            self.season_id, self.week, self.first_team_id, self.second_team_id
        )
    }
}

// ============================================================================
// GAME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub season_id: SeasonId,
    pub week: u32,
    pub date: NaiveDate,
    pub season_section: SeasonSection,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home_team_score: Option<u32>,
    pub away_team_score: Option<u32>,
    pub status: GameStatus,
    pub notes: String,
}

impl Game {
    /// New games always start SCHEDULED without scores
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: GameId,
        season_id: SeasonId,
        week: u32,
        date: NaiveDate,
        season_section: SeasonSection,
        home_team_id: TeamId,
        away_team_id: TeamId,
        notes: impl Into<String>,
    ) -> Self {
        Game {
            id,
            season_id,
            week,
            date,
            season_section,
            home_team_id,
            away_team_id,
            home_team_score: None,
            away_team_score: None,
            status: GameStatus::Scheduled,
            notes: notes.into(),
        }
    }

    pub fn key(&self) -> GameKey {
        GameKey::new(self.season_id, self.week, self.home_team_id, self.away_team_id)
    }

    pub fn involves(&self, team_id: TeamId) -> bool {
        self.home_team_id == team_id || self.away_team_id == team_id
    }

    pub fn opponent_of(&self, team_id: TeamId) -> Option<TeamId> {
        if self.home_team_id == team_id {
            Some(self.away_team_id)
        } else if self.away_team_id == team_id {
            Some(self.home_team_id)
        } else {
            None
        }
    }

    pub fn winning_team_id(&self) -> Option<TeamId> {
        match (self.home_team_score, self.away_team_score) {
            (Some(home), Some(away)) if home > away => Some(self.home_team_id),
            (Some(home), Some(away)) if away > home => Some(self.away_team_id),
            _ => None,
        }
    }

    pub fn losing_team_id(&self) -> Option<TeamId> {
        match (self.home_team_score, self.away_team_score) {
            (Some(home), Some(away)) if home > away => Some(self.away_team_id),
            (Some(home), Some(away)) if away > home => Some(self.home_team_id),
            _ => None,
        }
    }

    pub fn winning_team_score(&self) -> Option<u32> {
        match (self.home_team_score, self.away_team_score) {
            (Some(home), Some(away)) if home != away => Some(home.max(away)),
            _ => None,
        }
    }

    pub fn losing_team_score(&self) -> Option<u32> {
        match (self.home_team_score, self.away_team_score) {
            (Some(home), Some(away)) if home != away => Some(home.min(away)),
            _ => None,
        }
    }

    /// Points scored by `team_id` minus points allowed, for completed games
    pub fn margin_for(&self, team_id: TeamId) -> Option<i64> {
        let home = i64::from(self.home_team_score?);
        let away = i64::from(self.away_team_score?);
        if team_id == self.home_team_id {
            Some(home - away)
        } else if team_id == self.away_team_id {
            Some(away - home)
        } else {
            None
        }
    }

    // ========================================================================
    // STATE MACHINE
    // ========================================================================

    fn require_scheduled(&self, operation: GameOperation) -> Result<(), GameStatusError> {
        if self.status == GameStatus::Scheduled {
            Ok(())
        } else {
            Err(GameStatusError {
                game_id: self.id,
                operation,
                status: self.status,
            })
        }
    }

    pub(crate) fn reschedule(
        &mut self,
        week: u32,
        date: NaiveDate,
    ) -> Result<GameRescheduled, GameStatusError> {
        self.require_scheduled(GameOperation::Reschedule)?;

        let event = GameRescheduled {
            id: self.id,
            season_id: self.season_id,
            old_week: self.week,
            old_date: self.date,
            week,
            date,
        };
        self.apply_rescheduled(&event);
        Ok(event)
    }

    pub(crate) fn cancel(&mut self) -> Result<GameCanceled, GameStatusError> {
        self.require_scheduled(GameOperation::Cancel)?;

        let event = GameCanceled {
            id: self.id,
            season_id: self.season_id,
            week: self.week,
            date: self.date,
        };
        self.apply_canceled(&event);
        Ok(event)
    }

    pub(crate) fn complete(
        &mut self,
        home_team_score: u32,
        away_team_score: u32,
    ) -> Result<GameCompleted, GameStatusError> {
        self.require_scheduled(GameOperation::Complete)?;

        let event = GameCompleted {
            id: self.id,
            season_id: self.season_id,
            week: self.week,
            date: self.date,
            home_team_id: self.home_team_id,
            away_team_id: self.away_team_id,
            home_team_score,
            away_team_score,
        };
        self.apply_completed(&event);
        Ok(event)
    }

    pub(crate) fn update_notes(&mut self, notes: impl Into<String>) -> GameNotesUpdated {
        let event = GameNotesUpdated {
            id: self.id,
            season_id: self.season_id,
            old_notes: self.notes.clone(),
            notes: notes.into(),
        };
        self.apply_notes_updated(&event);
        event
    }

    // ========================================================================
    // EVENT APPLICATION (shared with the memory projection)
    // ========================================================================

    pub(crate) fn apply_rescheduled(&mut self, event: &GameRescheduled) {
        self.week = event.week;
        self.date = event.date;
    }

    pub(crate) fn apply_canceled(&mut self, _event: &GameCanceled) {
        self.status = GameStatus::Canceled;
    }

    pub(crate) fn apply_completed(&mut self, event: &GameCompleted) {
        self.home_team_score = Some(event.home_team_score);
        self.away_team_score = Some(event.away_team_score);
        self.status = GameStatus::Completed;
    }

    pub(crate) fn apply_notes_updated(&mut self, event: &GameNotesUpdated) {
        self.notes = event.notes.clone();
    }

    pub(crate) fn created(&self) -> GameCreated {
        GameCreated {
            id: self.id,
            season_id: self.season_id,
            week: self.week,
            date: self.date,
            season_section: self.season_section,
            home_team_id: self.home_team_id,
            away_team_id: self.away_team_id,
            notes: self.notes.clone(),
        }
    }
}

impl From<&GameCreated> for Game {
    fn from(event: &GameCreated) -> Self {
        Game::new(
            event.id,
            event.season_id,
            event.week,
            event.date,
            event.season_section,
            event.home_team_id,
            event.away_team_id,
            event.notes.clone(),
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

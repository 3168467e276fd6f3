// 🔎 Queries - read-only messages and their result records
//
// Each query type answers with exactly one result type. Results are flat
// records (ids, names, primitives) ready for printing; they never hand out
// aggregates. Absence is `None` or an empty list.
//
// Handlers are backend specific: see `storage::memory::queries` and
// `storage::sqlite::queries`.

use crate::bus::Query;
use crate::domain::{
    GameId, GameStatus, RankingId, RankingType, SeasonId, SeasonSection, TeamId, TeamRecordId,
};
use chrono::NaiveDate;
use serde::Serialize;

// ============================================================================
// RESULT RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonResult {
    pub id: SeasonId,
    pub year: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamResult {
    pub id: TeamId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AffiliationCountResult {
    pub season_id: SeasonId,
    pub fbs_count: u32,
    pub fcs_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameCountResult {
    pub season_id: SeasonId,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekCountResult {
    pub season_id: SeasonId,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamRecordValueResult {
    pub team: TeamResult,
    pub wins: u32,
    pub losses: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamRecordResult {
    pub id: TeamRecordId,
    pub season_id: SeasonId,
    pub year: u32,
    pub week: Option<u32>,
    pub values: Vec<TeamRecordValueResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRankingValueResult {
    pub team: TeamResult,
    pub order: u32,
    pub rank: u32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRankingResult {
    pub id: RankingId,
    pub name: String,
    pub season_id: SeasonId,
    pub year: u32,
    pub week: Option<u32>,
    pub values: Vec<TeamRankingValueResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameResult {
    pub id: GameId,
    pub season_id: SeasonId,
    pub week: u32,
    pub date: NaiveDate,
    pub season_section: SeasonSection,
    pub home_team: TeamResult,
    pub away_team: TeamResult,
    pub home_team_score: Option<u32>,
    pub away_team_score: Option<u32>,
    pub status: GameStatus,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRankingValueResult {
    pub game: GameResult,
    pub order: u32,
    pub rank: u32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRankingResult {
    pub id: RankingId,
    pub name: String,
    pub season_id: SeasonId,
    pub year: u32,
    pub week: Option<u32>,
    pub values: Vec<GameRankingValueResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestSeasonWeekResult {
    pub season_id: SeasonId,
    pub year: u32,
    /// None when the season has no completed games yet
    pub week: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanceledGameResult {
    pub year: u32,
    pub game: GameResult,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RankingNameResult {
    pub name: String,
    pub ranking_type: RankingType,
}

// ============================================================================
// QUERY MESSAGES
// ============================================================================

/// All seasons, ordered by year
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonsQuery;

impl Query for SeasonsQuery {
    type Result = Vec<SeasonResult>;
}

#[derive(Debug, Clone, Copy)]
pub struct SeasonByYearQuery {
    pub year: u32,
}

impl Query for SeasonByYearQuery {
    type Result = Option<SeasonResult>;
}

#[derive(Debug, Clone, Copy)]
pub struct SeasonByIdQuery {
    pub id: SeasonId,
}

impl Query for SeasonByIdQuery {
    type Result = Option<SeasonResult>;
}

#[derive(Debug, Clone, Copy)]
pub struct TeamByIdQuery {
    pub id: TeamId,
}

impl Query for TeamByIdQuery {
    type Result = Option<TeamResult>;
}

/// FBS and FCS team counts; None for an unknown season
#[derive(Debug, Clone, Copy)]
pub struct AffiliationCountBySeasonQuery {
    pub season_id: SeasonId,
}

impl Query for AffiliationCountBySeasonQuery {
    type Result = Option<AffiliationCountResult>;
}

#[derive(Debug, Clone, Copy)]
pub struct GameCountBySeasonQuery {
    pub season_id: SeasonId,
}

impl Query for GameCountBySeasonQuery {
    type Result = Option<GameCountResult>;
}

/// Highest week number among the season's games
#[derive(Debug, Clone, Copy)]
pub struct WeekCountBySeasonQuery {
    pub season_id: SeasonId,
}

impl Query for WeekCountBySeasonQuery {
    type Result = Option<WeekCountResult>;
}

#[derive(Debug, Clone, Copy)]
pub struct TeamRecordBySeasonWeekQuery {
    pub season_id: SeasonId,
    pub week: Option<u32>,
}

impl Query for TeamRecordBySeasonWeekQuery {
    type Result = Option<TeamRecordResult>;
}

#[derive(Debug, Clone)]
pub struct TeamRankingBySeasonWeekQuery {
    pub name: String,
    pub season_id: SeasonId,
    pub week: Option<u32>,
}

impl Query for TeamRankingBySeasonWeekQuery {
    type Result = Option<TeamRankingResult>;
}

#[derive(Debug, Clone)]
pub struct GameRankingBySeasonWeekQuery {
    pub name: String,
    pub season_id: SeasonId,
    pub week: Option<u32>,
}

impl Query for GameRankingBySeasonWeekQuery {
    type Result = Option<GameRankingResult>;
}

/// Latest season with completed games and its latest completed week. Falls
/// back to the latest season (week None) when nothing has been played.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestSeasonWeekQuery;

impl Query for LatestSeasonWeekQuery {
    type Result = Option<LatestSeasonWeekResult>;
}

/// Canceled games across all seasons, by year then date
#[derive(Debug, Clone, Copy, Default)]
pub struct CanceledGamesQuery;

impl Query for CanceledGamesQuery {
    type Result = Vec<CanceledGameResult>;
}

/// Names of the rankings stored for a season, sorted
#[derive(Debug, Clone, Copy)]
pub struct RankingNamesBySeasonQuery {
    pub season_id: SeasonId,
}

impl Query for RankingNamesBySeasonQuery {
    type Result = Vec<RankingNameResult>;
}

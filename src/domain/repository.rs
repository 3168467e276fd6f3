// Repository read contracts
//
// Split per aggregate and composed into `AggregateReader`. Both storage
// backends and the unit-of-work Transaction implement every trait; the
// write half (`create` + game mutations) lives on the Transaction's
// repositories because writes always go through an event bus.
//
// Absence is `Ok(None)`, never an error.

use super::affiliation::Affiliation;
use super::game::{Game, GameKey};
use super::ids::{AffiliationId, GameId, SeasonId, TeamId, TeamRecordId};
use super::ranking::{GameRanking, RankingKey, TeamRanking};
use super::record::TeamRecord;
use super::season::Season;
use super::team::Team;
use crate::error::Result;
use std::fmt;

pub trait SeasonReader {
    fn season(&self, id: SeasonId) -> Result<Option<Season>>;
    fn season_by_year(&self, year: u32) -> Result<Option<Season>>;
    /// All seasons, ordered by year
    fn seasons(&self) -> Result<Vec<Season>>;
}

pub trait TeamReader {
    fn team(&self, id: TeamId) -> Result<Option<Team>>;
    fn team_by_name(&self, name: &str) -> Result<Option<Team>>;
}

pub trait AffiliationReader {
    fn affiliation(&self, id: AffiliationId) -> Result<Option<Affiliation>>;
    fn affiliation_by_team(&self, season_id: SeasonId, team_id: TeamId)
        -> Result<Option<Affiliation>>;
    fn affiliations_for_season(&self, season_id: SeasonId) -> Result<Vec<Affiliation>>;
}

pub trait GameReader {
    fn game(&self, id: GameId) -> Result<Option<Game>>;
    fn game_by_key(&self, key: &GameKey) -> Result<Option<Game>>;
    fn games_for_season(&self, season_id: SeasonId) -> Result<Vec<Game>>;
}

pub trait RankingReader {
    fn team_ranking(&self, key: &RankingKey) -> Result<Option<TeamRanking>>;
    fn game_ranking(&self, key: &RankingKey) -> Result<Option<GameRanking>>;
}

pub trait TeamRecordReader {
    fn team_record(&self, id: TeamRecordId) -> Result<Option<TeamRecord>>;
    fn team_record_by_week(&self, season_id: SeasonId, week: Option<u32>)
        -> Result<Option<TeamRecord>>;
}

/// Everything a ranking or validation pass needs to read
pub trait AggregateReader:
    SeasonReader + TeamReader + AffiliationReader + GameReader + RankingReader + TeamRecordReader
{
}

impl<T> AggregateReader for T where
    T: SeasonReader
        + TeamReader
        + AffiliationReader
        + GameReader
        + RankingReader
        + TeamRecordReader
        + ?Sized
{
}

// ============================================================================
// CANONICAL SEASON RESOLUTION
// ============================================================================

/// A season named either by identity or by year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonRef {
    Id(SeasonId),
    Year(u32),
}

impl fmt::Display for SeasonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonRef::Id(id) => write!(f, "{}", id),
            SeasonRef::Year(year) => write!(f, "{}", year),
        }
    }
}

impl From<SeasonId> for SeasonRef {
    fn from(id: SeasonId) -> Self {
        SeasonRef::Id(id)
    }
}

impl From<u32> for SeasonRef {
    fn from(year: u32) -> Self {
        SeasonRef::Year(year)
    }
}

impl std::str::FromStr for SeasonRef {
    type Err = uuid::Error;

    /// Four digits or fewer is a year, anything else must be a season id
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.parse::<u32>() {
            Ok(year) if s.len() <= 4 => Ok(SeasonRef::Year(year)),
            _ => s.parse::<SeasonId>().map(SeasonRef::Id),
        }
    }
}

/// Resolve a season reference to the stored season, once, at the boundary
pub fn resolve_season<R>(reader: &R, season: SeasonRef) -> Result<Option<Season>>
where
    R: SeasonReader + ?Sized,
{
    match season {
        SeasonRef::Id(id) => reader.season(id),
        SeasonRef::Year(year) => reader.season_by_year(year),
    }
}

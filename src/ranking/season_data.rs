// Season snapshot - one season's aggregates in id-ordered maps
//
// BTreeMap everywhere so every ranking pass iterates in the same order.

use crate::domain::{
    Affiliation, AffiliationId, AggregateReader, Game, GameId, GameStatus, Season, SeasonId,
    SeasonSection, Subdivision, Team, TeamId,
};
use crate::error::Result;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonData {
    pub season: Season,
    pub teams: BTreeMap<TeamId, Team>,
    pub affiliations: BTreeMap<AffiliationId, Affiliation>,
    pub games: BTreeMap<GameId, Game>,
    subdivisions: BTreeMap<TeamId, Subdivision>,
}

impl SeasonData {
    pub fn new(
        season: Season,
        teams: impl IntoIterator<Item = Team>,
        affiliations: impl IntoIterator<Item = Affiliation>,
        games: impl IntoIterator<Item = Game>,
    ) -> Self {
        let affiliations: BTreeMap<AffiliationId, Affiliation> = affiliations
            .into_iter()
            .filter(|affiliation| affiliation.season_id == season.id)
            .map(|affiliation| (affiliation.id, affiliation))
            .collect();
        let subdivisions = affiliations
            .values()
            .map(|affiliation| (affiliation.team_id, affiliation.subdivision))
            .collect();

        SeasonData {
            teams: teams.into_iter().map(|team| (team.id, team)).collect(),
            games: games
                .into_iter()
                .filter(|game| game.season_id == season.id)
                .map(|game| (game.id, game))
                .collect(),
            affiliations,
            subdivisions,
            season,
        }
    }

    /// Snapshot a stored season; `None` when the season does not exist
    pub fn load<R>(reader: &R, season_id: SeasonId) -> Result<Option<Self>>
    where
        R: AggregateReader + ?Sized,
    {
        let Some(season) = reader.season(season_id)? else {
            return Ok(None);
        };

        let affiliations = reader.affiliations_for_season(season_id)?;
        let games = reader.games_for_season(season_id)?;

        let team_ids: BTreeSet<TeamId> = affiliations
            .iter()
            .map(|affiliation| affiliation.team_id)
            .chain(
                games
                    .iter()
                    .flat_map(|game| [game.home_team_id, game.away_team_id]),
            )
            .collect();
        let mut teams = Vec::with_capacity(team_ids.len());
        for team_id in team_ids {
            if let Some(team) = reader.team(team_id)? {
                teams.push(team);
            }
        }

        Ok(Some(SeasonData::new(season, teams, affiliations, games)))
    }

    pub fn subdivision_of(&self, team_id: TeamId) -> Option<Subdivision> {
        self.subdivisions.get(&team_id).copied()
    }

    pub fn team_ids_in(&self, subdivision: Subdivision) -> Vec<TeamId> {
        self.subdivisions
            .iter()
            .filter(|(_, s)| **s == subdivision)
            .map(|(team_id, _)| *team_id)
            .collect()
    }

    pub fn fbs_team_ids(&self) -> Vec<TeamId> {
        self.team_ids_in(Subdivision::Fbs)
    }

    /// Team name, or empty for a team missing from the snapshot
    pub fn team_name(&self, team_id: TeamId) -> &str {
        self.teams
            .get(&team_id)
            .map(|team| team.name.as_str())
            .unwrap_or("")
    }

    pub fn is_fbs_game(&self, game: &Game) -> bool {
        self.subdivision_of(game.home_team_id) == Some(Subdivision::Fbs)
            && self.subdivision_of(game.away_team_id) == Some(Subdivision::Fbs)
    }

    pub fn completed_games(&self) -> impl Iterator<Item = &Game> {
        self.games
            .values()
            .filter(|game| game.status == GameStatus::Completed)
    }

    /// Completed regular-season games between two FBS teams
    pub fn fbs_regular_season_results(&self) -> Vec<&Game> {
        self.completed_games()
            .filter(|game| game.season_section == SeasonSection::RegularSeason)
            .filter(|game| self.is_fbs_game(game))
            .collect()
    }

    /// Distinct weeks holding at least one completed game, ascending
    pub fn completed_weeks(&self) -> Vec<u32> {
        self.completed_games()
            .map(|game| game.week)
            .collect::<BTreeSet<u32>>()
            .into_iter()
            .collect()
    }
}

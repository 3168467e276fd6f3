// 🔁 Import Service - idempotent get-or-create by natural key
//
//   season      <- year
//   team        <- name
//   affiliation <- (season, team)
//   game        <- (season, week, unordered team pair)
//
// Each lookup goes run-local cache -> transaction -> create. A stored game
// whose date, result, or notes moved on in the source is mutated instead of
// duplicated. Afterwards the stored aggregate is checked field by field
// against the parsed facts; whatever no legal mutation could reconcile
// surfaces as a validation finding.

use crate::domain::{
    Affiliation, Game, GameKey, GameStatus, Season, SeasonId, SeasonSection, Subdivision, Team,
    TeamId,
};
use crate::error::Result;
use crate::source::GameRow;
use crate::transaction::Transaction;
use crate::validation::{GameData, ValidationService};
use std::collections::HashMap;

/// Notes naming a bowl or playoff game mark the postseason
const POSTSEASON_KEYWORDS: [&str; 4] = ["Bowl", "Playoff", "CFP", "National Championship"];

pub struct ImportService<'a> {
    tx: &'a Transaction,
    validation: &'a mut ValidationService,
    seasons: HashMap<u32, Season>,
    teams: HashMap<String, Team>,
    affiliations: HashMap<(SeasonId, TeamId), Affiliation>,
    games: HashMap<GameKey, Game>,
}

impl<'a> ImportService<'a> {
    pub fn new(tx: &'a Transaction, validation: &'a mut ValidationService) -> Self {
        ImportService {
            tx,
            validation,
            seasons: HashMap::new(),
            teams: HashMap::new(),
            affiliations: HashMap::new(),
            games: HashMap::new(),
        }
    }

    pub fn import_season(&mut self, year: u32) -> Result<Season> {
        let season = match self.seasons.get(&year) {
            Some(season) => season.clone(),
            None => {
                let season = match self.tx.seasons().find(year)? {
                    Some(season) => season,
                    None => self.tx.seasons().create(year)?,
                };
                self.seasons.insert(year, season.clone());
                season
            }
        };

        self.validation.validate_season_data(&season, year)?;
        Ok(season)
    }

    pub fn import_team(&mut self, name: &str) -> Result<Team> {
        let team = match self.teams.get(name) {
            Some(team) => team.clone(),
            None => {
                let team = match self.tx.teams().find(name)? {
                    Some(team) => team,
                    None => self.tx.teams().create(name)?,
                };
                self.teams.insert(name.to_string(), team.clone());
                team
            }
        };

        self.validation.validate_team_data(&team, name)?;
        Ok(team)
    }

    pub fn import_affiliation(
        &mut self,
        season_id: SeasonId,
        team_id: TeamId,
        subdivision: Subdivision,
    ) -> Result<Affiliation> {
        let key = (season_id, team_id);
        let affiliation = match self.affiliations.get(&key) {
            Some(affiliation) => affiliation.clone(),
            None => {
                let affiliations = self.tx.affiliations();
                let affiliation = match affiliations.find(season_id, team_id)? {
                    Some(affiliation) => affiliation,
                    None => affiliations.create(season_id, team_id, subdivision)?,
                };
                self.affiliations.insert(key, affiliation.clone());
                affiliation
            }
        };

        self.validation
            .validate_affiliation_data(&affiliation, season_id, team_id, subdivision)?;
        Ok(affiliation)
    }

    pub fn import_game(&mut self, data: &GameData) -> Result<Game> {
        let key = GameKey::new(data.season_id, data.week, data.home_team_id, data.away_team_id);

        let cached = self.games.get(&key).cloned();
        let found = match cached {
            Some(game) => Some(game),
            None => self.tx.games().find(&key)?,
        };

        let mut game = match found {
            Some(game) => game,
            None => self.tx.games().create(
                data.season_id,
                data.week,
                data.date,
                data.season_section,
                data.home_team_id,
                data.away_team_id,
                &data.notes,
            )?,
        };

        self.reconcile(&mut game, data)?;
        self.games.insert(key, game.clone());

        self.validation.validate_game_data(&game, data)?;
        Ok(game)
    }

    /// Bring a stored game in line with the source through legal mutations
    fn reconcile(&self, game: &mut Game, data: &GameData) -> Result<()> {
        let games = self.tx.games();

        if game.status == GameStatus::Scheduled {
            if game.date != data.date {
                games.reschedule(game, data.week, data.date)?;
            }

            match (data.status, data.home_team_score, data.away_team_score) {
                (GameStatus::Completed, Some(home), Some(away)) => {
                    // Source home/away may be flipped relative to the stored game
                    let (home, away) = if game.home_team_id == data.home_team_id {
                        (home, away)
                    } else {
                        (away, home)
                    };
                    games.complete(game, home, away)?;
                }
                (GameStatus::Canceled, _, _) => games.cancel(game)?,
                _ => {}
            }
        }

        if game.notes != data.notes {
            games.update_notes(game, &data.notes)?;
        }
        Ok(())
    }
}

// ============================================================================
// ROW CONVERSION
// ============================================================================

pub fn season_section_for(notes: &str) -> SeasonSection {
    if POSTSEASON_KEYWORDS.iter().any(|keyword| notes.contains(keyword)) {
        SeasonSection::Postseason
    } else {
        SeasonSection::RegularSeason
    }
}

/// Turn a winner/loser source row into home/away game facts
pub fn game_data_from_row(
    season_id: SeasonId,
    row: &GameRow,
    winner_id: TeamId,
    loser_id: TeamId,
) -> Result<GameData> {
    let (home_team_id, away_team_id, home_team_score, away_team_score) = if row.winner_was_away()
    {
        (loser_id, winner_id, row.loser_points, row.winner_points)
    } else {
        (winner_id, loser_id, row.winner_points, row.loser_points)
    };

    let status = if row.is_canceled() {
        GameStatus::Canceled
    } else if home_team_score.is_some() && away_team_score.is_some() {
        GameStatus::Completed
    } else {
        GameStatus::Scheduled
    };
    let (home_team_score, away_team_score) = match status {
        GameStatus::Completed => (home_team_score, away_team_score),
        _ => (None, None),
    };

    Ok(GameData {
        season_id,
        week: row.week,
        date: row.parsed_date()?,
        season_section: season_section_for(&row.notes),
        home_team_id,
        away_team_id,
        home_team_score,
        away_team_score,
        status,
        notes: row.notes.clone(),
    })
}

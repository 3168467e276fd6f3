// ✅ Validation Service - cross-checks imported facts against stored aggregates
//
// Two kinds of checks:
// - per-field validators: parsed external data vs. the stored aggregate, one
//   error per differing field
// - season integrity rules, run once per season import:
//     Rule 1: every FBS team plays at least 10 regular-season games
//     Rule 2: every FCS team plays at most 5 regular-season games against FBS
//     Rule 3: postseason games / regular-season games lies in [0.03, 0.06]
//
// IMMEDIATELY raises the first finding; ON_DEMAND accumulates findings until
// the caller drains them with `raise_errors` or `take_errors`.

use crate::domain::{
    Affiliation, AffiliationId, Game, GameId, GameStatus, Season, SeasonId, SeasonSection,
    Subdivision, Team, TeamId,
};
use crate::ranking::SeasonData;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::ops::RangeInclusive;
use thiserror::Error;

pub const MIN_FBS_GAMES: u32 = 10;
pub const MAX_FCS_GAMES_AGAINST_FBS: u32 = 5;
pub const POSTSEASON_RATIO_RANGE: RangeInclusive<f64> = 0.03..=0.06;

// ============================================================================
// VALIDATION ERRORS
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("season {season_id}: {attribute_name} is {attribute_value}, expected {expected_value}")]
    SeasonData {
        season_id: SeasonId,
        attribute_name: String,
        attribute_value: String,
        expected_value: String,
    },

    #[error("team {team_id}: {attribute_name} is {attribute_value}, expected {expected_value}")]
    TeamData {
        team_id: TeamId,
        attribute_name: String,
        attribute_value: String,
        expected_value: String,
    },

    #[error("affiliation {affiliation_id}: {attribute_name} is {attribute_value}, expected {expected_value}")]
    AffiliationData {
        affiliation_id: AffiliationId,
        attribute_name: String,
        attribute_value: String,
        expected_value: String,
    },

    #[error("game {game_id}: {attribute_name} is {attribute_value}, expected {expected_value}")]
    GameData {
        game_id: GameId,
        attribute_name: String,
        attribute_value: String,
        expected_value: String,
    },

    #[error("FBS team {team_id} played {game_count} games in season {season_id}")]
    FbsGameCount {
        season_id: SeasonId,
        team_id: TeamId,
        game_count: u32,
    },

    #[error("FCS team {team_id} played {game_count} games against FBS teams in season {season_id}")]
    FcsGameCount {
        season_id: SeasonId,
        team_id: TeamId,
        game_count: u32,
    },

    #[error("season {season_id} has {postseason_game_count} postseason games for {regular_season_game_count} regular season games")]
    PostseasonGameCount {
        season_id: SeasonId,
        regular_season_game_count: u32,
        postseason_game_count: u32,
    },

    #[error("{} validation errors", .0.len())]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Number of individual findings, flattening `Multiple`
    pub fn count(&self) -> usize {
        match self {
            ValidationError::Multiple(errors) => errors.iter().map(ValidationError::count).sum(),
            _ => 1,
        }
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        match self {
            ValidationError::Multiple(errors) => {
                errors.into_iter().flat_map(ValidationError::into_vec).collect()
            }
            error => vec![error],
        }
    }
}

// ============================================================================
// RAISE BEHAVIOR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaiseBehavior {
    /// Fail on the first finding
    Immediately,
    /// Collect findings; the caller drains them
    #[default]
    OnDemand,
}

// ============================================================================
// PARSED GAME FACTS
// ============================================================================

/// A game as the statistics source reports it, with team names already
/// resolved to identities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameData {
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

// ============================================================================
// VALIDATION SERVICE
// ============================================================================

#[derive(Debug, Default)]
pub struct ValidationService {
    raise_behavior: RaiseBehavior,
    errors: Vec<ValidationError>,
}

impl ValidationService {
    pub fn new(raise_behavior: RaiseBehavior) -> Self {
        ValidationService {
            raise_behavior,
            errors: Vec::new(),
        }
    }

    pub fn raise_behavior(&self) -> RaiseBehavior {
        self.raise_behavior
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<ValidationError> {
        std::mem::take(&mut self.errors)
    }

    /// Drain accumulated findings: none, the single one, or `Multiple`
    pub fn raise_errors(&mut self) -> Result<(), ValidationError> {
        let mut errors = self.take_errors();
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }

    fn report(&mut self, error: ValidationError) -> Result<(), ValidationError> {
        tracing::warn!(%error, "validation finding");
        match self.raise_behavior {
            RaiseBehavior::Immediately => Err(error),
            RaiseBehavior::OnDemand => {
                self.errors.push(error);
                Ok(())
            }
        }
    }

    // ========================================================================
    // PER-FIELD VALIDATORS
    // ========================================================================

    pub fn validate_season_data(
        &mut self,
        season: &Season,
        year: u32,
    ) -> Result<(), ValidationError> {
        if season.year != year {
            self.report(ValidationError::SeasonData {
                season_id: season.id,
                attribute_name: "year".to_string(),
                attribute_value: season.year.to_string(),
                expected_value: year.to_string(),
            })?;
        }
        Ok(())
    }

    pub fn validate_team_data(&mut self, team: &Team, name: &str) -> Result<(), ValidationError> {
        if team.name != name {
            self.report(ValidationError::TeamData {
                team_id: team.id,
                attribute_name: "name".to_string(),
                attribute_value: team.name.clone(),
                expected_value: name.to_string(),
            })?;
        }
        Ok(())
    }

    pub fn validate_affiliation_data(
        &mut self,
        affiliation: &Affiliation,
        season_id: SeasonId,
        team_id: TeamId,
        subdivision: Subdivision,
    ) -> Result<(), ValidationError> {
        let mismatch = |name: &str, actual: String, expected: String| {
            ValidationError::AffiliationData {
                affiliation_id: affiliation.id,
                attribute_name: name.to_string(),
                attribute_value: actual,
                expected_value: expected,
            }
        };

        let mut findings = Vec::new();
        if affiliation.season_id != season_id {
            findings.push(mismatch(
                "season_id",
                affiliation.season_id.to_string(),
                season_id.to_string(),
            ));
        }
        if affiliation.team_id != team_id {
            findings.push(mismatch(
                "team_id",
                affiliation.team_id.to_string(),
                team_id.to_string(),
            ));
        }
        if affiliation.subdivision != subdivision {
            findings.push(mismatch(
                "subdivision",
                affiliation.subdivision.to_string(),
                subdivision.to_string(),
            ));
        }

        for finding in findings {
            self.report(finding)?;
        }
        Ok(())
    }

    pub fn validate_game_data(
        &mut self,
        game: &Game,
        expected: &GameData,
    ) -> Result<(), ValidationError> {
        let mut findings = Vec::new();
        let mut check = |name: &str, actual: &dyn Display, wanted: &dyn Display, differs: bool| {
            if differs {
                findings.push(ValidationError::GameData {
                    game_id: game.id,
                    attribute_name: name.to_string(),
                    attribute_value: actual.to_string(),
                    expected_value: wanted.to_string(),
                });
            }
        };

        check(
            "season_id",
            &game.season_id,
            &expected.season_id,
            game.season_id != expected.season_id,
        );
        check("week", &game.week, &expected.week, game.week != expected.week);
        check("date", &game.date, &expected.date, game.date != expected.date);
        check(
            "season_section",
            &game.season_section,
            &expected.season_section,
            game.season_section != expected.season_section,
        );
        check(
            "home_team_id",
            &game.home_team_id,
            &expected.home_team_id,
            game.home_team_id != expected.home_team_id,
        );
        check(
            "away_team_id",
            &game.away_team_id,
            &expected.away_team_id,
            game.away_team_id != expected.away_team_id,
        );
        check(
            "home_team_score",
            &display_score(game.home_team_score),
            &display_score(expected.home_team_score),
            game.home_team_score != expected.home_team_score,
        );
        check(
            "away_team_score",
            &display_score(game.away_team_score),
            &display_score(expected.away_team_score),
            game.away_team_score != expected.away_team_score,
        );
        check("status", &game.status, &expected.status, game.status != expected.status);
        check("notes", &game.notes, &expected.notes, game.notes != expected.notes);

        for finding in findings {
            self.report(finding)?;
        }
        Ok(())
    }

    // ========================================================================
    // SEASON INTEGRITY RULES
    // ========================================================================

    pub fn validate_season_games(&mut self, data: &SeasonData) -> Result<(), ValidationError> {
        let season_id = data.season.id;

        let regular_games: Vec<&Game> = data
            .games
            .values()
            .filter(|game| game.status != GameStatus::Canceled)
            .filter(|game| game.season_section == SeasonSection::RegularSeason)
            .collect();

        // Rule 1: FBS teams play a full schedule
        let mut fbs_counts: BTreeMap<TeamId, u32> =
            data.fbs_team_ids().into_iter().map(|id| (id, 0)).collect();
        // Rule 2: FCS teams play few FBS opponents
        let mut fcs_counts: BTreeMap<TeamId, u32> = data
            .team_ids_in(Subdivision::Fcs)
            .into_iter()
            .map(|id| (id, 0))
            .collect();

        for game in &regular_games {
            for (team_id, opponent_id) in [
                (game.home_team_id, game.away_team_id),
                (game.away_team_id, game.home_team_id),
            ] {
                if let Some(count) = fbs_counts.get_mut(&team_id) {
                    *count += 1;
                }
                if data.subdivision_of(opponent_id) == Some(Subdivision::Fbs) {
                    if let Some(count) = fcs_counts.get_mut(&team_id) {
                        *count += 1;
                    }
                }
            }
        }

        let mut findings = Vec::new();

        for (team_id, game_count) in fbs_counts {
            if game_count < MIN_FBS_GAMES {
                findings.push(ValidationError::FbsGameCount {
                    season_id,
                    team_id,
                    game_count,
                });
            }
        }

        for (team_id, game_count) in fcs_counts {
            if game_count > MAX_FCS_GAMES_AGAINST_FBS {
                findings.push(ValidationError::FcsGameCount {
                    season_id,
                    team_id,
                    game_count,
                });
            }
        }

        // Rule 3: postseason size relative to the regular season
        let regular_season_game_count = regular_games.len() as u32;
        let postseason_game_count = data
            .games
            .values()
            .filter(|game| game.status != GameStatus::Canceled)
            .filter(|game| game.season_section == SeasonSection::Postseason)
            .count() as u32;

        let ratio_ok = match (regular_season_game_count, postseason_game_count) {
            (0, 0) => true,
            (0, _) => false,
            (regular, post) => {
                POSTSEASON_RATIO_RANGE.contains(&(f64::from(post) / f64::from(regular)))
            }
        };
        if !ratio_ok {
            findings.push(ValidationError::PostseasonGameCount {
                season_id,
                regular_season_game_count,
                postseason_game_count,
            });
        }

        for finding in findings {
            self.report(finding)?;
        }
        Ok(())
    }
}

fn display_score(score: Option<u32>) -> String {
    score.map(|s| s.to_string()).unwrap_or_else(|| "none".to_string())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AffiliationId, GameId};

    struct SeasonBuilder {
        season: Season,
        teams: Vec<Team>,
        affiliations: Vec<Affiliation>,
        games: Vec<Game>,
        day: u32,
    }

    impl SeasonBuilder {
        fn new() -> Self {
            SeasonBuilder {
                season: Season::new(SeasonId::generate(), 2023),
                teams: Vec::new(),
                affiliations: Vec::new(),
                games: Vec::new(),
                day: 0,
            }
        }

        fn team(&mut self, name: &str, subdivision: Subdivision) -> TeamId {
            let team = Team::new(TeamId::generate(), name);
            self.affiliations.push(Affiliation::new(
                AffiliationId::generate(),
                self.season.id,
                team.id,
                subdivision,
            ));
            let id = team.id;
            self.teams.push(team);
            id
        }

        fn game(&mut self, home: TeamId, away: TeamId, section: SeasonSection) {
            self.day += 1;
            let mut game = Game::new(
                GameId::generate(),
                self.season.id,
                self.day,
                NaiveDate::from_ymd_opt(2023, 8, 26).unwrap() + chrono::Duration::days(i64::from(self.day)),
                section,
                home,
                away,
                "",
            );
            game.complete(28, 14).unwrap();
            self.games.push(game);
        }

        fn build(self) -> SeasonData {
            SeasonData::new(self.season, self.teams, self.affiliations, self.games)
        }
    }

    /// Team A plays 9 games, B..L each play a full slate, and the postseason
    /// ratio is in range
    fn season_with_short_schedule() -> (SeasonData, TeamId) {
        let mut builder = SeasonBuilder::new();
        let short = builder.team("A", Subdivision::Fbs);
        let others: Vec<TeamId> = (0..12)
            .map(|i| builder.team(&format!("Team {}", i), Subdivision::Fbs))
            .collect();

        for opponent in others.iter().take(9) {
            builder.game(short, *opponent, SeasonSection::RegularSeason);
        }
        // Round robin among the others gives each 11 games plus A's games
        for i in 0..others.len() {
            for j in (i + 1)..others.len() {
                builder.game(others[i], others[j], SeasonSection::RegularSeason);
            }
        }
        // 75 regular games -> 3 postseason games is a 0.04 ratio
        for pair in others.chunks(2).take(3) {
            builder.game(pair[0], pair[1], SeasonSection::Postseason);
        }

        (builder.build(), short)
    }

    #[test]
    fn test_short_fbs_schedule_reported_on_demand() {
        let (data, short) = season_with_short_schedule();
        let mut service = ValidationService::new(RaiseBehavior::OnDemand);

        service.validate_season_games(&data).unwrap();

        assert_eq!(
            service.errors(),
            &[ValidationError::FbsGameCount {
                season_id: data.season.id,
                team_id: short,
                game_count: 9,
            }]
        );
        assert!(service.raise_errors().is_err());
        assert!(service.errors().is_empty());
    }

    #[test]
    fn test_short_fbs_schedule_raised_immediately() {
        let (data, short) = season_with_short_schedule();
        let mut service = ValidationService::new(RaiseBehavior::Immediately);

        let err = service.validate_season_games(&data).unwrap_err();
        assert_eq!(
            err,
            ValidationError::FbsGameCount {
                season_id: data.season.id,
                team_id: short,
                game_count: 9,
            }
        );
        assert!(service.errors().is_empty());
    }

    #[test]
    fn test_fcs_team_with_too_many_fbs_opponents() {
        let mut builder = SeasonBuilder::new();
        let fcs = builder.team("Montana", Subdivision::Fcs);
        let fbs: Vec<TeamId> = (0..6)
            .map(|i| builder.team(&format!("FBS {}", i), Subdivision::Fbs))
            .collect();
        for opponent in &fbs {
            builder.game(*opponent, fcs, SeasonSection::RegularSeason);
        }
        let data = builder.build();

        let mut service = ValidationService::new(RaiseBehavior::OnDemand);
        service.validate_season_games(&data).unwrap();

        let fcs_findings: Vec<&ValidationError> = service
            .errors()
            .iter()
            .filter(|e| matches!(e, ValidationError::FcsGameCount { .. }))
            .collect();
        assert_eq!(
            fcs_findings,
            vec![&ValidationError::FcsGameCount {
                season_id: data.season.id,
                team_id: fcs,
                game_count: 6,
            }]
        );
    }

    #[test]
    fn test_postseason_ratio_without_regular_games() {
        let mut builder = SeasonBuilder::new();
        let a = builder.team("A", Subdivision::Fcs);
        let b = builder.team("B", Subdivision::Fcs);
        builder.game(a, b, SeasonSection::Postseason);
        let data = builder.build();

        let mut service = ValidationService::new(RaiseBehavior::OnDemand);
        service.validate_season_games(&data).unwrap();

        assert_eq!(
            service.errors(),
            &[ValidationError::PostseasonGameCount {
                season_id: data.season.id,
                regular_season_game_count: 0,
                postseason_game_count: 1,
            }]
        );
    }

    #[test]
    fn test_empty_season_has_no_findings() {
        let data = SeasonBuilder::new().build();
        let mut service = ValidationService::new(RaiseBehavior::Immediately);
        assert!(service.validate_season_games(&data).is_ok());
    }

    #[test]
    fn test_game_data_reports_one_error_per_field() {
        let season_id = SeasonId::generate();
        let home = TeamId::generate();
        let away = TeamId::generate();
        let date = NaiveDate::from_ymd_opt(2023, 9, 2).unwrap();
        let mut game = Game::new(
            GameId::generate(),
            season_id,
            1,
            date,
            SeasonSection::RegularSeason,
            home,
            away,
            "",
        );
        game.complete(24, 10).unwrap();

        let expected = GameData {
            season_id,
            week: 1,
            date,
            season_section: SeasonSection::Postseason,
            home_team_id: home,
            away_team_id: away,
            home_team_score: Some(27),
            away_team_score: Some(10),
            status: GameStatus::Completed,
            notes: String::new(),
        };

        let mut service = ValidationService::new(RaiseBehavior::OnDemand);
        service.validate_game_data(&game, &expected).unwrap();

        let fields: Vec<String> = service
            .errors()
            .iter()
            .map(|error| match error {
                ValidationError::GameData { attribute_name, .. } => attribute_name.clone(),
                other => panic!("unexpected finding {other:?}"),
            })
            .collect();
        assert_eq!(fields, vec!["season_section", "home_team_score"]);
    }

    #[test]
    fn test_raise_errors_wraps_multiple() {
        let mut service = ValidationService::new(RaiseBehavior::OnDemand);
        let season = Season::new(SeasonId::generate(), 2020);
        let team = Team::new(TeamId::generate(), "Army");

        service.validate_season_data(&season, 2021).unwrap();
        service.validate_team_data(&team, "Navy").unwrap();

        let err = service.raise_errors().unwrap_err();
        assert_eq!(err.count(), 2);
        assert!(matches!(err, ValidationError::Multiple(ref errors) if errors.len() == 2));
        assert!(service.raise_errors().is_ok());
    }

    #[test]
    fn test_affiliation_subdivision_mismatch() {
        let affiliation = Affiliation::new(
            AffiliationId::generate(),
            SeasonId::generate(),
            TeamId::generate(),
            Subdivision::Fcs,
        );
        let mut service = ValidationService::new(RaiseBehavior::Immediately);

        let err = service
            .validate_affiliation_data(
                &affiliation,
                affiliation.season_id,
                affiliation.team_id,
                Subdivision::Fbs,
            )
            .unwrap_err();

        assert!(matches!(
            err,
            ValidationError::AffiliationData { ref attribute_name, .. } if attribute_name == "subdivision"
        ));
    }
}

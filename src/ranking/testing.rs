// Season fixtures for the ranking service tests

use super::SeasonData;
use crate::domain::{
    Affiliation, AffiliationId, Game, GameId, Season, SeasonId, SeasonSection, Subdivision, Team,
    TeamId,
};
use chrono::{Duration, NaiveDate};

pub(crate) struct SeasonBuilder {
    season: Season,
    teams: Vec<Team>,
    affiliations: Vec<Affiliation>,
    games: Vec<Game>,
}

impl SeasonBuilder {
    pub(crate) fn new(year: u32) -> Self {
        SeasonBuilder {
            season: Season::new(SeasonId::generate(), year),
            teams: Vec::new(),
            affiliations: Vec::new(),
            games: Vec::new(),
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

    pub(crate) fn fbs(&mut self, name: &str) -> TeamId {
        self.team(name, Subdivision::Fbs)
    }

    pub(crate) fn fcs(&mut self, name: &str) -> TeamId {
        self.team(name, Subdivision::Fcs)
    }

    pub(crate) fn scheduled(&mut self, week: u32, home: TeamId, away: TeamId) -> GameId {
        self.game(week, home, away, SeasonSection::RegularSeason)
    }

    pub(crate) fn result(
        &mut self,
        week: u32,
        home: TeamId,
        home_score: u32,
        away: TeamId,
        away_score: u32,
        section: SeasonSection,
    ) -> GameId {
        let id = self.game(week, home, away, section);
        if let Some(game) = self.games.last_mut() {
            game.complete(home_score, away_score).unwrap();
        }
        id
    }

    pub(crate) fn canceled(&mut self, week: u32, home: TeamId, away: TeamId) -> GameId {
        let id = self.game(week, home, away, SeasonSection::RegularSeason);
        if let Some(game) = self.games.last_mut() {
            game.cancel().unwrap();
        }
        id
    }

    fn game(&mut self, week: u32, home: TeamId, away: TeamId, section: SeasonSection) -> GameId {
        let kickoff = NaiveDate::from_ymd_opt(self.season.year as i32, 8, 28).unwrap()
            + Duration::days(7 * i64::from(week));
        let game = Game::new(
            GameId::generate(),
            self.season.id,
            week,
            kickoff,
            section,
            home,
            away,
            "",
        );
        let id = game.id;
        self.games.push(game);
        id
    }

    pub(crate) fn build(self) -> SeasonData {
        SeasonData::new(self.season, self.teams, self.affiliations, self.games)
    }
}

// 🔁 Transaction - repositories over a cache-over-store read view
//
// Reads consult the Unit of Work's memory cache first, then the backing
// store. A store result is only returned when the cache holds no newer
// version of the same aggregate, so a game rescheduled inside the transaction
// is not found under its old key and a superseded team record is not found
// by its old id.
//
// Writes never touch either store directly: every repository operation
// publishes exactly one event on the transaction's inner bus, and the Unit of
// Work's capture handler projects it into the cache and the journal.

use crate::bus::EventBus;
use crate::domain::{
    Affiliation, AffiliationId, AffiliationReader, Event, Game, GameId, GameKey, GameRanking,
    GameReader, RankingId, RankingKey, RankingReader, RankingValue, Season, SeasonId,
    SeasonReader, SeasonSection, Subdivision, Team, TeamId, TeamRanking, TeamReader, TeamRecord,
    TeamRecordId, TeamRecordReader, TeamRecordValue,
};
use crate::error::{Error, Result};
use crate::storage::{MemoryStorage, Storage};
use chrono::NaiveDate;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

pub struct Transaction {
    store: Rc<dyn Storage>,
    cache: Rc<MemoryStorage>,
    bus: Rc<EventBus>,
    open: Cell<bool>,
}

impl Transaction {
    pub(crate) fn new(store: Rc<dyn Storage>, cache: Rc<MemoryStorage>, bus: Rc<EventBus>) -> Self {
        Transaction {
            store,
            cache,
            bus,
            open: Cell::new(true),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    pub(crate) fn close(&self) {
        self.open.set(false);
    }

    fn publish(&self, event: Event) -> Result<()> {
        if !self.is_open() {
            return Err(Error::TransactionClosed);
        }
        self.bus.publish(&event)
    }

    // ========================================================================
    // REPOSITORIES
    // ========================================================================

    pub fn seasons(&self) -> SeasonRepository<'_> {
        SeasonRepository { tx: self }
    }

    pub fn teams(&self) -> TeamRepository<'_> {
        TeamRepository { tx: self }
    }

    pub fn affiliations(&self) -> AffiliationRepository<'_> {
        AffiliationRepository { tx: self }
    }

    pub fn games(&self) -> GameRepository<'_> {
        GameRepository { tx: self }
    }

    pub fn team_rankings(&self) -> TeamRankingRepository<'_> {
        TeamRankingRepository { tx: self }
    }

    pub fn game_rankings(&self) -> GameRankingRepository<'_> {
        GameRankingRepository { tx: self }
    }

    pub fn team_records(&self) -> TeamRecordRepository<'_> {
        TeamRecordRepository { tx: self }
    }
}

/// Merge store rows with cached rows, cached versions winning by id
fn overlay<K: Ord, T>(
    stored: Vec<T>,
    cached: Vec<T>,
    key: impl Fn(&T) -> K,
) -> BTreeMap<K, T> {
    let mut merged: BTreeMap<K, T> = stored.into_iter().map(|item| (key(&item), item)).collect();
    for item in cached {
        merged.insert(key(&item), item);
    }
    merged
}

// ============================================================================
// CACHE-OVER-STORE READERS
// ============================================================================

impl SeasonReader for Transaction {
    fn season(&self, id: SeasonId) -> Result<Option<Season>> {
        match self.cache.season(id)? {
            Some(season) => Ok(Some(season)),
            None => self.store.season(id),
        }
    }

    fn season_by_year(&self, year: u32) -> Result<Option<Season>> {
        match self.cache.season_by_year(year)? {
            Some(season) => Ok(Some(season)),
            None => self.store.season_by_year(year),
        }
    }

    fn seasons(&self) -> Result<Vec<Season>> {
        let merged = overlay(self.store.seasons()?, self.cache.seasons()?, |s| s.id);
        let mut seasons: Vec<Season> = merged.into_values().collect();
        seasons.sort_by_key(|season| season.year);
        Ok(seasons)
    }
}

impl TeamReader for Transaction {
    fn team(&self, id: TeamId) -> Result<Option<Team>> {
        match self.cache.team(id)? {
            Some(team) => Ok(Some(team)),
            None => self.store.team(id),
        }
    }

    fn team_by_name(&self, name: &str) -> Result<Option<Team>> {
        match self.cache.team_by_name(name)? {
            Some(team) => Ok(Some(team)),
            None => self.store.team_by_name(name),
        }
    }
}

impl AffiliationReader for Transaction {
    fn affiliation(&self, id: AffiliationId) -> Result<Option<Affiliation>> {
        match self.cache.affiliation(id)? {
            Some(affiliation) => Ok(Some(affiliation)),
            None => self.store.affiliation(id),
        }
    }

    fn affiliation_by_team(
        &self,
        season_id: SeasonId,
        team_id: TeamId,
    ) -> Result<Option<Affiliation>> {
        match self.cache.affiliation_by_team(season_id, team_id)? {
            Some(affiliation) => Ok(Some(affiliation)),
            None => self.store.affiliation_by_team(season_id, team_id),
        }
    }

    fn affiliations_for_season(&self, season_id: SeasonId) -> Result<Vec<Affiliation>> {
        let merged = overlay(
            self.store.affiliations_for_season(season_id)?,
            self.cache.affiliations_for_season(season_id)?,
            |a| a.id,
        );
        Ok(merged.into_values().collect())
    }
}

impl GameReader for Transaction {
    fn game(&self, id: GameId) -> Result<Option<Game>> {
        match self.cache.game(id)? {
            Some(game) => Ok(Some(game)),
            None => self.store.game(id),
        }
    }

    fn game_by_key(&self, key: &GameKey) -> Result<Option<Game>> {
        if let Some(game) = self.cache.game_by_key(key)? {
            return Ok(Some(game));
        }
        match self.store.game_by_key(key)? {
            // The cached version has moved to another key
            Some(stored) if self.cache.game(stored.id)?.is_some() => Ok(None),
            found => Ok(found),
        }
    }

    fn games_for_season(&self, season_id: SeasonId) -> Result<Vec<Game>> {
        let merged = overlay(
            self.store.games_for_season(season_id)?,
            self.cache.games_for_season(season_id)?,
            |g| g.id,
        );
        Ok(merged.into_values().collect())
    }
}

impl RankingReader for Transaction {
    fn team_ranking(&self, key: &RankingKey) -> Result<Option<TeamRanking>> {
        match self.cache.team_ranking(key)? {
            Some(ranking) => Ok(Some(ranking)),
            None => self.store.team_ranking(key),
        }
    }

    fn game_ranking(&self, key: &RankingKey) -> Result<Option<GameRanking>> {
        match self.cache.game_ranking(key)? {
            Some(ranking) => Ok(Some(ranking)),
            None => self.store.game_ranking(key),
        }
    }
}

impl TeamRecordReader for Transaction {
    fn team_record(&self, id: TeamRecordId) -> Result<Option<TeamRecord>> {
        if let Some(record) = self.cache.team_record(id)? {
            return Ok(Some(record));
        }
        match self.store.team_record(id)? {
            Some(stored)
                if self
                    .cache
                    .team_record_by_week(stored.season_id, stored.week)?
                    .is_some() =>
            {
                Ok(None)
            }
            found => Ok(found),
        }
    }

    fn team_record_by_week(
        &self,
        season_id: SeasonId,
        week: Option<u32>,
    ) -> Result<Option<TeamRecord>> {
        match self.cache.team_record_by_week(season_id, week)? {
            Some(record) => Ok(Some(record)),
            None => self.store.team_record_by_week(season_id, week),
        }
    }
}

// ============================================================================
// SEASONS
// ============================================================================

pub struct SeasonRepository<'a> {
    tx: &'a Transaction,
}

impl SeasonRepository<'_> {
    pub fn create(&self, year: u32) -> Result<Season> {
        if self.tx.season_by_year(year)?.is_some() {
            return Err(Error::duplicate("season", year));
        }
        let season = Season::new(SeasonId::generate(), year);
        self.tx.publish(Event::SeasonCreated(season.created()))?;
        Ok(season)
    }

    pub fn get(&self, id: SeasonId) -> Result<Option<Season>> {
        self.tx.season(id)
    }

    pub fn find(&self, year: u32) -> Result<Option<Season>> {
        self.tx.season_by_year(year)
    }

    pub fn all(&self) -> Result<Vec<Season>> {
        SeasonReader::seasons(self.tx)
    }
}

// ============================================================================
// TEAMS
// ============================================================================

pub struct TeamRepository<'a> {
    tx: &'a Transaction,
}

impl TeamRepository<'_> {
    pub fn create(&self, name: &str) -> Result<Team> {
        if self.tx.team_by_name(name)?.is_some() {
            return Err(Error::duplicate("team", name));
        }
        let team = Team::new(TeamId::generate(), name);
        self.tx.publish(Event::TeamCreated(team.created()))?;
        Ok(team)
    }

    pub fn get(&self, id: TeamId) -> Result<Option<Team>> {
        self.tx.team(id)
    }

    pub fn find(&self, name: &str) -> Result<Option<Team>> {
        self.tx.team_by_name(name)
    }
}

// ============================================================================
// AFFILIATIONS
// ============================================================================

pub struct AffiliationRepository<'a> {
    tx: &'a Transaction,
}

impl AffiliationRepository<'_> {
    pub fn create(
        &self,
        season_id: SeasonId,
        team_id: TeamId,
        subdivision: Subdivision,
    ) -> Result<Affiliation> {
        if self.tx.affiliation_by_team(season_id, team_id)?.is_some() {
            return Err(Error::duplicate(
                "affiliation",
                format!("season {} team {}", season_id, team_id),
            ));
        }
        let affiliation =
            Affiliation::new(AffiliationId::generate(), season_id, team_id, subdivision);
        self.tx
            .publish(Event::AffiliationCreated(affiliation.created()))?;
        Ok(affiliation)
    }

    pub fn get(&self, id: AffiliationId) -> Result<Option<Affiliation>> {
        self.tx.affiliation(id)
    }

    pub fn find(&self, season_id: SeasonId, team_id: TeamId) -> Result<Option<Affiliation>> {
        self.tx.affiliation_by_team(season_id, team_id)
    }

    pub fn for_season(&self, season_id: SeasonId) -> Result<Vec<Affiliation>> {
        self.tx.affiliations_for_season(season_id)
    }
}

// ============================================================================
// GAMES
// ============================================================================

pub struct GameRepository<'a> {
    tx: &'a Transaction,
}

impl GameRepository<'_> {
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        season_id: SeasonId,
        week: u32,
        date: NaiveDate,
        season_section: SeasonSection,
        home_team_id: TeamId,
        away_team_id: TeamId,
        notes: &str,
    ) -> Result<Game> {
        let key = GameKey::new(season_id, week, home_team_id, away_team_id);
        if self.tx.game_by_key(&key)?.is_some() {
            return Err(Error::duplicate("game", key));
        }
        let game = Game::new(
            GameId::generate(),
            season_id,
            week,
            date,
            season_section,
            home_team_id,
            away_team_id,
            notes,
        );
        self.tx.publish(Event::GameCreated(game.created()))?;
        Ok(game)
    }

    pub fn get(&self, id: GameId) -> Result<Option<Game>> {
        self.tx.game(id)
    }

    pub fn find(&self, key: &GameKey) -> Result<Option<Game>> {
        self.tx.game_by_key(key)
    }

    pub fn for_season(&self, season_id: SeasonId) -> Result<Vec<Game>> {
        self.tx.games_for_season(season_id)
    }

    /// Move a SCHEDULED game; `game` is updated on success
    pub fn reschedule(&self, game: &mut Game, week: u32, date: NaiveDate) -> Result<()> {
        let mut current = self.current(game.id)?;
        let event = current.reschedule(week, date)?;

        let new_key = current.key();
        if let Some(other) = self.tx.game_by_key(&new_key)? {
            if other.id != current.id {
                return Err(Error::duplicate("game", new_key));
            }
        }

        self.tx.publish(Event::GameRescheduled(event))?;
        *game = current;
        Ok(())
    }

    pub fn cancel(&self, game: &mut Game) -> Result<()> {
        let mut current = self.current(game.id)?;
        let event = current.cancel()?;
        self.tx.publish(Event::GameCanceled(event))?;
        *game = current;
        Ok(())
    }

    pub fn complete(
        &self,
        game: &mut Game,
        home_team_score: u32,
        away_team_score: u32,
    ) -> Result<()> {
        let mut current = self.current(game.id)?;
        let event = current.complete(home_team_score, away_team_score)?;
        self.tx.publish(Event::GameCompleted(event))?;
        *game = current;
        Ok(())
    }

    pub fn update_notes(&self, game: &mut Game, notes: &str) -> Result<()> {
        let mut current = self.current(game.id)?;
        let event = current.update_notes(notes);
        self.tx.publish(Event::GameNotesUpdated(event))?;
        *game = current;
        Ok(())
    }

    fn current(&self, id: GameId) -> Result<Game> {
        self.tx
            .game(id)?
            .ok_or_else(|| Error::not_found("game", id))
    }
}

// ============================================================================
// RANKINGS AND RECORDS
// ============================================================================

pub struct TeamRankingRepository<'a> {
    tx: &'a Transaction,
}

impl TeamRankingRepository<'_> {
    /// Create (or supersede) the ranking stored under (name, season, week)
    pub fn create(
        &self,
        name: &str,
        season_id: SeasonId,
        week: Option<u32>,
        values: Vec<RankingValue<TeamId>>,
    ) -> Result<TeamRanking> {
        let ranking = TeamRanking {
            id: RankingId::generate(),
            name: name.to_string(),
            season_id,
            week,
            values,
        };
        self.tx
            .publish(Event::TeamRankingCalculated(ranking.calculated()))?;
        Ok(ranking)
    }

    pub fn find(&self, name: &str, season_id: SeasonId, week: Option<u32>) -> Result<Option<TeamRanking>> {
        self.tx
            .team_ranking(&RankingKey::new(name, season_id, week))
    }
}

pub struct GameRankingRepository<'a> {
    tx: &'a Transaction,
}

impl GameRankingRepository<'_> {
    /// Create (or supersede) the ranking stored under (name, season, week)
    pub fn create(
        &self,
        name: &str,
        season_id: SeasonId,
        week: Option<u32>,
        values: Vec<RankingValue<GameId>>,
    ) -> Result<GameRanking> {
        let ranking = GameRanking {
            id: RankingId::generate(),
            name: name.to_string(),
            season_id,
            week,
            values,
        };
        self.tx
            .publish(Event::GameRankingCalculated(ranking.calculated()))?;
        Ok(ranking)
    }

    pub fn find(&self, name: &str, season_id: SeasonId, week: Option<u32>) -> Result<Option<GameRanking>> {
        self.tx
            .game_ranking(&RankingKey::new(name, season_id, week))
    }
}

pub struct TeamRecordRepository<'a> {
    tx: &'a Transaction,
}

impl TeamRecordRepository<'_> {
    /// Create (or supersede) the record for (season, week)
    pub fn create(
        &self,
        season_id: SeasonId,
        week: Option<u32>,
        values: Vec<TeamRecordValue>,
    ) -> Result<TeamRecord> {
        let record = TeamRecord {
            id: TeamRecordId::generate(),
            season_id,
            week,
            values,
        };
        self.tx
            .publish(Event::TeamRecordCalculated(record.calculated()))?;
        Ok(record)
    }

    pub fn get(&self, id: TeamRecordId) -> Result<Option<TeamRecord>> {
        self.tx.team_record(id)
    }

    pub fn find(&self, season_id: SeasonId, week: Option<u32>) -> Result<Option<TeamRecord>> {
        self.tx.team_record_by_week(season_id, week)
    }
}

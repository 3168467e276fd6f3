// 🧠 Memory storage - arena tables plus secondary indexes
//
// Every aggregate lives once in an id-keyed arena (BTreeMap, so iteration
// order is stable). Natural keys and parent ids are secondary indexes kept in
// step by the projection below. Each projector checks its preconditions
// before touching any table, so a failed event leaves the tables unchanged.
//
// Used both as a standalone backend and as the Unit of Work's read-your-writes
// cache overlay.

pub mod queries;

use super::{Storage, WriteLock};
use crate::domain::{
    Affiliation, AffiliationId, AffiliationReader, Event, Game, GameId, GameKey, GameRanking,
    GameReader, RankingKey, RankingReader, Season, SeasonId, SeasonReader, Team, TeamId,
    TeamRanking, TeamReader, TeamRecord, TeamRecordId, TeamRecordReader,
};
use crate::error::{Error, Result};
use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, BTreeSet};

type RecordKey = (SeasonId, Option<u32>);

// ============================================================================
// TABLES
// ============================================================================

#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    pub(crate) seasons: BTreeMap<SeasonId, Season>,
    pub(crate) season_by_year: BTreeMap<u32, SeasonId>,

    pub(crate) teams: BTreeMap<TeamId, Team>,
    pub(crate) team_by_name: BTreeMap<String, TeamId>,

    pub(crate) affiliations: BTreeMap<AffiliationId, Affiliation>,
    pub(crate) affiliation_by_key: BTreeMap<(SeasonId, TeamId), AffiliationId>,
    pub(crate) affiliations_by_season: BTreeMap<SeasonId, BTreeSet<AffiliationId>>,

    pub(crate) games: BTreeMap<GameId, Game>,
    pub(crate) game_by_key: BTreeMap<GameKey, GameId>,
    pub(crate) games_by_season: BTreeMap<SeasonId, BTreeSet<GameId>>,

    pub(crate) team_rankings: BTreeMap<RankingKey, TeamRanking>,
    pub(crate) game_rankings: BTreeMap<RankingKey, GameRanking>,

    pub(crate) team_records: BTreeMap<RecordKey, TeamRecord>,
    pub(crate) team_record_by_id: BTreeMap<TeamRecordId, RecordKey>,
}

impl Tables {
    fn apply_event(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::SeasonCreated(created) => {
                if self.seasons.contains_key(&created.id)
                    || self.season_by_year.contains_key(&created.year)
                {
                    return Err(Error::duplicate("season", created.year));
                }
                self.season_by_year.insert(created.year, created.id);
                self.seasons.insert(created.id, Season::from(created));
            }

            Event::TeamCreated(created) => {
                if self.teams.contains_key(&created.id)
                    || self.team_by_name.contains_key(&created.name)
                {
                    return Err(Error::duplicate("team", &created.name));
                }
                self.team_by_name.insert(created.name.clone(), created.id);
                self.teams.insert(created.id, Team::from(created));
            }

            Event::AffiliationCreated(created) => {
                let key = (created.season_id, created.team_id);
                if self.affiliations.contains_key(&created.id)
                    || self.affiliation_by_key.contains_key(&key)
                {
                    return Err(Error::duplicate(
                        "affiliation",
                        format!("season {} team {}", created.season_id, created.team_id),
                    ));
                }
                self.affiliation_by_key.insert(key, created.id);
                self.affiliations_by_season
                    .entry(created.season_id)
                    .or_default()
                    .insert(created.id);
                self.affiliations
                    .insert(created.id, Affiliation::from(created));
            }

            Event::GameCreated(created) => {
                self.insert_game(Game::from(created))?;
            }

            Event::GameRescheduled(rescheduled) => {
                let game = self.game_mut(rescheduled.id)?;
                let old_key = game.key();
                let mut moved = game.clone();
                moved.apply_rescheduled(rescheduled);
                let new_key = moved.key();

                if new_key != old_key {
                    if let Some(other) = self.game_by_key.get(&new_key) {
                        if *other != moved.id {
                            return Err(Error::duplicate("game", new_key));
                        }
                    }
                    self.game_by_key.remove(&old_key);
                    self.game_by_key.insert(new_key, moved.id);
                }
                self.games.insert(moved.id, moved);
            }

            Event::GameCanceled(canceled) => {
                self.game_mut(canceled.id)?.apply_canceled(canceled);
            }

            Event::GameCompleted(completed) => {
                self.game_mut(completed.id)?.apply_completed(completed);
            }

            Event::GameNotesUpdated(updated) => {
                self.game_mut(updated.id)?.apply_notes_updated(updated);
            }

            Event::TeamRecordCalculated(calculated) => {
                let key = (calculated.season_id, calculated.week);
                if let Some(previous) = self.team_records.remove(&key) {
                    self.team_record_by_id.remove(&previous.id);
                }
                self.team_record_by_id.insert(calculated.id, key);
                self.team_records.insert(key, TeamRecord::from(calculated));
            }

            Event::TeamRankingCalculated(calculated) => {
                let ranking = TeamRanking::from(calculated);
                self.team_rankings.insert(ranking.key(), ranking);
            }

            Event::GameRankingCalculated(calculated) => {
                let ranking = GameRanking::from(calculated);
                self.game_rankings.insert(ranking.key(), ranking);
            }

            Event::ValidationFailed(_) => {
                return Err(Error::UnhandledEvent {
                    event: event.name(),
                });
            }
        }

        Ok(())
    }

    fn insert_game(&mut self, game: Game) -> Result<()> {
        let key = game.key();
        if self.games.contains_key(&game.id) || self.game_by_key.contains_key(&key) {
            return Err(Error::duplicate("game", key));
        }
        self.game_by_key.insert(key, game.id);
        self.games_by_season
            .entry(game.season_id)
            .or_default()
            .insert(game.id);
        self.games.insert(game.id, game);
        Ok(())
    }

    fn game_mut(&mut self, id: GameId) -> Result<&mut Game> {
        self.games
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("game", id))
    }
}

// ============================================================================
// MEMORY STORAGE
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RefCell<Tables>,
    lock: WriteLock,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn tables(&self) -> Ref<'_, Tables> {
        self.tables.borrow()
    }

    /// Copy a stored game into this store ahead of a mutation event for it.
    /// A game already present is left alone.
    pub(crate) fn seed_game(&self, game: Game) -> Result<()> {
        let mut tables = self.tables.borrow_mut();
        if tables.games.contains_key(&game.id) {
            return Ok(());
        }
        tables.insert_game(game)
    }

    pub fn clear(&self) {
        *self.tables.borrow_mut() = Tables::default();
    }

    pub fn is_empty(&self) -> bool {
        let tables = self.tables.borrow();
        tables.seasons.is_empty()
            && tables.teams.is_empty()
            && tables.affiliations.is_empty()
            && tables.games.is_empty()
            && tables.team_rankings.is_empty()
            && tables.game_rankings.is_empty()
            && tables.team_records.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn apply(&self, events: &[Event]) -> Result<()> {
        match events {
            [] => Ok(()),
            // A single projector either fully applies or leaves the tables alone
            [event] => self.tables.borrow_mut().apply_event(event),
            _ => {
                let mut staged = self.tables.borrow().clone();
                for event in events {
                    staged.apply_event(event)?;
                }
                *self.tables.borrow_mut() = staged;
                Ok(())
            }
        }
    }

    fn drop_all(&self) -> Result<()> {
        self.clear();
        Ok(())
    }

    fn write_lock(&self) -> &WriteLock {
        &self.lock
    }
}

// ============================================================================
// READERS
// ============================================================================

impl SeasonReader for MemoryStorage {
    fn season(&self, id: SeasonId) -> Result<Option<Season>> {
        Ok(self.tables.borrow().seasons.get(&id).cloned())
    }

    fn season_by_year(&self, year: u32) -> Result<Option<Season>> {
        let tables = self.tables.borrow();
        Ok(tables
            .season_by_year
            .get(&year)
            .and_then(|id| tables.seasons.get(id))
            .cloned())
    }

    fn seasons(&self) -> Result<Vec<Season>> {
        let tables = self.tables.borrow();
        Ok(tables
            .season_by_year
            .values()
            .filter_map(|id| tables.seasons.get(id))
            .cloned()
            .collect())
    }
}

impl TeamReader for MemoryStorage {
    fn team(&self, id: TeamId) -> Result<Option<Team>> {
        Ok(self.tables.borrow().teams.get(&id).cloned())
    }

    fn team_by_name(&self, name: &str) -> Result<Option<Team>> {
        let tables = self.tables.borrow();
        Ok(tables
            .team_by_name
            .get(name)
            .and_then(|id| tables.teams.get(id))
            .cloned())
    }
}

impl AffiliationReader for MemoryStorage {
    fn affiliation(&self, id: AffiliationId) -> Result<Option<Affiliation>> {
        Ok(self.tables.borrow().affiliations.get(&id).cloned())
    }

    fn affiliation_by_team(
        &self,
        season_id: SeasonId,
        team_id: TeamId,
    ) -> Result<Option<Affiliation>> {
        let tables = self.tables.borrow();
        Ok(tables
            .affiliation_by_key
            .get(&(season_id, team_id))
            .and_then(|id| tables.affiliations.get(id))
            .cloned())
    }

    fn affiliations_for_season(&self, season_id: SeasonId) -> Result<Vec<Affiliation>> {
        let tables = self.tables.borrow();
        Ok(tables
            .affiliations_by_season
            .get(&season_id)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.affiliations.get(id))
            .cloned()
            .collect())
    }
}

impl GameReader for MemoryStorage {
    fn game(&self, id: GameId) -> Result<Option<Game>> {
        Ok(self.tables.borrow().games.get(&id).cloned())
    }

    fn game_by_key(&self, key: &GameKey) -> Result<Option<Game>> {
        let tables = self.tables.borrow();
        Ok(tables
            .game_by_key
            .get(key)
            .and_then(|id| tables.games.get(id))
            .cloned())
    }

    fn games_for_season(&self, season_id: SeasonId) -> Result<Vec<Game>> {
        let tables = self.tables.borrow();
        Ok(tables
            .games_by_season
            .get(&season_id)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.games.get(id))
            .cloned()
            .collect())
    }
}

impl RankingReader for MemoryStorage {
    fn team_ranking(&self, key: &RankingKey) -> Result<Option<TeamRanking>> {
        Ok(self.tables.borrow().team_rankings.get(key).cloned())
    }

    fn game_ranking(&self, key: &RankingKey) -> Result<Option<GameRanking>> {
        Ok(self.tables.borrow().game_rankings.get(key).cloned())
    }
}

impl TeamRecordReader for MemoryStorage {
    fn team_record(&self, id: TeamRecordId) -> Result<Option<TeamRecord>> {
        let tables = self.tables.borrow();
        Ok(tables
            .team_record_by_id
            .get(&id)
            .and_then(|key| tables.team_records.get(key))
            .cloned())
    }

    fn team_record_by_week(
        &self,
        season_id: SeasonId,
        week: Option<u32>,
    ) -> Result<Option<TeamRecord>> {
        Ok(self
            .tables
            .borrow()
            .team_records
            .get(&(season_id, week))
            .cloned())
    }
}

// ============================================================================
// TESTS
// ============================================================================

// 🗃️ SQLite storage - relational projection of the event stream
//
// Identifiers and enum values are stored as TEXT, dates as ISO TEXT. All
// writes go through `apply`, which wraps the batch in a native transaction.
// Repository reads use the write connection; query handlers open their own
// read-only connection when the database lives in a file.

pub mod projection;
pub mod queries;
pub mod schema;

use super::{Storage, WriteLock};
use crate::domain::{
    Affiliation, AffiliationId, AffiliationReader, Event, Game, GameId, GameKey, GameRanking,
    GameReader, GameStatus, Ranking, RankingId, RankingKey, RankingReader, RankingType,
    RankingValue, Season, SeasonId, SeasonReader, SeasonSection, Subdivision, Team, TeamId,
    TeamRanking, TeamReader, TeamRecord, TeamRecordId, TeamRecordReader, TeamRecordValue,
};
use crate::error::Result;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::{Path, PathBuf};

// ============================================================================
// TEXT COLUMN MAPPING
// ============================================================================

macro_rules! sql_text {
    ($($name:ty),+ $(,)?) => {
        $(
            impl ToSql for $name {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.to_string()))
                }
            }

            impl FromSql for $name {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    value
                        .as_str()?
                        .parse()
                        .map_err(|e| FromSqlError::Other(Box::new(e)))
                }
            }
        )+
    };
}

sql_text!(
    SeasonId,
    TeamId,
    AffiliationId,
    GameId,
    RankingId,
    TeamRecordId,
    Subdivision,
    SeasonSection,
    GameStatus,
    RankingType,
);

// ============================================================================
// SQLITE STORAGE
// ============================================================================

pub struct SqliteStorage {
    conn: Connection,
    path: Option<PathBuf>,
    lock: WriteLock,
}

impl SqliteStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        schema::setup_database(&conn)?;
        tracing::debug!(path = %path.display(), "opened sqlite storage");

        Ok(SqliteStorage {
            conn,
            path: Some(path),
            lock: WriteLock::default(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::setup_database(&conn)?;

        Ok(SqliteStorage {
            conn,
            path: None,
            lock: WriteLock::default(),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `read` on an independent read-only connection. In-memory
    /// databases cannot be shared, so those reuse the write connection.
    pub(crate) fn with_reader<T>(&self, read: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        match &self.path {
            Some(path) => {
                let conn = Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )?;
                read(&conn)
            }
            None => read(&self.conn),
        }
    }

    /// Committed events recorded in the audit trail, oldest first
    pub fn audit_trail(&self) -> Result<Vec<Event>> {
        let mut stmt = self
            .conn
            .prepare("SELECT data FROM event ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.iter()
            .map(|json| Ok(serde_json::from_str::<Event>(json)?))
            .collect()
    }
}

impl Storage for SqliteStorage {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn apply(&self, events: &[Event]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for event in events {
            projection::apply_event(&tx, event)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn drop_all(&self) -> Result<()> {
        schema::drop_database(&self.conn)?;
        schema::setup_database(&self.conn)
    }

    fn write_lock(&self) -> &WriteLock {
        &self.lock
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

pub(crate) const GAME_COLUMNS: &str = "id, season_id, week, date, season_section, \
     home_team_id, away_team_id, home_team_score, away_team_score, status, notes";

pub(crate) fn season_row(row: &Row<'_>) -> rusqlite::Result<Season> {
    Ok(Season {
        id: row.get(0)?,
        year: row.get(1)?,
    })
}

pub(crate) fn team_row(row: &Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn affiliation_row(row: &Row<'_>) -> rusqlite::Result<Affiliation> {
    Ok(Affiliation {
        id: row.get(0)?,
        season_id: row.get(1)?,
        team_id: row.get(2)?,
        subdivision: row.get(3)?,
    })
}

pub(crate) fn game_row(row: &Row<'_>) -> rusqlite::Result<Game> {
    Ok(Game {
        id: row.get(0)?,
        season_id: row.get(1)?,
        week: row.get(2)?,
        date: row.get(3)?,
        season_section: row.get(4)?,
        home_team_id: row.get(5)?,
        away_team_id: row.get(6)?,
        home_team_score: row.get(7)?,
        away_team_score: row.get(8)?,
        status: row.get(9)?,
        notes: row.get(10)?,
    })
}

// ============================================================================
// READS (shared by the repository readers and the query handlers)
// ============================================================================

pub(crate) fn read_season(conn: &Connection, id: SeasonId) -> Result<Option<Season>> {
    Ok(conn
        .query_row(
            "SELECT id, year FROM season WHERE id = ?1",
            params![id],
            season_row,
        )
        .optional()?)
}

pub(crate) fn read_game(conn: &Connection, id: GameId) -> Result<Option<Game>> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM game WHERE id = ?1", GAME_COLUMNS),
            params![id],
            game_row,
        )
        .optional()?)
}

pub(crate) fn read_team_record(
    conn: &Connection,
    season_id: SeasonId,
    week: Option<u32>,
) -> Result<Option<TeamRecord>> {
    let header = conn
        .query_row(
            "SELECT id, season_id, week FROM teamrecord WHERE season_id = ?1 AND week IS ?2",
            params![season_id, week],
            |row| {
                Ok(TeamRecord {
                    id: row.get(0)?,
                    season_id: row.get(1)?,
                    week: row.get(2)?,
                    values: Vec::new(),
                })
            },
        )
        .optional()?;

    let Some(mut record) = header else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT team_id, wins, losses FROM teamrecordvalue
         WHERE teamrecord_id = ?1
         ORDER BY ord",
    )?;
    record.values = stmt
        .query_map(params![record.id], |row| {
            Ok(TeamRecordValue {
                team_id: row.get(0)?,
                wins: row.get(1)?,
                losses: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(record))
}

/// Load one ranking with its values, in stored order
pub(crate) fn read_ranking<T: FromSql>(
    conn: &Connection,
    key: &RankingKey,
    ranking_type: RankingType,
) -> Result<Option<Ranking<T>>> {
    let header = conn
        .query_row(
            "SELECT id, name, season_id, week FROM ranking
             WHERE name = ?1 AND type = ?2 AND season_id = ?3 AND week IS ?4",
            params![key.name, ranking_type, key.season_id, key.week],
            |row| {
                Ok(Ranking {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    season_id: row.get(2)?,
                    week: row.get(3)?,
                    values: Vec::new(),
                })
            },
        )
        .optional()?;

    let Some(mut ranking) = header else {
        return Ok(None);
    };

    let sql = match ranking_type {
        RankingType::Team => {
            "SELECT team_id, ord, rank, value FROM teamrankingvalue WHERE ranking_id = ?1 ORDER BY ord"
        }
        RankingType::Game => {
            "SELECT game_id, ord, rank, value FROM gamerankingvalue WHERE ranking_id = ?1 ORDER BY ord"
        }
    };
    let mut stmt = conn.prepare(sql)?;
    ranking.values = stmt
        .query_map(params![ranking.id], |row| {
            Ok(RankingValue {
                id: row.get(0)?,
                order: row.get(1)?,
                rank: row.get(2)?,
                value: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(ranking))
}

// ============================================================================
// REPOSITORY READERS
// ============================================================================

impl SeasonReader for SqliteStorage {
    fn season(&self, id: SeasonId) -> Result<Option<Season>> {
        read_season(&self.conn, id)
    }

    fn season_by_year(&self, year: u32) -> Result<Option<Season>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, year FROM season WHERE year = ?1",
                params![year],
                season_row,
            )
            .optional()?)
    }

    fn seasons(&self) -> Result<Vec<Season>> {
        let mut stmt = self.conn.prepare("SELECT id, year FROM season ORDER BY year")?;
        let seasons = stmt
            .query_map([], season_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(seasons)
    }
}

impl TeamReader for SqliteStorage {
    fn team(&self, id: TeamId) -> Result<Option<Team>> {
        Ok(self
            .conn
            .query_row("SELECT id, name FROM team WHERE id = ?1", params![id], team_row)
            .optional()?)
    }

    fn team_by_name(&self, name: &str) -> Result<Option<Team>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name FROM team WHERE name = ?1",
                params![name],
                team_row,
            )
            .optional()?)
    }
}

impl AffiliationReader for SqliteStorage {
    fn affiliation(&self, id: AffiliationId) -> Result<Option<Affiliation>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, season_id, team_id, subdivision FROM affiliation WHERE id = ?1",
                params![id],
                affiliation_row,
            )
            .optional()?)
    }

    fn affiliation_by_team(
        &self,
        season_id: SeasonId,
        team_id: TeamId,
    ) -> Result<Option<Affiliation>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, season_id, team_id, subdivision FROM affiliation
                 WHERE season_id = ?1 AND team_id = ?2",
                params![season_id, team_id],
                affiliation_row,
            )
            .optional()?)
    }

    fn affiliations_for_season(&self, season_id: SeasonId) -> Result<Vec<Affiliation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, season_id, team_id, subdivision FROM affiliation
             WHERE season_id = ?1
             ORDER BY id",
        )?;
        let affiliations = stmt
            .query_map(params![season_id], affiliation_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(affiliations)
    }
}

impl GameReader for SqliteStorage {
    fn game(&self, id: GameId) -> Result<Option<Game>> {
        read_game(&self.conn, id)
    }

    fn game_by_key(&self, key: &GameKey) -> Result<Option<Game>> {
        let (first, second) = key.teams();
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM game
                     WHERE season_id = ?1 AND week = ?2
                       AND ((home_team_id = ?3 AND away_team_id = ?4)
                         OR (home_team_id = ?4 AND away_team_id = ?3))",
                    GAME_COLUMNS
                ),
                params![key.season_id, key.week, first, second],
                game_row,
            )
            .optional()?)
    }

    fn games_for_season(&self, season_id: SeasonId) -> Result<Vec<Game>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM game WHERE season_id = ?1 ORDER BY id",
            GAME_COLUMNS
        ))?;
        let games = stmt
            .query_map(params![season_id], game_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(games)
    }
}

impl RankingReader for SqliteStorage {
    fn team_ranking(&self, key: &RankingKey) -> Result<Option<TeamRanking>> {
        read_ranking(&self.conn, key, RankingType::Team)
    }

    fn game_ranking(&self, key: &RankingKey) -> Result<Option<GameRanking>> {
        read_ranking(&self.conn, key, RankingType::Game)
    }
}

impl TeamRecordReader for SqliteStorage {
    fn team_record(&self, id: TeamRecordId) -> Result<Option<TeamRecord>> {
        let key = self
            .conn
            .query_row(
                "SELECT season_id, week FROM teamrecord WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, SeasonId>(0)?, row.get::<_, Option<u32>>(1)?)),
            )
            .optional()?;

        match key {
            Some((season_id, week)) => read_team_record(&self.conn, season_id, week),
            None => Ok(None),
        }
    }

    fn team_record_by_week(
        &self,
        season_id: SeasonId,
        week: Option<u32>,
    ) -> Result<Option<TeamRecord>> {
        read_team_record(&self.conn, season_id, week)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::NaiveDate;

    struct Fixture {
        storage: SqliteStorage,
        season: Season,
        home: Team,
        away: Team,
    }

    fn fixture(storage: SqliteStorage) -> Fixture {
        let season = Season::new(SeasonId::generate(), 2019);
        let home = Team::new(TeamId::generate(), "LSU");
        let away = Team::new(TeamId::generate(), "Clemson");
        storage
            .apply(&[
                Event::SeasonCreated(season.created()),
                Event::TeamCreated(home.created()),
                Event::TeamCreated(away.created()),
            ])
            .unwrap();
        Fixture {
            storage,
            season,
            home,
            away,
        }
    }

    fn game(fx: &Fixture, week: u32) -> Game {
        Game::new(
            GameId::generate(),
            fx.season.id,
            week,
            NaiveDate::from_ymd_opt(2019, 9, week).unwrap(),
            SeasonSection::RegularSeason,
            fx.home.id,
            fx.away.id,
            "",
        )
    }

    #[test]
    fn test_aggregates_round_trip() {
        let fx = fixture(SqliteStorage::open_in_memory().unwrap());
        let affiliation = Affiliation::new(
            AffiliationId::generate(),
            fx.season.id,
            fx.away.id,
            Subdivision::Fbs,
        );
        let mut played = game(&fx, 2);
        let created = played.created();
        let completed = played.complete(42, 25).unwrap();
        let notes = played.update_notes("Semifinal rematch");

        fx.storage
            .apply(&[
                Event::AffiliationCreated(affiliation.created()),
                Event::GameCreated(created),
                Event::GameCompleted(completed),
                Event::GameNotesUpdated(notes),
            ])
            .unwrap();

        assert_eq!(fx.storage.seasons().unwrap(), vec![fx.season.clone()]);
        assert_eq!(fx.storage.team(fx.home.id).unwrap(), Some(fx.home.clone()));
        assert_eq!(
            fx.storage.affiliation(affiliation.id).unwrap(),
            Some(affiliation)
        );
        assert_eq!(fx.storage.game(played.id).unwrap(), Some(played.clone()));
        assert_eq!(fx.storage.game_by_key(&played.key()).unwrap(), Some(played));
    }

    #[test]
    fn test_reversed_pair_is_a_duplicate() {
        let fx = fixture(SqliteStorage::open_in_memory().unwrap());
        let first = game(&fx, 4);
        fx.storage
            .apply(&[Event::GameCreated(first.created())])
            .unwrap();

        let mut reversed = game(&fx, 4);
        std::mem::swap(&mut reversed.home_team_id, &mut reversed.away_team_id);
        let err = fx
            .storage
            .apply(&[Event::GameCreated(reversed.created())])
            .unwrap_err();
        assert!(matches!(err, Error::Duplicate { aggregate: "game", .. }));
    }

    #[test]
    fn test_failed_batch_rolls_back() {
        let fx = fixture(SqliteStorage::open_in_memory().unwrap());
        let scheduled = game(&fx, 1);
        let clash = Team::new(TeamId::generate(), "LSU");

        let err = fx
            .storage
            .apply(&[
                Event::GameCreated(scheduled.created()),
                Event::TeamCreated(clash.created()),
            ])
            .unwrap_err();

        assert!(matches!(err, Error::Duplicate { aggregate: "team", .. }));
        assert_eq!(fx.storage.game(scheduled.id).unwrap(), None);
        assert_eq!(fx.storage.audit_trail().unwrap().len(), 3);
    }

    #[test]
    fn test_ranking_supersedes_and_keeps_order() {
        let fx = fixture(SqliteStorage::open_in_memory().unwrap());
        let old = TeamRanking {
            id: RankingId::generate(),
            name: "SRS".to_string(),
            season_id: fx.season.id,
            week: None,
            values: vec![RankingValue {
                id: fx.away.id,
                order: 1,
                rank: 1,
                value: 1.0,
            }],
        };
        let new = TeamRanking {
            id: RankingId::generate(),
            values: vec![
                RankingValue {
                    id: fx.home.id,
                    order: 1,
                    rank: 1,
                    value: 12.5,
                },
                RankingValue {
                    id: fx.away.id,
                    order: 2,
                    rank: 2,
                    value: -12.5,
                },
            ],
            ..old.clone()
        };

        fx.storage
            .apply(&[
                Event::TeamRankingCalculated(old.calculated()),
                Event::TeamRankingCalculated(new.calculated()),
            ])
            .unwrap();

        let key = RankingKey::new("SRS", fx.season.id, None);
        assert_eq!(fx.storage.team_ranking(&key).unwrap(), Some(new));
        assert_eq!(fx.storage.game_ranking(&key).unwrap(), None);
    }

    #[test]
    fn test_team_record_by_id_and_week() {
        let fx = fixture(SqliteStorage::open_in_memory().unwrap());
        let record = TeamRecord {
            id: TeamRecordId::generate(),
            season_id: fx.season.id,
            week: Some(1),
            values: vec![
                TeamRecordValue {
                    team_id: fx.home.id,
                    wins: 1,
                    losses: 0,
                },
                TeamRecordValue {
                    team_id: fx.away.id,
                    wins: 0,
                    losses: 1,
                },
            ],
        };
        fx.storage
            .apply(&[Event::TeamRecordCalculated(record.calculated())])
            .unwrap();

        assert_eq!(fx.storage.team_record(record.id).unwrap(), Some(record.clone()));
        assert_eq!(
            fx.storage
                .team_record_by_week(fx.season.id, Some(1))
                .unwrap(),
            Some(record)
        );
        assert_eq!(
            fx.storage.team_record_by_week(fx.season.id, None).unwrap(),
            None
        );
    }

    #[test]
    fn test_file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rankings.db");

        let season = {
            let fx = fixture(SqliteStorage::open(&path).unwrap());
            fx.season
        };

        let reopened = SqliteStorage::open(&path).unwrap();
        assert_eq!(reopened.season_by_year(2019).unwrap(), Some(season));
        assert_eq!(reopened.path(), Some(path.as_path()));

        reopened.drop_all().unwrap();
        assert!(reopened.seasons().unwrap().is_empty());
    }
}

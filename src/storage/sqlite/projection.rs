// Event projection into the relational tables
//
// One statement group per event type, then one audit row. Runs inside the
// caller's transaction; any error aborts the whole batch.

use crate::domain::{Event, RankingType, RankingValue, SeasonId};
use crate::error::{Error, Result};
use chrono::Utc;
use rusqlite::types::ToSql;
use rusqlite::{ffi, params, Connection};
use uuid::Uuid;

pub fn apply_event(conn: &Connection, event: &Event) -> Result<()> {
    match event {
        Event::SeasonCreated(created) => {
            unique(
                conn.execute(
                    "INSERT INTO season (id, year) VALUES (?1, ?2)",
                    params![created.id, created.year],
                ),
                "season",
                created.year,
            )?;
        }

        Event::TeamCreated(created) => {
            unique(
                conn.execute(
                    "INSERT INTO team (id, name) VALUES (?1, ?2)",
                    params![created.id, created.name],
                ),
                "team",
                &created.name,
            )?;
        }

        Event::AffiliationCreated(created) => {
            unique(
                conn.execute(
                    "INSERT INTO affiliation (id, season_id, team_id, subdivision)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        created.id,
                        created.season_id,
                        created.team_id,
                        created.subdivision
                    ],
                ),
                "affiliation",
                format!("season {} team {}", created.season_id, created.team_id),
            )?;
        }

        Event::GameCreated(created) => {
            unique(
                conn.execute(
                    "INSERT INTO game (
                        id, season_id, week, date, season_section,
                        home_team_id, away_team_id, home_team_score, away_team_score,
                        status, notes
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, NULL, 'SCHEDULED', ?8)",
                    params![
                        created.id,
                        created.season_id,
                        created.week,
                        created.date,
                        created.season_section,
                        created.home_team_id,
                        created.away_team_id,
                        created.notes,
                    ],
                ),
                "game",
                created.id,
            )?;
        }

        Event::GameRescheduled(rescheduled) => {
            let changed = unique(
                conn.execute(
                    "UPDATE game SET week = ?2, date = ?3 WHERE id = ?1",
                    params![rescheduled.id, rescheduled.week, rescheduled.date],
                ),
                "game",
                format!("season {} week {}", rescheduled.season_id, rescheduled.week),
            )?;
            require_game(changed, event)?;
        }

        Event::GameCanceled(canceled) => {
            let changed = conn.execute(
                "UPDATE game SET status = 'CANCELED' WHERE id = ?1",
                params![canceled.id],
            )?;
            require_game(changed, event)?;
        }

        Event::GameCompleted(completed) => {
            let changed = conn.execute(
                "UPDATE game
                 SET home_team_score = ?2, away_team_score = ?3, status = 'COMPLETED'
                 WHERE id = ?1",
                params![
                    completed.id,
                    completed.home_team_score,
                    completed.away_team_score
                ],
            )?;
            require_game(changed, event)?;
        }

        Event::GameNotesUpdated(updated) => {
            let changed = conn.execute(
                "UPDATE game SET notes = ?2 WHERE id = ?1",
                params![updated.id, updated.notes],
            )?;
            require_game(changed, event)?;
        }

        Event::TeamRecordCalculated(calculated) => {
            // Recalculation supersedes the record stored under the same week
            conn.execute(
                "DELETE FROM teamrecord WHERE season_id = ?1 AND week IS ?2",
                params![calculated.season_id, calculated.week],
            )?;
            conn.execute(
                "INSERT INTO teamrecord (id, season_id, week) VALUES (?1, ?2, ?3)",
                params![calculated.id, calculated.season_id, calculated.week],
            )?;

            let mut stmt = conn.prepare(
                "INSERT INTO teamrecordvalue (teamrecord_id, team_id, ord, wins, losses)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (index, value) in calculated.values.iter().enumerate() {
                stmt.execute(params![
                    calculated.id,
                    value.team_id,
                    index as u32,
                    value.wins,
                    value.losses
                ])?;
            }
        }

        Event::TeamRankingCalculated(calculated) => {
            insert_ranking(
                conn,
                RankingType::Team,
                calculated.id,
                &calculated.name,
                calculated.season_id,
                calculated.week,
                &calculated.values,
            )?;
        }

        Event::GameRankingCalculated(calculated) => {
            insert_ranking(
                conn,
                RankingType::Game,
                calculated.id,
                &calculated.name,
                calculated.season_id,
                calculated.week,
                &calculated.values,
            )?;
        }

        Event::ValidationFailed(_) => {
            return Err(Error::UnhandledEvent {
                event: event.name(),
            });
        }
    }

    record_event(conn, event)
}

#[allow(clippy::too_many_arguments)]
fn insert_ranking<T: ToSql>(
    conn: &Connection,
    ranking_type: RankingType,
    id: crate::domain::RankingId,
    name: &str,
    season_id: SeasonId,
    week: Option<u32>,
    values: &[RankingValue<T>],
) -> Result<()> {
    // Value rows go with the superseded ranking (ON DELETE CASCADE)
    conn.execute(
        "DELETE FROM ranking WHERE name = ?1 AND type = ?2 AND season_id = ?3 AND week IS ?4",
        params![name, ranking_type, season_id, week],
    )?;
    conn.execute(
        "INSERT INTO ranking (id, name, type, season_id, week) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, name, ranking_type, season_id, week],
    )?;

    let sql = match ranking_type {
        RankingType::Team => {
            "INSERT INTO teamrankingvalue (ranking_id, team_id, ord, rank, value)
             VALUES (?1, ?2, ?3, ?4, ?5)"
        }
        RankingType::Game => {
            "INSERT INTO gamerankingvalue (ranking_id, game_id, ord, rank, value)
             VALUES (?1, ?2, ?3, ?4, ?5)"
        }
    };
    let mut stmt = conn.prepare(sql)?;
    for value in values {
        stmt.execute(params![id, value.id, value.order, value.rank, value.value])?;
    }

    Ok(())
}

/// Append the event to the audit trail
fn record_event(conn: &Connection, event: &Event) -> Result<()> {
    let (entity_type, entity_id) = event_subject(event);
    let data_json = serde_json::to_string(event)?;

    conn.execute(
        "INSERT INTO event (
            event_id, timestamp, event_type, entity_type, entity_id, data
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            Uuid::new_v4().to_string(),
            Utc::now().to_rfc3339(),
            event.name(),
            entity_type,
            entity_id,
            data_json,
        ],
    )?;

    Ok(())
}

fn event_subject(event: &Event) -> (&'static str, String) {
    match event {
        Event::SeasonCreated(e) => ("season", e.id.to_string()),
        Event::TeamCreated(e) => ("team", e.id.to_string()),
        Event::AffiliationCreated(e) => ("affiliation", e.id.to_string()),
        Event::GameCreated(e) => ("game", e.id.to_string()),
        Event::GameRescheduled(e) => ("game", e.id.to_string()),
        Event::GameCanceled(e) => ("game", e.id.to_string()),
        Event::GameCompleted(e) => ("game", e.id.to_string()),
        Event::GameNotesUpdated(e) => ("game", e.id.to_string()),
        Event::TeamRecordCalculated(e) => ("teamrecord", e.id.to_string()),
        Event::TeamRankingCalculated(e) => ("ranking", e.id.to_string()),
        Event::GameRankingCalculated(e) => ("ranking", e.id.to_string()),
        Event::ValidationFailed(_) => ("validation", String::new()),
    }
}

/// Map a UNIQUE / PRIMARY KEY violation to a duplicate natural key
fn unique(
    result: rusqlite::Result<usize>,
    aggregate: &'static str,
    key: impl ToString,
) -> Result<usize> {
    match result {
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation
                && matches!(
                    err.extended_code,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                ) =>
        {
            Err(Error::duplicate(aggregate, key))
        }
        other => Ok(other?),
    }
}

fn require_game(changed: usize, event: &Event) -> Result<()> {
    match (changed, event.mutated_game()) {
        (0, Some(id)) => Err(Error::not_found("game", id)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GameCanceled, GameId, SeasonCreated};
    use crate::storage::sqlite::schema::setup_database;
    use crate::validation::ValidationError;
    use chrono::NaiveDate;

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_audit_row_per_projected_event() {
        let conn = connection();
        let id = SeasonId::generate();
        apply_event(&conn, &Event::SeasonCreated(SeasonCreated { id, year: 2015 })).unwrap();

        let (event_type, entity_type, entity_id, data): (String, String, String, String) = conn
            .query_row(
                "SELECT event_type, entity_type, entity_id, data FROM event",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();

        assert_eq!(event_type, "SeasonCreated");
        assert_eq!(entity_type, "season");
        assert_eq!(entity_id, id.to_string());
        let back: Event = serde_json::from_str(&data).unwrap();
        assert_eq!(back, Event::SeasonCreated(SeasonCreated { id, year: 2015 }));
    }

    #[test]
    fn test_mutating_unknown_game_is_not_found() {
        let conn = connection();
        let event = Event::GameCanceled(GameCanceled {
            id: GameId::generate(),
            season_id: SeasonId::generate(),
            week: 1,
            date: NaiveDate::from_ymd_opt(2015, 9, 5).unwrap(),
        });

        let err = apply_event(&conn, &event).unwrap_err();
        assert!(matches!(err, Error::NotFound { aggregate: "game", .. }));
    }

    #[test]
    fn test_validation_event_is_unhandled() {
        let conn = connection();
        let event = Event::ValidationFailed(ValidationError::Multiple(Vec::new()));
        let err = apply_event(&conn, &event).unwrap_err();
        assert!(matches!(err, Error::UnhandledEvent { .. }));

        let audited: i64 = conn
            .query_row("SELECT COUNT(*) FROM event", [], |row| row.get(0))
            .unwrap();
        assert_eq!(audited, 0);
    }
}

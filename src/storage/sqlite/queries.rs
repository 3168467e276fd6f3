// Query handlers answering with SQL over a read-only connection

use super::{game_row, read_ranking, read_team_record, SqliteStorage, GAME_COLUMNS};
use crate::bus::QueryBus;
use crate::domain::{
    Game, GameId, GameRanking, RankingKey, RankingType, SeasonId, TeamId, TeamRanking,
};
use crate::error::{Error, Result};
use crate::queries::*;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::rc::Rc;

pub fn register_query_handlers(storage: &Rc<SqliteStorage>, bus: &QueryBus) -> Result<()> {
    let store = Rc::clone(storage);
    bus.register_handler(move |_: &SeasonsQuery| {
        store.with_reader(|conn| {
            let mut stmt = conn.prepare("SELECT id, year FROM season ORDER BY year")?;
            let seasons = stmt
                .query_map([], |row| {
                    Ok(SeasonResult {
                        id: row.get(0)?,
                        year: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(seasons)
        })
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &SeasonByYearQuery| {
        store.with_reader(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, year FROM season WHERE year = ?1",
                    params![query.year],
                    |row| {
                        Ok(SeasonResult {
                            id: row.get(0)?,
                            year: row.get(1)?,
                        })
                    },
                )
                .optional()?)
        })
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &SeasonByIdQuery| {
        store.with_reader(|conn| {
            Ok(super::read_season(conn, query.id)?.map(|season| SeasonResult {
                id: season.id,
                year: season.year,
            }))
        })
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &TeamByIdQuery| {
        store.with_reader(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, name FROM team WHERE id = ?1",
                    params![query.id],
                    |row| {
                        Ok(TeamResult {
                            id: row.get(0)?,
                            name: row.get(1)?,
                        })
                    },
                )
                .optional()?)
        })
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &AffiliationCountBySeasonQuery| {
        store.with_reader(|conn| {
            if super::read_season(conn, query.season_id)?.is_none() {
                return Ok(None);
            }
            let (fbs_count, fcs_count) = conn.query_row(
                "SELECT
                    COALESCE(SUM(subdivision = 'FBS'), 0),
                    COALESCE(SUM(subdivision = 'FCS'), 0)
                 FROM affiliation WHERE season_id = ?1",
                params![query.season_id],
                |row| Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?)),
            )?;
            Ok(Some(AffiliationCountResult {
                season_id: query.season_id,
                fbs_count,
                fcs_count,
            }))
        })
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &GameCountBySeasonQuery| {
        store.with_reader(|conn| {
            if super::read_season(conn, query.season_id)?.is_none() {
                return Ok(None);
            }
            let count = conn.query_row(
                "SELECT COUNT(*) FROM game WHERE season_id = ?1",
                params![query.season_id],
                |row| row.get::<_, u32>(0),
            )?;
            Ok(Some(GameCountResult {
                season_id: query.season_id,
                count,
            }))
        })
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &WeekCountBySeasonQuery| {
        store.with_reader(|conn| {
            if super::read_season(conn, query.season_id)?.is_none() {
                return Ok(None);
            }
            let count = conn.query_row(
                "SELECT COALESCE(MAX(week), 0) FROM game WHERE season_id = ?1",
                params![query.season_id],
                |row| row.get::<_, u32>(0),
            )?;
            Ok(Some(WeekCountResult {
                season_id: query.season_id,
                count,
            }))
        })
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &TeamRecordBySeasonWeekQuery| {
        store.with_reader(|conn| {
            let Some(record) = read_team_record(conn, query.season_id, query.week)? else {
                return Ok(None);
            };
            let names = team_names(conn)?;
            let values = record
                .values
                .iter()
                .map(|value| {
                    Ok(TeamRecordValueResult {
                        team: team_result(&names, value.team_id)?,
                        wins: value.wins,
                        losses: value.losses,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(TeamRecordResult {
                id: record.id,
                season_id: record.season_id,
                year: season_year(conn, record.season_id)?,
                week: record.week,
                values,
            }))
        })
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &TeamRankingBySeasonWeekQuery| {
        store.with_reader(|conn| {
            let key = RankingKey::new(&query.name, query.season_id, query.week);
            let ranking: Option<TeamRanking> = read_ranking(conn, &key, RankingType::Team)?;
            let Some(ranking) = ranking else {
                return Ok(None);
            };
            let names = team_names(conn)?;
            let values = ranking
                .values
                .iter()
                .map(|value| {
                    Ok(TeamRankingValueResult {
                        team: team_result(&names, value.id)?,
                        order: value.order,
                        rank: value.rank,
                        value: value.value,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(TeamRankingResult {
                id: ranking.id,
                year: season_year(conn, ranking.season_id)?,
                name: ranking.name,
                season_id: ranking.season_id,
                week: ranking.week,
                values,
            }))
        })
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &GameRankingBySeasonWeekQuery| {
        store.with_reader(|conn| {
            let key = RankingKey::new(&query.name, query.season_id, query.week);
            let ranking: Option<GameRanking> = read_ranking(conn, &key, RankingType::Game)?;
            let Some(ranking) = ranking else {
                return Ok(None);
            };
            let names = team_names(conn)?;
            let games = season_games(conn, ranking.season_id)?;
            let values = ranking
                .values
                .iter()
                .map(|value| {
                    let game = games
                        .get(&value.id)
                        .ok_or_else(|| Error::not_found("game", value.id))?;
                    Ok(GameRankingValueResult {
                        game: game_result(&names, game)?,
                        order: value.order,
                        rank: value.rank,
                        value: value.value,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(GameRankingResult {
                id: ranking.id,
                year: season_year(conn, ranking.season_id)?,
                name: ranking.name,
                season_id: ranking.season_id,
                week: ranking.week,
                values,
            }))
        })
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |_: &LatestSeasonWeekQuery| {
        store.with_reader(|conn| {
            let played = conn
                .query_row(
                    "SELECT s.id, s.year, MAX(g.week)
                     FROM season s JOIN game g ON g.season_id = s.id
                     WHERE g.status = 'COMPLETED'
                     GROUP BY s.id, s.year
                     ORDER BY s.year DESC
                     LIMIT 1",
                    [],
                    |row| {
                        Ok(LatestSeasonWeekResult {
                            season_id: row.get(0)?,
                            year: row.get(1)?,
                            week: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            if played.is_some() {
                return Ok(played);
            }

            Ok(conn
                .query_row(
                    "SELECT id, year FROM season ORDER BY year DESC LIMIT 1",
                    [],
                    |row| {
                        Ok(LatestSeasonWeekResult {
                            season_id: row.get(0)?,
                            year: row.get(1)?,
                            week: None,
                        })
                    },
                )
                .optional()?)
        })
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |_: &CanceledGamesQuery| {
        store.with_reader(|conn| {
            let names = team_names(conn)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT s.year, {} FROM game
                 JOIN season s ON s.id = game.season_id
                 WHERE game.status = 'CANCELED'
                 ORDER BY s.year, game.date, game.id",
                prefixed_game_columns()
            ))?;
            let rows = stmt
                .query_map([], |row| {
                    let year: u32 = row.get(0)?;
                    Ok((year, game_row_at(row, 1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(year, game)| {
                    Ok(CanceledGameResult {
                        year,
                        game: game_result(&names, &game)?,
                    })
                })
                .collect::<Result<Vec<_>>>()
        })
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &RankingNamesBySeasonQuery| {
        store.with_reader(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT name, type FROM ranking
                 WHERE season_id = ?1
                 ORDER BY name, type",
            )?;
            let mut names = stmt
                .query_map(params![query.season_id], |row| {
                    Ok(RankingNameResult {
                        name: row.get(0)?,
                        ranking_type: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            names.sort();
            Ok(names)
        })
    })?;

    Ok(())
}

// ============================================================================
// HELPERS
// ============================================================================

fn season_year(conn: &Connection, id: SeasonId) -> Result<u32> {
    super::read_season(conn, id)?
        .map(|season| season.year)
        .ok_or_else(|| Error::not_found("season", id))
}

fn team_names(conn: &Connection) -> Result<HashMap<TeamId, String>> {
    let mut stmt = conn.prepare("SELECT id, name FROM team")?;
    let names = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<HashMap<_, _>, _>>()?;
    Ok(names)
}

fn team_result(names: &HashMap<TeamId, String>, id: TeamId) -> Result<TeamResult> {
    names
        .get(&id)
        .map(|name| TeamResult {
            id,
            name: name.clone(),
        })
        .ok_or_else(|| Error::not_found("team", id))
}

fn game_result(names: &HashMap<TeamId, String>, game: &Game) -> Result<GameResult> {
    Ok(GameResult {
        id: game.id,
        season_id: game.season_id,
        week: game.week,
        date: game.date,
        season_section: game.season_section,
        home_team: team_result(names, game.home_team_id)?,
        away_team: team_result(names, game.away_team_id)?,
        home_team_score: game.home_team_score,
        away_team_score: game.away_team_score,
        status: game.status,
        notes: game.notes.clone(),
    })
}

fn season_games(conn: &Connection, season_id: SeasonId) -> Result<HashMap<GameId, Game>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM game WHERE season_id = ?1",
        GAME_COLUMNS
    ))?;
    let games = stmt
        .query_map(params![season_id], game_row)?
        .map(|game| game.map(|game| (game.id, game)))
        .collect::<std::result::Result<HashMap<_, _>, _>>()?;
    Ok(games)
}

fn prefixed_game_columns() -> String {
    GAME_COLUMNS
        .split(',')
        .map(|column| format!("game.{}", column.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `game_row` for a statement whose game columns start at `offset`
fn game_row_at(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Game> {
    Ok(Game {
        id: row.get(offset)?,
        season_id: row.get(offset + 1)?,
        week: row.get(offset + 2)?,
        date: row.get(offset + 3)?,
        season_section: row.get(offset + 4)?,
        home_team_id: row.get(offset + 5)?,
        away_team_id: row.get(offset + 6)?,
        home_team_score: row.get(offset + 7)?,
        away_team_score: row.get(offset + 8)?,
        status: row.get(offset + 9)?,
        notes: row.get(offset + 10)?,
    })
}

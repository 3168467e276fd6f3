// SQLite schema - aggregate tables, lookup tables and the event audit trail

use crate::domain::{GameStatus, RankingType, SeasonSection, Subdivision};
use crate::error::{Error, Result};
use rusqlite::{params, Connection};

/// Tables in dependency order; dropped in reverse
const TABLES: &[&str] = &[
    "subdivision",
    "gamestatus",
    "seasonsection",
    "rankingtype",
    "season",
    "team",
    "affiliation",
    "game",
    "teamrecord",
    "teamrecordvalue",
    "ranking",
    "teamrankingvalue",
    "gamerankingvalue",
    "event",
];

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Lookup tables (contents must match the application enums)
    // ==========================================================================
    for table in ["subdivision", "gamestatus", "seasonsection", "rankingtype"] {
        conn.execute(
            &format!("CREATE TABLE IF NOT EXISTS {} (name TEXT PRIMARY KEY)", table),
            [],
        )?;
    }

    // ==========================================================================
    // Aggregate tables
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS season (
            id TEXT PRIMARY KEY,
            year INTEGER NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS team (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS affiliation (
            id TEXT PRIMARY KEY,
            season_id TEXT NOT NULL REFERENCES season(id),
            team_id TEXT NOT NULL REFERENCES team(id),
            subdivision TEXT NOT NULL REFERENCES subdivision(name),
            UNIQUE (season_id, team_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS game (
            id TEXT PRIMARY KEY,
            season_id TEXT NOT NULL REFERENCES season(id),
            week INTEGER NOT NULL,
            date TEXT NOT NULL,
            season_section TEXT NOT NULL REFERENCES seasonsection(name),
            home_team_id TEXT NOT NULL REFERENCES team(id),
            away_team_id TEXT NOT NULL REFERENCES team(id),
            home_team_score INTEGER,
            away_team_score INTEGER,
            status TEXT NOT NULL REFERENCES gamestatus(name),
            notes TEXT NOT NULL,
            UNIQUE (season_id, week, home_team_id, away_team_id)
        )",
        [],
    )?;

    // Teams meet at most once a week regardless of who hosts
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_game_team_pair ON game(
            season_id, week, MIN(home_team_id, away_team_id), MAX(home_team_id, away_team_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS teamrecord (
            id TEXT PRIMARY KEY,
            season_id TEXT NOT NULL REFERENCES season(id),
            week INTEGER
        )",
        [],
    )?;

    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_teamrecord_week
            ON teamrecord(season_id, IFNULL(week, -1))",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS teamrecordvalue (
            teamrecord_id TEXT NOT NULL REFERENCES teamrecord(id) ON DELETE CASCADE,
            team_id TEXT NOT NULL REFERENCES team(id),
            ord INTEGER NOT NULL,
            wins INTEGER NOT NULL,
            losses INTEGER NOT NULL,
            PRIMARY KEY (teamrecord_id, team_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS ranking (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            type TEXT NOT NULL REFERENCES rankingtype(name),
            season_id TEXT NOT NULL REFERENCES season(id),
            week INTEGER
        )",
        [],
    )?;

    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_ranking_key
            ON ranking(name, type, season_id, IFNULL(week, -1))",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS teamrankingvalue (
            ranking_id TEXT NOT NULL REFERENCES ranking(id) ON DELETE CASCADE,
            team_id TEXT NOT NULL REFERENCES team(id),
            ord INTEGER NOT NULL,
            rank INTEGER NOT NULL,
            value REAL NOT NULL,
            PRIMARY KEY (ranking_id, team_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS gamerankingvalue (
            ranking_id TEXT NOT NULL REFERENCES ranking(id) ON DELETE CASCADE,
            game_id TEXT NOT NULL REFERENCES game(id),
            ord INTEGER NOT NULL,
            rank INTEGER NOT NULL,
            value REAL NOT NULL,
            PRIMARY KEY (ranking_id, game_id)
        )",
        [],
    )?;

    // ==========================================================================
    // Event table (append-only audit trail of committed events)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS event (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_game_season ON game(season_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_affiliation_season ON affiliation(season_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_event_entity ON event(entity_type, entity_id)",
        [],
    )?;

    sync_lookup_table(conn, "subdivision", Subdivision::ALL.iter().map(|v| v.as_str()))?;
    sync_lookup_table(conn, "gamestatus", GameStatus::ALL.iter().map(|v| v.as_str()))?;
    sync_lookup_table(conn, "seasonsection", SeasonSection::ALL.iter().map(|v| v.as_str()))?;
    sync_lookup_table(conn, "rankingtype", RankingType::ALL.iter().map(|v| v.as_str()))?;

    Ok(())
}

/// Drop every table, lookup tables included
pub fn drop_database(conn: &Connection) -> Result<()> {
    for table in TABLES.iter().rev() {
        conn.execute(&format!("DROP TABLE IF EXISTS {}", table), [])?;
    }
    Ok(())
}

/// Fill an empty lookup table, or check a populated one against the enum
fn sync_lookup_table<'a>(
    conn: &Connection,
    table: &'static str,
    values: impl Iterator<Item = &'a str>,
) -> Result<()> {
    let mut expected: Vec<String> = values.map(str::to_string).collect();
    expected.sort();

    let mut stmt = conn.prepare(&format!("SELECT name FROM {} ORDER BY name", table))?;
    let found = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if found.is_empty() {
        for name in &expected {
            conn.execute(
                &format!("INSERT INTO {} (name) VALUES (?1)", table),
                params![name],
            )?;
        }
        return Ok(());
    }

    if found != expected {
        return Err(Error::SchemaMismatch {
            table,
            expected,
            found,
        });
    }

    Ok(())
}

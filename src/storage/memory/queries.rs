// Query handlers answering straight from the memory tables

use super::{MemoryStorage, Tables};
use crate::bus::QueryBus;
use crate::domain::{Game, GameStatus, RankingKey, RankingType, SeasonId, Subdivision, TeamId};
use crate::error::{Error, Result};
use crate::queries::*;
use std::rc::Rc;

pub fn register_query_handlers(storage: &Rc<MemoryStorage>, bus: &QueryBus) -> Result<()> {
    let store = Rc::clone(storage);
    bus.register_handler(move |_: &SeasonsQuery| {
        let tables = store.tables();
        Ok(tables
            .season_by_year
            .values()
            .filter_map(|id| season_result(&tables, *id))
            .collect())
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &SeasonByYearQuery| {
        let tables = store.tables();
        Ok(tables
            .season_by_year
            .get(&query.year)
            .and_then(|id| season_result(&tables, *id)))
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &SeasonByIdQuery| {
        Ok(season_result(&store.tables(), query.id))
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &TeamByIdQuery| {
        let tables = store.tables();
        Ok(tables.teams.get(&query.id).map(|team| TeamResult {
            id: team.id,
            name: team.name.clone(),
        }))
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &AffiliationCountBySeasonQuery| {
        let tables = store.tables();
        if !tables.seasons.contains_key(&query.season_id) {
            return Ok(None);
        }
        let (mut fbs_count, mut fcs_count) = (0, 0);
        for subdivision in season_subdivisions(&tables, query.season_id) {
            match subdivision {
                Subdivision::Fbs => fbs_count += 1,
                Subdivision::Fcs => fcs_count += 1,
            }
        }
        Ok(Some(AffiliationCountResult {
            season_id: query.season_id,
            fbs_count,
            fcs_count,
        }))
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &GameCountBySeasonQuery| {
        let tables = store.tables();
        if !tables.seasons.contains_key(&query.season_id) {
            return Ok(None);
        }
        Ok(Some(GameCountResult {
            season_id: query.season_id,
            count: season_games(&tables, query.season_id).count() as u32,
        }))
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &WeekCountBySeasonQuery| {
        let tables = store.tables();
        if !tables.seasons.contains_key(&query.season_id) {
            return Ok(None);
        }
        Ok(Some(WeekCountResult {
            season_id: query.season_id,
            count: season_games(&tables, query.season_id)
                .map(|game| game.week)
                .max()
                .unwrap_or(0),
        }))
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &TeamRecordBySeasonWeekQuery| {
        let tables = store.tables();
        let Some(record) = tables.team_records.get(&(query.season_id, query.week)) else {
            return Ok(None);
        };
        let values = record
            .values
            .iter()
            .map(|value| {
                Ok(TeamRecordValueResult {
                    team: team_result(&tables, value.team_id)?,
                    wins: value.wins,
                    losses: value.losses,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(TeamRecordResult {
            id: record.id,
            season_id: record.season_id,
            year: season_year(&tables, record.season_id)?,
            week: record.week,
            values,
        }))
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &TeamRankingBySeasonWeekQuery| {
        let tables = store.tables();
        let key = RankingKey::new(&query.name, query.season_id, query.week);
        let Some(ranking) = tables.team_rankings.get(&key) else {
            return Ok(None);
        };
        let values = ranking
            .values
            .iter()
            .map(|value| {
                Ok(TeamRankingValueResult {
                    team: team_result(&tables, value.id)?,
                    order: value.order,
                    rank: value.rank,
                    value: value.value,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(TeamRankingResult {
            id: ranking.id,
            name: ranking.name.clone(),
            season_id: ranking.season_id,
            year: season_year(&tables, ranking.season_id)?,
            week: ranking.week,
            values,
        }))
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &GameRankingBySeasonWeekQuery| {
        let tables = store.tables();
        let key = RankingKey::new(&query.name, query.season_id, query.week);
        let Some(ranking) = tables.game_rankings.get(&key) else {
            return Ok(None);
        };
        let values = ranking
            .values
            .iter()
            .map(|value| {
                let game = tables
                    .games
                    .get(&value.id)
                    .ok_or_else(|| Error::not_found("game", value.id))?;
                Ok(GameRankingValueResult {
                    game: game_result(&tables, game)?,
                    order: value.order,
                    rank: value.rank,
                    value: value.value,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(GameRankingResult {
            id: ranking.id,
            name: ranking.name.clone(),
            season_id: ranking.season_id,
            year: season_year(&tables, ranking.season_id)?,
            week: ranking.week,
            values,
        }))
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |_: &LatestSeasonWeekQuery| {
        let tables = store.tables();
        let played = tables.season_by_year.iter().rev().find_map(|(year, id)| {
            season_games(&tables, *id)
                .filter(|game| game.status == GameStatus::Completed)
                .map(|game| game.week)
                .max()
                .map(|week| LatestSeasonWeekResult {
                    season_id: *id,
                    year: *year,
                    week: Some(week),
                })
        });
        let latest = played.or_else(|| {
            tables
                .season_by_year
                .iter()
                .next_back()
                .map(|(year, id)| LatestSeasonWeekResult {
                    season_id: *id,
                    year: *year,
                    week: None,
                })
        });
        Ok(latest)
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |_: &CanceledGamesQuery| {
        let tables = store.tables();
        let mut canceled = Vec::new();
        for (year, season_id) in &tables.season_by_year {
            let mut games: Vec<&Game> = season_games(&tables, *season_id)
                .filter(|game| game.status == GameStatus::Canceled)
                .collect();
            games.sort_by_key(|game| (game.date, game.id));
            for game in games {
                canceled.push(CanceledGameResult {
                    year: *year,
                    game: game_result(&tables, game)?,
                });
            }
        }
        Ok(canceled)
    })?;

    let store = Rc::clone(storage);
    bus.register_handler(move |query: &RankingNamesBySeasonQuery| {
        let tables = store.tables();
        let team_names = tables
            .team_rankings
            .keys()
            .filter(|key| key.season_id == query.season_id)
            .map(|key| (key.name.clone(), RankingType::Team));
        let game_names = tables
            .game_rankings
            .keys()
            .filter(|key| key.season_id == query.season_id)
            .map(|key| (key.name.clone(), RankingType::Game));

        let mut names: Vec<RankingNameResult> = team_names
            .chain(game_names)
            .map(|(name, ranking_type)| RankingNameResult { name, ranking_type })
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    })?;

    Ok(())
}

// ============================================================================
// HELPERS
// ============================================================================

fn season_result(tables: &Tables, id: SeasonId) -> Option<SeasonResult> {
    tables.seasons.get(&id).map(|season| SeasonResult {
        id: season.id,
        year: season.year,
    })
}

fn season_year(tables: &Tables, id: SeasonId) -> Result<u32> {
    tables
        .seasons
        .get(&id)
        .map(|season| season.year)
        .ok_or_else(|| Error::not_found("season", id))
}

fn team_result(tables: &Tables, id: TeamId) -> Result<TeamResult> {
    tables
        .teams
        .get(&id)
        .map(|team| TeamResult {
            id: team.id,
            name: team.name.clone(),
        })
        .ok_or_else(|| Error::not_found("team", id))
}

fn game_result(tables: &Tables, game: &Game) -> Result<GameResult> {
    Ok(GameResult {
        id: game.id,
        season_id: game.season_id,
        week: game.week,
        date: game.date,
        season_section: game.season_section,
        home_team: team_result(tables, game.home_team_id)?,
        away_team: team_result(tables, game.away_team_id)?,
        home_team_score: game.home_team_score,
        away_team_score: game.away_team_score,
        status: game.status,
        notes: game.notes.clone(),
    })
}

fn season_games(tables: &Tables, season_id: SeasonId) -> impl Iterator<Item = &Game> + '_ {
    tables
        .games_by_season
        .get(&season_id)
        .into_iter()
        .flatten()
        .filter_map(|id| tables.games.get(id))
}

fn season_subdivisions(
    tables: &Tables,
    season_id: SeasonId,
) -> impl Iterator<Item = Subdivision> + '_ {
    tables
        .affiliations_by_season
        .get(&season_id)
        .into_iter()
        .flatten()
        .filter_map(|id| tables.affiliations.get(id))
        .map(|affiliation| affiliation.subdivision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Affiliation, AffiliationId, Event, GameId, Season, SeasonSection, Team, TeamRecord,
        TeamRecordId, TeamRecordValue,
    };
    use crate::storage::Storage;
    use chrono::NaiveDate;

    fn seeded() -> (Rc<MemoryStorage>, QueryBus, Season, Team, Team) {
        let storage = Rc::new(MemoryStorage::new());
        let season = Season::new(SeasonId::generate(), 2021);
        let navy = Team::new(TeamId::generate(), "Navy");
        let army = Team::new(TeamId::generate(), "Army");

        let mut played = Game::new(
            GameId::generate(),
            season.id,
            14,
            NaiveDate::from_ymd_opt(2021, 12, 11).unwrap(),
            SeasonSection::RegularSeason,
            army.id,
            navy.id,
            "",
        );
        let created = played.created();
        let completed = played.complete(17, 13).unwrap();

        let mut called_off = Game::new(
            GameId::generate(),
            season.id,
            2,
            NaiveDate::from_ymd_opt(2021, 9, 11).unwrap(),
            SeasonSection::RegularSeason,
            navy.id,
            army.id,
            "",
        );
        let called_off_created = called_off.created();
        let canceled = called_off.cancel().unwrap();

        storage
            .apply(&[
                Event::SeasonCreated(season.created()),
                Event::TeamCreated(navy.created()),
                Event::TeamCreated(army.created()),
                Event::AffiliationCreated(
                    Affiliation::new(AffiliationId::generate(), season.id, navy.id, Subdivision::Fbs)
                        .created(),
                ),
                Event::AffiliationCreated(
                    Affiliation::new(AffiliationId::generate(), season.id, army.id, Subdivision::Fbs)
                        .created(),
                ),
                Event::GameCreated(created),
                Event::GameCompleted(completed),
                Event::GameCreated(called_off_created),
                Event::GameCanceled(canceled),
            ])
            .unwrap();

        let bus = QueryBus::new();
        register_query_handlers(&storage, &bus).unwrap();
        (storage, bus, season, navy, army)
    }

    #[test]
    fn test_season_and_count_queries() {
        let (_, bus, season, _, _) = seeded();

        assert_eq!(
            bus.query(SeasonsQuery).unwrap(),
            vec![SeasonResult {
                id: season.id,
                year: 2021
            }]
        );
        assert_eq!(bus.query(SeasonByYearQuery { year: 2020 }).unwrap(), None);

        let counts = bus
            .query(AffiliationCountBySeasonQuery {
                season_id: season.id,
            })
            .unwrap()
            .unwrap();
        assert_eq!((counts.fbs_count, counts.fcs_count), (2, 0));

        let games = bus
            .query(GameCountBySeasonQuery {
                season_id: season.id,
            })
            .unwrap()
            .unwrap();
        assert_eq!(games.count, 2);

        let weeks = bus
            .query(WeekCountBySeasonQuery {
                season_id: season.id,
            })
            .unwrap()
            .unwrap();
        assert_eq!(weeks.count, 14);
    }

    #[test]
    fn test_latest_week_and_canceled_games() {
        let (_, bus, season, navy, _) = seeded();

        let latest = bus.query(LatestSeasonWeekQuery).unwrap().unwrap();
        assert_eq!(latest.season_id, season.id);
        assert_eq!(latest.week, Some(14));

        let canceled = bus.query(CanceledGamesQuery).unwrap();
        assert_eq!(canceled.len(), 1);
        assert_eq!(canceled[0].year, 2021);
        assert_eq!(canceled[0].game.home_team.name, navy.name);
        assert_eq!(canceled[0].game.status, GameStatus::Canceled);
    }

    #[test]
    fn test_record_query_joins_team_names() {
        let (storage, bus, season, navy, army) = seeded();
        let record = TeamRecord {
            id: TeamRecordId::generate(),
            season_id: season.id,
            week: None,
            values: vec![
                TeamRecordValue {
                    team_id: army.id,
                    wins: 1,
                    losses: 0,
                },
                TeamRecordValue {
                    team_id: navy.id,
                    wins: 0,
                    losses: 1,
                },
            ],
        };
        storage
            .apply(&[Event::TeamRecordCalculated(record.calculated())])
            .unwrap();

        let result = bus
            .query(TeamRecordBySeasonWeekQuery {
                season_id: season.id,
                week: None,
            })
            .unwrap()
            .unwrap();
        assert_eq!(result.year, 2021);
        assert_eq!(result.values[0].team.name, "Army");
        assert_eq!(result.values[1].losses, 1);

        assert_eq!(
            bus.query(TeamRecordBySeasonWeekQuery {
                season_id: season.id,
                week: Some(3),
            })
            .unwrap(),
            None
        );
    }
}

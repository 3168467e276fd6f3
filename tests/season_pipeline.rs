// End-to-end: CSV season -> import -> calculate -> queries, on both backends

use fbs_rankings::domain::{GameStatus, RankingType, SeasonRef};
use fbs_rankings::queries::{
    AffiliationCountBySeasonQuery, CanceledGamesQuery, GameCountBySeasonQuery,
    GameRankingBySeasonWeekQuery, LatestSeasonWeekQuery, RankingNamesBySeasonQuery,
    SeasonByYearQuery, SeasonsQuery, TeamRankingBySeasonWeekQuery, TeamRecordBySeasonWeekQuery,
    WeekCountBySeasonQuery,
};
use fbs_rankings::{
    Application, CalculateRankingsForSeasonCommand, Config, DropStorageCommand, Error,
    ImportSeasonByYearCommand, StorageConfig,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TEAMS: &str = "rank,school
1,Georgia
2,Michigan
3,Ohio State
4,Oregon
";

const GAMES: &str = "week,date,winner,winner_points,home_marker,loser,loser_points,notes
1,2022-09-03,(3) Georgia,49,N,(11) Oregon,3,Chick-fil-A Kickoff
1,2022-09-03,(4) Michigan,51,,Colorado State,7,
2,2022-09-10,Ohio State,45,,Georgia,41,
2,2022-09-10,Michigan,30,@,Oregon,20,
3,2022-09-17,Georgia,,,Michigan,,Canceled
4,2022-09-24,Ohio State,,,Oregon,,
15,\"Dec 31, 2022\",Georgia,42,N,Ohio State,41,Peach Bowl
";

fn write_source(dir: &Path) {
    let season = dir.join("2022");
    fs::create_dir_all(&season).unwrap();
    fs::write(season.join("teams.csv"), TEAMS).unwrap();
    fs::write(season.join("games.csv"), GAMES).unwrap();
}

fn config(dir: &Path, storage: StorageConfig) -> Config {
    let mut config = Config {
        storage,
        ..Config::default()
    };
    config.source.path = dir.to_path_buf();
    config
}

fn backends(dir: &Path) -> Vec<Config> {
    vec![
        config(dir, StorageConfig::Memory),
        config(
            dir,
            StorageConfig::Sqlite {
                path: dir.join("fbsrankings.db"),
            },
        ),
    ]
}

fn import_and_calculate(app: &Application) {
    app.send(ImportSeasonByYearCommand { year: 2022 }).unwrap();
    app.send(CalculateRankingsForSeasonCommand {
        season: SeasonRef::Year(2022),
    })
    .unwrap();
}

#[test]
fn test_season_pipeline_on_each_backend() {
    let dir = TempDir::new().unwrap();
    write_source(dir.path());

    for config in backends(dir.path()) {
        let app = Application::new(&config).unwrap();
        import_and_calculate(&app);
        let kind = app.storage_kind();

        // A four-team season breaks the schedule-size and postseason rules
        let findings = app.take_findings();
        assert!(!findings.is_empty(), "{}", kind);

        let seasons = app.query(SeasonsQuery).unwrap();
        assert_eq!(seasons.len(), 1, "{}", kind);
        let season = app
            .query(SeasonByYearQuery { year: 2022 })
            .unwrap()
            .unwrap();

        let affiliations = app
            .query(AffiliationCountBySeasonQuery {
                season_id: season.id,
            })
            .unwrap()
            .unwrap();
        assert_eq!((affiliations.fbs_count, affiliations.fcs_count), (4, 1), "{}", kind);

        let games = app
            .query(GameCountBySeasonQuery {
                season_id: season.id,
            })
            .unwrap()
            .unwrap();
        assert_eq!(games.count, 7, "{}", kind);

        let weeks = app
            .query(WeekCountBySeasonQuery {
                season_id: season.id,
            })
            .unwrap()
            .unwrap();
        assert_eq!(weeks.count, 15, "{}", kind);

        let latest = app.query(LatestSeasonWeekQuery).unwrap().unwrap();
        assert_eq!((latest.year, latest.week), (2022, Some(15)), "{}", kind);

        let canceled = app.query(CanceledGamesQuery).unwrap();
        assert_eq!(canceled.len(), 1, "{}", kind);
        assert_eq!(canceled[0].game.status, GameStatus::Canceled);
        assert_eq!(canceled[0].game.home_team.name, "Georgia");
        assert_eq!(canceled[0].game.away_team.name, "Michigan");

        let record = app
            .query(TeamRecordBySeasonWeekQuery {
                season_id: season.id,
                week: None,
            })
            .unwrap()
            .unwrap();
        let summary: Vec<(String, u32, u32)> = record
            .values
            .iter()
            .map(|v| (v.team.name.clone(), v.wins, v.losses))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Colorado State".to_string(), 0, 1),
                ("Georgia".to_string(), 2, 1),
                ("Michigan".to_string(), 2, 0),
                ("Ohio State".to_string(), 1, 1),
                ("Oregon".to_string(), 0, 2),
            ],
            "{}",
            kind
        );

        // Week 1 splits into two components, so SRS starts at week 2
        for (week, expected) in [(Some(1), false), (Some(2), true), (None, true)] {
            let srs = app
                .query(TeamRankingBySeasonWeekQuery {
                    name: "SRS".to_string(),
                    season_id: season.id,
                    week,
                })
                .unwrap();
            assert_eq!(srs.is_some(), expected, "{} week {:?}", kind, week);
        }

        let srs = app
            .query(TeamRankingBySeasonWeekQuery {
                name: "SRS".to_string(),
                season_id: season.id,
                week: None,
            })
            .unwrap()
            .unwrap();
        let total: f64 = srs.values.iter().map(|v| v.value).sum();
        assert!(total.abs() < 1e-6, "{}", kind);
        let orders: Vec<u32> = srs.values.iter().map(|v| v.order).collect();
        assert_eq!(orders, (1..=5).collect::<Vec<u32>>());

        let strength = app
            .query(GameRankingBySeasonWeekQuery {
                name: "SRS - Game Strength".to_string(),
                season_id: season.id,
                week: None,
            })
            .unwrap()
            .unwrap();
        // Every non-canceled game between two rated teams
        assert_eq!(strength.values.len(), 6, "{}", kind);

        let names = app
            .query(RankingNamesBySeasonQuery {
                season_id: season.id,
            })
            .unwrap();
        for (name, ranking_type) in [
            ("Colley Matrix", RankingType::Team),
            ("Simultaneous Wins", RankingType::Team),
            ("SRS - Future SoS", RankingType::Team),
            ("Colley Matrix - Game Strength", RankingType::Game),
        ] {
            assert!(
                names
                    .iter()
                    .any(|n| n.name == name && n.ranking_type == ranking_type),
                "{} missing {}",
                kind,
                name
            );
        }
    }
}

#[test]
fn test_backends_agree() {
    let dir = TempDir::new().unwrap();
    write_source(dir.path());

    let results: Vec<Vec<(String, u32, f64)>> = backends(dir.path())
        .iter()
        .map(|config| {
            let app = Application::new(config).unwrap();
            import_and_calculate(&app);
            let season = app
                .query(SeasonByYearQuery { year: 2022 })
                .unwrap()
                .unwrap();
            app.query(TeamRankingBySeasonWeekQuery {
                name: "Colley Matrix".to_string(),
                season_id: season.id,
                week: None,
            })
            .unwrap()
            .unwrap()
            .values
            .into_iter()
            .map(|v| (v.team.name, v.rank, v.value))
            .collect()
        })
        .collect();

    assert_eq!(results[0].len(), results[1].len());
    for (memory, sqlite) in results[0].iter().zip(&results[1]) {
        assert_eq!((&memory.0, memory.1), (&sqlite.0, sqlite.1));
        assert!((memory.2 - sqlite.2).abs() < 1e-12);
    }
}

#[test]
fn test_sqlite_storage_persists_and_drops() {
    let dir = TempDir::new().unwrap();
    write_source(dir.path());
    let config = config(
        dir.path(),
        StorageConfig::Sqlite {
            path: dir.path().join("persisted.db"),
        },
    );

    {
        let app = Application::new(&config).unwrap();
        import_and_calculate(&app);
    }

    let app = Application::new(&config).unwrap();
    assert_eq!(app.query(SeasonsQuery).unwrap().len(), 1);

    // Reimport after restart adds no duplicates
    app.send(ImportSeasonByYearCommand { year: 2022 }).unwrap();
    let season = app
        .query(SeasonByYearQuery { year: 2022 })
        .unwrap()
        .unwrap();
    let games = app
        .query(GameCountBySeasonQuery {
            season_id: season.id,
        })
        .unwrap()
        .unwrap();
    assert_eq!(games.count, 7);

    app.send(DropStorageCommand).unwrap();
    assert!(app.query(SeasonsQuery).unwrap().is_empty());
}

#[test]
fn test_missing_season_source() {
    let dir = TempDir::new().unwrap();
    let app = Application::new(&config(dir.path(), StorageConfig::Memory)).unwrap();
    let err = app
        .send(ImportSeasonByYearCommand { year: 1999 })
        .unwrap_err();
    assert!(matches!(err, Error::Source { .. }));
    assert!(app.query(SeasonsQuery).unwrap().is_empty());
}

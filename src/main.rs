// FBS Rankings CLI - import seasons, calculate rankings, print tables
//
// Issues commands and queries only; everything else lives in the library.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use fbs_rankings::domain::{SeasonId, SeasonRef};
use fbs_rankings::queries::{
    AffiliationCountBySeasonQuery, CanceledGamesQuery, GameCountBySeasonQuery,
    GameRankingBySeasonWeekQuery, LatestSeasonWeekQuery, RankingNamesBySeasonQuery,
    SeasonByIdQuery, SeasonByYearQuery, SeasonResult, SeasonsQuery, TeamRankingBySeasonWeekQuery,
    TeamRecordBySeasonWeekQuery, WeekCountBySeasonQuery,
};
use fbs_rankings::{
    logging, Application, CalculateRankingsForSeasonCommand, Config, DropStorageCommand,
    ImportSeasonByYearCommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fbs-rankings")]
#[command(about = "College football season import and ranking calculator")]
struct Args {
    /// Path to JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Import one or more seasons from the statistics source
    Import {
        #[arg(required = true)]
        years: Vec<u32>,
        /// Calculate rankings for each season after importing it
        #[arg(long)]
        calculate: bool,
    },
    /// Calculate records and rankings for stored seasons
    Calculate {
        /// Season years or ids
        #[arg(required = true)]
        seasons: Vec<SeasonRef>,
    },
    /// List stored seasons with team and game counts
    Seasons,
    /// Show the latest season and week with results
    Latest,
    /// Print a team ranking
    Ranking {
        name: String,
        #[arg(short, long)]
        season: Option<SeasonRef>,
        #[arg(short, long)]
        week: Option<u32>,
        #[arg(short, long, default_value_t = 25)]
        top: usize,
    },
    /// Print a game ranking
    GameRanking {
        name: String,
        #[arg(short, long)]
        season: Option<SeasonRef>,
        #[arg(short, long)]
        week: Option<u32>,
        #[arg(short, long, default_value_t = 25)]
        top: usize,
    },
    /// Print team records
    Record {
        #[arg(short, long)]
        season: Option<SeasonRef>,
        #[arg(short, long)]
        week: Option<u32>,
    },
    /// List canceled games across all seasons
    Canceled,
    /// Delete everything in the configured storage
    Drop,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => Config::default(),
    };
    logging::init(&config.logging.level, args.verbose)?;

    let app = Application::new(&config).context("Failed to start application")?;

    match args.command {
        CliCommand::Import { years, calculate } => run_import(&app, &years, calculate),
        CliCommand::Calculate { seasons } => run_calculate(&app, seasons),
        CliCommand::Seasons => print_seasons(&app),
        CliCommand::Latest => print_latest(&app),
        CliCommand::Ranking {
            name,
            season,
            week,
            top,
        } => print_team_ranking(&app, name, season, week, top),
        CliCommand::GameRanking {
            name,
            season,
            week,
            top,
        } => print_game_ranking(&app, name, season, week, top),
        CliCommand::Record { season, week } => print_record(&app, season, week),
        CliCommand::Canceled => print_canceled(&app),
        CliCommand::Drop => {
            app.send(DropStorageCommand)?;
            println!("✓ Dropped {} storage", app.storage_kind());
            Ok(())
        }
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_import(app: &Application, years: &[u32], calculate: bool) -> Result<()> {
    for &year in years {
        app.send(ImportSeasonByYearCommand { year })
            .with_context(|| format!("Failed to import season {}", year))?;
        println!("✓ Imported {}", year);

        let findings = app.take_findings();
        if !findings.is_empty() {
            println!("⚠️  {} validation findings:", findings.len());
            for finding in findings {
                println!("   - {}", finding);
            }
        }

        if calculate {
            app.send(CalculateRankingsForSeasonCommand {
                season: SeasonRef::Year(year),
            })
            .with_context(|| format!("Failed to calculate season {}", year))?;
            println!("✓ Calculated {}", year);
        }
    }
    Ok(())
}

fn run_calculate(app: &Application, seasons: Vec<SeasonRef>) -> Result<()> {
    for season in seasons {
        app.send(CalculateRankingsForSeasonCommand { season })
            .with_context(|| format!("Failed to calculate season {}", season))?;
        println!("✓ Calculated {}", season);
    }
    Ok(())
}

// ============================================================================
// TABLES
// ============================================================================

fn print_seasons(app: &Application) -> Result<()> {
    let seasons = app.query(SeasonsQuery)?;
    if seasons.is_empty() {
        println!("No seasons imported yet");
        return Ok(());
    }

    println!("{:>6} {:>5} {:>5} {:>6} {:>6}", "Season", "FBS", "FCS", "Games", "Weeks");
    for season in seasons {
        let affiliations = app.query(AffiliationCountBySeasonQuery {
            season_id: season.id,
        })?;
        let games = app.query(GameCountBySeasonQuery {
            season_id: season.id,
        })?;
        let weeks = app.query(WeekCountBySeasonQuery {
            season_id: season.id,
        })?;

        println!(
            "{:>6} {:>5} {:>5} {:>6} {:>6}",
            season.year,
            affiliations.as_ref().map_or(0, |a| a.fbs_count),
            affiliations.as_ref().map_or(0, |a| a.fcs_count),
            games.map_or(0, |g| g.count),
            weeks.map_or(0, |w| w.count),
        );
    }
    Ok(())
}

fn print_latest(app: &Application) -> Result<()> {
    match app.query(LatestSeasonWeekQuery)? {
        Some(latest) => match latest.week {
            Some(week) => println!("{} week {}", latest.year, week),
            None => println!("{} (no completed games)", latest.year),
        },
        None => println!("No seasons imported yet"),
    }
    Ok(())
}

fn print_team_ranking(
    app: &Application,
    name: String,
    season: Option<SeasonRef>,
    week: Option<u32>,
    top: usize,
) -> Result<()> {
    let season = resolve(app, season)?;
    let query = TeamRankingBySeasonWeekQuery {
        name: name.clone(),
        season_id: season.id,
        week,
    };
    let Some(ranking) = app.query(query)? else {
        return missing_ranking(app, &name, season.id);
    };

    println!("{} - {} {}", ranking.name, ranking.year, week_label(ranking.week));
    for value in ranking.values.iter().take(top) {
        println!("{:>4} {:<30} {:>10.3}", value.rank, value.team.name, value.value);
    }
    Ok(())
}

fn print_game_ranking(
    app: &Application,
    name: String,
    season: Option<SeasonRef>,
    week: Option<u32>,
    top: usize,
) -> Result<()> {
    let season = resolve(app, season)?;
    let query = GameRankingBySeasonWeekQuery {
        name: name.clone(),
        season_id: season.id,
        week,
    };
    let Some(ranking) = app.query(query)? else {
        return missing_ranking(app, &name, season.id);
    };

    println!("{} - {} {}", ranking.name, ranking.year, week_label(ranking.week));
    for value in ranking.values.iter().take(top) {
        let game = &value.game;
        println!(
            "{:>4} {:>3} {} {:<25} vs {:<25} {:>8.3}",
            value.rank, game.week, game.date, game.home_team.name, game.away_team.name, value.value
        );
    }
    Ok(())
}

fn print_record(app: &Application, season: Option<SeasonRef>, week: Option<u32>) -> Result<()> {
    let season = resolve(app, season)?;
    let record = app
        .query(TeamRecordBySeasonWeekQuery {
            season_id: season.id,
            week,
        })?
        .ok_or_else(|| anyhow!("No record for {} {}", season.year, week_label(week)))?;

    println!("Records - {} {}", record.year, week_label(record.week));
    for value in &record.values {
        println!("{:<30} {:>3}-{:<3}", value.team.name, value.wins, value.losses);
    }
    Ok(())
}

fn print_canceled(app: &Application) -> Result<()> {
    let canceled = app.query(CanceledGamesQuery)?;
    if canceled.is_empty() {
        println!("No canceled games");
    }
    for entry in canceled {
        let game = &entry.game;
        println!(
            "{} week {:>2} {} {} vs {} {}",
            entry.year, game.week, game.date, game.home_team.name, game.away_team.name, game.notes
        );
    }
    Ok(())
}

// ============================================================================
// HELPERS
// ============================================================================

/// Named season, or the latest one with results
fn resolve(app: &Application, season: Option<SeasonRef>) -> Result<SeasonResult> {
    let found = match season {
        Some(SeasonRef::Year(year)) => app.query(SeasonByYearQuery { year })?,
        Some(SeasonRef::Id(id)) => app.query(SeasonByIdQuery { id })?,
        None => match app.query(LatestSeasonWeekQuery)? {
            Some(latest) => app.query(SeasonByIdQuery {
                id: latest.season_id,
            })?,
            None => None,
        },
    };

    match (found, season) {
        (Some(found), _) => Ok(found),
        (None, Some(season)) => bail!("Season {} not found", season),
        (None, None) => bail!("No seasons imported yet"),
    }
}

fn missing_ranking(app: &Application, name: &str, season_id: SeasonId) -> Result<()> {
    let names = app.query(RankingNamesBySeasonQuery { season_id })?;
    eprintln!("❌ No ranking named {:?}", name);
    if !names.is_empty() {
        eprintln!("   Available:");
        for entry in names {
            eprintln!("   - {} ({})", entry.name, entry.ranking_type);
        }
    }
    bail!("Ranking {:?} not found", name)
}

fn week_label(week: Option<u32>) -> String {
    match week {
        Some(week) => format!("week {}", week),
        None => "final".to_string(),
    }
}

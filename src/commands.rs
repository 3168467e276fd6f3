// 🎯 Commands - the write side of the application
//
//   ImportSeasonByYearCommand        fetch, upsert, validate, commit
//   CalculateRankingsForSeasonCommand records + every ranking, one commit
//   DropStorageCommand               clear the backing store
//
// Every write happens inside one unit of work; a handler error drops it,
// which rolls back everything the command did.

use crate::bus::{Command, CommandBus, EventBus};
use crate::domain::{resolve_season, Event, Season, SeasonRef, Subdivision};
use crate::error::{Error, Result};
use crate::import::{game_data_from_row, ImportService};
use crate::ranking::{
    ColleyMatrixRankingService, GameStrengthRankingService, SeasonData,
    SimultaneousWinsRankingService, SrsRankingService, StrengthOfScheduleRankingService,
    TeamRankingDraft, TeamRecordService,
};
use crate::source::StatisticsSource;
use crate::storage::Storage;
use crate::unit_of_work::UnitOfWork;
use crate::validation::{RaiseBehavior, ValidationService};
use std::collections::HashSet;
use std::rc::Rc;

// ============================================================================
// MESSAGES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSeasonByYearCommand {
    pub year: u32,
}

impl Command for ImportSeasonByYearCommand {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculateRankingsForSeasonCommand {
    pub season: SeasonRef,
}

impl Command for CalculateRankingsForSeasonCommand {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropStorageCommand;

impl Command for DropStorageCommand {}

// ============================================================================
// REGISTRATION
// ============================================================================

/// Everything the command handlers share
#[derive(Clone)]
pub struct CommandContext {
    pub storage: Rc<dyn Storage>,
    pub event_bus: Rc<EventBus>,
    pub source: Rc<dyn StatisticsSource>,
    pub raise_behavior: RaiseBehavior,
}

pub fn register_command_handlers(context: &CommandContext, bus: &CommandBus) -> Result<()> {
    let ctx = context.clone();
    bus.register_handler(move |command: &ImportSeasonByYearCommand| {
        import_season_by_year(&ctx, command.year)
    })?;

    let ctx = context.clone();
    bus.register_handler(move |command: &CalculateRankingsForSeasonCommand| {
        calculate_rankings_for_season(&ctx, command.season)
    })?;

    let ctx = context.clone();
    bus.register_handler(move |_: &DropStorageCommand| drop_storage(&ctx))?;

    Ok(())
}

// ============================================================================
// IMPORT
// ============================================================================

fn import_season_by_year(ctx: &CommandContext, year: u32) -> Result<()> {
    tracing::info!(year, source = ctx.source.name(), "importing season");

    // All source I/O happens before the unit of work opens
    let team_rows = ctx.source.teams(year)?;
    let game_rows = ctx.source.games(year)?;

    let uow = UnitOfWork::open(Rc::clone(&ctx.storage), Rc::clone(&ctx.event_bus))?;
    let mut validation = ValidationService::new(ctx.raise_behavior);

    let season = {
        let mut import = ImportService::new(uow.transaction(), &mut validation);
        let season = import.import_season(year)?;

        let mut fbs_names = HashSet::new();
        for row in &team_rows {
            let team = import.import_team(&row.school)?;
            import.import_affiliation(season.id, team.id, Subdivision::Fbs)?;
            fbs_names.insert(row.school.as_str());
        }

        for row in &game_rows {
            let (winner_name, loser_name) = row.teams();
            let mut ids = Vec::with_capacity(2);
            for name in [winner_name, loser_name] {
                let team = import.import_team(name)?;
                if !fbs_names.contains(name) {
                    import.import_affiliation(season.id, team.id, Subdivision::Fcs)?;
                }
                ids.push(team.id);
            }

            let data = game_data_from_row(season.id, row, ids[0], ids[1])?;
            import.import_game(&data)?;
        }

        season
    };

    let data = load_season(uow.transaction(), &season)?;
    validation.validate_season_games(&data)?;

    uow.commit()?;

    let findings = validation.take_errors();
    tracing::info!(
        year,
        teams = data.teams.len(),
        games = data.games.len(),
        findings = findings.len(),
        "imported season"
    );
    for finding in findings {
        ctx.event_bus.publish(&Event::ValidationFailed(finding))?;
    }

    Ok(())
}

// ============================================================================
// CALCULATE
// ============================================================================

fn calculate_rankings_for_season(ctx: &CommandContext, season: SeasonRef) -> Result<()> {
    let uow = UnitOfWork::open(Rc::clone(&ctx.storage), Rc::clone(&ctx.event_bus))?;
    let tx = uow.transaction();

    let season = resolve_season(tx, season)?.ok_or_else(|| Error::not_found("season", season))?;
    let data = load_season(tx, &season)?;
    tracing::info!(year = season.year, games = data.games.len(), "calculating rankings");

    for record in TeamRecordService::new().calculate_for_season(&data) {
        tx.team_records()
            .create(season.id, record.week, record.values)?;
    }

    let performance: Vec<TeamRankingDraft> = [
        SrsRankingService::new().calculate_for_season(&data),
        ColleyMatrixRankingService::new().calculate_for_season(&data),
        SimultaneousWinsRankingService::new().calculate_for_season(&data),
    ]
    .into_iter()
    .flatten()
    .collect();

    let strength_of_schedule = StrengthOfScheduleRankingService::new();
    let game_strength = GameStrengthRankingService::new();
    let mut ranking_count = 0;

    for ranking in &performance {
        for derived in strength_of_schedule.calculate_for_ranking(&data, ranking) {
            tx.team_rankings()
                .create(&derived.name, season.id, derived.week, derived.values)?;
            ranking_count += 1;
        }
        for derived in game_strength.calculate_for_ranking(&data, ranking) {
            tx.game_rankings()
                .create(&derived.name, season.id, derived.week, derived.values)?;
            ranking_count += 1;
        }
    }
    for ranking in performance {
        tx.team_rankings()
            .create(&ranking.name, season.id, ranking.week, ranking.values)?;
        ranking_count += 1;
    }

    uow.commit()?;
    tracing::info!(year = season.year, rankings = ranking_count, "calculated rankings");
    Ok(())
}

// ============================================================================
// DROP
// ============================================================================

fn drop_storage(ctx: &CommandContext) -> Result<()> {
    let lock = ctx.storage.write_lock();
    lock.acquire(ctx.storage.kind())?;
    let result = ctx.storage.drop_all();
    lock.release();

    if result.is_ok() {
        tracing::info!(storage = ctx.storage.kind(), "dropped storage");
    }
    result
}

fn load_season<R>(reader: &R, season: &Season) -> Result<SeasonData>
where
    R: crate::domain::AggregateReader + ?Sized,
{
    SeasonData::load(reader, season.id)?.ok_or_else(|| Error::not_found("season", season.year))
}

// ============================================================================
// TESTS
// ============================================================================

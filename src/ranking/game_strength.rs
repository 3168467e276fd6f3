// Game strength - how good a matchup is, weighted toward the weaker team
//
//   (99 * weaker + 1 * stronger) / 100
//
// over every non-canceled game whose teams both appear in the performance
// ranking. Named "<performance> - Game Strength".

use super::{game_ranking, GameRankingDraft, SeasonData, TeamRankingDraft};
use crate::domain::{GameId, GameStatus};
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, Copy)]
pub struct GameStrengthRankingService;

impl GameStrengthRankingService {
    pub fn new() -> Self {
        GameStrengthRankingService
    }

    pub fn calculate_for_ranking(
        &self,
        data: &SeasonData,
        performance: &TeamRankingDraft,
    ) -> Vec<GameRankingDraft> {
        let values: BTreeMap<GameId, f64> = data
            .games
            .values()
            .filter(|game| game.status != GameStatus::Canceled)
            .filter_map(|game| {
                let home = performance.value_of(&game.home_team_id)?;
                let away = performance.value_of(&game.away_team_id)?;
                Some((game.id, game_strength(home, away)))
            })
            .collect();

        if values.is_empty() {
            return Vec::new();
        }

        let name = format!("{} - Game Strength", performance.name);
        vec![game_ranking(data, &name, performance.week, values)]
    }
}

pub fn game_strength(first: f64, second: f64) -> f64 {
    let (weaker, stronger) = if first <= second {
        (first, second)
    } else {
        (second, first)
    };
    (99.0 * weaker + stronger) / 100.0
}

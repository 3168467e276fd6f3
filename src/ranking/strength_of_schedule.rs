// Strength of schedule - mean opponent rating from a performance ranking
//
// Three variants per performance ranking, named after it:
//   "<name> - Overall SoS": every non-canceled game
//   "<name> - Past SoS":    completed games through the ranking week
//   "<name> - Future SoS":  scheduled games after the ranking week
// Teams with no rated opponent in a variant are left out of it; an empty
// variant produces no ranking.

use super::{team_ranking, SeasonData, TeamRankingDraft};
use crate::domain::{Game, GameStatus, TeamId};
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, Copy)]
pub struct StrengthOfScheduleRankingService;

impl StrengthOfScheduleRankingService {
    pub fn new() -> Self {
        StrengthOfScheduleRankingService
    }

    pub fn calculate_for_ranking(
        &self,
        data: &SeasonData,
        performance: &TeamRankingDraft,
    ) -> Vec<TeamRankingDraft> {
        let through = performance.week.unwrap_or(u32::MAX);

        let overall = |game: &Game| game.status != GameStatus::Canceled;
        let past = |game: &Game| game.status == GameStatus::Completed && game.week <= through;
        let future = |game: &Game| game.status == GameStatus::Scheduled && game.week > through;

        let variants: [(&str, &dyn Fn(&Game) -> bool); 3] = [
            ("Overall SoS", &overall),
            ("Past SoS", &past),
            ("Future SoS", &future),
        ];

        variants
            .into_iter()
            .filter_map(|(suffix, include)| {
                let values = mean_opponent_values(data, performance, include);
                if values.is_empty() {
                    return None;
                }
                let name = format!("{} - {}", performance.name, suffix);
                Some(team_ranking(data, &name, performance.week, values))
            })
            .collect()
    }
}

fn mean_opponent_values(
    data: &SeasonData,
    performance: &TeamRankingDraft,
    include: &dyn Fn(&Game) -> bool,
) -> BTreeMap<TeamId, f64> {
    let mut totals: BTreeMap<TeamId, (f64, u32)> = BTreeMap::new();

    for game in data.games.values().filter(|game| include(game)) {
        for (team_id, opponent_id) in [
            (game.home_team_id, game.away_team_id),
            (game.away_team_id, game.home_team_id),
        ] {
            if performance.value_of(&team_id).is_none() {
                continue;
            }
            if let Some(rating) = performance.value_of(&opponent_id) {
                let entry = totals.entry(team_id).or_insert((0.0, 0));
                entry.0 += rating;
                entry.1 += 1;
            }
        }
    }

    totals
        .into_iter()
        .map(|(team_id, (total, count))| (team_id, total / f64::from(count)))
        .collect()
}

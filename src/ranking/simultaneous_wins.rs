// Simultaneous Wins - a team is worth its win percentage plus a share of the
// rating of every team it beat
//
//   r_i - sum over wins(r_loser / games_i) = wins_i / games_i
//
// Same game filter as Colley: completed FBS-vs-FBS regular-season results.

use super::linalg::Matrix;
use super::{team_ranking, SeasonData, TeamRankingDraft};
use crate::domain::TeamId;
use std::collections::BTreeMap;

pub const SIMULTANEOUS_WINS_NAME: &str = "Simultaneous Wins";

#[derive(Debug, Default, Clone, Copy)]
pub struct SimultaneousWinsRankingService;

impl SimultaneousWinsRankingService {
    pub fn new() -> Self {
        SimultaneousWinsRankingService
    }

    pub fn calculate_for_season(&self, data: &SeasonData) -> Vec<TeamRankingDraft> {
        let games = data.fbs_regular_season_results();
        if games.is_empty() {
            return Vec::new();
        }

        let team_ids = data.fbs_team_ids();
        let index: BTreeMap<TeamId, usize> = team_ids
            .iter()
            .enumerate()
            .map(|(i, team_id)| (*team_id, i))
            .collect();
        let n = team_ids.len();

        let mut game_counts = vec![0u32; n];
        let mut win_counts = vec![0u32; n];
        for game in &games {
            game_counts[index[&game.home_team_id]] += 1;
            game_counts[index[&game.away_team_id]] += 1;
            if let Some(winner) = game.winning_team_id() {
                win_counts[index[&winner]] += 1;
            }
        }

        let mut matrix = Matrix::zeros(n);
        let mut rhs = vec![0.0; n];
        for i in 0..n {
            matrix.add(i, i, 1.0);
            if game_counts[i] > 0 {
                rhs[i] = f64::from(win_counts[i]) / f64::from(game_counts[i]);
            }
        }
        for game in &games {
            let (Some(winner), Some(loser)) = (game.winning_team_id(), game.losing_team_id())
            else {
                continue;
            };
            let (w, l) = (index[&winner], index[&loser]);
            matrix.add(w, l, -1.0 / f64::from(game_counts[w]));
        }

        match matrix.solve(&rhs) {
            Some(ratings) => vec![team_ranking(
                data,
                SIMULTANEOUS_WINS_NAME,
                None,
                team_ids.into_iter().zip(ratings).collect(),
            )],
            None => {
                tracing::warn!(season = data.season.year, "Simultaneous Wins system is singular");
                Vec::new()
            }
        }
    }
}

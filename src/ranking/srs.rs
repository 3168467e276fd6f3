// 📈 SRS - Simple Rating System
//
// For each week with completed games (cumulative through that week), solve
//   games_i * r_i - sum(r_opponents) = sum(clipped margins)
// with every coefficient raised by 1, which folds in sum(r) = 0 so a
// connected schedule has a unique solution. Ratings are then mean-centered.
//
// Margins are clipped to 24 points and widened to at least 7 for any
// non-tied game.
//
// A week whose schedule graph is not yet connected is singular: it is
// skipped, and the last solvable week stands in for the season-final ranking
// if the full season is singular too.

use super::linalg::Matrix;
use super::{team_ranking, SeasonData, TeamRankingDraft};
use crate::domain::{Game, TeamId};
use std::collections::BTreeMap;

pub const SRS_NAME: &str = "SRS";

const MAX_MARGIN: i64 = 24;
const MIN_MARGIN: i64 = 7;

#[derive(Debug, Default, Clone, Copy)]
pub struct SrsRankingService;

impl SrsRankingService {
    pub fn new() -> Self {
        SrsRankingService
    }

    pub fn calculate_for_season(&self, data: &SeasonData) -> Vec<TeamRankingDraft> {
        let mut rankings = Vec::new();
        let mut last_solved: Option<BTreeMap<TeamId, f64>> = None;

        for week in data.completed_weeks() {
            let games: Vec<&Game> = data.completed_games().filter(|g| g.week <= week).collect();
            match solve_ratings(&games) {
                Some(ratings) => {
                    rankings.push(team_ranking(data, SRS_NAME, Some(week), ratings.clone()));
                    last_solved = Some(ratings);
                }
                None => {
                    tracing::warn!(
                        season = data.season.year,
                        week,
                        "SRS system is singular, skipping week"
                    );
                }
            }
        }

        let games: Vec<&Game> = data.completed_games().collect();
        let final_ratings = solve_ratings(&games).or(last_solved);
        if let Some(ratings) = final_ratings {
            rankings.push(team_ranking(data, SRS_NAME, None, ratings));
        }

        rankings
    }
}

/// Clip a point margin into [7, 24] magnitude, keeping ties at zero
pub fn clip_margin(margin: i64) -> i64 {
    match margin {
        0 => 0,
        m => m.signum() * m.abs().clamp(MIN_MARGIN, MAX_MARGIN),
    }
}

fn solve_ratings(games: &[&Game]) -> Option<BTreeMap<TeamId, f64>> {
    let team_ids: Vec<TeamId> = games
        .iter()
        .flat_map(|game| [game.home_team_id, game.away_team_id])
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    if team_ids.is_empty() {
        return None;
    }
    let index: BTreeMap<TeamId, usize> = team_ids
        .iter()
        .enumerate()
        .map(|(i, team_id)| (*team_id, i))
        .collect();

    let n = team_ids.len();
    let mut matrix = Matrix::zeros(n);
    let mut margins = vec![0.0; n];

    for game in games {
        let (home, away) = (index[&game.home_team_id], index[&game.away_team_id]);
        let Some(margin) = game.margin_for(game.home_team_id) else {
            continue;
        };
        let margin = clip_margin(margin) as f64;

        matrix.add(home, home, 1.0);
        matrix.add(away, away, 1.0);
        matrix.add(home, away, -1.0);
        matrix.add(away, home, -1.0);
        margins[home] += margin;
        margins[away] -= margin;
    }
    matrix.add_all(1.0);

    let ratings = matrix.solve(&margins)?;
    let mean = ratings.iter().sum::<f64>() / n as f64;

    Some(
        team_ids
            .into_iter()
            .zip(ratings)
            .map(|(team_id, rating)| (team_id, rating - mean))
            .collect(),
    )
}

// Colley Matrix - win/loss only rating over FBS regular-season results
//
//   (2 + games_i) * r_i - sum(games_ij * r_j) = 1 + (wins_i - losses_i) / 2
//
// The Colley matrix is always positive definite, so one solve per season.

use super::linalg::Matrix;
use super::{team_ranking, SeasonData, TeamRankingDraft};
use crate::domain::TeamId;
use std::collections::BTreeMap;

pub const COLLEY_MATRIX_NAME: &str = "Colley Matrix";

#[derive(Debug, Default, Clone, Copy)]
pub struct ColleyMatrixRankingService;

impl ColleyMatrixRankingService {
    pub fn new() -> Self {
        ColleyMatrixRankingService
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
        let mut matrix = Matrix::zeros(n);
        let mut rhs = vec![1.0; n];
        for i in 0..n {
            matrix.add(i, i, 2.0);
        }

        for game in games {
            let (home, away) = (index[&game.home_team_id], index[&game.away_team_id]);
            matrix.add(home, home, 1.0);
            matrix.add(away, away, 1.0);
            matrix.add(home, away, -1.0);
            matrix.add(away, home, -1.0);

            // Ties count as games but move neither side
            if let (Some(winner), Some(loser)) = (game.winning_team_id(), game.losing_team_id()) {
                rhs[index[&winner]] += 0.5;
                rhs[index[&loser]] -= 0.5;
            }
        }

        match matrix.solve(&rhs) {
            Some(ratings) => vec![team_ranking(
                data,
                COLLEY_MATRIX_NAME,
                None,
                team_ids.into_iter().zip(ratings).collect(),
            )],
            None => {
                tracing::warn!(season = data.season.year, "Colley system is singular");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeasonSection;
    use crate::ranking::testing::SeasonBuilder;

    #[test]
    fn test_two_team_colley_ratings() {
        let mut season = SeasonBuilder::new(2017);
        let a = season.fbs("UCF");
        let b = season.fbs("Auburn");
        season.result(1, a, 34, b, 27, SeasonSection::RegularSeason);
        let data = season.build();

        let rankings = ColleyMatrixRankingService::new().calculate_for_season(&data);
        assert_eq!(rankings.len(), 1);
        let ranking = &rankings[0];
        assert_eq!(ranking.name, COLLEY_MATRIX_NAME);
        assert_eq!(ranking.week, None);

        // [3 -1; -1 3] r = [1.5, 0.5]
        assert!((ranking.value_of(&a).unwrap() - 0.625).abs() < 1e-9);
        assert!((ranking.value_of(&b).unwrap() - 0.375).abs() < 1e-9);
    }

    #[test]
    fn test_tied_game_counts_as_played() {
        let mut season = SeasonBuilder::new(2017);
        let a = season.fbs("Iowa");
        let b = season.fbs("Purdue");
        let c = season.fbs("Wisconsin");
        season.result(1, a, 21, b, 7, SeasonSection::RegularSeason);
        season.result(2, a, 14, c, 14, SeasonSection::RegularSeason);
        let data = season.build();

        // [4 -1 -1; -1 3 0; -1 0 3] r = [1.5, 0.5, 1.0]
        let ranking = &ColleyMatrixRankingService::new().calculate_for_season(&data)[0];
        assert!((ranking.value_of(&a).unwrap() - 0.6).abs() < 1e-9);
        assert!((ranking.value_of(&b).unwrap() - 1.1 / 3.0).abs() < 1e-9);
        assert!((ranking.value_of(&c).unwrap() - 1.6 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_ignores_fcs_postseason_and_unplayed_games() {
        let mut season = SeasonBuilder::new(2017);
        let a = season.fbs("Georgia");
        let b = season.fbs("Oklahoma");
        let c = season.fbs("Idle State");
        let fcs = season.fcs("Samford");
        season.result(1, a, 42, fcs, 14, SeasonSection::RegularSeason);
        season.result(2, b, 31, a, 17, SeasonSection::RegularSeason);
        season.result(14, a, 54, b, 48, SeasonSection::Postseason);
        season.canceled(3, a, c);
        let data = season.build();

        let ranking = &ColleyMatrixRankingService::new().calculate_for_season(&data)[0];
        assert_eq!(ranking.values.len(), 3);
        assert_eq!(ranking.value_of(&fcs), None);
        assert!((ranking.value_of(&c).unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(ranking.values[0].id, b);
    }
}

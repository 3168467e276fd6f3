// 📊 Ranking - ordered values over teams or games for one season week
//
// `week == None` is the season-final ranking. A ranking is created in one
// piece; recalculating under the same (name, season, week) supersedes the
// previous one.

use super::events::{GameRankingCalculated, TeamRankingCalculated};
use super::ids::{GameId, RankingId, SeasonId, TeamId};
use super::UnknownVariant;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// RANKING TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RankingType {
    Team,
    Game,
}

impl RankingType {
    pub const ALL: [RankingType; 2] = [RankingType::Team, RankingType::Game];

    pub fn as_str(&self) -> &'static str {
        match self {
            RankingType::Team => "Team",
            RankingType::Game => "Game",
        }
    }
}

impl fmt::Display for RankingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RankingType::ALL
            .into_iter()
            .find(|ranking_type| ranking_type.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("ranking type", s))
    }
}

// ============================================================================
// RANKING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingValue<T> {
    /// Ranked subject (a team or a game)
    pub id: T,
    /// Dense 1-based position in the sorted sequence
    pub order: u32,
    /// 1 + number of strictly greater values
    pub rank: u32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking<T> {
    pub id: RankingId,
    pub name: String,
    pub season_id: SeasonId,
    pub week: Option<u32>,
    pub values: Vec<RankingValue<T>>,
}

pub type TeamRanking = Ranking<TeamId>;
pub type GameRanking = Ranking<GameId>;

impl<T> Ranking<T> {
    pub fn key(&self) -> RankingKey {
        RankingKey::new(&self.name, self.season_id, self.week)
    }

    pub fn value_of(&self, subject: &T) -> Option<&RankingValue<T>>
    where
        T: PartialEq,
    {
        self.values.iter().find(|value| &value.id == subject)
    }
}

impl TeamRanking {
    pub(crate) fn calculated(&self) -> TeamRankingCalculated {
        TeamRankingCalculated {
            id: self.id,
            name: self.name.clone(),
            season_id: self.season_id,
            week: self.week,
            values: self.values.clone(),
        }
    }
}

impl GameRanking {
    pub(crate) fn calculated(&self) -> GameRankingCalculated {
        GameRankingCalculated {
            id: self.id,
            name: self.name.clone(),
            season_id: self.season_id,
            week: self.week,
            values: self.values.clone(),
        }
    }
}

impl From<&TeamRankingCalculated> for TeamRanking {
    fn from(event: &TeamRankingCalculated) -> Self {
        Ranking {
            id: event.id,
            name: event.name.clone(),
            season_id: event.season_id,
            week: event.week,
            values: event.values.clone(),
        }
    }
}

impl From<&GameRankingCalculated> for GameRanking {
    fn from(event: &GameRankingCalculated) -> Self {
        Ranking {
            id: event.id,
            name: event.name.clone(),
            season_id: event.season_id,
            week: event.week,
            values: event.values.clone(),
        }
    }
}

/// Natural key of a ranking: (name, season, week)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RankingKey {
    pub name: String,
    pub season_id: SeasonId,
    pub week: Option<u32>,
}

impl RankingKey {
    pub fn new(name: &str, season_id: SeasonId, week: Option<u32>) -> Self {
        RankingKey {
            name: name.to_string(),
            season_id,
            week,
        }
    }
}

impl fmt::Display for RankingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.week {
            Some(week) => write!(f, "{} / season {} / week {}", self.name, self.season_id, week),
            None => write!(f, "{} / season {} / final", self.name, self.season_id),
        }
    }
}

// ============================================================================
// TIE-BREAK
// ============================================================================

/// Turn unordered (subject, secondary key, value) entries into ranking values.
///
/// Sorts by value descending, then the secondary key (team name, game date +
/// names), then the subject id, which yields a total order. Equal values share
/// a rank; `order` is always the dense position.
pub fn rank_values<T, K>(mut entries: Vec<(T, K, f64)>) -> Vec<RankingValue<T>>
where
    T: Ord,
    K: Ord,
{
    entries.sort_by(|(a_id, a_key, a_value), (b_id, b_key, b_value)| {
        b_value
            .total_cmp(a_value)
            .then_with(|| a_key.cmp(b_key))
            .then_with(|| a_id.cmp(b_id))
    });

    let mut values: Vec<RankingValue<T>> = Vec::with_capacity(entries.len());
    let mut previous: Option<(f64, u32)> = None;

    for (index, (id, _, value)) in entries.into_iter().enumerate() {
        let order = index as u32 + 1;
        let rank = match previous {
            Some((previous_value, previous_rank)) if previous_value == value => previous_rank,
            _ => order,
        };
        previous = Some((value, rank));
        values.push(RankingValue {
            id,
            order,
            rank,
            value,
        });
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rank_values_sorts_descending() {
        let values = rank_values(vec![(1u32, "b", 0.5), (2, "a", 2.0), (3, "c", -1.0)]);
        let ids: Vec<u32> = values.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
        assert_eq!(values[0].order, 1);
        assert_eq!(values[2].rank, 3);
    }

    #[test]
    fn test_ties_share_rank_and_break_on_secondary_key() {
        let values = rank_values(vec![
            (10u32, "Wyoming", 1.0),
            (20, "Alabama", 1.0),
            (30, "Texas", 3.0),
            (40, "Utah", 0.0),
        ]);

        let summary: Vec<(u32, u32, u32)> =
            values.iter().map(|v| (v.id, v.order, v.rank)).collect();
        assert_eq!(summary, vec![(30, 1, 1), (20, 2, 2), (10, 3, 2), (40, 4, 4)]);
    }

    #[test]
    fn test_signed_zeros_share_rank() {
        let values = rank_values(vec![(1u32, "a", -0.0), (2, "b", 0.0), (3, "c", -1.0)]);
        let ranks: Vec<u32> = values.iter().map(|v| v.rank).collect();
        assert_eq!(ranks, vec![1, 1, 3]);
    }

    #[test]
    fn test_ranking_type_text_round_trip() {
        for ranking_type in RankingType::ALL {
            assert_eq!(ranking_type.as_str().parse::<RankingType>().unwrap(), ranking_type);
        }
    }

    proptest! {
        #[test]
        fn prop_order_is_dense_and_rank_counts_greater(
            raw in proptest::collection::vec((-5i32..5, 0u8..4), 0..40)
        ) {
            let entries: Vec<(usize, u8, f64)> = raw
                .iter()
                .enumerate()
                .map(|(i, (value, key))| (i, *key, f64::from(*value)))
                .collect();
            let values = rank_values(entries.clone());

            prop_assert_eq!(values.len(), entries.len());
            for (index, value) in values.iter().enumerate() {
                prop_assert_eq!(value.order as usize, index + 1);
                let greater = entries.iter().filter(|(_, _, v)| *v > value.value).count();
                prop_assert_eq!(value.rank as usize, greater + 1);
            }
        }

        #[test]
        fn prop_ranking_is_deterministic(
            raw in proptest::collection::vec((-3i32..3, 0u8..3), 0..30)
        ) {
            let entries: Vec<(usize, u8, f64)> = raw
                .iter()
                .enumerate()
                .map(|(i, (value, key))| (i, *key, f64::from(*value)))
                .collect();
            let mut reversed = entries.clone();
            reversed.reverse();

            prop_assert_eq!(rank_values(entries), rank_values(reversed));
        }
    }
}

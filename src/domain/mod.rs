// Domain model - aggregates, events and repository contracts
//
// Each aggregate has a stable UUID identity and a natural key:
// season <- year, team <- name, affiliation <- (season, team),
// game <- (season, week, unordered team pair), ranking <- (name, season, week).

pub mod affiliation;
pub mod events;
pub mod game;
pub mod ids;
pub mod ranking;
pub mod record;
pub mod repository;
pub mod season;
pub mod team;

pub use affiliation::{Affiliation, Subdivision};
pub use events::*;
pub use game::{Game, GameKey, GameOperation, GameStatus, GameStatusError};
pub use ids::{AffiliationId, GameId, RankingId, SeasonId, TeamId, TeamRecordId};
pub use ranking::{
    rank_values, GameRanking, Ranking, RankingKey, RankingType, RankingValue, TeamRanking,
};
pub use record::{TeamRecord, TeamRecordValue};
pub use repository::{
    resolve_season, AffiliationReader, AggregateReader, GameReader, RankingReader, SeasonReader,
    SeasonRef, TeamReader, TeamRecordReader,
};
pub use season::{Season, SeasonSection};
pub use team::Team;

/// A lookup-table or text value that does not name any enum variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }
}

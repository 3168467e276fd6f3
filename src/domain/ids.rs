// Typed identifiers - one UUID newtype per aggregate kind
//
// A SeasonId never compares equal to a TeamId, even when both wrap the same
// UUID: the compiler keeps the kinds apart.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! aggregate_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Fresh random identity
            pub fn generate() -> Self {
                $name(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                $name(uuid)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.hyphenated().fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map($name)
            }
        }
    };
}

aggregate_id!(
    /// Identity of a Season aggregate
    SeasonId
);
aggregate_id!(
    /// Identity of a Team aggregate
    TeamId
);
aggregate_id!(
    /// Identity of an Affiliation aggregate
    AffiliationId
);
aggregate_id!(
    /// Identity of a Game aggregate
    GameId
);
aggregate_id!(
    /// Identity of a Ranking aggregate (team or game ranking)
    RankingId
);
aggregate_id!(
    /// Identity of a TeamRecord aggregate
    TeamRecordId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = SeasonId::generate();
        let b = SeasonId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_id_text_round_trip() {
        let id = GameId::generate();
        let text = id.to_string();

        assert_eq!(text.len(), 36);
        assert_eq!(text.parse::<GameId>().unwrap(), id);
        assert!("not-a-uuid".parse::<GameId>().is_err());
    }

    #[test]
    fn test_ids_serialize_as_plain_uuid_strings() {
        let id = TeamId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }
}

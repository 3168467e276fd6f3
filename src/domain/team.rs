// Team - identity keyed by school name

use super::events::TeamCreated;
use super::ids::TeamId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
}

impl Team {
    pub fn new(id: TeamId, name: impl Into<String>) -> Self {
        Team {
            id,
            name: name.into(),
        }
    }

    pub(crate) fn created(&self) -> TeamCreated {
        TeamCreated {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

impl From<&TeamCreated> for Team {
    fn from(event: &TeamCreated) -> Self {
        Team::new(event.id, event.name.clone())
    }
}

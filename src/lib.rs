// FBS Rankings - Core Library
// Event-sourced college football seasons plus the ranking services over them

pub mod app;
pub mod bus;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod import;
pub mod logging;
pub mod queries;
pub mod ranking;
pub mod source;
pub mod storage;
pub mod transaction;
pub mod unit_of_work;
pub mod validation;

// Re-export commonly used types
pub use app::Application;
pub use bus::{Command, CommandBus, EventBus, Query, QueryBus};
pub use commands::{
    CalculateRankingsForSeasonCommand, DropStorageCommand, ImportSeasonByYearCommand,
};
pub use config::{Config, StorageConfig};
pub use domain::{
    Event, Game, GameKey, GameStatus, Season, SeasonId, SeasonRef, SeasonSection, Subdivision,
    Team, TeamId,
};
pub use error::{Error, Result};
pub use source::{CsvSource, GameRow, StatisticsSource, TeamRow};
pub use storage::{MemoryStorage, SqliteStorage, Storage};
pub use unit_of_work::UnitOfWork;
pub use validation::{RaiseBehavior, ValidationError, ValidationService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

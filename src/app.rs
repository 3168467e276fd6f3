// 🧩 Application - wires storage, buses, and handlers from a Config
//
// The CLI (and the integration tests) talk to the application only through
// `send` (commands) and `query` (queries).

use crate::bus::{Command, CommandBus, EventBus, Query, QueryBus};
use crate::commands::{register_command_handlers, CommandContext};
use crate::config::{Config, StorageConfig};
use crate::domain::Event;
use crate::error::Result;
use crate::source::{CsvSource, StatisticsSource};
use crate::storage::{memory, sqlite, MemoryStorage, SqliteStorage, Storage};
use crate::validation::ValidationError;
use std::cell::RefCell;
use std::rc::Rc;

pub struct Application {
    storage: Rc<dyn Storage>,
    event_bus: Rc<EventBus>,
    command_bus: CommandBus,
    query_bus: QueryBus,
    findings: Rc<RefCell<Vec<ValidationError>>>,
}

impl Application {
    pub fn new(config: &Config) -> Result<Self> {
        let source = Rc::new(CsvSource::new(&config.source.path));
        Self::with_source(config, source)
    }

    pub fn with_source(config: &Config, source: Rc<dyn StatisticsSource>) -> Result<Self> {
        let query_bus = QueryBus::new();

        let storage: Rc<dyn Storage> = match &config.storage {
            StorageConfig::Memory => {
                let storage = Rc::new(MemoryStorage::new());
                memory::queries::register_query_handlers(&storage, &query_bus)?;
                storage
            }
            StorageConfig::Sqlite { path } => {
                let storage = Rc::new(SqliteStorage::open(path)?);
                sqlite::queries::register_query_handlers(&storage, &query_bus)?;
                storage
            }
        };

        let event_bus = Rc::new(EventBus::new());
        let findings = Rc::new(RefCell::new(Vec::new()));
        {
            let findings = Rc::clone(&findings);
            event_bus.register_handler(move |event| {
                if let Event::ValidationFailed(finding) = event {
                    findings.borrow_mut().push(finding.clone());
                }
                Ok(())
            });
        }

        let command_bus = CommandBus::new();
        let context = CommandContext {
            storage: Rc::clone(&storage),
            event_bus: Rc::clone(&event_bus),
            source,
            raise_behavior: config.validation.raise_behavior,
        };
        register_command_handlers(&context, &command_bus)?;

        tracing::debug!(storage = storage.kind(), "application ready");
        Ok(Application {
            storage,
            event_bus,
            command_bus,
            query_bus,
            findings,
        })
    }

    pub fn storage_kind(&self) -> &'static str {
        self.storage.kind()
    }

    pub fn event_bus(&self) -> &Rc<EventBus> {
        &self.event_bus
    }

    pub fn send<C: Command>(&self, command: C) -> Result<()> {
        self.command_bus.send(command)
    }

    pub fn query<Q: Query>(&self, query: Q) -> Result<Q::Result> {
        self.query_bus.query(query)
    }

    /// Validation findings published since the last call
    pub fn take_findings(&self) -> Vec<ValidationError> {
        std::mem::take(&mut *self.findings.borrow_mut())
    }
}

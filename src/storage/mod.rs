// 🗄️ Storage backends - persistent projection of the event stream
//
// A backend is a set of repository readers plus one write path: `apply`,
// which projects a batch of events all-or-nothing. Nothing else writes to a
// backend. The Unit of Work is the only caller of `apply` outside tests.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use crate::domain::{AggregateReader, Event};
use crate::error::{Error, Result};
use std::cell::Cell;

pub trait Storage: AggregateReader {
    /// Short backend name used in logs and errors ("memory", "sqlite")
    fn kind(&self) -> &'static str;

    /// Project events in order; on any error nothing of the batch is kept
    fn apply(&self, events: &[Event]) -> Result<()>;

    /// Remove every aggregate (and audit row) from the backend
    fn drop_all(&self) -> Result<()>;

    fn write_lock(&self) -> &WriteLock;
}

// ============================================================================
// WRITE LOCK
// ============================================================================

/// At most one open Unit of Work per backend
#[derive(Debug, Default)]
pub struct WriteLock {
    held: Cell<bool>,
}

impl WriteLock {
    pub fn acquire(&self, storage: &'static str) -> Result<()> {
        if self.held.replace(true) {
            return Err(Error::TransactionInProgress { storage });
        }
        Ok(())
    }

    pub fn release(&self) {
        self.held.set(false);
    }

    pub fn is_held(&self) -> bool {
        self.held.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_lock_is_exclusive() {
        let lock = WriteLock::default();
        lock.acquire("memory").unwrap();
        assert!(matches!(
            lock.acquire("memory"),
            Err(Error::TransactionInProgress { storage: "memory" })
        ));

        lock.release();
        assert!(!lock.is_held());
        assert!(lock.acquire("memory").is_ok());
    }
}

// 📦 Unit of Work - one Transaction, one inner bus, one disposable cache
//
// Lifecycle:
//   open      -> takes the backend's write lock
//   (writes)  -> inner bus -> capture handler -> cache + journal
//   commit    -> journal applied to the backend as one batch, then each event
//                republished on the outer bus in original order
//   rollback / close / drop -> journal and cache discarded, backend untouched
//
// A failed commit leaves the Unit of Work open with its journal intact; the
// caller decides whether to retry or roll back.

use crate::bus::EventBus;
use crate::domain::{Event, GameReader};
use crate::error::{Error, Result};
use crate::storage::{MemoryStorage, Storage};
use crate::transaction::Transaction;
use std::cell::RefCell;
use std::rc::Rc;

pub struct UnitOfWork {
    storage: Rc<dyn Storage>,
    event_bus: Rc<EventBus>,
    cache: Rc<MemoryStorage>,
    journal: Rc<RefCell<Vec<Event>>>,
    transaction: Transaction,
}

impl UnitOfWork {
    pub fn open(storage: Rc<dyn Storage>, event_bus: Rc<EventBus>) -> Result<Self> {
        storage.write_lock().acquire(storage.kind())?;

        let cache = Rc::new(MemoryStorage::new());
        let journal = Rc::new(RefCell::new(Vec::new()));
        let inner_bus = Rc::new(EventBus::new());

        {
            let cache = Rc::clone(&cache);
            let store = Rc::clone(&storage);
            let journal = Rc::clone(&journal);
            inner_bus.register_handler(move |event| {
                if let Some(game_id) = event.mutated_game() {
                    if cache.game(game_id)?.is_none() {
                        if let Some(stored) = store.game(game_id)? {
                            cache.seed_game(stored)?;
                        }
                    }
                }
                cache.apply(std::slice::from_ref(event))?;
                journal.borrow_mut().push(event.clone());
                Ok(())
            });
        }

        tracing::debug!(storage = storage.kind(), "opened unit of work");

        let transaction = Transaction::new(Rc::clone(&storage), Rc::clone(&cache), inner_bus);
        Ok(UnitOfWork {
            storage,
            event_bus,
            cache,
            journal,
            transaction,
        })
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn is_open(&self) -> bool {
        self.transaction.is_open()
    }

    /// Events captured since open, in publication order
    pub fn pending_events(&self) -> Vec<Event> {
        self.journal.borrow().clone()
    }

    pub fn commit(&self) -> Result<()> {
        if !self.is_open() {
            return Err(Error::TransactionClosed);
        }

        let events = self.journal.borrow().clone();
        self.storage.apply(&events)?;

        self.discard();
        tracing::info!(
            storage = self.storage.kind(),
            events = events.len(),
            "committed unit of work"
        );

        for event in &events {
            self.event_bus.publish(event)?;
        }
        Ok(())
    }

    pub fn rollback(&self) {
        if self.is_open() {
            let discarded = self.journal.borrow().len();
            self.discard();
            tracing::debug!(
                storage = self.storage.kind(),
                events = discarded,
                "rolled back unit of work"
            );
        }
    }

    pub fn close(self) {
        self.rollback();
    }

    fn discard(&self) {
        self.journal.borrow_mut().clear();
        self.cache.clear();
        self.transaction.close();
        self.storage.write_lock().release();
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        self.rollback();
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        GameKey, SeasonReader, SeasonSection, Subdivision, TeamRecordValue, TeamReader,
        TeamRecordReader,
    };
    use crate::storage::SqliteStorage;
    use chrono::NaiveDate;

    fn backends() -> Vec<Rc<dyn Storage>> {
        vec![
            Rc::new(MemoryStorage::new()),
            Rc::new(SqliteStorage::open_in_memory().unwrap()),
        ]
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, month, day).unwrap()
    }

    #[test]
    fn test_read_your_writes_before_commit() {
        for storage in backends() {
            let uow = UnitOfWork::open(Rc::clone(&storage), Rc::new(EventBus::new())).unwrap();
            let tx = uow.transaction();

            let season = tx.seasons().create(2023).unwrap();
            assert_eq!(tx.seasons().find(2023).unwrap(), Some(season.clone()));
            assert_eq!(storage.season_by_year(2023).unwrap(), None);

            uow.commit().unwrap();
            assert_eq!(storage.season_by_year(2023).unwrap(), Some(season));
        }
    }

    #[test]
    fn test_rollback_and_drop_leave_store_unchanged() {
        for storage in backends() {
            {
                let uow = UnitOfWork::open(Rc::clone(&storage), Rc::new(EventBus::new())).unwrap();
                uow.transaction().teams().create("Tulane").unwrap();
                uow.rollback();
                assert!(!uow.is_open());
            }
            {
                let uow = UnitOfWork::open(Rc::clone(&storage), Rc::new(EventBus::new())).unwrap();
                uow.transaction().teams().create("Tulane").unwrap();
            }
            assert_eq!(storage.team_by_name("Tulane").unwrap(), None);
            assert!(!storage.write_lock().is_held());
        }
    }

    #[test]
    fn test_one_open_unit_of_work_per_store() {
        let storage: Rc<dyn Storage> = Rc::new(MemoryStorage::new());
        let bus = Rc::new(EventBus::new());

        let first = UnitOfWork::open(Rc::clone(&storage), Rc::clone(&bus)).unwrap();
        let err = UnitOfWork::open(Rc::clone(&storage), Rc::clone(&bus))
            .err()
            .unwrap();
        assert!(matches!(err, Error::TransactionInProgress { storage: "memory" }));

        first.close();
        assert!(UnitOfWork::open(storage, bus).is_ok());
    }

    #[test]
    fn test_writes_after_commit_fail() {
        let storage: Rc<dyn Storage> = Rc::new(MemoryStorage::new());
        let uow = UnitOfWork::open(storage, Rc::new(EventBus::new())).unwrap();
        uow.transaction().seasons().create(2010).unwrap();
        uow.commit().unwrap();

        let err = uow.transaction().seasons().create(2011).unwrap_err();
        assert!(matches!(err, Error::TransactionClosed));
        assert!(matches!(uow.commit(), Err(Error::TransactionClosed)));
    }

    #[test]
    fn test_commit_republishes_in_order() {
        let storage: Rc<dyn Storage> = Rc::new(MemoryStorage::new());
        let outer = Rc::new(EventBus::new());
        let names = Rc::new(RefCell::new(Vec::new()));

        let seen = Rc::clone(&names);
        outer.register_handler(move |event| {
            seen.borrow_mut().push(event.name());
            Ok(())
        });

        let uow = UnitOfWork::open(storage, Rc::clone(&outer)).unwrap();
        let tx = uow.transaction();
        let season = tx.seasons().create(2018).unwrap();
        let team = tx.teams().create("UCF").unwrap();
        tx.affiliations()
            .create(season.id, team.id, Subdivision::Fbs)
            .unwrap();

        assert!(names.borrow().is_empty());
        uow.commit().unwrap();
        assert_eq!(
            *names.borrow(),
            vec!["SeasonCreated", "TeamCreated", "AffiliationCreated"]
        );
    }

    #[test]
    fn test_rescheduled_game_found_by_new_key_only() {
        for storage in backends() {
            let bus = Rc::new(EventBus::new());
            let (season, home, away, mut game) = {
                let uow = UnitOfWork::open(Rc::clone(&storage), Rc::clone(&bus)).unwrap();
                let tx = uow.transaction();
                let season = tx.seasons().create(2023).unwrap();
                let home = tx.teams().create("Utah").unwrap();
                let away = tx.teams().create("Utah State").unwrap();
                let game = tx
                    .games()
                    .create(
                        season.id,
                        3,
                        date(9, 16),
                        SeasonSection::RegularSeason,
                        home.id,
                        away.id,
                        "",
                    )
                    .unwrap();
                uow.commit().unwrap();
                (season, home, away, game)
            };

            let uow = UnitOfWork::open(Rc::clone(&storage), Rc::clone(&bus)).unwrap();
            let tx = uow.transaction();
            tx.games().reschedule(&mut game, 5, date(9, 30)).unwrap();
            assert_eq!(game.week, 5);

            let week3 = GameKey::new(season.id, 3, away.id, home.id);
            let week5 = GameKey::new(season.id, 5, home.id, away.id);
            assert_eq!(tx.games().find(&week3).unwrap(), None);
            assert_eq!(tx.games().find(&week5).unwrap(), Some(game.clone()));
            assert_eq!(tx.games().for_season(season.id).unwrap(), vec![game.clone()]);

            uow.commit().unwrap();
            assert_eq!(storage.game_by_key(&week3).unwrap(), None);
            assert_eq!(storage.game_by_key(&week5).unwrap(), Some(game));
        }
    }

    #[test]
    fn test_terminal_game_rejects_mutation() {
        let storage: Rc<dyn Storage> = Rc::new(MemoryStorage::new());
        let uow = UnitOfWork::open(storage, Rc::new(EventBus::new())).unwrap();
        let tx = uow.transaction();
        let season = tx.seasons().create(2023).unwrap();
        let home = tx.teams().create("Army").unwrap();
        let away = tx.teams().create("Navy").unwrap();
        let mut game = tx
            .games()
            .create(
                season.id,
                15,
                date(12, 9),
                SeasonSection::RegularSeason,
                home.id,
                away.id,
                "",
            )
            .unwrap();

        tx.games().complete(&mut game, 17, 11).unwrap();
        let before = uow.pending_events().len();

        let err = tx.games().cancel(&mut game).unwrap_err();
        assert!(matches!(err, Error::GameStatus(_)));
        assert_eq!(uow.pending_events().len(), before);

        // Notes may change in any state
        tx.games().update_notes(&mut game, "Gillette Stadium").unwrap();
        assert_eq!(tx.games().get(game.id).unwrap().unwrap().notes, "Gillette Stadium");
    }

    #[test]
    fn test_duplicate_create_rejected_across_cache_and_store() {
        for storage in backends() {
            let bus = Rc::new(EventBus::new());
            {
                let uow = UnitOfWork::open(Rc::clone(&storage), Rc::clone(&bus)).unwrap();
                uow.transaction().teams().create("Rice").unwrap();
                uow.commit().unwrap();
            }

            let uow = UnitOfWork::open(Rc::clone(&storage), Rc::clone(&bus)).unwrap();
            let tx = uow.transaction();
            assert!(matches!(
                tx.teams().create("Rice"),
                Err(Error::Duplicate { aggregate: "team", .. })
            ));
            tx.teams().create("SMU").unwrap();
            assert!(matches!(
                tx.teams().create("SMU"),
                Err(Error::Duplicate { .. })
            ));
        }
    }

    #[test]
    fn test_superseded_record_hidden_inside_transaction() {
        let storage: Rc<dyn Storage> = Rc::new(MemoryStorage::new());
        let bus = Rc::new(EventBus::new());
        let (season, old) = {
            let uow = UnitOfWork::open(Rc::clone(&storage), Rc::clone(&bus)).unwrap();
            let tx = uow.transaction();
            let season = tx.seasons().create(2001).unwrap();
            let old = tx.team_records().create(season.id, None, Vec::new()).unwrap();
            uow.commit().unwrap();
            (season, old)
        };

        let uow = UnitOfWork::open(Rc::clone(&storage), bus).unwrap();
        let tx = uow.transaction();
        let team = tx.teams().create("Miami").unwrap();
        let new = tx
            .team_records()
            .create(
                season.id,
                None,
                vec![TeamRecordValue {
                    team_id: team.id,
                    wins: 12,
                    losses: 0,
                }],
            )
            .unwrap();

        assert_eq!(tx.team_records().get(old.id).unwrap(), None);
        assert_eq!(tx.team_records().find(season.id, None).unwrap(), Some(new));
        assert!(storage.team_record(old.id).unwrap().is_some());
    }

    #[test]
    fn test_failed_commit_stays_open() {
        let storage: Rc<dyn Storage> = Rc::new(MemoryStorage::new());
        let bus = Rc::new(EventBus::new());
        let uow = UnitOfWork::open(Rc::clone(&storage), bus).unwrap();
        uow.transaction().seasons().create(1999).unwrap();

        // Something outside the unit of work claims the same year first
        let rogue = crate::domain::Season::new(crate::domain::SeasonId::generate(), 1999);
        storage
            .apply(&[Event::SeasonCreated(rogue.created())])
            .unwrap();

        assert!(matches!(uow.commit(), Err(Error::Duplicate { .. })));
        assert!(uow.is_open());
        assert_eq!(uow.pending_events().len(), 1);

        uow.rollback();
        assert!(!uow.is_open());
        assert_eq!(storage.seasons().unwrap(), vec![rogue]);
    }
}

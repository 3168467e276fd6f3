// 🚌 In-process buses - synchronous, single-threaded dispatch
//
// EventBus: fan-out to every registered handler, in registration order. The
//           first handler error stops dispatch and is returned to the
//           publisher.
// CommandBus / QueryBus: exactly one handler per message type, keyed by the
//           message's static type. Sending an unregistered type is a
//           configuration error.
//
// Handler lists are snapshotted before dispatch, so a handler may publish or
// send further messages on the same bus.

use crate::domain::Event;
use crate::error::{Error, Result};
use std::any::{type_name, Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

// ============================================================================
// EVENT BUS
// ============================================================================

pub type EventHandler = Rc<dyn Fn(&Event) -> Result<()>>;

/// Handle returned on registration; needed to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct EventBus {
    handlers: RefCell<Vec<(SubscriptionId, EventHandler)>>,
    next_id: Cell<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_handler<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> Result<()> + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut().push((id, Rc::new(handler)));
        id
    }

    /// Returns false when the subscription was not registered
    pub fn unregister_handler(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn publish(&self, event: &Event) -> Result<()> {
        let handlers: Vec<EventHandler> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();

        tracing::debug!(event = event.name(), handlers = handlers.len(), "publishing event");

        for handler in handlers {
            handler(event)?;
        }

        Ok(())
    }
}

// ============================================================================
// COMMAND BUS
// ============================================================================

/// Marker for command messages
pub trait Command: 'static {}

type CommandHandler<C> = Rc<dyn Fn(&C) -> Result<()>>;

#[derive(Default)]
pub struct CommandBus {
    handlers: RefCell<HashMap<TypeId, Box<dyn Any>>>,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_handler<C, F>(&self, handler: F) -> Result<()>
    where
        C: Command,
        F: Fn(&C) -> Result<()> + 'static,
    {
        let mut handlers = self.handlers.borrow_mut();
        if handlers.contains_key(&TypeId::of::<C>()) {
            return Err(Error::HandlerAlreadyRegistered {
                message: type_name::<C>(),
            });
        }

        let handler: CommandHandler<C> = Rc::new(handler);
        handlers.insert(TypeId::of::<C>(), Box::new(handler));
        Ok(())
    }

    pub fn unregister_handler<C: Command>(&self) -> bool {
        self.handlers
            .borrow_mut()
            .remove(&TypeId::of::<C>())
            .is_some()
    }

    pub fn send<C: Command>(&self, command: C) -> Result<()> {
        let handler = self
            .handlers
            .borrow()
            .get(&TypeId::of::<C>())
            .and_then(|handler| handler.downcast_ref::<CommandHandler<C>>())
            .cloned()
            .ok_or(Error::NoCommandHandler {
                command: type_name::<C>(),
            })?;

        handler(&command)
    }
}

// ============================================================================
// QUERY BUS
// ============================================================================

/// A query message and the one result type it answers with
pub trait Query: 'static {
    type Result: 'static;
}

type QueryHandler<Q> = Rc<dyn Fn(&Q) -> Result<<Q as Query>::Result>>;

#[derive(Default)]
pub struct QueryBus {
    handlers: RefCell<HashMap<TypeId, Box<dyn Any>>>,
}

impl QueryBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_handler<Q, F>(&self, handler: F) -> Result<()>
    where
        Q: Query,
        F: Fn(&Q) -> Result<Q::Result> + 'static,
    {
        let mut handlers = self.handlers.borrow_mut();
        if handlers.contains_key(&TypeId::of::<Q>()) {
            return Err(Error::HandlerAlreadyRegistered {
                message: type_name::<Q>(),
            });
        }

        let handler: QueryHandler<Q> = Rc::new(handler);
        handlers.insert(TypeId::of::<Q>(), Box::new(handler));
        Ok(())
    }

    pub fn unregister_handler<Q: Query>(&self) -> bool {
        self.handlers
            .borrow_mut()
            .remove(&TypeId::of::<Q>())
            .is_some()
    }

    pub fn query<Q: Query>(&self, query: Q) -> Result<Q::Result> {
        let handler = self
            .handlers
            .borrow()
            .get(&TypeId::of::<Q>())
            .and_then(|handler| handler.downcast_ref::<QueryHandler<Q>>())
            .cloned()
            .ok_or(Error::NoQueryHandler {
                query: type_name::<Q>(),
            })?;

        handler(&query)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SeasonCreated, SeasonId};

    fn season_created(year: u32) -> Event {
        Event::SeasonCreated(SeasonCreated {
            id: SeasonId::generate(),
            year,
        })
    }

    #[test]
    fn test_events_fan_out_in_registration_order() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let seen = Rc::clone(&seen);
            bus.register_handler(move |_| {
                seen.borrow_mut().push(label);
                Ok(())
            });
        }

        bus.publish(&season_created(2020)).unwrap();
        assert_eq!(*seen.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_handler_error_propagates_and_stops_dispatch() {
        let bus = EventBus::new();
        let reached = Rc::new(Cell::new(false));

        bus.register_handler(|_| Err(Error::config("boom")));
        let flag = Rc::clone(&reached);
        bus.register_handler(move |_| {
            flag.set(true);
            Ok(())
        });

        let err = bus.publish(&season_created(2020)).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(!reached.get());
    }

    #[test]
    fn test_unregister_stops_delivery() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));

        let counter = Rc::clone(&count);
        let id = bus.register_handler(move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        bus.publish(&season_created(2020)).unwrap();
        assert!(bus.unregister_handler(id));
        assert!(!bus.unregister_handler(id));
        bus.publish(&season_created(2021)).unwrap();

        assert_eq!(count.get(), 1);
        assert_eq!(bus.handler_count(), 0);
    }

    #[test]
    fn test_handler_may_publish_on_same_bus() {
        let bus = Rc::new(EventBus::new());
        let years = Rc::new(RefCell::new(Vec::new()));

        let inner_bus = Rc::clone(&bus);
        let seen = Rc::clone(&years);
        bus.register_handler(move |event| {
            if let Event::SeasonCreated(created) = event {
                seen.borrow_mut().push(created.year);
                if created.year == 2020 {
                    inner_bus.publish(&season_created(2021))?;
                }
            }
            Ok(())
        });

        bus.publish(&season_created(2020)).unwrap();
        assert_eq!(*years.borrow(), vec![2020, 2021]);
    }

    struct Ping(u32);
    impl Command for Ping {}

    struct Double(u32);
    impl Query for Double {
        type Result = u32;
    }

    #[test]
    fn test_command_routes_to_single_handler() {
        let bus = CommandBus::new();
        let received = Rc::new(Cell::new(0));

        let sink = Rc::clone(&received);
        bus.register_handler(move |ping: &Ping| {
            sink.set(ping.0);
            Ok(())
        })
        .unwrap();

        bus.send(Ping(7)).unwrap();
        assert_eq!(received.get(), 7);

        let duplicate = bus.register_handler(|_: &Ping| Ok(()));
        assert!(matches!(duplicate, Err(Error::HandlerAlreadyRegistered { .. })));
    }

    #[test]
    fn test_unregistered_command_is_configuration_error() {
        let bus = CommandBus::new();
        let err = bus.send(Ping(1)).unwrap_err();
        assert!(matches!(err, Error::NoCommandHandler { .. }));

        bus.register_handler(|_: &Ping| Ok(())).unwrap();
        assert!(bus.unregister_handler::<Ping>());
        assert!(bus.send(Ping(1)).is_err());
    }

    #[test]
    fn test_query_returns_typed_result() {
        let bus = QueryBus::new();
        assert!(matches!(bus.query(Double(2)), Err(Error::NoQueryHandler { .. })));

        bus.register_handler(|query: &Double| Ok(query.0 * 2)).unwrap();
        assert_eq!(bus.query(Double(21)).unwrap(), 42);
    }
}

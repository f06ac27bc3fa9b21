//! Update bus owned by each store.
//!
//! Listeners are called synchronously, in mutation order, on the thread that
//! performed the mutation. Channel subscribers receive the same events through
//! a bounded buffer and never slow the writer down. A listener that panics is
//! logged and counted; the remaining listeners and subscribers still run.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crossbeam_channel::{bounded, Sender, TrySendError};
use tracing::{trace, warn};

use super::events::{ListenerId, SubscriptionId, UpdateEvent};
use super::stream::UpdateStream;

type Listener = Arc<dyn Fn(&UpdateEvent) + Send + Sync>;

thread_local! {
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

/// True while this thread is running update listeners.
pub(crate) fn is_dispatching() -> bool {
    DISPATCHING.with(Cell::get)
}

struct DispatchGuard {
    previous: bool,
}

impl DispatchGuard {
    fn enter() -> Self {
        Self {
            previous: DISPATCHING.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DISPATCHING.with(|flag| flag.set(self.previous));
    }
}

#[derive(Debug, Default)]
pub(crate) struct SubscriberTable {
    senders: Mutex<HashMap<SubscriptionId, Sender<UpdateEvent>>>,
}

impl SubscriberTable {
    pub(crate) fn remove(&self, id: SubscriptionId) {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner).remove(&id);
    }

    fn len(&self) -> usize {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Listener registry and channel fan-out for update events.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use tempora::UpdateBus;
///
/// let bus = UpdateBus::new(16);
/// let seen = Arc::new(Mutex::new(0));
/// let counter = Arc::clone(&seen);
/// let id = bus.attach(move |_event| *counter.lock().unwrap() += 1);
/// assert_eq!(bus.listener_count(), 1);
/// assert!(bus.detach(id));
/// assert!(!bus.detach(id));
/// ```
pub struct UpdateBus {
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    subscribers: Arc<SubscriberTable>,
    stream_capacity: usize,
    dropped_events: AtomicU64,
    listener_panics: AtomicU64,
}

impl UpdateBus {
    /// Create a bus whose channel subscribers buffer up to `stream_capacity` events.
    #[must_use]
    pub fn new(stream_capacity: usize) -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            subscribers: Arc::new(SubscriberTable::default()),
            stream_capacity: stream_capacity.max(1),
            dropped_events: AtomicU64::new(0),
            listener_panics: AtomicU64::new(0),
        }
    }

    /// Register a listener called for every subsequent event.
    ///
    /// The listener runs while the store's mutation lock is held: it may read
    /// from the store, but a write fails with `ReentrantMutation`.
    pub fn attach<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&UpdateEvent) + Send + Sync + 'static,
    {
        let id = ListenerId::new();
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not attached.
    pub fn detach(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Open a bounded channel receiving every subsequent event.
    pub fn subscribe(&self) -> UpdateStream {
        let id = SubscriptionId::new();
        let (tx, rx) = bounded(self.stream_capacity);
        self.subscribers
            .senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        UpdateStream::new(id, rx, Arc::downgrade(&self.subscribers))
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Events not delivered to a subscriber because its buffer was full.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Listener calls that panicked.
    #[must_use]
    pub fn listener_panics(&self) -> u64 {
        self.listener_panics.load(Ordering::Relaxed)
    }

    /// Deliver `events` in order to every listener, then to every subscriber.
    pub(crate) fn publish(&self, events: &[UpdateEvent]) {
        if events.is_empty() {
            return;
        }
        let listeners: Vec<(ListenerId, Listener)> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        {
            let _guard = DispatchGuard::enter();
            for event in events {
                trace!(kind = ?event.kind, container = %event.container, statement = %event.statement, "update event");
                for (id, listener) in &listeners {
                    if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                        self.listener_panics.fetch_add(1, Ordering::Relaxed);
                        warn!(listener = ?id, statement = %event.statement, "update listener panicked");
                    }
                }
            }
        }

        let mut senders = self.subscribers.senders.lock().unwrap_or_else(PoisonError::into_inner);
        let mut closed = Vec::new();
        for event in events {
            for (id, tx) in senders.iter() {
                match tx.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        self.dropped_events.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(TrySendError::Disconnected(_)) => closed.push(*id),
                }
            }
        }
        for id in closed {
            senders.remove(&id);
        }
    }
}

impl fmt::Debug for UpdateBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateBus")
            .field("listeners", &self.listener_count())
            .field("subscribers", &self.subscriber_count())
            .field("stream_capacity", &self.stream_capacity)
            .field("dropped_events", &self.dropped_events())
            .field("listener_panics", &self.listener_panics())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::statement::{Statement, Term};
    use crate::storage::ContainerId;

    fn event(n: i64) -> UpdateEvent {
        UpdateEvent::insert(
            None,
            Statement::new("http://a", "http://p", Term::integer(n)),
            ContainerId::new("global"),
        )
    }

    #[test]
    fn listeners_see_events_in_order() {
        let bus = UpdateBus::new(8);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.attach(move |e| sink.lock().unwrap().push(e.statement.object.clone()));

        bus.publish(&[event(1), event(2), event(3)]);
        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![Term::integer(1), Term::integer(2), Term::integer(3)]);
    }

    #[test]
    fn dispatch_flag_is_set_only_inside_listeners() {
        let bus = UpdateBus::new(8);
        let inside = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&inside);
        bus.attach(move |_| *flag.lock().unwrap() = is_dispatching());

        assert!(!is_dispatching());
        bus.publish(&[event(1)]);
        assert!(*inside.lock().unwrap());
        assert!(!is_dispatching());
    }

    #[test]
    fn panicking_listener_does_not_stop_delivery() {
        let bus = UpdateBus::new(8);
        let seen = Arc::new(Mutex::new(0));
        bus.attach(|e| assert!(e.statement.object != Term::integer(2), "listener rejects 2"));
        let counter = Arc::clone(&seen);
        bus.attach(move |_| *counter.lock().unwrap() += 1);
        let stream = bus.subscribe();

        bus.publish(&[event(1), event(2), event(3)]);
        assert_eq!(*seen.lock().unwrap(), 3);
        assert_eq!(bus.listener_panics(), 1);
        assert_eq!(stream.drain().len(), 3);
        assert!(!is_dispatching());
    }

    #[test]
    fn full_subscriber_counts_drops() {
        let bus = UpdateBus::new(2);
        let stream = bus.subscribe();
        bus.publish(&[event(1), event(2), event(3)]);
        assert_eq!(bus.dropped_events(), 1);
        assert_eq!(stream.drain().len(), 2);
        assert!(stream.try_recv().is_none());
    }

    #[test]
    fn dropped_stream_unregisters() {
        let bus = UpdateBus::new(2);
        let stream = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(stream);
        assert_eq!(bus.subscriber_count(), 0);

        let stream = bus.subscribe();
        stream.unsubscribe();
        stream.unsubscribe();
        bus.publish(&[event(1)]);
        assert!(stream.try_recv().is_none());
        assert_eq!(bus.dropped_events(), 0);
    }
}

//! Channel subscriber handle: a bounded receiver that unregisters itself
//! from the bus when dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use super::bus::SubscriberTable;
use super::events::{SubscriptionId, UpdateEvent};

/// A channel subscription to a store's update events.
///
/// Events are delivered with a non-blocking send; when the buffer is full
/// the event is dropped and counted on the bus. Dropping this stream
/// unregisters it.
#[derive(Debug)]
pub struct UpdateStream {
    subscription_id: SubscriptionId,
    rx: Receiver<UpdateEvent>,
    table: Weak<SubscriberTable>,
    unregistered: AtomicBool,
}

impl UpdateStream {
    pub(crate) fn new(subscription_id: SubscriptionId, rx: Receiver<UpdateEvent>, table: Weak<SubscriberTable>) -> Self {
        Self {
            subscription_id,
            rx,
            table,
            unregistered: AtomicBool::new(false),
        }
    }

    /// The subscription id backing this stream.
    #[must_use]
    pub const fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    /// Stop receiving new events. Idempotent; already buffered events can
    /// still be drained.
    pub fn unsubscribe(&self) {
        if self.unregistered.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(table) = self.table.upgrade() {
            table.remove(self.subscription_id);
        }
    }

    /// Next buffered event, without blocking.
    #[must_use]
    pub fn try_recv(&self) -> Option<UpdateEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Next event, waiting up to `timeout`. `None` on timeout or once the
    /// store is gone and the buffer is empty.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<UpdateEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Every currently buffered event, in delivery order.
    #[must_use]
    pub fn drain(&self) -> Vec<UpdateEvent> {
        self.rx.try_iter().collect()
    }
}

impl Drop for UpdateStream {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

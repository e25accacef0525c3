//! # Event bus for broadcasting lifecycle events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from many sources (procedures, evaluator,
//! retry drivers, the queue itself).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                   Subscriber (one per queue):
//!   Procedure 1 ──┐
//!   Procedure 2 ──┼──────► Bus ───────► subscriber_listener ────► SubscriberSet
//!   Retry       ──┤  (broadcast chan)     (in ProcedureQueue)
//!   Queue       ──┘
//! ```
//!
//! Publishing never waits. The channel keeps the last `capacity` events;
//! a receiver that falls further behind gets `RecvError::Lagged(n)` and
//! resumes from the oldest retained event. Events published while nobody
//! is subscribed are gone.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for lifecycle events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

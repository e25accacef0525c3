//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by a queue, its procedures,
//! the condition evaluator, retry drivers and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `ProcedureQueue` (add/dispatch/shutdown), `Procedure`
//!   (start/cancel/finish via its host queue), condition evaluation, `Retry`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the queue's subscriber listener (fans out to
//!   `SubscriberSet`) and anything obtained from `ProcedureQueue::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

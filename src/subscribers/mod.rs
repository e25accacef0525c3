//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! fan-out used by every [`ProcedureQueue`](crate::ProcedureQueue) to deliver
//! lifecycle events broadcast through its [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Procedure / Retry / Queue ── publish(Event) ──► Bus ──► subscriber_listener
//!                                                               │
//!                                                        SubscriberSet::emit
//!                                                   ┌───────────┼───────────┐
//!                                                   ▼           ▼           ▼
//!                                               LogWriter    Metrics      Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use procvisor::{Subscribe, Event, EventKind};
//! use async_trait::async_trait;
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.is_failure() {
//!             // increment failure counter
//!         }
//!     }
//!     fn name(&self) -> &'static str { "failure-counter" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

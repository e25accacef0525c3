//! # Lifecycle events emitted by queues, procedures and retry drivers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Procedure lifecycle**: added, conditions evaluated, starting, produced,
//!   cancelled, finished
//! - **Scheduling**: exclusivity registration, retry decisions
//! - **Subscriber health**: overflow and panics inside subscribers
//! - **Shutdown**: queue shutdown and grace outcome
//!
//! Subscribers run independently, so delivery order across them is not
//! guaranteed. `seq` is process-wide and strictly increasing; sort by it to
//! reconstruct the publication order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use procvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RetryScheduled)
//!     .with_procedure("upload #3")
//!     .with_attempt(2)
//!     .with_delay(Duration::from_millis(250));
//!
//! assert_eq!(ev.kind, EventKind::RetryScheduled);
//! assert_eq!(ev.procedure.as_deref(), Some("upload #3"));
//! assert_eq!(ev.delay_ms, Some(250));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `procedure` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `procedure` (subscriber name), `reason` ("full" / "closed").
    SubscriberOverflow,

    // === Procedure lifecycle ===
    /// Procedure was added to a queue (`Initialized → Pending`).
    ///
    /// Sets: `procedure`, `id`.
    ProcedureAdded,

    /// Condition evaluation finished (`EvaluatingConditions → Ready`).
    ///
    /// Sets: `procedure`, `id`, `errors` (number of errors after evaluation).
    ConditionsEvaluated,

    /// Procedure entered `Executing`; `execute` is about to run.
    ///
    /// Sets: `procedure`, `id`.
    ProcedureStarting,

    /// A running procedure produced new work.
    ///
    /// Sets: `procedure` (producer), `id` (producer), `reason` (produced procedure).
    ProcedureProduced,

    /// Procedure was cancelled.
    ///
    /// Sets: `procedure`, `id`, `errors`.
    ProcedureCancelled,

    /// Procedure reached `Finished`.
    ///
    /// Sets: `procedure`, `id`, `errors`, `reason` (error labels, if any).
    ProcedureFinished,

    // === Scheduling ===
    /// Procedure registered in a mutual-exclusion category.
    ///
    /// Sets: `procedure`, `id`, `category`, `reason` (previous procedure, if any).
    ExclusivityRegistered,

    /// Retry driver scheduled another attempt.
    ///
    /// Sets: `procedure` (driver), `attempt` (failed attempt), `delay_ms`, `errors`.
    RetryScheduled,

    /// Retry driver stopped producing attempts after a failure.
    ///
    /// Sets: `procedure` (driver), `attempt` (last attempt), `errors`.
    RetryExhausted,

    // === Shutdown ===
    /// Queue shutdown requested.
    ShutdownRequested,

    /// All procedures finished within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some procedures did not finish in time.
    GraceExceeded,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Display identity of the procedure (`"name #id"`), if applicable.
    pub procedure: Option<Arc<str>>,
    /// Numeric procedure id, if applicable.
    pub id: Option<u64>,
    /// Mutual-exclusion category, if applicable.
    pub category: Option<Arc<str>>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Delay before the next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Number of errors carried at event time.
    pub errors: Option<u32>,
    /// Human-readable reason (error labels, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            procedure: None,
            id: None,
            category: None,
            attempt: None,
            delay_ms: None,
            errors: None,
            reason: None,
        }
    }

    /// Attaches a procedure display name.
    #[inline]
    pub fn with_procedure(mut self, procedure: impl Into<Arc<str>>) -> Self {
        self.procedure = Some(procedure.into());
        self
    }

    /// Attaches a numeric procedure id.
    #[inline]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Attaches a mutual-exclusion category.
    #[inline]
    pub fn with_category(mut self, category: impl Into<Arc<str>>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches an error count.
    #[inline]
    pub fn with_errors(mut self, n: usize) -> Self {
        self.errors = Some(n.min(u32::MAX as usize) as u32);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_procedure(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_procedure(subscriber)
            .with_reason(info)
    }

    /// True for events describing a procedure that finished with errors.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self.kind, EventKind::ProcedureFinished) && self.errors.unwrap_or(0) > 0
    }
}

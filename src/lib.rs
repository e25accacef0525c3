//! # procvisor
//!
//! **Procvisor** is a cooperative procedure scheduler for tokio.
//!
//! A [`Procedure`] is a unit of deferred, observable, cancellable work. It
//! becomes eligible for execution only after its dependencies have finished
//! and its asynchronous preconditions ([`Condition`]s) hold. Procedures can
//! be composed into dependency graphs, made mutually exclusive by category,
//! and retried on failure with configurable backoff.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Procedure   │   │  Procedure   │   │ RetryProc.   │
//!     │ (+conditions)│◄──│ (depends on) │   │ (produces    │
//!     └──────┬───────┘   └──────┬───────┘   │  attempts)   │
//!            ▼                  ▼           └──────┬───────┘
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ProcedureQueue                                                   │
//! │  - waiting list, polled on add / evaluation / cancel / finish     │
//! │  - optional semaphore (QueueConfig::max_concurrent)               │
//! │  - Bus (broadcast events) ──► SubscriberSet (per-sub queues)      │
//! └──────┬──────────────────────────────┬─────────────────────────────┘
//!        │ Pending + deps finished       │ Ready
//!        ▼                               ▼
//! ┌──────────────────────┐      ┌─────────────────────────────┐
//! │ condition evaluator  │      │ Procedure::run              │
//! │ - exclusivity        │      │ - on_start observers        │
//! │   registration  ─────┼──►   │ - Work::execute(Context)    │
//! │ - join all conditions│      │ - finish ─► on_finish       │
//! └──────────┬───────────┘      └──────────────┬──────────────┘
//!            ▼                                 ▼
//! ┌──────────────────────┐       dependents re-polled, done signal,
//! │ ExclusivityManager   │       ProcedureFinished event
//! │ category ─► [A, B, C]│
//! └──────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Initialized ─► Pending ─► EvaluatingConditions ─► Ready ─► Executing ─► Finishing ─► Finished
//!                   │                                  │                      ▲
//!                   └──────────── cancelled ───────────┴──────────────────────┘
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                                  |
//! |-------------------|-----------------------------------------------------------------|-----------------------------------------------------|
//! | **Procedures**    | Units of work with dependencies, observers and cancellation.    | [`Procedure`], [`Work`], [`Context`], [`ProcedureFn`] |
//! | **Conditions**    | Async preconditions, combinators and built-ins.                 | [`Condition`], [`ConditionResult`], [`ConditionExt`] |
//! | **Exclusivity**   | At most one procedure per category at a time, FIFO.             | [`ExclusivityManager`], [`MutuallyExclusive`]       |
//! | **Retry**         | Attempt factories, backoff and a decision handler.              | [`Retry`], [`RetryProcedure`], [`Backoff`]          |
//! | **Scheduling**    | Queue with concurrency limit, intent priority and shutdown.     | [`ProcedureQueue`], [`QueueConfig`]                 |
//! | **Observability** | Per-procedure observers and queue-wide event subscribers.       | [`Observer`], [`Subscribe`], [`Event`]              |
//! | **Errors**        | Typed errors for procedures and the queue runtime.              | [`ProcedureError`], [`RuntimeError`]                |
//!
//! ## Optional features
//! - `logging`: exports a [`LogWriter`] subscriber that renders events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use procvisor::{
//!     Context, ExclusivityManager, MutuallyExclusive, Procedure, ProcedureError,
//!     ProcedureQueue, QueueConfig,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let queue = ProcedureQueue::builder(QueueConfig::default())
//!         .with_exclusivity(Arc::new(ExclusivityManager::new()))
//!         .build();
//!
//!     let uploads: Vec<Procedure> = (0..3)
//!         .map(|i| {
//!             let p = Procedure::from_fn(format!("upload-{i}"), |ctx: Context| async move {
//!                 if ctx.is_cancelled() {
//!                     return Ok(());
//!                 }
//!                 Ok::<_, ProcedureError>(())
//!             });
//!             p.add_condition(MutuallyExclusive::named("network"));
//!             p
//!         })
//!         .collect();
//!
//!     queue.add_all(uploads.iter().cloned())?;
//!     queue.wait_until_idle().await;
//!     assert!(uploads.iter().all(|p| p.is_finished() && !p.failed()));
//!     Ok(())
//! }
//! ```

mod conditions;
mod error;
mod events;
mod exclusivity;
mod observers;
mod policies;
mod procedure;
mod procedures;
mod queue;
mod retry;
mod subscribers;
mod sync;

// ---- Public re-exports ----

pub use conditions::{
    BlockCondition, Condition, ConditionExt, ConditionResult, FalseCondition, NegatedCondition,
    NoFailedDependencies, SilentCondition, TrueCondition, WithDependency,
};
pub use error::{ProcedureError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use exclusivity::{ExclusivityManager, MutuallyExclusive};
pub use observers::{BlockObserver, Observer, TimeoutObserver};
pub use policies::{Backoff, JitterPolicy};
pub use procedure::{
    Context, Procedure, ProcedureFn, ProcedureId, State, UserIntent, WeakProcedure, Work, chain,
    max_user_intent,
};
pub use procedures::{Delay, DelayProcedure, Group, GroupProcedure};
pub use queue::{ProcedureQueue, QueueBuilder, QueueConfig};
pub use retry::{Attempt, DEFAULT_MAX_COUNT, Retry, RetryInfo, RetryProcedure, RetryState};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

//! # Procedure queue.
//!
//! [`ProcedureQueue`] accepts procedures, re-polls their readiness whenever
//! something they wait for changes, and dispatches ready ones onto the tokio
//! runtime, highest [`UserIntent`](crate::UserIntent) first.
//!
//! ## Architecture
//! ```text
//! add(p) ─► will_enqueue (Initialized → Pending) ─► wire condition predecessors
//!        ─► install QueueObserver (+ TimeoutObserver) ─► waiting ─► poll
//!
//! poll ─► is_ready? ─► spawn ─► [permit | cancelled] ─► Procedure::run
//!             │
//!             └─ Pending + deps finished ─► condition evaluation (spawned) ─► poll
//!
//! Procedure::finish ─► ProcedureFinished event ─► outstanding -= 1
//!                   └► dependents' queues poll
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use procvisor::{Context, Procedure, ProcedureError, ProcedureQueue, QueueConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let queue = ProcedureQueue::builder(QueueConfig {
//!         max_concurrent: 2,
//!         grace: Duration::from_secs(5),
//!         ..QueueConfig::default()
//!     })
//!     .build();
//!
//!     let ticker = Procedure::from_fn("ticker", |ctx: Context| async move {
//!         while !ctx.is_cancelled() {
//!             tokio::time::sleep(Duration::from_millis(10)).await;
//!         }
//!         Ok::<_, ProcedureError>(())
//!     });
//!     queue.add(ticker.clone())?;
//!
//!     queue.shutdown().await?;
//!     assert!(ticker.is_finished());
//!     Ok(())
//! }
//! ```

mod builder;
mod config;
mod observer;
mod shared;

pub use builder::QueueBuilder;
pub use config::QueueConfig;

pub(crate) use shared::Shared;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::RuntimeError;
use crate::events::{Event, EventKind};
use crate::exclusivity::ExclusivityManager;
use crate::procedure::Procedure;

/// Schedules procedures onto the tokio runtime. Cheap to clone.
///
/// Dropping the last handle cancels and finishes the procedures the queue
/// has not dispatched yet, so they release their exclusivity categories.
/// Procedures already dispatched run to completion.
#[derive(Clone)]
pub struct ProcedureQueue {
    shared: Arc<Shared>,
}

impl ProcedureQueue {
    /// Queue with [`QueueConfig::default`] on the current runtime.
    ///
    /// # Panics
    /// If called outside a tokio runtime.
    pub fn new() -> Self {
        QueueBuilder::new(QueueConfig::default()).build()
    }

    /// Returns a builder for a configured queue.
    pub fn builder(cfg: QueueConfig) -> QueueBuilder {
        QueueBuilder::new(cfg)
    }

    /// Enqueues a procedure.
    ///
    /// Condition predecessors that are still `Initialized` are enqueued too.
    ///
    /// # Errors
    /// [`RuntimeError::AlreadyEnqueued`] if the procedure is not `Initialized`.
    pub fn add(&self, procedure: Procedure) -> Result<(), RuntimeError> {
        self.shared.add(procedure)
    }

    /// Enqueues every procedure, stopping at the first error.
    pub fn add_all(
        &self,
        procedures: impl IntoIterator<Item = Procedure>,
    ) -> Result<(), RuntimeError> {
        for procedure in procedures {
            self.add(procedure)?;
        }
        Ok(())
    }

    /// Number of enqueued procedures that have not finished.
    pub fn len(&self) -> usize {
        self.shared.outstanding()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enqueued procedures that have not finished.
    pub fn procedures(&self) -> Vec<Procedure> {
        self.shared.active()
    }

    /// Resolves once every enqueued procedure has finished.
    pub async fn wait_until_idle(&self) {
        self.shared.wait_until_idle().await
    }

    /// Cancels every enqueued procedure that has not finished.
    pub fn cancel_all(&self) {
        for procedure in self.shared.active() {
            procedure.cancel();
        }
    }

    /// Cancels everything and waits up to [`QueueConfig::grace`] for it to
    /// finish.
    ///
    /// # Errors
    /// [`RuntimeError::GraceExceeded`] listing the procedures still running.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let grace = self.shared.cfg().grace;
        debug!(procedures = self.len(), ?grace, "shutdown requested");
        self.shared.publish(Event::new(EventKind::ShutdownRequested));
        self.cancel_all();

        if tokio::time::timeout(grace, self.wait_until_idle())
            .await
            .is_ok()
        {
            self.shared.publish(Event::new(EventKind::AllStoppedWithin));
            return Ok(());
        }

        let stuck: Vec<String> = self
            .procedures()
            .iter()
            .map(ToString::to_string)
            .collect();
        warn!(?grace, ?stuck, "shutdown grace exceeded");
        self.shared.publish(
            Event::new(EventKind::GraceExceeded)
                .with_errors(stuck.len())
                .with_reason(stuck.join(", ")),
        );
        Err(RuntimeError::GraceExceeded { grace, stuck })
    }

    /// Subscribes to the queue's lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.bus().subscribe()
    }

    /// The exclusivity manager used by this queue.
    pub fn exclusivity(&self) -> &Arc<ExclusivityManager> {
        self.shared.exclusivity()
    }

    pub fn config(&self) -> &QueueConfig {
        self.shared.cfg()
    }
}

impl Default for ProcedureQueue {
    fn default() -> Self {
        Self::new()
    }
}

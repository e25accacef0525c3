//! # LogWriter: renders lifecycle events through `tracing`
//!
//! A minimal subscriber for demos and debugging. Install a `tracing`
//! subscriber (e.g. `tracing_subscriber::fmt`) to see the output.
//!
//! ## Example output
//! ```text
//! INFO procvisor: added procedure="upload #4"
//! INFO procvisor: starting procedure="upload #4"
//! WARN procvisor: finished with errors procedure="upload #4" errors=1 reason="procedure_failed"
//! INFO procvisor: retry scheduled procedure="retry #3" attempt=1 delay_ms=100
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let procedure = e.procedure.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::ProcedureAdded => info!(procedure, "added"),
            EventKind::ConditionsEvaluated => {
                info!(procedure, errors = e.errors.unwrap_or(0), "conditions evaluated")
            }
            EventKind::ProcedureStarting => info!(procedure, "starting"),
            EventKind::ProcedureProduced => {
                info!(procedure, produced = e.reason.as_deref(), "produced")
            }
            EventKind::ProcedureCancelled => {
                info!(procedure, errors = e.errors.unwrap_or(0), "cancelled")
            }
            EventKind::ProcedureFinished if e.is_failure() => warn!(
                procedure,
                errors = e.errors.unwrap_or(0),
                reason = e.reason.as_deref(),
                "finished with errors"
            ),
            EventKind::ProcedureFinished => info!(procedure, "finished"),
            EventKind::ExclusivityRegistered => info!(
                procedure,
                category = e.category.as_deref(),
                after = e.reason.as_deref(),
                "exclusive"
            ),
            EventKind::RetryScheduled => info!(
                procedure,
                attempt = e.attempt,
                delay_ms = e.delay_ms,
                "retry scheduled"
            ),
            EventKind::RetryExhausted => {
                warn!(procedure, attempt = e.attempt, "retry exhausted")
            }
            EventKind::ShutdownRequested => info!("shutdown requested"),
            EventKind::AllStoppedWithin => info!("all procedures stopped within grace"),
            EventKind::GraceExceeded => warn!("grace exceeded"),
            EventKind::SubscriberOverflow => {
                warn!(subscriber = procedure, reason = e.reason.as_deref(), "subscriber overflow")
            }
            EventKind::SubscriberPanicked => {
                warn!(subscriber = procedure, info = e.reason.as_deref(), "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

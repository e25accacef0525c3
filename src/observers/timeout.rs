//! # Execution deadline.
//!
//! [`TimeoutObserver`] starts a timer when the procedure starts executing.
//! If the procedure has not finished when the timer fires, it is cancelled
//! with [`ProcedureError::Timeout`]. The timer holds only a weak reference
//! and stops as soon as the procedure finishes.

use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::error::ProcedureError;
use crate::observers::Observer;
use crate::procedure::Procedure;

/// Cancels a procedure that executes longer than `timeout`.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutObserver {
    timeout: Duration,
}

impl TimeoutObserver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Observer for TimeoutObserver {
    fn on_start(&self, procedure: &Procedure) {
        let Ok(runtime) = Handle::try_current() else {
            warn!(procedure = %procedure, "no tokio runtime; timeout not armed");
            return;
        };
        let timeout = self.timeout;
        let weak = procedure.downgrade();
        let mut finished = procedure.finished_receiver();

        runtime.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    if let Some(procedure) = weak.upgrade() {
                        if !procedure.is_finished() {
                            debug!(procedure = %procedure, ?timeout, "timed out");
                            procedure.cancel_with_error(ProcedureError::Timeout { timeout });
                        }
                    }
                }
                _ = finished.wait_for(|done| *done) => {}
            }
        });
    }
}

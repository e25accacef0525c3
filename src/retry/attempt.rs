//! Attempts and retry history.

use crate::error::ProcedureError;
use crate::procedure::Procedure;
use crate::procedures::Delay;

/// One attempt of a retried procedure, with an optional delay before it.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub delay: Option<Delay>,
    pub procedure: Procedure,
}

impl Attempt {
    pub fn new(procedure: Procedure) -> Self {
        Self {
            delay: None,
            procedure,
        }
    }

    pub fn with_delay(mut self, delay: Delay) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl From<Procedure> for Attempt {
    fn from(procedure: Procedure) -> Self {
        Self::new(procedure)
    }
}

impl From<(Delay, Procedure)> for Attempt {
    fn from((delay, procedure): (Delay, Procedure)) -> Self {
        Self::new(procedure).with_delay(delay)
    }
}

/// What the retry handler sees after an attempt failed.
///
/// `recovered` and `failed` hold the history *before* `errors` is
/// classified.
#[derive(Debug, Clone)]
pub struct RetryInfo {
    /// The attempt that just failed.
    pub procedure: Procedure,
    /// Number of attempts made so far (1-based).
    pub count: u32,
    /// Errors of the attempt that just failed.
    pub errors: Vec<ProcedureError>,
    /// Errors of earlier attempts that were followed by another attempt.
    pub recovered: Vec<ProcedureError>,
    /// Errors of terminal attempts.
    pub failed: Vec<ProcedureError>,
}

/// Counters of a retry driver. Grows monotonically.
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    /// Attempts started.
    pub count: u32,
    pub recovered: Vec<ProcedureError>,
    pub failed: Vec<ProcedureError>,
}

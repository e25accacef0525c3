//! # Delay procedure.
//!
//! Waits for an interval (or until an instant) without occupying a worker,
//! then finishes. Finishes immediately if the interval is not positive, and
//! early if cancelled. Used by [`Retry`](crate::Retry) to space attempts.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::ProcedureError;
use crate::procedure::{Context, Procedure, Work};

/// How long a [`DelayProcedure`] waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
    /// A fixed interval from the moment execution starts.
    By(Duration),
    /// Until a point in time.
    Until(Instant),
}

impl Delay {
    /// Remaining interval, measured now. Zero if the instant has passed.
    pub fn interval(&self) -> Duration {
        match *self {
            Delay::By(d) => d,
            Delay::Until(at) => at.saturating_duration_since(Instant::now()),
        }
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delay::By(d) => write!(f, "{d:?}"),
            Delay::Until(_) => write!(f, "until {:?}", self.interval()),
        }
    }
}

/// Work that waits for a [`Delay`].
#[derive(Debug, Clone, Copy)]
pub struct DelayProcedure {
    delay: Delay,
}

impl DelayProcedure {
    pub fn new(delay: Delay) -> Self {
        Self { delay }
    }

    /// Named procedure running a delay.
    pub fn procedure(delay: Delay) -> Procedure {
        Procedure::named(format!("Delay {delay}"), Self::new(delay))
    }
}

#[async_trait]
impl Work for DelayProcedure {
    async fn execute(&self, ctx: Context) -> Result<(), ProcedureError> {
        let interval = self.delay.interval();
        if interval.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = ctx.cancelled() => {}
        }
        Ok(())
    }

    fn holds_slot(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn past_instant_has_zero_interval() {
        let past = Delay::Until(Instant::now() - Duration::from_secs(1));
        assert_eq!(past.interval(), Duration::ZERO);
    }

    #[test]
    fn name_mentions_interval() {
        let p = DelayProcedure::procedure(Delay::By(Duration::from_millis(250)));
        assert_eq!(p.name(), Some("Delay 250ms"));
    }
}

//! # Retry driver.
//!
//! [`Retry`] is [`Work`] that runs attempts produced by a factory until one
//! succeeds or retrying stops. Each attempt is produced onto the driver's
//! queue; a [`DelayProcedure`] produced in front of it spaces attempts out.
//!
//! ## Decision after a failed attempt `n`
//! ```text
//! n >= max_count ─────────────────────────────► terminal
//! factory() == None ──────────────────────────► terminal
//! recommended = attempt with delay (attempt.delay or backoff.delay_for(n))
//! handler(info, recommended) == None ─────────► terminal
//! otherwise: errors → recovered, produce [delay ─►] attempt n+1
//! terminal:  errors → failed, finish with them
//! ```
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use procvisor::{Attempt, Backoff, Context, Procedure, ProcedureError, ProcedureQueue, Retry};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let calls = Arc::new(AtomicU32::new(0));
//! let retry = Retry::new({
//!     let calls = calls.clone();
//!     move || {
//!         let calls = calls.clone();
//!         let attempt = Procedure::from_fn("flaky", move |_ctx: Context| {
//!             let n = calls.fetch_add(1, Ordering::SeqCst);
//!             async move {
//!                 if n < 2 { Err(ProcedureError::fail("not yet")) } else { Ok(()) }
//!             }
//!         });
//!         Some(Attempt::new(attempt))
//!     }
//! })
//! .with_backoff(Backoff::None)
//! .into_procedure("flaky-retry");
//!
//! let queue = ProcedureQueue::new();
//! queue.add(retry.procedure().clone()).unwrap();
//! retry.procedure().wait().await;
//! assert_eq!(retry.count(), 3);
//! assert_eq!(retry.recovered_errors().len(), 2);
//! assert!(!retry.procedure().failed());
//! # }
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{DisplayErrors, ProcedureError};
use crate::events::EventKind;
use crate::policies::Backoff;
use crate::procedure::{Context, Procedure, Work};
use crate::procedures::{Delay, DelayProcedure};
use crate::retry::{Attempt, RetryInfo, RetryState};
use crate::sync::lock;

/// Default maximum number of attempts.
pub const DEFAULT_MAX_COUNT: u32 = 5;

type Factory = Box<dyn FnMut() -> Option<Attempt> + Send>;
type Handler = Arc<dyn Fn(&RetryInfo, Attempt) -> Option<Attempt> + Send + Sync>;

/// Work that retries attempts produced by a factory.
pub struct Retry {
    factory: Mutex<Factory>,
    max_count: u32,
    backoff: Backoff,
    handler: Handler,
    state: Arc<Mutex<RetryState>>,
}

impl Retry {
    /// Creates a driver pulling attempts from `factory`. `None` means no
    /// more attempts are available.
    pub fn new<F>(factory: F) -> Self
    where
        F: FnMut() -> Option<Attempt> + Send + 'static,
    {
        Self {
            factory: Mutex::new(Box::new(factory)),
            max_count: DEFAULT_MAX_COUNT,
            backoff: Backoff::default(),
            handler: Arc::new(|_, recommended| Some(recommended)),
            state: Arc::new(Mutex::new(RetryState::default())),
        }
    }

    /// Creates a driver taking attempts from an iterator.
    pub fn attempts<I>(attempts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Attempt>,
        I::IntoIter: Send + 'static,
    {
        let mut iter = attempts.into_iter();
        Self::new(move || iter.next().map(Into::into))
    }

    /// Maximum number of attempts (default 5). The first attempt always runs.
    pub fn with_max_count(mut self, max_count: u32) -> Self {
        self.max_count = max_count;
        self
    }

    /// Strategy for the recommended delay (default `Fixed(100ms)`).
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Decision hook: receives the history and the recommended next attempt,
    /// returns the attempt to run or `None` to stop.
    pub fn with_handler<H>(mut self, handler: H) -> Self
    where
        H: Fn(&RetryInfo, Attempt) -> Option<Attempt> + Send + Sync + 'static,
    {
        self.handler = Arc::new(handler);
        self
    }

    /// Wraps the driver in a named procedure.
    pub fn into_procedure(self, name: impl Into<Arc<str>>) -> RetryProcedure {
        let state = Arc::clone(&self.state);
        RetryProcedure {
            procedure: Procedure::named(name, self),
            state,
        }
    }

    fn next_attempt(&self) -> Option<Attempt> {
        let mut factory = lock(&self.factory);
        (*factory)()
    }

    /// Returns the next attempt, or `None` if the failure is terminal.
    fn decide(&self, failed: &Procedure, count: u32, errors: &[ProcedureError]) -> Option<Attempt> {
        if count >= self.max_count {
            debug!(attempt = %failed, count, max = self.max_count, "retry limit reached");
            return None;
        }
        let Attempt { delay, procedure } = self.next_attempt()?;
        let delay = delay.or_else(|| self.backoff.delay_for(count).map(Delay::By));
        let info = {
            let state = lock(&self.state);
            RetryInfo {
                procedure: failed.clone(),
                count,
                errors: errors.to_vec(),
                recovered: state.recovered.clone(),
                failed: state.failed.clone(),
            }
        };
        (self.handler)(&info, Attempt { delay, procedure })
    }

    /// Produces the attempt (and its delay) onto the driver's queue.
    fn schedule(&self, ctx: &Context, attempt: Attempt) -> (Procedure, Option<Procedure>) {
        let Attempt { delay, procedure } = attempt;
        let delay = delay
            .filter(|d| !d.interval().is_zero())
            .map(DelayProcedure::procedure);
        if let Some(delay) = &delay {
            procedure.add_dependency(delay);
            ctx.produce(delay.clone());
        }
        ctx.produce(procedure.clone());
        (procedure, delay)
    }
}

#[async_trait]
impl Work for Retry {
    async fn execute(&self, ctx: Context) -> Result<(), ProcedureError> {
        let Some(mut attempt) = self.next_attempt() else {
            return Err(ProcedureError::NoMoreAttempts);
        };
        loop {
            let count = {
                let mut state = lock(&self.state);
                state.count += 1;
                state.count
            };
            let (current, delay) = self.schedule(&ctx, attempt);
            tokio::select! {
                _ = current.wait() => {}
                _ = ctx.cancelled() => {
                    if let Some(delay) = &delay {
                        delay.cancel();
                    }
                    current.cancel();
                    current.wait().await;
                }
            }

            let errors = current.errors();
            if errors.is_empty() {
                debug!(driver = %ctx.procedure(), count, "attempt succeeded");
                return Ok(());
            }

            let next = if ctx.is_cancelled() {
                None
            } else {
                self.decide(&current, count, &errors)
            };
            match next {
                Some(next) => {
                    debug!(
                        driver = %ctx.procedure(),
                        count,
                        errors = %DisplayErrors(&errors),
                        delay = ?next.delay,
                        "retrying"
                    );
                    let mut ev = ctx
                        .procedure()
                        .event(EventKind::RetryScheduled)
                        .with_attempt(count)
                        .with_errors(errors.len());
                    if let Some(delay) = &next.delay {
                        ev = ev.with_delay(delay.interval());
                    }
                    ctx.publish(ev);
                    lock(&self.state).recovered.extend(errors);
                    attempt = next;
                }
                None => {
                    debug!(driver = %ctx.procedure(), count, errors = %DisplayErrors(&errors), "giving up");
                    ctx.publish(
                        ctx.procedure()
                            .event(EventKind::RetryExhausted)
                            .with_attempt(count)
                            .with_errors(errors.len()),
                    );
                    lock(&self.state).failed.extend(errors.iter().cloned());
                    ctx.finish(errors);
                    return Ok(());
                }
            }
        }
    }

    fn holds_slot(&self) -> bool {
        false
    }
}

/// A procedure driven by [`Retry`], with access to its counters.
#[derive(Clone)]
pub struct RetryProcedure {
    procedure: Procedure,
    state: Arc<Mutex<RetryState>>,
}

impl RetryProcedure {
    /// The driver procedure, to enqueue or depend on.
    pub fn procedure(&self) -> &Procedure {
        &self.procedure
    }

    /// Snapshot of the counters.
    pub fn state(&self) -> RetryState {
        lock(&self.state).clone()
    }

    /// Attempts started.
    pub fn count(&self) -> u32 {
        lock(&self.state).count
    }

    pub fn recovered_errors(&self) -> Vec<ProcedureError> {
        lock(&self.state).recovered.clone()
    }

    pub fn failed_errors(&self) -> Vec<ProcedureError> {
        lock(&self.state).failed.clone()
    }
}

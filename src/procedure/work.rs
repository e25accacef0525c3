//! # Work abstraction and execution context.
//!
//! A [`Procedure`] wraps a [`Work`]: the body that runs once the procedure is
//! dispatched. The body receives a [`Context`] giving access to the owning
//! procedure, its cancellation token, and the ability to produce new work or
//! finish early.
//!
//! Work should check [`Context::is_cancelled`] (or await
//! [`Context::cancelled`]) and return promptly once cancelled.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ProcedureError;
use crate::events::Event;
use crate::procedure::Procedure;
use crate::queue::Shared;

/// # Asynchronous body of a procedure.
///
/// `execute` is awaited exactly once, only from the `Executing` state.
/// Returning `Err(e)` finishes the procedure with `e`; returning `Ok(())`
/// finishes it with whatever errors it already carries.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use procvisor::{Context, ProcedureError, Work};
///
/// struct Upload;
///
/// #[async_trait]
/// impl Work for Upload {
///     async fn execute(&self, ctx: Context) -> Result<(), ProcedureError> {
///         if ctx.is_cancelled() {
///             return Ok(());
///         }
///         // do work...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Work: Send + Sync + 'static {
    /// Runs the procedure body until completion or cancellation.
    async fn execute(&self, ctx: Context) -> Result<(), ProcedureError>;

    /// Whether executing this work takes one of the queue's
    /// `max_concurrent` slots.
    ///
    /// Work that only waits on procedures it produced onto the same queue
    /// (retry drivers) or on a timer (delays) returns `false`.
    fn holds_slot(&self) -> bool {
        true
    }
}

/// Handle given to [`Work::execute`].
#[derive(Clone)]
pub struct Context {
    procedure: Procedure,
}

impl Context {
    pub(crate) fn new(procedure: Procedure) -> Self {
        Self { procedure }
    }

    /// The procedure being executed.
    pub fn procedure(&self) -> &Procedure {
        &self.procedure
    }

    /// Returns `true` once the procedure has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.procedure.is_cancelled()
    }

    /// Resolves when the procedure is cancelled.
    pub async fn cancelled(&self) {
        self.procedure.cancel_token().cancelled().await
    }

    /// Clone of the procedure's cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.procedure.cancel_token().clone()
    }

    /// Hands new work to the procedure's observers (the queue enqueues it).
    pub fn produce(&self, procedure: Procedure) {
        self.procedure.produce(procedure);
    }

    /// Finishes the procedure now. Later calls (including the implicit one
    /// after `execute` returns) are ignored.
    pub fn finish(&self, errors: Vec<ProcedureError>) {
        self.procedure.finish(errors);
    }

    pub(crate) fn host(&self) -> Option<Arc<Shared>> {
        self.procedure.host()
    }

    pub(crate) fn publish(&self, event: Event) {
        if let Some(host) = self.host() {
            host.publish(event);
        }
    }
}

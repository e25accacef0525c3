//! # Function-backed work (`ProcedureFn`).
//!
//! [`ProcedureFn`] wraps a closure `F: Fn(Context) -> Fut`. A procedure runs
//! its body once, so the closure is called once; use `Arc<...>` explicitly
//! inside the closure if state has to be shared with the caller.
//!
//! ## Example
//! ```rust
//! use procvisor::{Context, Procedure, ProcedureError};
//!
//! let p = Procedure::from_fn("hello", |ctx: Context| async move {
//!     if ctx.is_cancelled() {
//!         return Ok(());
//!     }
//!     Ok::<_, ProcedureError>(())
//! });
//! assert_eq!(p.name(), Some("hello"));
//! ```

use std::future::Future;

use async_trait::async_trait;

use crate::error::ProcedureError;
use crate::procedure::work::{Context, Work};

/// Function-backed work implementation.
pub struct ProcedureFn<F> {
    f: F,
}

impl<F> ProcedureFn<F> {
    /// Wraps a closure that creates the body future.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Work for ProcedureFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProcedureError>> + Send + 'static,
{
    async fn execute(&self, ctx: Context) -> Result<(), ProcedureError> {
        (self.f)(ctx).await
    }
}

//! # Observer: per-procedure lifecycle callbacks.
//!
//! An [`Observer`] is attached to one or more procedures with
//! [`Procedure::add_observer`] and is called synchronously at lifecycle
//! points. Every callback receives the procedure by reference, so an
//! observer never needs to capture the procedure it watches.
//!
//! ```text
//! Ready ──► Executing ── on_start ──► Work::execute ── produce ── on_produce
//!                                                        │
//!   cancel / cancel_with_error ── on_cancel (first only) │
//!                                                        ▼
//!                                         Finishing ── on_finish ──► Finished
//! ```
//!
//! ## Rules
//! - `on_start` runs before `on_finish`; each runs at most once.
//! - Callbacks run without any procedure lock held and may call back into
//!   the procedure (e.g. `cancel_with_error`).
//! - A panicking callback is logged and does not affect other observers.
//! - Callbacks must not block; spawn a task for async follow-up work.
//!
//! For a feed of *all* lifecycle events across a queue, use a
//! [`Subscribe`](crate::Subscribe) implementation instead.

use crate::error::ProcedureError;
use crate::procedure::Procedure;

/// # Trait for receiving per-procedure lifecycle callbacks.
///
/// All methods default to no-ops.
pub trait Observer: Send + Sync + 'static {
    /// Called after the procedure entered `Executing`, before its work runs.
    fn on_start(&self, procedure: &Procedure) {
        let _ = procedure;
    }

    /// Called when the procedure produces new work.
    fn on_produce(&self, procedure: &Procedure, produced: &Procedure) {
        let _ = (procedure, produced);
    }

    /// Called on the first cancellation, with all errors recorded so far.
    fn on_cancel(&self, procedure: &Procedure, errors: &[ProcedureError]) {
        let _ = (procedure, errors);
    }

    /// Called once while finishing, with the final error list.
    fn on_finish(&self, procedure: &Procedure, errors: &[ProcedureError]) {
        let _ = (procedure, errors);
    }
}

//! Retry delay policies.
//!
//! This module groups the knobs that control **how long** a [`Retry`](crate::Retry)
//! driver waits between attempts.
//!
//! ## Contents
//! - [`Backoff`] how retry delays evolve (none / fixed / exponential)
//! - [`JitterPolicy`] randomization strategy to avoid thundering herd
//!
//! ## Quick wiring
//! ```text
//! Retry { max_count, backoff: Backoff, handler }
//!      └─► retry driver uses:
//!           - backoff.delay_for(attempt) as the recommended delay
//!           - handler(info, recommended) to accept/override/stop
//! ```
//!
//! ## Defaults
//! - `Backoff::default()` → `Fixed(100ms)`.
//! - `JitterPolicy::None` by default; consider `Equal` for balanced randomness.

mod backoff;
mod jitter;

pub use backoff::Backoff;
pub use jitter::JitterPolicy;

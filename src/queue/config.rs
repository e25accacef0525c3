//! # Queue configuration.
//!
//! Provides [`QueueConfig`], the settings of one [`ProcedureQueue`](crate::ProcedureQueue).
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (no semaphore created)
//! - `timeout = 0s` → no default per-procedure timeout

use std::time::Duration;

/// Configuration of a procedure queue.
///
/// ## Field semantics
/// - `max_concurrent`: procedures executing at once (`0` = unlimited)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `grace`: maximum wait in [`shutdown`](crate::ProcedureQueue::shutdown)
/// - `timeout`: default per-procedure execution timeout (`0s` = none)
///
/// ## Notes
/// All fields are public. Prefer the helper accessors over checking the
/// `0` sentinels directly.
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Maximum number of procedures executing concurrently.
    ///
    /// Procedures waiting for a slot are not yet `Executing`; cancelling one
    /// releases it without waiting for a slot.
    ///
    /// Work whose [`Work::holds_slot`](crate::Work::holds_slot) is `false`
    /// (retry drivers, delays, groups) runs without a slot.
    pub max_concurrent: usize,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Receivers lagging behind more than `bus_capacity` events skip older
    /// ones. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,

    /// Maximum time `shutdown` waits for cancelled procedures to finish
    /// before returning `RuntimeError::GraceExceeded`.
    pub grace: Duration,

    /// Default execution timeout installed on every added procedure as a
    /// [`TimeoutObserver`](crate::TimeoutObserver).
    pub timeout: Duration,
}

impl QueueConfig {
    /// Returns the concurrency limit as an `Option` (`None` = unlimited).
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        (self.max_concurrent > 0).then_some(self.max_concurrent)
    }

    /// Returns the default per-procedure timeout as an `Option`.
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        (!self.timeout.is_zero()).then_some(self.timeout)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for QueueConfig {
    /// Default configuration:
    ///
    /// - `max_concurrent = 0` (unlimited)
    /// - `bus_capacity = 1024`
    /// - `grace = 60s`
    /// - `timeout = 0s` (no timeout)
    fn default() -> Self {
        Self {
            max_concurrent: 0,
            bus_capacity: 1024,
            grace: Duration::from_secs(60),
            timeout: Duration::ZERO,
        }
    }
}

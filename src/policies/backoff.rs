//! # Backoff strategy for retry drivers.
//!
//! [`Backoff`] computes the *recommended* delay before the next attempt of a
//! [`Retry`](crate::Retry). The driver hands this recommendation to its
//! decision handler, which may accept it or override it.
//!
//! For [`Backoff::Exponential`] the delay for attempt `n` is
//! `first × factor^(n-1)`, clamped to `max`, then jitter is applied. The base
//! is derived purely from the attempt number, so jitter never feeds back
//! into subsequent delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use procvisor::{Backoff, JitterPolicy};
//!
//! let backoff = Backoff::Exponential {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! // After the first failed attempt: uses 'first'
//! assert_eq!(backoff.delay_for(1), Some(Duration::from_millis(100)));
//! // After the second: first × factor
//! assert_eq!(backoff.delay_for(2), Some(Duration::from_millis(200)));
//! // Far out: capped at max
//! assert_eq!(backoff.delay_for(20), Some(Duration::from_secs(10)));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff strategy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Wait the same interval after every failure.
    Fixed(Duration),
    /// Grow the delay geometrically up to a cap.
    Exponential {
        /// Delay after the first failed attempt.
        first: Duration,
        /// Maximum delay cap.
        max: Duration,
        /// Multiplicative growth factor (`>= 1.0` recommended).
        factor: f64,
        /// Jitter applied to the clamped delay.
        jitter: JitterPolicy,
    },
}

impl Default for Backoff {
    /// Returns `Fixed(100ms)`.
    fn default() -> Self {
        Backoff::Fixed(Duration::from_millis(100))
    }
}

impl Backoff {
    /// Recommended delay after `attempt` (1-based) has failed.
    ///
    /// Returns `None` when no delay should be inserted.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        match *self {
            Backoff::None => None,
            Backoff::Fixed(d) if d.is_zero() => None,
            Backoff::Fixed(d) => Some(d),
            Backoff::Exponential {
                first,
                max,
                factor,
                jitter,
            } => {
                let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let unclamped = first.as_secs_f64() * factor.powi(exp);
                let base = if !unclamped.is_finite()
                    || unclamped < 0.0
                    || unclamped > max.as_secs_f64()
                {
                    max
                } else {
                    Duration::from_secs_f64(unclamped)
                };
                let delay = jitter.apply(base);
                (!delay.is_zero()).then_some(delay)
            }
        }
    }
}

//! # Retrying failed work.
//!
//! - [`Retry`] the driver ([`Work`](crate::Work)), built from a factory of
//!   [`Attempt`]s
//! - [`RetryProcedure`] the driver procedure plus its [`RetryState`]
//! - [`RetryInfo`] what the decision handler sees

mod attempt;
mod driver;

pub use attempt::{Attempt, RetryInfo, RetryState};
pub use driver::{DEFAULT_MAX_COUNT, Retry, RetryProcedure};

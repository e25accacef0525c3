//! # Reusable procedures.
//!
//! - [`DelayProcedure`] waits for a [`Delay`]
//! - [`Group`] / [`GroupProcedure`] runs children as one procedure

mod delay;
mod group;

pub use delay::{Delay, DelayProcedure};
pub use group::{Group, GroupProcedure};

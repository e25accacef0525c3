//! # Mutual exclusion by category.
//!
//! - [`ExclusivityManager`] the registry (one global default, or injected
//!   per queue)
//! - [`MutuallyExclusive`] the condition that registers a procedure

mod condition;
mod manager;

pub use condition::MutuallyExclusive;
pub use manager::ExclusivityManager;

//! # Conditions: asynchronous preconditions of a procedure.
//!
//! - [`Condition`] / [`ConditionResult`] the trait and its outcome
//! - built-ins: [`TrueCondition`], [`FalseCondition`], [`BlockCondition`],
//!   [`NoFailedDependencies`]
//! - combinators via [`ConditionExt`]: [`SilentCondition`],
//!   [`NegatedCondition`], [`WithDependency`]
//!
//! Mutual exclusion is expressed as a condition too, see
//! [`MutuallyExclusive`](crate::MutuallyExclusive).

mod builtin;
mod compose;
mod condition;
mod evaluator;

pub use builtin::{BlockCondition, FalseCondition, NoFailedDependencies, TrueCondition};
pub use compose::{ConditionExt, NegatedCondition, SilentCondition, WithDependency};
pub use condition::{Condition, ConditionResult};

pub(crate) use evaluator::{evaluate, register_exclusive};

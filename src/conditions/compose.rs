//! # Condition combinators.
//!
//! ```
//! use procvisor::{ConditionExt, FalseCondition, TrueCondition};
//!
//! let quiet = FalseCondition::new().silent();
//! let inverted = TrueCondition::new().negated();
//! # let _ = (quiet, inverted);
//! ```

use async_trait::async_trait;

use crate::conditions::{Condition, ConditionResult};
use crate::procedure::Procedure;

/// Turns a failing condition into an ignored one.
///
/// The wrapped condition's predecessor procedure is not scheduled.
pub struct SilentCondition<C> {
    inner: C,
    name: String,
}

impl<C: Condition> SilentCondition<C> {
    pub fn new(inner: C) -> Self {
        let name = format!("Silent<{}>", inner.name());
        Self { inner, name }
    }
}

#[async_trait]
impl<C: Condition> Condition for SilentCondition<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_mutually_exclusive(&self) -> bool {
        self.inner.is_mutually_exclusive()
    }

    fn category(&self) -> String {
        self.inner.category()
    }

    async fn evaluate(&self, procedure: &Procedure) -> ConditionResult {
        match self.inner.evaluate(procedure).await {
            ConditionResult::Failed(_) => ConditionResult::Ignored,
            other => other,
        }
    }
}

/// Swaps satisfied and failed. Ignored stays ignored.
pub struct NegatedCondition<C> {
    inner: C,
    name: String,
}

impl<C: Condition> NegatedCondition<C> {
    pub fn new(inner: C) -> Self {
        let name = format!("Not<{}>", inner.name());
        Self { inner, name }
    }
}

#[async_trait]
impl<C: Condition> Condition for NegatedCondition<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_mutually_exclusive(&self) -> bool {
        self.inner.is_mutually_exclusive()
    }

    fn category(&self) -> String {
        self.inner.category()
    }

    fn dependency(&self) -> Option<Procedure> {
        self.inner.dependency()
    }

    async fn evaluate(&self, procedure: &Procedure) -> ConditionResult {
        match self.inner.evaluate(procedure).await {
            ConditionResult::Satisfied => ConditionResult::failed(self.name.as_str()),
            ConditionResult::Failed(_) => ConditionResult::Satisfied,
            ConditionResult::Ignored => ConditionResult::Ignored,
        }
    }
}

/// Gives a condition a predecessor procedure.
pub struct WithDependency<C> {
    inner: C,
    dependency: Procedure,
}

#[async_trait]
impl<C: Condition> Condition for WithDependency<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_mutually_exclusive(&self) -> bool {
        self.inner.is_mutually_exclusive()
    }

    fn category(&self) -> String {
        self.inner.category()
    }

    fn dependency(&self) -> Option<Procedure> {
        Some(self.dependency.clone())
    }

    async fn evaluate(&self, procedure: &Procedure) -> ConditionResult {
        self.inner.evaluate(procedure).await
    }
}

/// Combinator methods available on every [`Condition`].
pub trait ConditionExt: Condition + Sized {
    /// See [`SilentCondition`].
    fn silent(self) -> SilentCondition<Self> {
        SilentCondition::new(self)
    }

    /// See [`NegatedCondition`].
    fn negated(self) -> NegatedCondition<Self> {
        NegatedCondition::new(self)
    }

    /// Runs `procedure` before this condition is evaluated.
    fn with_dependency(self, procedure: Procedure) -> WithDependency<Self> {
        WithDependency {
            inner: self,
            dependency: procedure,
        }
    }
}

impl<C: Condition> ConditionExt for C {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{FalseCondition, TrueCondition};
    use crate::procedure::Context;

    fn target() -> Procedure {
        Procedure::from_fn("target", |_ctx: Context| async { Ok(()) })
    }

    #[tokio::test]
    async fn silent_turns_failure_into_ignored() {
        let p = target();
        let result = FalseCondition::new().silent().evaluate(&p).await;
        assert!(result.is_ignored());
        assert!(!result.is_satisfied());
    }

    #[tokio::test]
    async fn negated_swaps_outcomes() {
        let p = target();
        assert!(FalseCondition::new().negated().evaluate(&p).await.is_satisfied());
        let failed = TrueCondition::new().negated().evaluate(&p).await;
        assert_eq!(failed.error().map(|e| e.as_label()), Some("condition_failed"));
    }

    #[test]
    fn silent_drops_predecessor() {
        let gated = TrueCondition::new().with_dependency(target());
        assert!(gated.dependency().is_some());
        assert!(gated.silent().dependency().is_none());
    }
}

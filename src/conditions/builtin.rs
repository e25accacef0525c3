//! Built-in conditions.

use async_trait::async_trait;

use crate::conditions::{Condition, ConditionResult};
use crate::error::ProcedureError;
use crate::procedure::Procedure;

/// Always satisfied.
#[derive(Debug, Clone)]
pub struct TrueCondition {
    name: String,
    mutually_exclusive: bool,
}

impl TrueCondition {
    pub fn new() -> Self {
        Self {
            name: "True Condition".to_string(),
            mutually_exclusive: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Marks the condition mutually exclusive (category = its name).
    pub fn mutually_exclusive(mut self, exclusive: bool) -> Self {
        self.mutually_exclusive = exclusive;
        self
    }
}

impl Default for TrueCondition {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Condition for TrueCondition {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_mutually_exclusive(&self) -> bool {
        self.mutually_exclusive
    }

    async fn evaluate(&self, _procedure: &Procedure) -> ConditionResult {
        ConditionResult::Satisfied
    }
}

/// Always fails with [`ProcedureError::ConditionFailed`].
#[derive(Debug, Clone)]
pub struct FalseCondition {
    name: String,
    mutually_exclusive: bool,
}

impl FalseCondition {
    pub fn new() -> Self {
        Self {
            name: "False Condition".to_string(),
            mutually_exclusive: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn mutually_exclusive(mut self, exclusive: bool) -> Self {
        self.mutually_exclusive = exclusive;
        self
    }
}

impl Default for FalseCondition {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Condition for FalseCondition {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_mutually_exclusive(&self) -> bool {
        self.mutually_exclusive
    }

    async fn evaluate(&self, _procedure: &Procedure) -> ConditionResult {
        ConditionResult::failed(self.name.as_str())
    }
}

/// Satisfied when the closure returns `true`, failed otherwise.
pub struct BlockCondition<F> {
    name: String,
    f: F,
}

impl<F> BlockCondition<F>
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self {
            name: "Block Condition".to_string(),
            f,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl<F> Condition for BlockCondition<F>
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&self, _procedure: &Procedure) -> ConditionResult {
        if (self.f)() {
            ConditionResult::Satisfied
        } else {
            ConditionResult::failed(self.name.as_str())
        }
    }
}

/// Fails if any dependency of the procedure finished with errors or was
/// cancelled.
///
/// Cancelled dependencies are checked first: they fail the condition with
/// [`ProcedureError::DependenciesCancelled`], or make it `Ignored` when
/// `ignore_cancellations` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFailedDependencies {
    pub ignore_cancellations: bool,
}

impl NoFailedDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignoring_cancellations() -> Self {
        Self {
            ignore_cancellations: true,
        }
    }
}

#[async_trait]
impl Condition for NoFailedDependencies {
    fn name(&self) -> &str {
        "No Failed Dependencies"
    }

    async fn evaluate(&self, procedure: &Procedure) -> ConditionResult {
        let dependencies = procedure.dependencies();
        let cancelled = dependencies.iter().filter(|d| d.is_cancelled()).count();
        if cancelled > 0 {
            return if self.ignore_cancellations {
                ConditionResult::Ignored
            } else {
                ConditionResult::Failed(ProcedureError::DependenciesCancelled { count: cancelled })
            };
        }
        let failed = dependencies.iter().filter(|d| d.failed()).count();
        if failed > 0 {
            return ConditionResult::Failed(ProcedureError::DependenciesFailed { count: failed });
        }
        ConditionResult::Satisfied
    }
}

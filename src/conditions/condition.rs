//! # Condition trait and evaluation result.

use async_trait::async_trait;

use crate::error::ProcedureError;
use crate::procedure::Procedure;

/// Outcome of evaluating one [`Condition`].
#[derive(Debug, Clone)]
pub enum ConditionResult {
    /// The precondition holds.
    Satisfied,
    /// The condition abstains. Contributes no error, but is not a success.
    Ignored,
    /// The precondition does not hold; the error is added to the procedure.
    Failed(ProcedureError),
}

impl ConditionResult {
    /// `Failed` with a [`ProcedureError::ConditionFailed`] naming `condition`.
    pub fn failed(condition: impl Into<String>) -> Self {
        ConditionResult::Failed(ProcedureError::ConditionFailed {
            condition: condition.into(),
        })
    }

    /// `true` only for [`ConditionResult::Satisfied`].
    pub fn is_satisfied(&self) -> bool {
        matches!(self, ConditionResult::Satisfied)
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, ConditionResult::Ignored)
    }

    pub fn error(&self) -> Option<&ProcedureError> {
        match self {
            ConditionResult::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn into_error(self) -> Option<ProcedureError> {
        match self {
            ConditionResult::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// # Asynchronous precondition gating a procedure.
///
/// Conditions are evaluated after all dependencies of the procedure have
/// finished and before it becomes ready. Evaluation of a procedure's
/// conditions is concurrent; they must not depend on each other.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use procvisor::{Condition, ConditionResult, Procedure};
///
/// struct Online;
///
/// #[async_trait]
/// impl Condition for Online {
///     fn name(&self) -> &str { "online" }
///
///     async fn evaluate(&self, _procedure: &Procedure) -> ConditionResult {
///         ConditionResult::Satisfied
///     }
/// }
/// ```
#[async_trait]
pub trait Condition: Send + Sync + 'static {
    /// Name used in errors and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// `true` if at most one procedure carrying this condition's
    /// [`category`](Condition::category) may execute at a time.
    fn is_mutually_exclusive(&self) -> bool {
        false
    }

    /// Mutual-exclusion category. Defaults to the condition name.
    fn category(&self) -> String {
        self.name().to_string()
    }

    /// Predecessor procedure that must finish before this condition is
    /// evaluated. The queue enqueues it (if needed) and makes it a
    /// dependency of the gated procedure.
    fn dependency(&self) -> Option<Procedure> {
        None
    }

    /// Evaluates the condition for `procedure`.
    async fn evaluate(&self, procedure: &Procedure) -> ConditionResult;
}

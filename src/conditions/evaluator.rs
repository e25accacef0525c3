//! # Condition evaluation.
//!
//! Runs once per procedure, after every dependency has finished.
//!
//! ## Steps
//! 1. [`register_exclusive`] (synchronous, called while the queue polls):
//!    register the procedure once per distinct mutually exclusive category.
//!    The previous procedure in the category becomes a dependency.
//! 2. [`evaluate`] (spawned on the queue's runtime): conditions whose
//!    predecessor finished with errors fail with
//!    [`ProcedureError::ConditionDependencyFailed`] without being evaluated;
//!    all other conditions are evaluated concurrently and joined.
//! 3. Every `Failed` result contributes its error; `Ignored` contributes
//!    nothing.
//!
//! Registration happens in poll order and regardless of the outcome of the
//! conditions, so a procedure whose conditions fail still takes its turn in
//! the category.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::trace;

use crate::conditions::{Condition, ConditionResult};
use crate::error::ProcedureError;
use crate::exclusivity::ExclusivityManager;
use crate::procedure::Procedure;

/// Registers `procedure` once per distinct mutually exclusive category.
///
/// Returns `(category, previous procedure)` for each registration.
pub(crate) fn register_exclusive(
    procedure: &Procedure,
    conditions: &[Arc<dyn Condition>],
    exclusivity: &Arc<ExclusivityManager>,
) -> Vec<(String, Option<Procedure>)> {
    let mut seen = HashSet::new();
    let mut registrations = Vec::new();
    for condition in conditions.iter().filter(|c| c.is_mutually_exclusive()) {
        let category = condition.category();
        if seen.insert(category.clone()) {
            let previous = exclusivity.register(procedure, &category);
            registrations.push((category, previous));
        }
    }
    registrations
}

/// Evaluates all conditions concurrently; returns the errors of failed ones
/// in condition order.
pub(crate) async fn evaluate(
    procedure: &Procedure,
    conditions: &[Arc<dyn Condition>],
) -> Vec<ProcedureError> {
    join_all(conditions.iter().map(|c| evaluate_one(procedure, c.as_ref())))
        .await
        .into_iter()
        .filter_map(ConditionResult::into_error)
        .collect()
}

async fn evaluate_one(procedure: &Procedure, condition: &dyn Condition) -> ConditionResult {
    if let Some(predecessor) = condition.dependency() {
        let errors = predecessor.errors();
        if !errors.is_empty() {
            return ConditionResult::Failed(ProcedureError::ConditionDependencyFailed {
                condition: condition.name().to_string(),
                errors,
            });
        }
    }
    let result = condition.evaluate(procedure).await;
    trace!(procedure = %procedure, condition = condition.name(), ?result, "condition evaluated");
    result
}

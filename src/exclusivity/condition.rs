//! [`MutuallyExclusive`]: the condition that opts a procedure into a category.

use async_trait::async_trait;

use crate::conditions::{Condition, ConditionResult};
use crate::procedure::Procedure;

/// Always satisfied; makes the procedure mutually exclusive within a
/// category.
///
/// ```
/// use procvisor::{Condition, MutuallyExclusive};
///
/// struct Alert;
///
/// let by_type = MutuallyExclusive::of::<Alert>();
/// assert!(by_type.category().ends_with("Alert"));
///
/// let by_name = MutuallyExclusive::named("network");
/// assert_eq!(by_name.category(), "network");
/// assert_eq!(by_name.name(), "MutuallyExclusive<network>");
/// ```
#[derive(Debug, Clone)]
pub struct MutuallyExclusive {
    name: String,
    category: String,
}

impl MutuallyExclusive {
    /// Category named after the type `T`.
    pub fn of<T: ?Sized>() -> Self {
        Self::named(std::any::type_name::<T>())
    }

    /// Category with an explicit name.
    pub fn named(category: impl Into<String>) -> Self {
        let category = category.into();
        Self {
            name: format!("MutuallyExclusive<{category}>"),
            category,
        }
    }
}

#[async_trait]
impl Condition for MutuallyExclusive {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_mutually_exclusive(&self) -> bool {
        true
    }

    fn category(&self) -> String {
        self.category.clone()
    }

    async fn evaluate(&self, _procedure: &Procedure) -> ConditionResult {
        ConditionResult::Satisfied
    }
}

//! Helpers over groups of procedures.

use crate::procedure::{Procedure, UserIntent};

/// Makes every procedure depend on the one before it, so they run in order.
///
/// ```
/// use procvisor::{chain, Context, Procedure, ProcedureError};
///
/// let steps: Vec<Procedure> = (0..3)
///     .map(|i| Procedure::from_fn(format!("step-{i}"), |_ctx: Context| async {
///         Ok::<_, ProcedureError>(())
///     }))
///     .collect();
/// chain(&steps);
/// assert_eq!(steps[2].dependencies(), vec![steps[1].clone()]);
/// assert!(steps[0].dependencies().is_empty());
/// ```
pub fn chain(procedures: &[Procedure]) {
    for pair in procedures.windows(2) {
        pair[1].add_dependency(&pair[0]);
    }
}

/// Highest [`UserIntent`] among `procedures` (`UserIntent::None` if empty).
pub fn max_user_intent(procedures: &[Procedure]) -> UserIntent {
    procedures
        .iter()
        .map(Procedure::user_intent)
        .max()
        .unwrap_or_default()
}

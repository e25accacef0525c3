//! Procedure identity and scheduling intent.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for procedure identities.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, comparable, process-unique procedure identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcedureId(u64);

impl ProcedureId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value, for logs and events.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProcedureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How directly a procedure relates to something the user asked for.
///
/// Informational: it only changes dispatch priority among procedures that
/// become ready at the same time (`Initiated` first, `None` last).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UserIntent {
    /// Background work.
    #[default]
    None,
    /// A side effect of something the user initiated.
    SideEffect,
    /// Directly initiated by the user.
    Initiated,
}

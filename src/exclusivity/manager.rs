//! # Mutual-exclusion registry.
//!
//! Maps a category to the procedures registered under it, in registration
//! order. Registering appends the procedure and makes the previously
//! registered one a dependency, so at most one procedure per category
//! executes at a time and they execute FIFO. A finish observer removes the
//! procedure again.
//!
//! ```text
//! register(C, "network")            "network": [A, B]      → C depends on B
//!     │                                         ▲
//!     └──► append ──────────────────────────────┘ [A, B, C]
//! A finishes ── on_finish ──► unregister(A)                → [B, C]
//! ```
//!
//! Exclusion is expressed through dependency edges; no lock is held while
//! procedures run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, Weak};

use tracing::debug;

use crate::error::ProcedureError;
use crate::observers::Observer;
use crate::procedure::Procedure;
use crate::sync::lock;

static GLOBAL: OnceLock<Arc<ExclusivityManager>> = OnceLock::new();

/// Registry of mutually exclusive procedures, keyed by category.
#[derive(Default)]
pub struct ExclusivityManager {
    procedures: Mutex<HashMap<String, Vec<Procedure>>>,
}

impl ExclusivityManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide default instance.
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new())))
    }

    /// Registers `procedure` under `category` and returns the previously
    /// registered procedure, which becomes a dependency of `procedure`.
    ///
    /// # Panics
    /// If `procedure` has already begun executing.
    pub fn register(self: &Arc<Self>, procedure: &Procedure, category: &str) -> Option<Procedure> {
        let previous = {
            let mut map = lock(&self.procedures);
            let list = map.entry(category.to_string()).or_default();
            let previous = list.last().cloned();
            list.push(procedure.clone());
            previous
        };

        // Wired outside the registry lock. `procedure` is still evaluating and
        // cannot unregister yet; a `previous` that finishes meanwhile is just
        // a finished dependency.
        if let Some(previous) = &previous {
            procedure.add_dependency(previous);
        }
        procedure.add_observer(Unregister {
            manager: Arc::downgrade(self),
            category: category.to_string(),
        });
        debug!(
            procedure = %procedure,
            category,
            previous = previous.as_ref().map(ToString::to_string),
            "registered exclusive"
        );
        previous
    }

    /// Removes `procedure` from `category`.
    pub fn unregister(&self, procedure: &Procedure, category: &str) {
        let mut map = lock(&self.procedures);
        if let Some(list) = map.get_mut(category) {
            list.retain(|p| p != procedure);
            if list.is_empty() {
                map.remove(category);
            }
        }
    }

    /// Categories that currently have registered procedures, sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = lock(&self.procedures).keys().cloned().collect();
        categories.sort();
        categories
    }

    /// Procedures registered under `category`, in registration order.
    pub fn procedures(&self, category: &str) -> Vec<Procedure> {
        lock(&self.procedures)
            .get(category)
            .cloned()
            .unwrap_or_default()
    }

    /// Cancels and removes every registered procedure.
    pub fn reset(&self) {
        let drained: Vec<Procedure> = lock(&self.procedures)
            .drain()
            .flat_map(|(_, list)| list)
            .collect();
        for procedure in drained {
            procedure.cancel();
        }
    }
}

/// Finish observer removing a procedure from one category.
struct Unregister {
    manager: Weak<ExclusivityManager>,
    category: String,
}

impl Observer for Unregister {
    fn on_finish(&self, procedure: &Procedure, _errors: &[ProcedureError]) {
        if let Some(manager) = self.manager.upgrade() {
            manager.unregister(procedure, &self.category);
        }
    }
}

//! # Group procedure.
//!
//! Runs a set of child procedures on an internal queue and finishes once all
//! of them have finished, carrying every child error. Children can be added
//! while the group is running. Cancelling the group cancels its children;
//! if the group was cancelled with errors the children receive
//! [`ProcedureError::ParentCancelled`].
//!
//! ```text
//! GroupProcedure ── execute ──► internal ProcedureQueue ──► child 1 .. child N
//!        │                         (shares the exclusivity manager)
//!        └── on_cancel ──► cancel children
//! ```

use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use tracing::warn;

use crate::error::{ProcedureError, RuntimeError};
use crate::exclusivity::ExclusivityManager;
use crate::observers::Observer;
use crate::procedure::{Context, Procedure, Work};
use crate::queue::{ProcedureQueue, QueueBuilder, QueueConfig};
use crate::sync::lock;

/// Builder for a [`GroupProcedure`].
#[derive(Default)]
pub struct Group {
    children: Vec<Procedure>,
    max_concurrent: usize,
}

impl Group {
    pub fn new(children: impl IntoIterator<Item = Procedure>) -> Self {
        Self {
            children: children.into_iter().collect(),
            max_concurrent: 0,
        }
    }

    /// Limits how many children run at once (0 = unlimited).
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Creates the group procedure.
    pub fn into_procedure(self, name: impl Into<Arc<str>>) -> GroupProcedure {
        let state = Arc::new(GroupState {
            inner: Mutex::new(GroupInner {
                children: self.children,
                queue: None,
            }),
            max_concurrent: self.max_concurrent,
        });
        let procedure = Procedure::named(
            name,
            GroupWork {
                state: Arc::clone(&state),
            },
        );
        procedure.add_observer(CancelChildren {
            state: Arc::downgrade(&state),
        });
        GroupProcedure { procedure, state }
    }
}

/// A procedure running a group of children, plus access to the children.
#[derive(Clone)]
pub struct GroupProcedure {
    procedure: Procedure,
    state: Arc<GroupState>,
}

impl GroupProcedure {
    /// The group itself, to enqueue or depend on.
    pub fn procedure(&self) -> &Procedure {
        &self.procedure
    }

    /// Snapshot of the children.
    pub fn children(&self) -> Vec<Procedure> {
        lock(&self.state.inner).children.clone()
    }

    /// Adds a child. If the group is running, the child is enqueued on the
    /// internal queue right away.
    pub fn add_child(&self, child: Procedure) -> Result<(), RuntimeError> {
        let queue = {
            let mut inner = lock(&self.state.inner);
            inner.children.push(child.clone());
            inner.queue.clone()
        };
        match queue {
            Some(queue) => queue.add(child),
            None => Ok(()),
        }
    }
}

struct GroupState {
    inner: Mutex<GroupInner>,
    max_concurrent: usize,
}

struct GroupInner {
    children: Vec<Procedure>,
    queue: Option<ProcedureQueue>,
}

struct GroupWork {
    state: Arc<GroupState>,
}

#[async_trait]
impl Work for GroupWork {
    async fn execute(&self, ctx: Context) -> Result<(), ProcedureError> {
        let exclusivity = ctx
            .host()
            .map(|host| Arc::clone(host.exclusivity()))
            .unwrap_or_else(ExclusivityManager::global);
        let queue = QueueBuilder::new(QueueConfig {
            max_concurrent: self.state.max_concurrent,
            ..QueueConfig::default()
        })
        .with_exclusivity(exclusivity)
        .build();

        let children = {
            let mut inner = lock(&self.state.inner);
            inner.queue = Some(queue.clone());
            inner.children.clone()
        };

        let mut errors = Vec::new();
        for child in children {
            if let Err(err) = queue.add(child) {
                warn!(group = %ctx.procedure(), error = %err, "child rejected");
                errors.push(ProcedureError::fail(err.as_message()));
            }
        }
        queue.wait_until_idle().await;

        let children = {
            let mut inner = lock(&self.state.inner);
            inner.queue = None;
            inner.children.clone()
        };
        errors.extend(children.iter().flat_map(Procedure::errors));
        if !errors.is_empty() {
            ctx.finish(errors);
        }
        Ok(())
    }

    /// Children are bounded by the group's own limit, not the parent's.
    fn holds_slot(&self) -> bool {
        false
    }
}

struct CancelChildren {
    state: Weak<GroupState>,
}

impl Observer for CancelChildren {
    fn on_cancel(&self, _procedure: &Procedure, errors: &[ProcedureError]) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let children = lock(&state.inner).children.clone();
        for child in children {
            if errors.is_empty() {
                child.cancel();
            } else {
                child.cancel_with_error(ProcedureError::ParentCancelled {
                    errors: errors.to_vec(),
                });
            }
        }
    }
}

//! # Queue internals shared with the procedures it hosts.
//!
//! Procedures hold a `Weak<Shared>` (their host). Through it they publish
//! events, start condition evaluation on the queue's runtime, re-poll the
//! queue and report that they finished.
//!
//! ## Poll
//! ```text
//! poll()
//!   ├─ waiting.partition(is_ready)      (finished procedures are dropped)
//!   ├─ ready.sort_by(UserIntent desc)   (stable: FIFO within an intent)
//!   └─ for each: runtime.spawn ─► [semaphore permit | cancelled] ─► Procedure::run
//!                                 (only for work that holds a slot)
//! ```
//!
//! Triggers: every add, every completed condition evaluation, every
//! cancellation, and every finish of a dependency.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, Weak};

use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Semaphore, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::exclusivity::ExclusivityManager;
use crate::observers::TimeoutObserver;
use crate::procedure::{Procedure, ProcedureId};
use crate::queue::QueueConfig;
use crate::queue::observer::QueueObserver;
use crate::subscribers::SubscriberSet;
use crate::sync::lock;

pub(crate) struct Shared {
    cfg: QueueConfig,
    bus: Bus,
    runtime: Handle,
    exclusivity: Arc<ExclusivityManager>,
    semaphore: Option<Arc<Semaphore>>,
    /// Enqueued procedures not yet dispatched.
    waiting: Mutex<Vec<Procedure>>,
    /// Enqueued procedures not yet finished.
    active: Mutex<HashMap<ProcedureId, Procedure>>,
    outstanding: watch::Sender<usize>,
    /// Cancelled on drop; stops the subscriber listener.
    token: CancellationToken,
    me: Weak<Shared>,
}

impl Shared {
    pub(crate) fn new(
        cfg: QueueConfig,
        bus: Bus,
        runtime: Handle,
        exclusivity: Arc<ExclusivityManager>,
    ) -> Arc<Self> {
        let semaphore = cfg.concurrency_limit().map(Semaphore::new).map(Arc::new);
        let (outstanding, _) = watch::channel(0);
        Arc::new_cyclic(|me| Self {
            cfg,
            bus,
            runtime,
            exclusivity,
            semaphore,
            waiting: Mutex::new(Vec::new()),
            active: Mutex::new(HashMap::new()),
            outstanding,
            token: CancellationToken::new(),
            me: me.clone(),
        })
    }

    pub(crate) fn cfg(&self) -> &QueueConfig {
        &self.cfg
    }

    pub(crate) fn bus(&self) -> &Bus {
        &self.bus
    }

    pub(crate) fn exclusivity(&self) -> &Arc<ExclusivityManager> {
        &self.exclusivity
    }

    pub(crate) fn publish(&self, event: Event) {
        self.bus.publish(event);
    }

    pub(crate) fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn(fut);
    }

    /// Accepts a procedure: `Initialized → Pending`, wiring, then poll.
    pub(crate) fn add(&self, procedure: Procedure) -> Result<(), RuntimeError> {
        procedure.will_enqueue(self.me.clone())?;
        lock(&self.active).insert(procedure.id(), procedure.clone());
        self.outstanding.send_modify(|n| *n += 1);

        procedure.add_observer(QueueObserver {
            queue: self.me.clone(),
        });
        if let Some(timeout) = self.cfg.default_timeout() {
            procedure.add_observer(TimeoutObserver::new(timeout));
        }
        for predecessor in procedure.wire_condition_predecessors() {
            if let Err(err) = self.add(predecessor) {
                debug!(procedure = %procedure, error = %err, "condition predecessor not enqueued");
            }
        }

        debug!(procedure = %procedure, "added");
        self.publish(procedure.event(EventKind::ProcedureAdded));
        lock(&self.waiting).push(procedure);
        self.poll();
        Ok(())
    }

    /// Dispatches every waiting procedure that is ready.
    pub(crate) fn poll(&self) {
        let mut ready = {
            let mut waiting = lock(&self.waiting);
            let (ready, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut *waiting)
                .into_iter()
                .filter(|p| !p.is_finished())
                .partition(Procedure::is_ready);
            *waiting = rest;
            ready
        };
        ready.sort_by_key(|p| Reverse(p.user_intent()));
        for procedure in ready {
            self.dispatch(procedure);
        }
    }

    fn dispatch(&self, procedure: Procedure) {
        trace!(procedure = %procedure, "dispatching");
        let semaphore = self
            .semaphore
            .clone()
            .filter(|_| procedure.holds_slot());
        self.runtime.spawn(async move {
            let _permit = match semaphore {
                Some(semaphore) => {
                    let token = procedure.cancel_token().clone();
                    tokio::select! {
                        permit = semaphore.acquire_owned() => permit.ok(),
                        _ = token.cancelled() => None,
                    }
                }
                None => None,
            };
            procedure.run().await;
        });
    }

    pub(crate) fn procedure_finished(&self, id: ProcedureId) {
        if lock(&self.active).remove(&id).is_some() {
            self.outstanding.send_modify(|n| *n = n.saturating_sub(1));
        }
    }

    /// Enqueued procedures that have not finished, ordered by id.
    pub(crate) fn active(&self) -> Vec<Procedure> {
        let mut procedures: Vec<Procedure> = lock(&self.active).values().cloned().collect();
        procedures.sort_by_key(Procedure::id);
        procedures
    }

    pub(crate) fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    pub(crate) async fn wait_until_idle(&self) {
        let mut rx = self.outstanding.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Forwards bus events to `set` until the queue is dropped.
    pub(crate) fn subscriber_listener(&self, set: SubscriberSet) {
        let mut rx = self.bus.subscribe();
        let token = self.token.clone();
        self.runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    ev = rx.recv() => match ev {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "subscriber listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            set.shutdown().await;
        });
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.token.cancel();
        let orphaned = std::mem::take(&mut *lock(&self.waiting));
        if !orphaned.is_empty() {
            debug!(procedures = orphaned.len(), "queue dropped with undispatched procedures");
        }
        for procedure in orphaned {
            procedure.abandon();
        }
    }
}

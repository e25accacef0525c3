//! # Procedure handle and lifecycle.
//!
//! [`Procedure`] is a cheap, cloneable handle to one unit of deferred work.
//! All clones refer to the same lifecycle; dependencies and dependents are
//! tracked through [`WeakProcedure`] so a dependency graph never keeps its
//! nodes alive.
//!
//! ## Lifecycle
//! ```text
//! add(queue) ─► Pending ──(deps finished, lazy on is_ready)──► EvaluatingConditions
//!                  │                                                 │ evaluator (spawned)
//!                  │                                                 ▼
//!                  │ cancelled                                     Ready ──► Executing ──► Work::execute
//!                  ▼                                                 │ cancelled / errors     │
//!              Finishing ◄───────────────────────────────────────────┴────────────────────────┘
//!                  │ on_finish observers
//!                  ▼
//!               Finished ─► done signal ─► host queue / dependents re-polled
//! ```
//!
//! ## Rules
//! - `finish` is idempotent: the first call wins, later calls are ignored.
//! - No lock is held while observers run or while the host queue is polled.
//! - Conditions, dependencies, observers and intent can only be changed
//!   before execution begins; doing so later panics.

use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::FutureExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::conditions::{Condition, evaluate, register_exclusive};
use crate::error::{DisplayErrors, ProcedureError, RuntimeError};
use crate::events::{Event, EventKind};
use crate::observers::Observer;
use crate::procedure::identity::{ProcedureId, UserIntent};
use crate::procedure::state::State;
use crate::procedure::work::{Context, Work};
use crate::procedure::work_fn::ProcedureFn;
use crate::queue::Shared;
use crate::subscribers::panic_message;
use crate::sync::lock;

/// # Handle to a unit of deferred, observable, cancellable work.
///
/// # Example
/// ```
/// use procvisor::{Context, Procedure, ProcedureError, ProcedureQueue};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fetch = Procedure::from_fn("fetch", |_ctx: Context| async { Ok::<_, ProcedureError>(()) });
/// let parse = fetch.then(Procedure::from_fn("parse", |_ctx: Context| async {
///     Ok::<_, ProcedureError>(())
/// }));
///
/// let queue = ProcedureQueue::new();
/// queue.add_all([fetch.clone(), parse.clone()]).unwrap();
/// parse.wait().await;
/// assert!(fetch.is_finished());
/// assert!(!parse.failed());
/// # }
/// ```
#[derive(Clone)]
pub struct Procedure {
    inner: Arc<Inner>,
}

/// Non-owning reference to a [`Procedure`].
#[derive(Clone)]
pub struct WeakProcedure {
    inner: Weak<Inner>,
}

struct Inner {
    id: ProcedureId,
    name: Option<Arc<str>>,
    work: Arc<dyn Work>,
    token: CancellationToken,
    done: watch::Sender<bool>,
    lifecycle: Mutex<Lifecycle>,
}

struct Lifecycle {
    state: State,
    errors: Vec<ProcedureError>,
    dependencies: Vec<WeakProcedure>,
    dependents: Vec<WeakProcedure>,
    conditions: Vec<Arc<dyn Condition>>,
    observers: Vec<Arc<dyn Observer>>,
    intent: UserIntent,
    finishing: bool,
    cancel_notified: bool,
    host: Option<Weak<Shared>>,
}

impl Lifecycle {
    /// Moves to `next`. Returns `false` when absorbed because already finished.
    ///
    /// # Panics
    /// On any edge not allowed by [`State::can_transition_to`].
    fn transition(&mut self, next: State, who: &Procedure) -> bool {
        if self.state == State::Finished {
            return false;
        }
        assert!(
            self.state.can_transition_to(next),
            "illegal state transition for {who}: {} -> {next}",
            self.state
        );
        trace!(procedure = %who, from = %self.state, to = %next, "transition");
        self.state = next;
        true
    }

    fn assert_mutable(&self, who: &Procedure, what: &str) {
        assert!(
            self.state < State::Executing,
            "cannot change {what} of {who} once execution has begun (state: {})",
            self.state
        );
    }

    fn host(&self) -> Option<Arc<Shared>> {
        self.host.as_ref().and_then(Weak::upgrade)
    }
}

impl Procedure {
    /// Creates an unnamed procedure running `work`.
    pub fn new(work: impl Work) -> Self {
        Self::build(None, Arc::new(work))
    }

    /// Creates a named procedure running `work`.
    pub fn named(name: impl Into<Arc<str>>, work: impl Work) -> Self {
        Self::build(Some(name.into()), Arc::new(work))
    }

    /// Creates a named procedure from an async closure.
    pub fn from_fn<F, Fut>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ProcedureError>> + Send + 'static,
    {
        Self::named(name, ProcedureFn::new(f))
    }

    fn build(name: Option<Arc<str>>, work: Arc<dyn Work>) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                id: ProcedureId::next(),
                name,
                work,
                token: CancellationToken::new(),
                done,
                lifecycle: Mutex::new(Lifecycle {
                    state: State::Initialized,
                    errors: Vec::new(),
                    dependencies: Vec::new(),
                    dependents: Vec::new(),
                    conditions: Vec::new(),
                    observers: Vec::new(),
                    intent: UserIntent::default(),
                    finishing: false,
                    cancel_notified: false,
                    host: None,
                }),
            }),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        lock(&self.inner.lifecycle)
    }

    /// Process-unique identity.
    pub fn id(&self) -> ProcedureId {
        self.inner.id
    }

    /// Optional human-readable name.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.lifecycle().state
    }

    pub fn is_executing(&self) -> bool {
        self.state() == State::Executing
    }

    /// `true` once the procedure reached [`State::Finished`].
    pub fn is_finished(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// `true` if any error has been recorded. Never resets.
    pub fn failed(&self) -> bool {
        !self.lifecycle().errors.is_empty()
    }

    /// Snapshot of the recorded errors, in insertion order.
    pub fn errors(&self) -> Vec<ProcedureError> {
        self.lifecycle().errors.clone()
    }

    pub fn user_intent(&self) -> UserIntent {
        self.lifecycle().intent
    }

    /// Sets the scheduling intent.
    ///
    /// # Panics
    /// If execution has already begun.
    pub fn set_user_intent(&self, intent: UserIntent) {
        let mut lc = self.lifecycle();
        lc.assert_mutable(self, "user intent");
        lc.intent = intent;
    }

    /// Returns a weak reference to this procedure.
    pub fn downgrade(&self) -> WeakProcedure {
        WeakProcedure {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.inner.token
    }

    /// Whether this procedure's work takes a concurrency slot on its queue.
    pub(crate) fn holds_slot(&self) -> bool {
        self.inner.work.holds_slot()
    }

    pub(crate) fn host(&self) -> Option<Arc<Shared>> {
        self.lifecycle().host()
    }

    /// Event pre-filled with this procedure's identity.
    pub(crate) fn event(&self, kind: EventKind) -> Event {
        Event::new(kind)
            .with_procedure(self.to_string())
            .with_id(self.id().as_u64())
    }

    // ---- configuration -------------------------------------------------

    /// Attaches a condition.
    ///
    /// Conditions added while the procedure is `Pending` still count: their
    /// predecessors are wired and enqueued on the next poll.
    ///
    /// # Panics
    /// If execution has already begun.
    pub fn add_condition(&self, condition: impl Condition) {
        self.add_condition_arc(Arc::new(condition));
    }

    /// Attaches a shared condition.
    ///
    /// # Panics
    /// If execution has already begun.
    pub fn add_condition_arc(&self, condition: Arc<dyn Condition>) {
        let mut lc = self.lifecycle();
        lc.assert_mutable(self, "conditions");
        lc.conditions.push(condition);
    }

    /// Snapshot of the attached conditions.
    pub fn conditions(&self) -> Vec<Arc<dyn Condition>> {
        self.lifecycle().conditions.clone()
    }

    /// Attaches an observer.
    ///
    /// # Panics
    /// If execution has already begun.
    pub fn add_observer(&self, observer: impl Observer) {
        self.add_observer_arc(Arc::new(observer));
    }

    /// Attaches a shared observer.
    ///
    /// # Panics
    /// If execution has already begun.
    pub fn add_observer_arc(&self, observer: Arc<dyn Observer>) {
        let mut lc = self.lifecycle();
        lc.assert_mutable(self, "observers");
        lc.observers.push(observer);
    }

    /// Makes `dependency` a prerequisite of this procedure.
    ///
    /// Adding the same dependency twice has no effect.
    ///
    /// # Panics
    /// If execution has already begun, or if `dependency` is `self`.
    pub fn add_dependency(&self, dependency: &Procedure) {
        assert!(self != dependency, "{self} cannot depend on itself");
        {
            let mut lc = self.lifecycle();
            lc.assert_mutable(self, "dependencies");
            if lc.dependencies.iter().any(|d| d.is(dependency)) {
                return;
            }
            lc.dependencies.push(dependency.downgrade());
        }
        dependency.lifecycle().dependents.push(self.downgrade());
    }

    /// Adds every procedure in `dependencies` as a dependency.
    pub fn add_dependencies<'a>(&self, dependencies: impl IntoIterator<Item = &'a Procedure>) {
        for dependency in dependencies {
            self.add_dependency(dependency);
        }
    }

    /// Dependencies that are still alive.
    pub fn dependencies(&self) -> Vec<Procedure> {
        self.lifecycle()
            .dependencies
            .iter()
            .filter_map(WeakProcedure::upgrade)
            .collect()
    }

    /// Makes `next` depend on `self` and returns it, for chaining.
    pub fn then(&self, next: Procedure) -> Procedure {
        next.add_dependency(self);
        next
    }

    // ---- readiness -----------------------------------------------------

    /// Readiness check used by the queue.
    ///
    /// In `Pending`, condition predecessors are wired as dependencies first.
    /// Once every dependency has finished, this call moves the
    /// procedure to `EvaluatingConditions`, starts condition evaluation on
    /// the host runtime and returns `false`.
    pub fn is_ready(&self) -> bool {
        let state = self.state();
        let cancelled = self.is_cancelled();
        match state {
            State::Initialized => cancelled,
            State::Pending => {
                if cancelled {
                    return true;
                }
                let unqueued = self.wire_condition_predecessors();
                if !unqueued.is_empty() {
                    self.enqueue_later(unqueued);
                    return false;
                }
                if dependencies_finished(&self.lifecycle().dependencies) {
                    self.start_evaluation();
                }
                false
            }
            State::Ready => cancelled || dependencies_finished(&self.lifecycle().dependencies),
            _ => false,
        }
    }

    /// Makes every condition predecessor a dependency of this procedure.
    ///
    /// Returns the predecessors that are not on any queue yet.
    pub(crate) fn wire_condition_predecessors(&self) -> Vec<Procedure> {
        let predecessors: Vec<Procedure> = self
            .conditions()
            .iter()
            .filter_map(|condition| condition.dependency())
            .collect();
        for predecessor in &predecessors {
            self.add_dependency(predecessor);
        }
        predecessors
            .into_iter()
            .filter(|p| p.state() == State::Initialized)
            .collect()
    }

    /// Enqueues `predecessors` on this procedure's queue from a spawned task,
    /// outside the poll that discovered them.
    fn enqueue_later(&self, predecessors: Vec<Procedure>) {
        let Some(host) = self.host() else {
            return;
        };
        let queue = Arc::clone(&host);
        let who = self.to_string();
        host.spawn(async move {
            for predecessor in predecessors {
                if let Err(err) = queue.add(predecessor) {
                    debug!(procedure = %who, error = %err, "condition predecessor not enqueued");
                }
            }
        });
    }

    fn start_evaluation(&self) {
        let (conditions, host) = {
            let mut lc = self.lifecycle();
            if lc.state != State::Pending || self.is_cancelled() {
                return;
            }
            let Some(host) = lc.host() else {
                return;
            };
            lc.transition(State::EvaluatingConditions, self);
            (lc.conditions.clone(), host)
        };

        for (category, previous) in register_exclusive(self, &conditions, host.exclusivity()) {
            let mut ev = self
                .event(EventKind::ExclusivityRegistered)
                .with_category(category);
            if let Some(previous) = previous {
                ev = ev.with_reason(previous.to_string());
            }
            host.publish(ev);
        }

        let procedure = self.clone();
        let runtime = Arc::clone(&host);
        runtime.spawn(async move {
            let errors = evaluate(&procedure, &conditions).await;
            procedure.conditions_evaluated(errors, &host);
        });
    }

    fn conditions_evaluated(&self, errors: Vec<ProcedureError>, host: &Arc<Shared>) {
        let count = {
            let mut lc = self.lifecycle();
            lc.errors.extend(errors);
            lc.transition(State::Ready, self);
            lc.errors.len()
        };
        debug!(procedure = %self, errors = count, "conditions evaluated");
        host.publish(self.event(EventKind::ConditionsEvaluated).with_errors(count));
        host.poll();
    }

    pub(crate) fn will_enqueue(&self, host: Weak<Shared>) -> Result<(), RuntimeError> {
        let mut lc = self.lifecycle();
        if lc.state != State::Initialized {
            return Err(RuntimeError::AlreadyEnqueued {
                procedure: self.to_string(),
            });
        }
        lc.host = Some(host);
        lc.transition(State::Pending, self);
        Ok(())
    }

    // ---- execution -----------------------------------------------------

    /// Runs the procedure once dispatched by its queue.
    pub(crate) async fn run(&self) {
        let observers = {
            let mut lc = self.lifecycle();
            if lc.finishing {
                return;
            }
            if self.is_cancelled() || !lc.errors.is_empty() {
                None
            } else {
                lc.transition(State::Executing, self);
                Some(lc.observers.clone())
            }
        };
        let Some(observers) = observers else {
            self.finish(Vec::new());
            return;
        };

        for observer in &observers {
            self.notify("on_start", || observer.on_start(self));
        }
        debug!(procedure = %self, "executing");
        if let Some(host) = self.host() {
            host.publish(self.event(EventKind::ProcedureStarting));
        }

        let fut = self.inner.work.execute(Context::new(self.clone()));
        let errors = match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(())) => Vec::new(),
            Ok(Err(err)) => vec![err],
            Err(payload) => {
                let info = panic_message(payload.as_ref());
                warn!(procedure = %self, panic = %info, "work panicked");
                vec![ProcedureError::Panicked { info }]
            }
        };
        self.finish(errors);
    }

    /// Hands `procedure` to this procedure's observers (`on_produce`).
    ///
    /// When this procedure runs on a queue, the queue enqueues the produced
    /// procedure.
    pub fn produce(&self, procedure: Procedure) {
        let observers = self.lifecycle().observers.clone();
        debug!(procedure = %self, produced = %procedure, "produced");
        if let Some(host) = self.host() {
            host.publish(
                self.event(EventKind::ProcedureProduced)
                    .with_reason(procedure.to_string()),
            );
        }
        for observer in &observers {
            self.notify("on_produce", || observer.on_produce(self, &procedure));
        }
    }

    /// Finishes the procedure with `errors` appended.
    ///
    /// Idempotent: only the first call has any effect.
    ///
    /// # Panics
    /// If the procedure has not been enqueued or is still evaluating
    /// conditions.
    pub fn finish(&self, errors: Vec<ProcedureError>) {
        let (observers, errors, host) = {
            let mut lc = self.lifecycle();
            if lc.finishing {
                if !errors.is_empty() {
                    debug!(procedure = %self, ignored = %DisplayErrors(&errors), "already finishing");
                }
                return;
            }
            lc.transition(State::Finishing, self);
            lc.finishing = true;
            lc.errors.extend(errors);
            (lc.observers.clone(), lc.errors.clone(), lc.host())
        };

        for observer in &observers {
            self.notify("on_finish", || observer.on_finish(self, &errors));
        }

        let dependents = {
            let mut lc = self.lifecycle();
            lc.transition(State::Finished, self);
            self.inner.done.send_replace(true);
            std::mem::take(&mut lc.dependents)
        };

        if errors.is_empty() {
            debug!(procedure = %self, "finished");
        } else {
            debug!(procedure = %self, errors = %DisplayErrors(&errors), "finished with errors");
        }
        if let Some(host) = &host {
            let mut ev = self
                .event(EventKind::ProcedureFinished)
                .with_errors(errors.len());
            if !errors.is_empty() {
                ev = ev.with_reason(DisplayErrors(&errors).to_string());
            }
            host.publish(ev);
            host.procedure_finished(self.id());
        }
        for dependent in dependents.iter().filter_map(WeakProcedure::upgrade) {
            dependent.wake_host();
        }
    }

    /// Resolves once the procedure is finished.
    pub async fn wait(&self) {
        let mut rx = self.inner.done.subscribe();
        let _ = rx.wait_for(|done| *done).await;
    }

    /// Receiver of the finished flag that does not keep the procedure alive.
    pub(crate) fn finished_receiver(&self) -> watch::Receiver<bool> {
        self.inner.done.subscribe()
    }

    fn wake_host(&self) {
        if let Some(host) = self.host() {
            host.poll();
        }
    }

    // ---- cancellation --------------------------------------------------

    /// Cancels the procedure without adding errors.
    pub fn cancel(&self) {
        self.cancel_with_errors(Vec::new());
    }

    /// Cancels the procedure, recording `error`.
    pub fn cancel_with_error(&self, error: ProcedureError) {
        self.cancel_with_errors(vec![error]);
    }

    /// Cancels the procedure, recording `errors`.
    ///
    /// Has no effect once the procedure is finishing. `on_cancel` observers
    /// run on the first cancellation only.
    pub fn cancel_with_errors(&self, errors: Vec<ProcedureError>) {
        let (observers, errors, host) = {
            let mut lc = self.lifecycle();
            if lc.finishing {
                return;
            }
            lc.errors.extend(errors);
            self.inner.token.cancel();
            if lc.cancel_notified {
                return;
            }
            lc.cancel_notified = true;
            (lc.observers.clone(), lc.errors.clone(), lc.host())
        };

        debug!(procedure = %self, errors = errors.len(), "cancelled");
        for observer in &observers {
            self.notify("on_cancel", || observer.on_cancel(self, &errors));
        }
        if let Some(host) = host {
            host.publish(
                self.event(EventKind::ProcedureCancelled)
                    .with_errors(errors.len()),
            );
            host.poll();
        }
    }

    /// Cancels the procedure and finishes it unless it is evaluating
    /// conditions. Used when its queue goes away before dispatching it.
    pub(crate) fn abandon(&self) {
        self.cancel();
        if matches!(self.state(), State::Pending | State::Ready) {
            self.finish(Vec::new());
        }
    }

    /// Runs one observer callback, isolating panics.
    fn notify(&self, callback: &str, f: impl FnOnce()) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
            warn!(
                procedure = %self,
                callback,
                panic = %panic_message(payload.as_ref()),
                "observer panicked"
            );
        }
    }
}

/// `true` when every live dependency has finished. Dropped dependencies
/// count as finished.
fn dependencies_finished(dependencies: &[WeakProcedure]) -> bool {
    dependencies
        .iter()
        .all(|d| d.upgrade().is_none_or(|p| p.is_finished()))
}

impl WeakProcedure {
    /// Upgrades to a strong handle if the procedure is still alive.
    pub fn upgrade(&self) -> Option<Procedure> {
        self.inner.upgrade().map(|inner| Procedure { inner })
    }

    fn is(&self, procedure: &Procedure) -> bool {
        std::ptr::eq(self.inner.as_ptr(), Arc::as_ptr(&procedure.inner))
    }
}

impl PartialEq for Procedure {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Procedure {}

impl Hash for Procedure {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} {}", self.id()),
            None => write!(f, "Unnamed Procedure {}", self.id()),
        }
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("id", &self.id().as_u64())
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for WeakProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(p) => write!(f, "WeakProcedure({p})"),
            None => f.write_str("WeakProcedure(dropped)"),
        }
    }
}

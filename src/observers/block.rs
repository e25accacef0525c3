//! Closure-backed [`Observer`].

use crate::error::ProcedureError;
use crate::observers::Observer;
use crate::procedure::Procedure;

type StartFn = Box<dyn Fn(&Procedure) + Send + Sync>;
type ProduceFn = Box<dyn Fn(&Procedure, &Procedure) + Send + Sync>;
type ErrorsFn = Box<dyn Fn(&Procedure, &[ProcedureError]) + Send + Sync>;

/// Observer assembled from optional closures.
///
/// ```
/// use procvisor::BlockObserver;
///
/// let observer = BlockObserver::new()
///     .with_start(|p| println!("{p} started"))
///     .with_finish(|p, errors| println!("{p} finished with {} errors", errors.len()));
/// # let _ = observer;
/// ```
#[derive(Default)]
pub struct BlockObserver {
    start: Option<StartFn>,
    produce: Option<ProduceFn>,
    cancel: Option<ErrorsFn>,
    finish: Option<ErrorsFn>,
}

impl BlockObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start(mut self, f: impl Fn(&Procedure) + Send + Sync + 'static) -> Self {
        self.start = Some(Box::new(f));
        self
    }

    pub fn with_produce(
        mut self,
        f: impl Fn(&Procedure, &Procedure) + Send + Sync + 'static,
    ) -> Self {
        self.produce = Some(Box::new(f));
        self
    }

    pub fn with_cancel(
        mut self,
        f: impl Fn(&Procedure, &[ProcedureError]) + Send + Sync + 'static,
    ) -> Self {
        self.cancel = Some(Box::new(f));
        self
    }

    pub fn with_finish(
        mut self,
        f: impl Fn(&Procedure, &[ProcedureError]) + Send + Sync + 'static,
    ) -> Self {
        self.finish = Some(Box::new(f));
        self
    }
}

impl Observer for BlockObserver {
    fn on_start(&self, procedure: &Procedure) {
        if let Some(f) = &self.start {
            f(procedure);
        }
    }

    fn on_produce(&self, procedure: &Procedure, produced: &Procedure) {
        if let Some(f) = &self.produce {
            f(procedure, produced);
        }
    }

    fn on_cancel(&self, procedure: &Procedure, errors: &[ProcedureError]) {
        if let Some(f) = &self.cancel {
            f(procedure, errors);
        }
    }

    fn on_finish(&self, procedure: &Procedure, errors: &[ProcedureError]) {
        if let Some(f) = &self.finish {
            f(procedure, errors);
        }
    }
}

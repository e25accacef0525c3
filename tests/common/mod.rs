#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use procvisor::{
    Context, ExclusivityManager, Procedure, ProcedureError, ProcedureQueue, QueueConfig,
};

/// Installs a test tracing subscriber once (`RUST_LOG` controls verbosity).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Queue with an isolated exclusivity manager.
pub fn queue() -> (ProcedureQueue, Arc<ExclusivityManager>) {
    queue_with(QueueConfig::default())
}

pub fn queue_with(cfg: QueueConfig) -> (ProcedureQueue, Arc<ExclusivityManager>) {
    init_tracing();
    let manager = Arc::new(ExclusivityManager::new());
    let queue = ProcedureQueue::builder(cfg)
        .with_exclusivity(manager.clone())
        .build();
    (queue, manager)
}

/// Fails the test if `fut` does not complete within five seconds.
pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("operation timed out")
}

/// Shared log of procedure names in execution order.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, name: &str) {
        self.0.lock().unwrap().push(name.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Procedure that records its name when it executes.
pub fn recording(name: &str, journal: &Journal) -> Procedure {
    let journal = journal.clone();
    let label = name.to_string();
    Procedure::from_fn(name.to_string(), move |_ctx: Context| {
        journal.record(&label);
        async { Ok(()) }
    })
}

/// Procedure that counts executions and succeeds.
pub fn counting(name: &str, counter: &Arc<AtomicUsize>) -> Procedure {
    let counter = counter.clone();
    Procedure::from_fn(name.to_string(), move |_ctx: Context| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
    })
}

/// Procedure that always fails with `reason`.
pub fn failing(name: &str, reason: &'static str) -> Procedure {
    Procedure::from_fn(name.to_string(), move |_ctx: Context| async move {
        Err(ProcedureError::fail(reason))
    })
}

/// Procedure that succeeds immediately.
pub fn ok(name: &str) -> Procedure {
    Procedure::from_fn(name.to_string(), |_ctx: Context| async { Ok(()) })
}

/// Tracks how many bodies run at once and the maximum observed.
#[derive(Clone, Default)]
pub struct Concurrency {
    running: Arc<AtomicUsize>,
    max: Arc<AtomicUsize>,
}

impl Concurrency {
    pub fn enter(&self) {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

/// Procedure that holds a concurrency slot for `hold`.
pub fn tracked(name: &str, concurrency: &Concurrency, hold: Duration) -> Procedure {
    let concurrency = concurrency.clone();
    Procedure::from_fn(name.to_string(), move |_ctx: Context| {
        let concurrency = concurrency.clone();
        async move {
            concurrency.enter();
            tokio::time::sleep(hold).await;
            concurrency.exit();
            Ok(())
        }
    })
}

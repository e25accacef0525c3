mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use procvisor::{
    Attempt, Backoff, Context, Delay, Procedure, ProcedureError, QueueConfig, Retry,
    RetryProcedure,
};
use tokio::sync::Notify;

use common::{failing, queue, queue_with, within};

/// Factory producing attempts that fail until `succeed_after` attempts ran.
fn flaky(calls: &Arc<AtomicU32>, succeed_after: u32) -> impl FnMut() -> Option<Attempt> + Send + use<> {
    let calls = calls.clone();
    move || {
        let calls = calls.clone();
        let attempt = Procedure::from_fn("flaky", move |_ctx: Context| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n > succeed_after {
                    Ok(())
                } else {
                    Err(ProcedureError::fail(format!("attempt {n}")))
                }
            }
        });
        Some(Attempt::new(attempt))
    }
}

async fn run(retry: &RetryProcedure) {
    let (queue, _) = queue();
    queue.add(retry.procedure().clone()).unwrap();
    within(retry.procedure().wait()).await;
    within(queue.wait_until_idle()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn factory_exhaustion_is_terminal() {
    let attempts: Vec<Procedure> = (0..5).map(|i| failing(&format!("attempt-{i}"), "nope")).collect();
    let retry = Retry::attempts(attempts)
        .with_max_count(10)
        .with_backoff(Backoff::None)
        .into_procedure("five-then-nil");
    run(&retry).await;

    assert_eq!(retry.count(), 5);
    assert_eq!(retry.recovered_errors().len(), 4);
    assert_eq!(retry.failed_errors().len(), 1);
    assert_eq!(retry.procedure().errors().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn max_count_limits_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let retry = Retry::new(flaky(&calls, u32::MAX))
        .with_max_count(3)
        .with_backoff(Backoff::None)
        .into_procedure("limited");
    run(&retry).await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(retry.count(), 3);
    assert_eq!(retry.recovered_errors().len(), 2);
    assert_eq!(retry.failed_errors().len(), 1);
    assert!(retry.procedure().failed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn default_max_count_is_five() {
    let calls = Arc::new(AtomicU32::new(0));
    let retry = Retry::new(flaky(&calls, u32::MAX))
        .with_backoff(Backoff::None)
        .into_procedure("default-limit");
    run(&retry).await;
    assert_eq!(retry.count(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn success_stops_retrying() {
    let calls = Arc::new(AtomicU32::new(0));
    let retry = Retry::new(flaky(&calls, 2))
        .with_backoff(Backoff::None)
        .into_procedure("eventually");
    run(&retry).await;

    assert_eq!(retry.count(), 3);
    assert_eq!(retry.recovered_errors().len(), 2);
    assert!(retry.failed_errors().is_empty());
    assert!(!retry.procedure().failed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn handler_returning_none_stops_after_first_attempt() {
    let calls = Arc::new(AtomicU32::new(0));
    let retry = Retry::new(flaky(&calls, u32::MAX))
        .with_handler(|_, _| None)
        .into_procedure("no-retry");
    run(&retry).await;

    assert_eq!(retry.count(), 1);
    assert!(retry.recovered_errors().is_empty());
    assert_eq!(retry.failed_errors().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn handler_sees_history_before_classification() {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let retry = Retry::new(flaky(&calls, u32::MAX))
        .with_max_count(3)
        .with_backoff(Backoff::Fixed(Duration::from_millis(5)))
        .with_handler({
            let seen = seen.clone();
            move |info, recommended| {
                seen.lock().unwrap().push((
                    info.count,
                    info.errors.len(),
                    info.recovered.len(),
                    recommended.delay,
                ));
                Some(recommended)
            }
        })
        .into_procedure("history");
    run(&retry).await;

    let delay = Some(Delay::By(Duration::from_millis(5)));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![(1, 1, 0, delay), (2, 1, 1, delay)]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn backoff_spaces_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let retry = Retry::new(flaky(&calls, 1))
        .with_backoff(Backoff::Fixed(Duration::from_millis(40)))
        .into_procedure("spaced");

    let started = tokio::time::Instant::now();
    run(&retry).await;
    assert!(started.elapsed() >= Duration::from_millis(40));
    assert_eq!(retry.count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn empty_factory_fails_with_no_more_attempts() {
    let retry = Retry::new(|| None).into_procedure("empty");
    run(&retry).await;

    assert_eq!(retry.count(), 0);
    assert!(matches!(
        retry.procedure().errors().as_slice(),
        [ProcedureError::NoMoreAttempts]
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelling_driver_cancels_running_attempt() {
    let started = Arc::new(Notify::new());
    let attempt = Procedure::from_fn("long", {
        let started = started.clone();
        move |ctx: Context| {
            let started = started.clone();
            async move {
                started.notify_one();
                ctx.cancelled().await;
                Err(ProcedureError::fail("interrupted"))
            }
        }
    });
    let retry = Retry::attempts([attempt.clone()]).into_procedure("cancellable");

    let (queue, _) = queue();
    queue.add(retry.procedure().clone()).unwrap();
    within(started.notified()).await;
    retry.procedure().cancel();

    within(retry.procedure().wait()).await;
    assert!(attempt.is_cancelled());
    assert!(attempt.is_finished());
    assert_eq!(retry.count(), 1);
    assert_eq!(retry.failed_errors().len(), 1);
    within(queue.wait_until_idle()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn driver_does_not_take_the_only_slot() {
    let (queue, _) = queue_with(QueueConfig {
        max_concurrent: 1,
        ..QueueConfig::default()
    });
    let retry = Retry::attempts([failing("a0", "busy"), failing("a1", "still busy")])
        .with_backoff(Backoff::Fixed(Duration::from_millis(10)))
        .into_procedure("single-slot");

    queue.add(retry.procedure().clone()).unwrap();
    within(retry.procedure().wait()).await;
    within(queue.wait_until_idle()).await;

    assert_eq!(retry.count(), 2);
    assert_eq!(retry.recovered_errors().len(), 1);
    assert_eq!(retry.failed_errors().len(), 1);
}

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use procvisor::{
    Backoff, Context, Delay, DelayProcedure, Event, EventKind, Group, Procedure, ProcedureError,
    ProcedureQueue, QueueConfig, Retry, RuntimeError, State, Subscribe,
};
use tokio::sync::Notify;

use common::{Concurrency, counting, failing, ok, queue, queue_with, tracked, within};

/// Procedure that runs until cancelled.
fn until_cancelled(name: &str) -> Procedure {
    Procedure::from_fn(name.to_string(), |ctx: Context| async move {
        ctx.cancelled().await;
        Ok::<_, ProcedureError>(())
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn max_concurrent_limits_executing_procedures() {
    let (queue, _) = queue_with(QueueConfig {
        max_concurrent: 2,
        ..QueueConfig::default()
    });
    let concurrency = Concurrency::default();
    let procedures: Vec<Procedure> = (0..6)
        .map(|i| tracked(&format!("slot-{i}"), &concurrency, Duration::from_millis(20)))
        .collect();

    queue.add_all(procedures.iter().cloned()).unwrap();
    within(queue.wait_until_idle()).await;

    assert!(concurrency.max() <= 2, "max was {}", concurrency.max());
    assert!(procedures.iter().all(Procedure::is_finished));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn len_tracks_unfinished_procedures() {
    let (queue, _) = queue();
    assert!(queue.is_empty());

    let a = until_cancelled("a");
    let b = until_cancelled("b");
    queue.add_all([a.clone(), b.clone()]).unwrap();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.procedures(), vec![a.clone(), b.clone()]);

    a.cancel();
    within(a.wait()).await;
    within(async {
        while queue.len() != 1 {
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert_eq!(queue.procedures(), vec![b.clone()]);

    queue.cancel_all();
    within(queue.wait_until_idle()).await;
    assert!(b.is_cancelled());
    assert!(queue.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shutdown_finishes_within_grace() {
    let (queue, _) = queue_with(QueueConfig {
        grace: Duration::from_secs(2),
        ..QueueConfig::default()
    });
    let workers: Vec<Procedure> = (0..3).map(|i| until_cancelled(&format!("worker-{i}"))).collect();
    queue.add_all(workers.iter().cloned()).unwrap();

    within(queue.shutdown()).await.unwrap();
    assert!(workers.iter().all(|w| w.is_finished() && w.is_cancelled()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shutdown_reports_stuck_procedures() {
    let (queue, _) = queue_with(QueueConfig {
        grace: Duration::from_millis(50),
        ..QueueConfig::default()
    });
    let release = Arc::new(Notify::new());
    let stubborn = Procedure::from_fn("stubborn", {
        let release = release.clone();
        move |_ctx: Context| {
            let release = release.clone();
            async move {
                release.notified().await;
                Ok::<_, ProcedureError>(())
            }
        }
    });
    queue.add(stubborn.clone()).unwrap();
    within(async {
        while stubborn.state() != State::Executing {
            tokio::task::yield_now().await;
        }
    })
    .await;

    let mut events = queue.subscribe();
    match within(queue.shutdown()).await {
        Err(RuntimeError::GraceExceeded { stuck, .. }) => {
            assert_eq!(stuck, vec![stubborn.to_string()]);
        }
        other => panic!("expected GraceExceeded, got {other:?}"),
    }

    let mut kinds = Vec::new();
    while let Ok(ev) = events.try_recv() {
        kinds.push(ev.kind);
    }
    assert_eq!(kinds.first(), Some(&EventKind::ShutdownRequested));
    assert_eq!(kinds.last(), Some(&EventKind::GraceExceeded));

    release.notify_one();
    within(stubborn.wait()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lifecycle_events_are_published_in_order() {
    let (queue, _) = queue();
    let mut events = queue.subscribe();
    let p = ok("observed");
    queue.add(p.clone()).unwrap();
    within(queue.wait_until_idle()).await;

    let mut kinds = Vec::new();
    while let Ok(ev) = events.try_recv() {
        if ev.id == Some(p.id().as_u64()) {
            kinds.push(ev.kind);
        }
    }
    assert_eq!(
        kinds,
        vec![
            EventKind::ProcedureAdded,
            EventKind::ConditionsEvaluated,
            EventKind::ProcedureStarting,
            EventKind::ProcedureFinished,
        ]
    );
}

#[derive(Default)]
struct Collector(Mutex<Vec<Event>>);

#[async_trait]
impl Subscribe for Collector {
    async fn on_event(&self, event: &Event) {
        self.0.lock().unwrap().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn subscribers_receive_failures() {
    let collector = Arc::new(Collector::default());
    let queue = ProcedureQueue::builder(QueueConfig::default())
        .with_exclusivity(Arc::new(procvisor::ExclusivityManager::new()))
        .with_subscribers(vec![collector.clone()])
        .build();

    let broken = failing("broken", "disk full");
    queue.add(broken.clone()).unwrap();
    within(queue.wait_until_idle()).await;

    within(async {
        loop {
            let done = collector
                .0
                .lock()
                .unwrap()
                .iter()
                .any(|ev| ev.kind == EventKind::ProcedureFinished);
            if done {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    let events = collector.0.lock().unwrap();
    let finished = events
        .iter()
        .find(|ev| ev.kind == EventKind::ProcedureFinished)
        .unwrap();
    assert!(finished.is_failure());
    assert_eq!(finished.procedure.as_deref(), Some(broken.to_string().as_str()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn group_runs_children_and_collects_errors() {
    let (queue, _) = queue();
    let runs = Arc::new(AtomicUsize::new(0));
    let group = Group::new([
        counting("first", &runs),
        failing("second", "bad input"),
        counting("third", &runs),
    ])
    .with_max_concurrent(1)
    .into_procedure("batch");

    queue.add(group.procedure().clone()).unwrap();
    within(group.procedure().wait()).await;

    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert!(group.children().iter().all(Procedure::is_finished));
    let errors = group.procedure().errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0], ProcedureError::Fail { reason } if reason == "bad input"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn group_accepts_children_while_running() {
    let (queue, _) = queue();
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let gate = Procedure::from_fn("gate", {
        let started = started.clone();
        let release = release.clone();
        move |_ctx: Context| {
            let started = started.clone();
            let release = release.clone();
            async move {
                started.notify_one();
                release.notified().await;
                Ok::<_, ProcedureError>(())
            }
        }
    });
    let group = Group::new([gate]).into_procedure("open-group");
    queue.add(group.procedure().clone()).unwrap();
    within(started.notified()).await;

    let late = ok("late");
    group.add_child(late.clone()).unwrap();
    within(late.wait()).await;
    assert!(!group.procedure().is_finished());

    release.notify_one();
    within(group.procedure().wait()).await;
    assert_eq!(group.children().len(), 2);
    assert!(!group.procedure().failed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelling_group_with_error_cancels_children() {
    let (queue, _) = queue();
    let child = until_cancelled("child");
    let group = Group::new([child.clone()]).into_procedure("doomed");
    queue.add(group.procedure().clone()).unwrap();
    within(async {
        while child.state() != State::Executing {
            tokio::task::yield_now().await;
        }
    })
    .await;

    group
        .procedure()
        .cancel_with_error(ProcedureError::fail("operator abort"));
    within(group.procedure().wait()).await;

    assert!(child.is_cancelled());
    assert!(matches!(
        child.errors().as_slice(),
        [ProcedureError::ParentCancelled { errors }] if errors.len() == 1
    ));
    // operator abort + the child's ParentCancelled
    assert_eq!(group.procedure().errors().len(), 2);
    within(queue.wait_until_idle()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn group_cancelled_before_start_never_runs_children() {
    let (queue, _) = queue();
    let runs = Arc::new(AtomicUsize::new(0));
    let child = counting("child", &runs);
    let group = Group::new([child.clone()]).into_procedure("skipped");
    group.procedure().cancel();

    queue.add(group.procedure().clone()).unwrap();
    within(group.procedure().wait()).await;

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert!(child.is_cancelled());
    assert_eq!(child.state(), State::Initialized);
}

#[tokio::test(start_paused = true)]
async fn delay_procedure_waits_for_interval() {
    let (queue, _) = queue();
    let delay = DelayProcedure::procedure(Delay::By(Duration::from_secs(30)));
    let after = ok("after");
    after.add_dependency(&delay);

    let started = tokio::time::Instant::now();
    queue.add_all([delay.clone(), after.clone()]).unwrap();
    queue.wait_until_idle().await;

    assert!(started.elapsed() >= Duration::from_secs(30));
    assert!(after.is_finished() && !after.failed());
}

#[tokio::test(start_paused = true)]
async fn cancelled_delay_finishes_early() {
    let (queue, _) = queue();
    let delay = DelayProcedure::procedure(Delay::By(Duration::from_secs(3600)));
    queue.add(delay.clone()).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let started = tokio::time::Instant::now();
    delay.cancel();
    delay.wait().await;
    assert!(started.elapsed() < Duration::from_secs(3600));
    assert!(delay.is_cancelled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn composites_do_not_starve_a_limited_queue() {
    let (queue, _) = queue_with(QueueConfig {
        max_concurrent: 1,
        ..QueueConfig::default()
    });
    let retry = Retry::attempts([failing("try-0", "flaky"), ok("try-1")])
        .with_backoff(Backoff::Fixed(Duration::from_millis(10)))
        .into_procedure("nested-retry");
    let runs = Arc::new(AtomicUsize::new(0));
    let group = Group::new([retry.procedure().clone(), counting("sibling", &runs)])
        .with_max_concurrent(1)
        .into_procedure("limited-group");
    let outer = counting("outer", &runs);

    queue
        .add_all([group.procedure().clone(), outer.clone()])
        .unwrap();
    within(queue.wait_until_idle()).await;

    assert!(group.procedure().is_finished());
    assert!(!group.procedure().failed());
    assert_eq!(retry.count(), 2);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn limited_queue_still_bounds_plain_work_next_to_a_driver() {
    let (queue, _) = queue_with(QueueConfig {
        max_concurrent: 1,
        ..QueueConfig::default()
    });
    let concurrency = Concurrency::default();
    let retry = Retry::attempts([
        tracked("attempt-0", &concurrency, Duration::from_millis(20)),
    ])
    .into_procedure("driver");
    let plain: Vec<Procedure> = (0..3)
        .map(|i| tracked(&format!("plain-{i}"), &concurrency, Duration::from_millis(20)))
        .collect();

    queue.add(retry.procedure().clone()).unwrap();
    queue.add_all(plain.iter().cloned()).unwrap();
    within(queue.wait_until_idle()).await;

    assert_eq!(concurrency.max(), 1);
    assert_eq!(retry.count(), 1);
    assert!(!retry.procedure().failed());
}

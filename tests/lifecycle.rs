mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use procvisor::{
    BlockObserver, Context, Procedure, ProcedureError, QueueConfig, State, TrueCondition,
};

use common::{Journal, counting, failing, ok, queue, queue_with, recording, within};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn procedure_runs_to_finished() {
    let (queue, _) = queue();
    let p = ok("simple");
    queue.add(p.clone()).unwrap();

    within(p.wait()).await;
    assert_eq!(p.state(), State::Finished);
    assert!(p.is_finished());
    assert!(!p.failed());
    within(queue.wait_until_idle()).await;
    assert!(queue.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn work_error_is_recorded() {
    let (queue, _) = queue();
    let p = failing("broken", "boom");
    queue.add(p.clone()).unwrap();

    within(p.wait()).await;
    let errors = p.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].to_string(), "execution failed: boom");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn finish_is_idempotent_under_concurrent_callers() {
    let (queue, _) = queue();
    let finishes = Arc::new(AtomicUsize::new(0));

    let p = Procedure::from_fn("racy", |ctx: Context| async move {
        let threads: Vec<_> = (0..16)
            .map(|i| {
                let ctx = ctx.clone();
                std::thread::spawn(move || ctx.finish(vec![ProcedureError::fail(format!("e{i}"))]))
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        Ok(())
    });
    let seen = finishes.clone();
    p.add_observer(BlockObserver::new().with_finish(move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
    }));

    queue.add(p.clone()).unwrap();
    within(p.wait()).await;

    assert_eq!(finishes.load(Ordering::SeqCst), 1);
    assert_eq!(p.errors().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_before_start_skips_execute() {
    let (queue, _) = queue();
    let executed = Arc::new(AtomicUsize::new(0));
    let started = Arc::new(AtomicUsize::new(0));

    let p = counting("cancelled", &executed);
    let seen = started.clone();
    p.add_observer(BlockObserver::new().with_start(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    }));
    p.cancel();
    queue.add(p.clone()).unwrap();

    within(p.wait()).await;
    assert!(p.is_cancelled());
    assert!(!p.failed());
    assert_eq!(executed.load(Ordering::SeqCst), 0);
    assert_eq!(started.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_with_error_while_waiting_for_dependency() {
    let (queue, _) = queue();
    let gate = Procedure::from_fn("gate", |ctx: Context| async move {
        ctx.cancelled().await;
        Ok(())
    });
    let executed = Arc::new(AtomicUsize::new(0));
    let p = counting("dependent", &executed);
    p.add_dependency(&gate);

    queue.add_all([p.clone(), gate.clone()]).unwrap();
    p.cancel_with_error(ProcedureError::fail("not needed"));

    within(p.wait()).await;
    assert!(p.failed());
    assert_eq!(executed.load(Ordering::SeqCst), 0);

    gate.cancel();
    within(queue.wait_until_idle()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dependencies_finish_first() {
    let (queue, _) = queue();
    let journal = Journal::default();
    let first = Procedure::from_fn("first", {
        let journal = journal.clone();
        move |_ctx: Context| {
            let journal = journal.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                journal.record("first");
                Ok(())
            }
        }
    });
    let second = first.then(recording("second", &journal));

    queue.add(second.clone()).unwrap();
    queue.add(first.clone()).unwrap();
    within(queue.wait_until_idle()).await;

    assert_eq!(journal.entries(), vec!["first", "second"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dropped_dependency_counts_as_finished() {
    let (queue, _) = queue();
    let executed = Arc::new(AtomicUsize::new(0));
    let p = counting("orphan", &executed);
    {
        let never_enqueued = ok("ghost");
        p.add_dependency(&never_enqueued);
    }
    queue.add(p.clone()).unwrap();
    within(p.wait()).await;
    assert_eq!(executed.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn panicking_work_is_recorded() {
    let (queue, _) = queue();
    let p = Procedure::from_fn("explodes", |_ctx: Context| async move {
        if true {
            panic!("kaboom");
        }
        Ok(())
    });
    queue.add(p.clone()).unwrap();

    within(p.wait()).await;
    let errors = p.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].as_label(), "procedure_panicked");
    assert_eq!(errors[0].to_string(), "panicked: kaboom");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn default_timeout_cancels_with_error() {
    let (queue, _) = queue_with(QueueConfig {
        timeout: Duration::from_millis(50),
        ..QueueConfig::default()
    });
    let p = Procedure::from_fn("slow", |ctx: Context| async move {
        ctx.cancelled().await;
        Ok(())
    });
    queue.add(p.clone()).unwrap();

    within(p.wait()).await;
    assert!(p.is_cancelled());
    assert!(matches!(
        p.errors().as_slice(),
        [ProcedureError::Timeout { timeout }] if *timeout == Duration::from_millis(50)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn produced_procedures_run_on_the_same_queue() {
    let (queue, _) = queue();
    let journal = Journal::default();
    let child = recording("child", &journal);

    let parent = Procedure::from_fn("parent", {
        let child = child.clone();
        move |ctx: Context| {
            ctx.produce(child.clone());
            async { Ok(()) }
        }
    });
    queue.add(parent.clone()).unwrap();

    within(child.wait()).await;
    assert_eq!(journal.entries(), vec!["child"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn observers_see_start_before_finish() {
    let (queue, _) = queue();
    let journal = Journal::default();
    let p = ok("observed");
    p.add_observer(
        BlockObserver::new()
            .with_start({
                let journal = journal.clone();
                move |_| journal.record("start")
            })
            .with_finish({
                let journal = journal.clone();
                move |_, _| journal.record("finish")
            }),
    );
    queue.add(p.clone()).unwrap();

    within(p.wait()).await;
    assert_eq!(journal.entries(), vec!["start", "finish"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn adding_twice_is_rejected() {
    let (queue, _) = queue();
    let p = ok("once");
    queue.add(p.clone()).unwrap();
    let err = queue.add(p.clone()).unwrap_err();
    assert_eq!(err.as_label(), "runtime_already_enqueued");
    within(queue.wait_until_idle()).await;
}

#[tokio::test]
#[should_panic(expected = "once execution has begun")]
async fn changing_conditions_after_finish_panics() {
    let (queue, _) = queue();
    let p = ok("done");
    queue.add(p.clone()).unwrap();
    within(p.wait()).await;
    p.add_condition(TrueCondition::new());
}

#[test]
#[should_panic(expected = "illegal state transition")]
fn finishing_before_enqueue_panics() {
    ok("early").finish(Vec::new());
}

//! Integration tests for rununtil.
//!
//! These exercise broadcast cancellation end to end. Real OS signals are
//! covered in `os_signals.rs`, which runs as its own test process.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rununtil::{
    run_in_background, shutdown_fn, BoxWorker, CancelRegistry, Runner, Signal, Termination,
    WorkerFn,
};

/// Helper to create a worker whose shutdown increments `counter`.
fn counting_worker(counter: &Arc<AtomicUsize>) -> BoxWorker {
    let counter = Arc::clone(counter);
    Box::new(move || {
        shutdown_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    })
}

/// Helper to create a worker whose shutdown sets `flag`.
fn flag_worker(name: &str, flag: &Arc<AtomicBool>) -> BoxWorker {
    let flag = Arc::clone(flag);
    WorkerFn::boxed(name, move || shutdown_fn(move || flag.store(true, Ordering::SeqCst)))
}

async fn wait_for_waiters(registry: &CancelRegistry, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while registry.len() < n {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("runs did not register in time");
}

#[tokio::test]
async fn test_broadcast_without_runs_is_noop() {
    let registry = CancelRegistry::new();
    for _ in 0..10 {
        assert_eq!(registry.cancel_all(), 0);
    }
    assert!(registry.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_broadcast_releases_every_blocked_run_once() {
    const RUNS: usize = 16;

    let registry = CancelRegistry::new();
    let runner = Runner::new(Arc::clone(&registry)).with_signals(&[]);
    let stopped = Arc::new(AtomicUsize::new(0));

    let runs: Vec<_> = (0..RUNS)
        .map(|_| {
            let runner = runner.clone();
            let worker = counting_worker(&stopped);
            tokio::spawn(async move { runner.run(vec![worker]).await })
        })
        .collect();

    wait_for_waiters(&registry, RUNS).await;
    assert_eq!(runner.broadcast_cancel(), RUNS);
    // Second broadcast finds nothing left
    assert_eq!(runner.broadcast_cancel(), 0);

    for run in runs {
        let outcome = run.await.unwrap().unwrap();
        assert_eq!(outcome.termination, Termination::Cancelled);
    }
    assert_eq!(stopped.load(Ordering::SeqCst), RUNS);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_sequential_cancel_cycles_leave_registry_empty() {
    let registry = CancelRegistry::new();
    let stopped = Arc::new(AtomicUsize::new(0));

    for cycle in 0..100 {
        let worker = counting_worker(&stopped);
        let handle = run_in_background(Arc::clone(&registry), {
            let registry = Arc::clone(&registry);
            move || async move {
                let runner = Runner::new(registry).with_signals(&[]);
                runner.run(vec![worker]).await
            }
        });

        let outcome = handle.cancel_and_wait().await.unwrap().unwrap();
        assert_eq!(outcome.termination, Termination::Cancelled);
        assert!(registry.is_empty(), "registry not empty after cycle {cycle}");
        assert_eq!(stopped.load(Ordering::SeqCst), cycle + 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_self_cancel_and_global_broadcast() {
    const RUNS: usize = 100;

    let registry = CancelRegistry::new();
    let stopped = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..RUNS)
        .map(|_| {
            let worker = counting_worker(&stopped);
            let registry_for_run = Arc::clone(&registry);
            let handle = run_in_background(Arc::clone(&registry), move || async move {
                let runner = Runner::new(registry_for_run).with_signals(&[]);
                runner.run(vec![worker]).await
            });
            handle.cancel();
            handle
        })
        .collect();

    registry.cancel_all();

    let results = tokio::time::timeout(
        Duration::from_secs(10),
        futures::future::join_all(handles.into_iter().map(|h| h.wait())),
    )
    .await
    .expect("background runs hung");

    for result in results {
        result.unwrap().unwrap();
    }
    assert_eq!(stopped.load(Ordering::SeqCst), RUNS);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_background_runner_with_explicit_signals() {
    let registry = CancelRegistry::new();
    let flag = Arc::new(AtomicBool::new(false));

    let worker = flag_worker("worker", &flag);
    let handle = run_in_background(Arc::clone(&registry), {
        let registry = Arc::clone(&registry);
        move || async move {
            let runner = Runner::new(registry);
            runner
                .run_with_signals(&[Signal::Interrupt, Signal::Terminate], vec![worker])
                .await
        }
    });
    handle.cancel();

    tokio::time::timeout(Duration::from_millis(500), async {
        while !flag.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("shutdown callback did not run");

    let outcome = handle.wait().await.unwrap().unwrap();
    assert_eq!(outcome.termination, Termination::Cancelled);
}

#[tokio::test]
async fn test_separate_registries_are_independent() {
    let first = CancelRegistry::new();
    let second = CancelRegistry::new();
    let flag = Arc::new(AtomicBool::new(false));

    let runner = Runner::new(Arc::clone(&second)).with_signals(&[]);
    let worker = flag_worker("isolated", &flag);
    let run = tokio::spawn(async move { runner.run(vec![worker]).await });

    wait_for_waiters(&second, 1).await;
    assert_eq!(first.cancel_all(), 0);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!flag.load(Ordering::SeqCst));
    assert!(!run.is_finished());

    assert_eq!(second.cancel_all(), 1);
    run.await.unwrap().unwrap();
    assert!(flag.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_config_driven_runner() {
    use rununtil::config::parse_config;

    let config = parse_config(
        r#"
run:
  signals: [hangup]
  cancel_retry_interval: 1ms
"#,
    )
    .expect("failed to parse config");

    let registry = CancelRegistry::new();
    let runner = Runner::from_config(Arc::clone(&registry), &config.run);
    assert_eq!(runner.signals(), &[Signal::Hangup]);

    let stopped = Arc::new(AtomicUsize::new(0));
    let worker = counting_worker(&stopped);
    let handle = runner.run_in_background({
        let runner = runner.clone();
        move || async move { runner.run(vec![worker]).await }
    });

    handle.cancel_and_wait().await.unwrap().unwrap();
    assert_eq!(stopped.load(Ordering::SeqCst), 1);
}

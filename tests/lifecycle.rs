use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

use bounded_exec::{
    Backend, Executor, ExecutorConfig, ExecutorError, Job, LifecycleError, LifecycleExecutor,
    LifecycleState, Result, Value,
};

fn lifecycle_err(result: Result<()>) -> Option<LifecycleError> {
    match result {
        Err(ExecutorError::Lifecycle(e)) => Some(e),
        _ => None,
    }
}

/// Returns a job that records how many tracked jobs run at the same time.
fn tracked(
    active: &Arc<AtomicUsize>,
    peak: &Arc<AtomicUsize>,
    work: Duration,
) -> impl FnOnce() + Send + 'static {
    let active = Arc::clone(active);
    let peak = Arc::clone(peak);
    move || {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(work);
        active.fetch_sub(1, Ordering::SeqCst);
    }
}

fn wait_for_state(exec: &LifecycleExecutor, state: LifecycleState) {
    while exec.state() != state {
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn construction_rejects_zero_counts() {
    assert!(matches!(
        LifecycleExecutor::new(0, 4),
        Err(ExecutorError::Construction(_))
    ));
    assert!(matches!(
        LifecycleExecutor::new(4, 0),
        Err(ExecutorError::Construction(_))
    ));
}

#[test]
fn state_machine() -> Result<()> {
    let exec = LifecycleExecutor::new(4, 4)?;
    assert_eq!(exec.state(), LifecycleState::Created);
    assert_eq!(lifecycle_err(exec.stop()), Some(LifecycleError::NotStarted));
    assert_eq!(exec.state(), LifecycleState::Created);

    exec.start()?;
    assert_eq!(exec.state(), LifecycleState::Started);
    assert_eq!(
        lifecycle_err(exec.start()),
        Some(LifecycleError::AlreadyStarted)
    );
    assert_eq!(exec.state(), LifecycleState::Started);

    exec.stop()?;
    assert_eq!(exec.state(), LifecycleState::Stopped);
    assert_eq!(lifecycle_err(exec.stop()), Some(LifecycleError::NotStarted));

    exec.start()?;
    assert_eq!(exec.state(), LifecycleState::Started);
    exec.stop()?;
    Ok(())
}

#[test]
fn queue_full_while_stopped() -> Result<()> {
    let exec = LifecycleExecutor::new(4, 4)?;
    for _ in 0..4 {
        exec.try_enqueue(|| {})?;
    }
    assert_eq!(exec.queued(), 4);
    assert!(matches!(
        exec.try_enqueue(|| {}),
        Err(ExecutorError::QueueFull)
    ));
    Ok(())
}

#[test]
fn jobs_do_not_run_before_start() -> Result<()> {
    let exec = LifecycleExecutor::new(4, 4)?;
    let (tx, rx) = mpsc::channel();
    exec.try_enqueue(move || tx.send(true).unwrap())?;

    thread::sleep(Duration::from_millis(10));
    assert!(rx.try_recv().is_err());

    exec.start()?;
    assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
    exec.stop()?;
    Ok(())
}

#[test]
fn jobs_queued_before_start_all_run() -> Result<()> {
    const JOBS: usize = 16;
    let exec = LifecycleExecutor::new(4, JOBS)?;
    let (tx, rx) = mpsc::channel();
    for _ in 0..JOBS {
        let tx = tx.clone();
        exec.try_enqueue(move || tx.send(true).unwrap())?;
    }

    exec.start()?;
    for _ in 0..JOBS {
        assert!(rx.recv().unwrap());
    }
    exec.wait();
    assert_eq!(exec.stats().completed, JOBS as u64);
    Ok(())
}

#[test]
fn stopped_executor_keeps_queue_for_restart() -> Result<()> {
    let exec = LifecycleExecutor::new(2, 4)?;
    exec.start()?;
    exec.stop()?;

    let (tx, rx) = mpsc::channel();
    exec.try_enqueue(move || tx.send(()).unwrap())?;
    thread::sleep(Duration::from_millis(10));
    assert!(rx.try_recv().is_err());

    exec.start()?;
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    exec.stop()?;
    Ok(())
}

#[test]
fn capacity_counts_only_queued_jobs() -> Result<()> {
    let exec = LifecycleExecutor::new(3, 2)?;
    exec.start()?;
    let (release_tx, release_rx) = crossbeam::channel::unbounded::<()>();
    let (started_tx, started_rx) = mpsc::channel();

    for _ in 0..3 {
        let release_rx = release_rx.clone();
        let started_tx = started_tx.clone();
        exec.enqueue(move || {
            started_tx.send(()).unwrap();
            let _ = release_rx.recv();
        });
    }
    for _ in 0..3 {
        started_rx.recv().unwrap();
    }

    // All workers are busy; the queue still holds two more.
    exec.try_enqueue(|| {})?;
    exec.try_enqueue(|| {})?;
    assert!(matches!(
        exec.try_enqueue(|| {}),
        Err(ExecutorError::QueueFull)
    ));

    drop(release_tx);
    exec.wait();
    exec.stop()?;
    Ok(())
}

#[test]
fn stop_waits_for_running_jobs() -> Result<()> {
    let exec = LifecycleExecutor::new(1, 1)?;
    let (started_tx, started_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel();
    exec.start()?;
    exec.enqueue(move || {
        started_tx.send(()).unwrap();
        thread::sleep(Duration::from_millis(20));
        done_tx.send(()).unwrap();
    });

    started_rx.recv().unwrap();
    exec.stop()?;
    assert!(done_rx.try_recv().is_ok());
    Ok(())
}

#[test]
fn concurrent_start_succeeds_once() -> Result<()> {
    let exec = Arc::new(LifecycleExecutor::new(4, 4)?);
    let barrier = Arc::new(Barrier::new(2));

    let starters: Vec<_> = (0..2)
        .map(|_| {
            let exec = Arc::clone(&exec);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                exec.start().is_ok()
            })
        })
        .collect();

    let successes = starters
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(successes, 1);
    exec.stop()?;
    Ok(())
}

#[test]
fn job_with_values_runs_with_its_arguments() -> Result<()> {
    let exec = LifecycleExecutor::new(4, 4)?;
    let (tx, rx) = mpsc::channel();
    let job = Job::with_values(
        move |label: &'static str, n: i32| tx.send(format!("{label}{n}")).unwrap(),
        vec![Value::new("one"), Value::new(1)],
    )?;
    exec.try_enqueue_job(job)?;

    exec.start()?;
    assert_eq!(rx.recv().unwrap(), "one1");
    exec.stop()?;
    Ok(())
}

#[test]
fn mismatched_values_are_rejected_before_admission() -> Result<()> {
    let exec = LifecycleExecutor::new(4, 4)?;
    let job = Job::with_values(
        |_: i32, _: &'static str| panic!("mismatched job must never run"),
        vec![Value::new("one"), Value::new(1)],
    );
    assert!(matches!(job, Err(ExecutorError::ArgumentMismatch(_))));
    assert_eq!(exec.queued(), 0);
    Ok(())
}

#[test]
fn constructor_takes_workers_then_capacity() -> Result<()> {
    let exec = LifecycleExecutor::new(3, 5)?;
    assert_eq!(exec.workers(), 3);
    assert_eq!(exec.capacity(), 5);
    Ok(())
}

#[test]
fn restart_during_stop_never_exceeds_worker_count() -> Result<()> {
    let exec = Arc::new(LifecycleExecutor::new(1, 4)?);
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (started_tx, started_rx) = mpsc::channel();

    exec.start()?;
    let long = tracked(&active, &peak, Duration::from_millis(200));
    exec.enqueue(move || {
        started_tx.send(()).unwrap();
        long();
    });
    started_rx.recv().unwrap();
    exec.enqueue(tracked(&active, &peak, Duration::from_millis(10)));

    let stopper = {
        let exec = Arc::clone(&exec);
        thread::spawn(move || exec.stop())
    };
    wait_for_state(&exec, LifecycleState::Stopped);
    thread::sleep(Duration::from_millis(20));

    // Blocks until the stopped worker has finished the long job.
    exec.start()?;
    exec.wait();
    stopper.join().unwrap()?;

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert_eq!(exec.stats().completed, 2);
    exec.stop()?;
    Ok(())
}

#[test]
fn stop_leaves_queued_jobs_untouched() -> Result<()> {
    const QUEUED: usize = 3;
    let exec = Arc::new(LifecycleExecutor::new(1, 4)?);
    let ran = Arc::new(AtomicUsize::new(0));
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    exec.start()?;
    exec.enqueue(move || {
        started_tx.send(()).unwrap();
        let _ = release_rx.recv();
    });
    started_rx.recv().unwrap();
    for _ in 0..QUEUED {
        let ran = Arc::clone(&ran);
        exec.try_enqueue(move || {
            ran.fetch_add(1, Ordering::SeqCst);
        })?;
    }
    assert_eq!(exec.queued(), QUEUED);

    let stopper = {
        let exec = Arc::clone(&exec);
        thread::spawn(move || exec.stop())
    };
    wait_for_state(&exec, LifecycleState::Stopped);
    release_tx.send(()).unwrap();
    stopper.join().unwrap()?;

    thread::sleep(Duration::from_millis(10));
    assert_eq!(exec.queued(), QUEUED);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(exec.stats().completed, 1);

    exec.start()?;
    exec.wait();
    assert_eq!(ran.load(Ordering::SeqCst), QUEUED);
    assert_eq!(exec.queued(), 0);
    exec.stop()?;
    Ok(())
}

#[test]
fn backend_setting_does_not_affect_lifecycle_workers() -> Result<()> {
    let config = ExecutorConfig::new(2)
        .queue_capacity(4)
        .backend(Backend::Rayon)
        .thread_name("lifecycle");
    let exec = LifecycleExecutor::from_config(&config)?;
    let (tx, rx) = mpsc::channel();
    exec.try_enqueue(move || {
        tx.send(thread::current().name().map(str::to_owned)).unwrap();
    })?;

    exec.start()?;
    let name = rx.recv().unwrap().unwrap();
    assert!(name.starts_with("lifecycle-"));
    exec.stop()?;
    Ok(())
}

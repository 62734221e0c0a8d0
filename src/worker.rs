use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{Receiver, TryRecvError};
use crossbeam::select;
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::admission::Permit;
use crate::{Job, Result};

/// What a worker does when a job panics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanicPolicy {
    /// Catch the panic, log and count it; the worker keeps running.
    #[default]
    Isolate,
    /// Log the panic and abort the whole process.
    Abort,
}

/// Counters shared by an executor and its workers.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    completed: AtomicU64,
    panicked: AtomicU64,
    discarded: AtomicU64,
}

impl Counters {
    pub(crate) fn discard(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> Stats {
        Stats {
            completed: self.completed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time view of an executor's job counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Jobs that ran to completion, including those that panicked.
    pub completed: u64,
    /// Jobs that panicked under [`PanicPolicy::Isolate`].
    pub panicked: u64,
    /// Jobs thrown away without running (no-op executor).
    pub discarded: u64,
}

/// A job on its way through a queue, together with the permits it holds.
#[derive(Debug)]
pub(crate) struct Dispatch {
    pub(crate) job: Job,
    /// Returned as soon as a worker takes the job off the queue.
    pub(crate) slot: Option<Permit>,
    /// Returned once the job has finished running.
    pub(crate) ticket: Permit,
}

/// Runs one job under `policy`, then returns its permits.
pub(crate) fn run(dispatch: Dispatch, policy: PanicPolicy, counters: &Counters, worker: &str) {
    let Dispatch { job, slot, ticket } = dispatch;
    drop(slot);

    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| job.execute())) {
        let message = panic_message(payload.as_ref());
        match policy {
            PanicPolicy::Isolate => {
                error!("{worker}: job panicked, continuing: {message}");
                counters.panicked.fetch_add(1, Ordering::Relaxed);
            }
            PanicPolicy::Abort => {
                error!("{worker}: job panicked, aborting: {message}");
                process::abort();
            }
        }
    }

    counters.completed.fetch_add(1, Ordering::Relaxed);
    drop(ticket);
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

/// Everything a worker thread needs besides its queue.
#[derive(Debug, Clone)]
pub(crate) struct WorkerSettings {
    pub(crate) thread_name: String,
    pub(crate) policy: PanicPolicy,
}

/// Spawns a worker thread that pulls jobs from `queue` in FIFO order.
///
/// The worker exits when the queue is closed and drained, or, when `stop`
/// is given, once the stop channel is closed. The job in hand always
/// finishes first.
pub(crate) fn spawn_worker(
    id: usize,
    queue: Receiver<Dispatch>,
    stop: Option<Receiver<()>>,
    settings: &WorkerSettings,
    counters: Arc<Counters>,
) -> Result<JoinHandle<()>> {
    let name = format!("{}-{id}", settings.thread_name);
    let policy = settings.policy;
    let handle = thread::Builder::new()
        .name(name.clone())
        .spawn(move || loop {
            let next = match &stop {
                Some(stop) => {
                    if let Err(TryRecvError::Disconnected) = stop.try_recv() {
                        debug!("{name}: stop requested, shutting down");
                        return;
                    }
                    select! {
                        recv(queue) -> msg => msg,
                        recv(stop) -> _ => {
                            debug!("{name}: stop requested, shutting down");
                            return;
                        }
                    }
                }
                None => queue.recv(),
            };
            match next {
                Ok(dispatch) => {
                    debug!("{name} executing job");
                    run(dispatch, policy, &counters, &name);
                }
                Err(_) => {
                    debug!("{name}: queue closed, shutting down");
                    return;
                }
            }
        })?;
    Ok(handle)
}

use std::fmt;
use std::sync::Arc;

use crossbeam::channel::{self, Sender};
use log::{debug, trace};

use super::Executor;
use crate::admission::{Admission, Permit};
use crate::worker::{self, Counters, Dispatch, WorkerSettings};
use crate::{ExecutorConfig, ExecutorError, Job, Result, Stats};

/// An executor whose workers drain a single shared FIFO queue.
///
/// Capacity counts jobs that were admitted but have not completed yet,
/// whether they are still queued or already running. With the default
/// capacity (one per worker) a job is only admitted when a worker is free;
/// a larger capacity buffers the excess in the queue.
///
/// Dropping the executor closes the queue. Workers finish the jobs already
/// queued and then exit.
pub struct QueueExecutor {
    tx: Sender<Dispatch>,
    admission: Arc<Admission>,
    counters: Arc<Counters>,
    workers: usize,
}

impl QueueExecutor {
    /// Creates an executor with `workers` workers and a capacity of
    /// `workers` jobs.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Construction`] if `workers` is zero, or an
    /// IO error if a worker thread cannot be spawned.
    pub fn new(workers: usize) -> Result<Self> {
        Self::from_config(&ExecutorConfig::new(workers))
    }

    /// Creates an executor with `workers` workers that admits up to
    /// `capacity` outstanding jobs.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Construction`] if either count is zero, or an
    /// IO error if a worker thread cannot be spawned.
    pub fn with_capacity(workers: usize, capacity: usize) -> Result<Self> {
        Self::from_config(&ExecutorConfig::new(workers).queue_capacity(capacity))
    }

    /// Creates an executor from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Construction`] if the worker count is zero or
    /// the configuration is invalid, or an IO error if a worker thread cannot
    /// be spawned.
    pub fn from_config(config: &ExecutorConfig) -> Result<Self> {
        config.require_workers()?;
        let capacity = config.effective_capacity();
        let (tx, rx) = channel::bounded::<Dispatch>(capacity);
        let counters = Arc::new(Counters::default());
        let settings = WorkerSettings {
            thread_name: config.thread_name.clone(),
            policy: config.panic_policy,
        };

        // Workers spawned before a failure see the queue close when `tx`
        // drops on the error path, and exit.
        for id in 0..config.workers {
            worker::spawn_worker(id, rx.clone(), None, &settings, Arc::clone(&counters))?;
        }
        debug!(
            "Started queue executor: {} workers, capacity {}",
            config.workers, capacity
        );

        Ok(QueueExecutor {
            tx,
            admission: Admission::new(capacity),
            counters,
            workers: config.workers,
        })
    }

    /// Number of workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Maximum number of outstanding jobs.
    pub fn capacity(&self) -> usize {
        self.admission.capacity()
    }

    /// Number of jobs admitted but not yet completed.
    pub fn outstanding(&self) -> usize {
        self.admission.in_use()
    }

    fn dispatch(&self, job: Job, ticket: Permit) {
        let dispatch = Dispatch {
            job,
            slot: None,
            ticket,
        };
        // The permit guarantees a free slot, and workers only exit after
        // `self.tx` is gone, so this never blocks or fails.
        if self.tx.send(dispatch).is_err() {
            debug!("Queue closed, job dropped");
        }
    }
}

impl Executor for QueueExecutor {
    fn enqueue_job(&self, job: Job) {
        if job.is_empty() {
            trace!("Discarding empty job");
            return;
        }
        let ticket = self.admission.acquire();
        self.dispatch(job, ticket);
    }

    fn try_enqueue_job(&self, job: Job) -> Result<()> {
        if job.is_empty() {
            trace!("Discarding empty job");
            return Ok(());
        }
        let ticket = self.admission.try_acquire().ok_or(ExecutorError::QueueFull)?;
        self.dispatch(job, ticket);
        Ok(())
    }

    fn wait(&self) {
        self.admission.wait_idle();
    }

    fn stats(&self) -> Stats {
        self.counters.snapshot()
    }
}

impl fmt::Debug for QueueExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueExecutor")
            .field("workers", &self.workers)
            .field("admission", &self.admission)
            .finish()
    }
}

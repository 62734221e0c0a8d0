use std::fmt;
use std::sync::Arc;
use std::thread;

use log::{debug, trace};

use super::Executor;
use crate::admission::{Admission, Permit};
use crate::worker::{self, Counters, Dispatch};
use crate::{ExecutorConfig, ExecutorError, Job, PanicPolicy, Result, Stats};

/// An executor backed by a `rayon` thread pool.
///
/// Admission takes one of `workers` permits; the job is then handed to the
/// pool, which releases the permit when the job completes. There is no
/// buffering beyond the workers: capacity is the worker count.
pub struct RayonExecutor {
    pool: rayon::ThreadPool,
    admission: Arc<Admission>,
    counters: Arc<Counters>,
    policy: PanicPolicy,
}

impl RayonExecutor {
    /// Creates an executor with `workers` pool threads.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Construction`] if `workers` is zero, or an
    /// error if the pool cannot be built.
    pub fn new(workers: usize) -> Result<Self> {
        Self::from_config(&ExecutorConfig::new(workers))
    }

    /// Creates an executor from `config`. `queue_capacity` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Construction`] if the worker count is zero or
    /// the configuration is invalid, or an error if the pool cannot be built.
    pub fn from_config(config: &ExecutorConfig) -> Result<Self> {
        config.require_workers()?;
        let prefix = config.thread_name.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(move |id| format!("{prefix}-{id}"))
            .build()?;
        debug!("Started rayon executor: {} workers", config.workers);

        Ok(RayonExecutor {
            pool,
            admission: Admission::new(config.workers),
            counters: Arc::new(Counters::default()),
            policy: config.panic_policy,
        })
    }

    /// Number of pool threads.
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn dispatch(&self, job: Job, ticket: Permit) {
        let dispatch = Dispatch {
            job,
            slot: None,
            ticket,
        };
        let counters = Arc::clone(&self.counters);
        let policy = self.policy;
        self.pool.spawn_fifo(move || {
            let current = thread::current();
            let name = current.name().unwrap_or("rayon-worker");
            worker::run(dispatch, policy, &counters, name);
        });
    }
}

impl Executor for RayonExecutor {
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

impl fmt::Debug for RayonExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RayonExecutor")
            .field("workers", &self.workers())
            .field("admission", &self.admission)
            .finish()
    }
}

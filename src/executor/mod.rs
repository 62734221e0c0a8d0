use crate::{Backend, ExecutorConfig, Job, Result, Stats};

/// A bounded executor that runs jobs on a fixed set of workers.
///
/// Implementors own the admission control and the workers; callers only
/// hand over jobs. Every method is safe to call from any number of threads
/// at once.
///
/// A job that never returns occupies its worker forever: executors don't
/// preempt.
pub trait Executor: Send + Sync {
    /// Admits a job, blocking while the executor is at capacity.
    ///
    /// Empty jobs are discarded without taking capacity.
    fn enqueue_job(&self, job: Job);

    /// Admits a job without blocking.
    ///
    /// Empty jobs are discarded and `Ok(())` is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::QueueFull`](crate::ExecutorError::QueueFull)
    /// if there is no free capacity right now. The caller may retry later.
    fn try_enqueue_job(&self, job: Job) -> Result<()>;

    /// Blocks until every job admitted before the call has completed.
    ///
    /// New jobs may still be admitted by other threads while waiting, and
    /// they count too: this returns only once the executor is idle. Under a
    /// steady stream of enqueues from other threads the executor may never
    /// become idle, and `wait` then never returns. Pause the producers first
    /// if a bounded wait is needed.
    ///
    /// Must not be called from inside a job of the same executor.
    fn wait(&self);

    /// Returns a snapshot of the executor's job counters.
    fn stats(&self) -> Stats;

    /// Admits a closure, blocking while the executor is at capacity.
    fn enqueue<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
        Self: Sized,
    {
        self.enqueue_job(Job::new(job))
    }

    /// Admits a closure without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::QueueFull`](crate::ExecutorError::QueueFull)
    /// if there is no free capacity right now.
    fn try_enqueue<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
        Self: Sized,
    {
        self.try_enqueue_job(Job::new(job))
    }
}

mod lifecycle;
mod noop;
mod queue;
mod rayon_pool;

pub use self::lifecycle::{LifecycleExecutor, LifecycleState};
pub use self::noop::NoOpExecutor;
pub use self::queue::QueueExecutor;
pub use self::rayon_pool::RayonExecutor;

/// An executor chosen at runtime.
///
/// Zero workers selects the no-op executor, so "background work disabled"
/// needs no special-casing at call sites.
#[derive(Debug)]
pub enum AnyExecutor {
    /// Discards everything.
    NoOp(NoOpExecutor),
    /// Shared FIFO queue drained by worker threads.
    Queue(QueueExecutor),
    /// Permit-gated dispatch onto a rayon pool.
    Rayon(RayonExecutor),
}

impl AnyExecutor {
    /// Creates a queue executor with `workers` workers, or a no-op executor
    /// when `workers` is zero.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be spawned.
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Ok(AnyExecutor::NoOp(NoOpExecutor::new()));
        }
        Ok(AnyExecutor::Queue(QueueExecutor::new(workers)?))
    }

    /// Creates the executor described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the workers cannot
    /// be started.
    pub fn from_config(config: &ExecutorConfig) -> Result<Self> {
        config.validate()?;
        if config.workers == 0 {
            return Ok(AnyExecutor::NoOp(NoOpExecutor::new()));
        }
        match config.backend {
            Backend::Queue => Ok(AnyExecutor::Queue(QueueExecutor::from_config(config)?)),
            Backend::Rayon => Ok(AnyExecutor::Rayon(RayonExecutor::from_config(config)?)),
        }
    }

    fn inner(&self) -> &dyn Executor {
        match self {
            AnyExecutor::NoOp(exec) => exec as &dyn Executor,
            AnyExecutor::Queue(exec) => exec,
            AnyExecutor::Rayon(exec) => exec,
        }
    }
}

impl Executor for AnyExecutor {
    fn enqueue_job(&self, job: Job) {
        self.inner().enqueue_job(job)
    }

    fn try_enqueue_job(&self, job: Job) -> Result<()> {
        self.inner().try_enqueue_job(job)
    }

    fn wait(&self) {
        self.inner().wait()
    }

    fn stats(&self) -> Stats {
        self.inner().stats()
    }
}

use log::trace;

use super::Executor;
use crate::worker::Counters;
use crate::{Job, Result, Stats};

/// An executor with no workers.
///
/// Every job is dropped unexecuted, nothing ever blocks, and `wait` returns
/// immediately.
#[derive(Debug, Default)]
pub struct NoOpExecutor {
    counters: Counters,
}

impl NoOpExecutor {
    /// Creates a no-op executor.
    pub fn new() -> Self {
        NoOpExecutor::default()
    }

    fn discard(&self, job: Job) {
        if !job.is_empty() {
            trace!("No-op executor discarding job");
            self.counters.discard();
        }
    }
}

impl Executor for NoOpExecutor {
    fn enqueue_job(&self, job: Job) {
        self.discard(job);
    }

    fn try_enqueue_job(&self, job: Job) -> Result<()> {
        self.discard(job);
        Ok(())
    }

    fn wait(&self) {}

    fn stats(&self) -> Stats {
        self.counters.snapshot()
    }
}

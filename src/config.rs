use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ExecutorError, PanicPolicy, Result};

const DEFAULT_THREAD_NAME: &str = "exec-worker";

/// Which admission design backs an executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// A shared FIFO queue drained by dedicated worker threads.
    #[default]
    Queue,
    /// Worker-count permits with dispatch onto a rayon pool.
    Rayon,
}

/// Executor settings.
///
/// Every field has a default, so a JSON file only needs the keys it wants
/// to change:
///
/// ```json
/// { "workers": 4, "queue_capacity": 16, "panic_policy": "isolate" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Number of workers. Zero selects the no-op executor.
    pub workers: usize,
    /// Maximum number of jobs admitted but not completed. Defaults to
    /// `workers`. Ignored by the rayon backend.
    pub queue_capacity: Option<usize>,
    /// Admission design. Ignored by the lifecycle executor.
    pub backend: Backend,
    /// Behaviour on job panics.
    pub panic_policy: PanicPolicy,
    /// Prefix for worker thread names.
    pub thread_name: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            workers: num_cpus::get(),
            queue_capacity: None,
            backend: Backend::default(),
            panic_policy: PanicPolicy::default(),
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }
}

impl ExecutorConfig {
    /// Creates the default configuration with `workers` workers.
    pub fn new(workers: usize) -> Self {
        ExecutorConfig {
            workers,
            ..Default::default()
        }
    }

    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read, isn't valid JSON, or
    /// fails [`validate`](Self::validate).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: ExecutorConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the queue capacity.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Sets the backend.
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the panic policy.
    pub fn panic_policy(mut self, policy: PanicPolicy) -> Self {
        self.panic_policy = policy;
        self
    }

    /// Sets the worker thread name prefix.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Capacity after applying the default.
    pub fn effective_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.workers)
    }

    /// Checks the configuration for values no executor accepts.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Construction`] for a zero queue capacity or a
    /// thread name containing a NUL byte.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == Some(0) {
            return Err(ExecutorError::Construction(
                "queue capacity must be a positive number".to_owned(),
            ));
        }
        if self.thread_name.contains('\0') {
            return Err(ExecutorError::Construction(
                "thread name must not contain NUL bytes".to_owned(),
            ));
        }
        Ok(())
    }

    pub(crate) fn require_workers(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ExecutorError::Construction(
                "worker count must be a positive number".to_owned(),
            ));
        }
        self.validate()
    }
}

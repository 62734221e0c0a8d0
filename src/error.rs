use std::fmt;
use std::io;
use thiserror::Error;

/// Error type for executor operations.
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// IO error, e.g. a worker thread could not be spawned.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error while reading configuration.
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The executor could not be built from the given parameters.
    #[error("Invalid executor configuration: {0}")]
    Construction(String),

    /// Arguments bound to a job do not match the callable's parameters.
    #[error("Job arguments do not match the callable: {0}")]
    ArgumentMismatch(#[from] ArgumentMismatch),

    /// Non-blocking admission was rejected; retry later.
    #[error("Executor queue is full at the moment")]
    QueueFull,

    /// Start/stop was called in the wrong state.
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// The rayon pool backing an executor failed to build.
    #[error("Thread pool build error: {0}")]
    ThreadPoolBuild(#[from] rayon::ThreadPoolBuildError),
}

/// Describes how a set of bound values failed to fit a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentMismatch {
    /// Wrong number of arguments.
    Arity {
        /// Number of parameters the callable declares.
        expected: usize,
        /// Number of values supplied.
        found: usize,
    },
    /// A value's type differs from the parameter at the same position.
    Type {
        /// Zero-based parameter position.
        position: usize,
        /// Parameter type name.
        expected: &'static str,
        /// Supplied value type name.
        found: &'static str,
    },
}

impl fmt::Display for ArgumentMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentMismatch::Arity { expected, found } if found < expected => write!(
                f,
                "too few arguments were passed: expected {expected}, got {found}"
            ),
            ArgumentMismatch::Arity { expected, found } => write!(
                f,
                "too many arguments were passed: expected {expected}, got {found}"
            ),
            ArgumentMismatch::Type {
                position,
                expected,
                found,
            } => write!(
                f,
                "argument {position}: expected '{expected}', got '{found}'"
            ),
        }
    }
}

impl std::error::Error for ArgumentMismatch {}

/// Caller errors of the start/stop state machine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    /// `start` was called on a running executor.
    #[error("couldn't start already running executor")]
    AlreadyStarted,
    /// `stop` was called on an executor that is not running.
    #[error("couldn't stop non-running executor")]
    NotStarted,
}

/// Result type alias for executor operations.
pub type Result<T> = std::result::Result<T, ExecutorError>;

#![deny(missing_docs)]

//! A bounded concurrent job executor.
//!
//! This library decouples submitting units of work from running them on a
//! fixed number of workers. Admission is bounded: a blocking `enqueue` waits
//! for capacity, a non-blocking `try_enqueue` fails fast with
//! [`ExecutorError::QueueFull`], and `wait` blocks until everything admitted
//! so far has completed.
//!
//! ```
//! use bounded_exec::{AnyExecutor, Executor};
//! use std::sync::mpsc;
//!
//! let exec = AnyExecutor::new(4).unwrap();
//! let (tx, rx) = mpsc::channel();
//! for i in 0..16 {
//!     let tx = tx.clone();
//!     exec.enqueue(move || tx.send(i).unwrap());
//! }
//! exec.wait();
//! assert_eq!(rx.try_iter().count(), 16);
//! ```

mod admission;
mod config;
mod error;
/// Executor implementations.
pub mod executor;
mod job;
mod worker;

pub use admission::{Admission, Permit};
pub use config::{Backend, ExecutorConfig};
pub use error::{ArgumentMismatch, ExecutorError, LifecycleError, Result};
pub use executor::{
    AnyExecutor, Executor, LifecycleExecutor, LifecycleState, NoOpExecutor, QueueExecutor,
    RayonExecutor,
};
pub use job::{Callable, Job, Value};
pub use worker::{PanicPolicy, Stats};

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, error, trace};

use super::Executor;
use crate::admission::Admission;
use crate::worker::{self, Counters, Dispatch, WorkerSettings};
use crate::{ExecutorConfig, ExecutorError, Job, LifecycleError, Result, Stats};

/// Observable state of a [`LifecycleExecutor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Built, never started.
    Created,
    /// Workers are consuming the queue.
    Started,
    /// Workers were stopped; the queue is kept.
    Stopped,
}

struct Running {
    // Dropping the sender closes the stop channel.
    stop: Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

enum State {
    Created,
    Started(Running),
    Stopped,
}

/// An executor with an explicit start/stop switch.
///
/// Admission is independent of the switch: jobs can be enqueued at any time
/// and wait in the queue until the executor is started. Capacity counts
/// queued jobs only; a job stops taking capacity as soon as a worker picks
/// it up.
///
/// ```
/// use bounded_exec::{Executor, LifecycleExecutor};
/// use std::sync::mpsc;
///
/// let exec = LifecycleExecutor::new(2, 4).unwrap();
/// let (tx, rx) = mpsc::channel();
/// exec.try_enqueue(move || tx.send(42).unwrap()).unwrap();
///
/// exec.start().unwrap();
/// assert_eq!(rx.recv().unwrap(), 42);
/// exec.stop().unwrap();
/// ```
pub struct LifecycleExecutor {
    tx: Sender<Dispatch>,
    rx: Receiver<Dispatch>,
    slots: Arc<Admission>,
    in_flight: Arc<Admission>,
    state: Mutex<State>,
    // Held across a whole start or stop, including the join in `stop`, so a
    // new worker generation never overlaps with the one being stopped.
    transition: Mutex<()>,
    settings: WorkerSettings,
    workers: usize,
    counters: Arc<Counters>,
}

impl LifecycleExecutor {
    /// Creates a stopped executor with `workers` workers once started and
    /// room for `queue_capacity` queued jobs.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Construction`] if either count is zero.
    pub fn new(workers: usize, queue_capacity: usize) -> Result<Self> {
        Self::from_config(&ExecutorConfig::new(workers).queue_capacity(queue_capacity))
    }

    /// Creates a stopped executor from `config`. `backend` is ignored: the
    /// lifecycle executor always runs its own worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Construction`] if the worker count is zero or
    /// the configuration is invalid.
    pub fn from_config(config: &ExecutorConfig) -> Result<Self> {
        config.require_workers()?;
        let (tx, rx) = channel::unbounded();
        Ok(LifecycleExecutor {
            tx,
            rx,
            slots: Admission::new(config.effective_capacity()),
            in_flight: Admission::unbounded(),
            state: Mutex::new(State::Created),
            transition: Mutex::new(()),
            settings: WorkerSettings {
                thread_name: config.thread_name.clone(),
                policy: config.panic_policy,
            },
            workers: config.workers,
            counters: Arc::new(Counters::default()),
        })
    }

    /// Starts the workers.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyStarted`] if the executor is running,
    /// or an IO error if a worker thread cannot be spawned. The state is
    /// unchanged on error.
    ///
    /// If a [`stop`](Self::stop) is in progress, this blocks until the
    /// stopped workers have exited. Calling it from a job while another
    /// thread stops the executor therefore deadlocks.
    pub fn start(&self) -> Result<()> {
        let _transition = self.lock_transition();
        let mut state = self.lock();
        if let State::Started(_) = *state {
            return Err(LifecycleError::AlreadyStarted.into());
        }

        let (stop, stop_rx) = channel::bounded(0);
        let mut handles = Vec::with_capacity(self.workers);
        for id in 0..self.workers {
            // On error `stop` is dropped, which shuts down the workers
            // spawned so far.
            handles.push(worker::spawn_worker(
                id,
                self.rx.clone(),
                Some(stop_rx.clone()),
                &self.settings,
                Arc::clone(&self.counters),
            )?);
        }

        *state = State::Started(Running { stop, handles });
        debug!("Lifecycle executor started: {} workers", self.workers);
        Ok(())
    }

    /// Stops the workers.
    ///
    /// Blocks until jobs already running have finished; no job starts after
    /// this returns. Queued jobs stay queued for the next [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotStarted`] if the executor isn't running.
    pub fn stop(&self) -> Result<()> {
        let _transition = self.lock_transition();
        let handles = {
            let mut state = self.lock();
            match mem::replace(&mut *state, State::Stopped) {
                State::Started(Running { stop, handles }) => {
                    // Closed before the state lock is released, so anyone
                    // observing `Stopped` knows the workers were told.
                    drop(stop);
                    handles
                }
                other => {
                    *state = other;
                    return Err(LifecycleError::NotStarted.into());
                }
            }
        };

        let current = thread::current().id();
        for handle in handles {
            // A job may stop its own executor; it can't wait for itself.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!("Lifecycle executor worker exited with a panic");
            }
        }
        debug!("Lifecycle executor stopped");
        Ok(())
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        match *self.lock() {
            State::Created => LifecycleState::Created,
            State::Started(_) => LifecycleState::Started,
            State::Stopped => LifecycleState::Stopped,
        }
    }

    /// Number of jobs waiting in the queue.
    pub fn queued(&self) -> usize {
        self.slots.in_use()
    }

    /// Number of workers started by [`start`](Self::start).
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Maximum number of queued jobs.
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_transition(&self) -> MutexGuard<'_, ()> {
        self.transition.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Executor for LifecycleExecutor {
    fn enqueue_job(&self, job: Job) {
        if job.is_empty() {
            trace!("Discarding empty job");
            return;
        }
        let slot = self.slots.acquire();
        let ticket = self.in_flight.acquire();
        // `self.rx` keeps the channel open for as long as `self` lives.
        let _ = self.tx.send(Dispatch {
            job,
            slot: Some(slot),
            ticket,
        });
    }

    fn try_enqueue_job(&self, job: Job) -> Result<()> {
        if job.is_empty() {
            trace!("Discarding empty job");
            return Ok(());
        }
        let slot = self.slots.try_acquire().ok_or(ExecutorError::QueueFull)?;
        let ticket = self.in_flight.acquire();
        let _ = self.tx.send(Dispatch {
            job,
            slot: Some(slot),
            ticket,
        });
        Ok(())
    }

    /// Blocks until every admitted job has completed.
    ///
    /// While the executor is not started, queued jobs can't complete, so this
    /// blocks until someone starts it.
    fn wait(&self) {
        self.in_flight.wait_idle();
    }

    fn stats(&self) -> Stats {
        self.counters.snapshot()
    }
}

impl fmt::Debug for LifecycleExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleExecutor")
            .field("state", &self.state())
            .field("workers", &self.workers)
            .field("slots", &self.slots)
            .finish()
    }
}

//! Counting-permit admission control.
//!
//! Every capacity bound in the crate goes through [`Admission`]: queue
//! slots, outstanding jobs, and the drain barrier behind `wait`.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// A counting semaphore whose permits are returned by dropping a [`Permit`].
///
/// `wait_idle` blocks until every permit has come back, which is how the
/// executors implement their drain barrier.
pub struct Admission {
    capacity: usize,
    in_use: Mutex<usize>,
    released: Condvar,
}

impl Admission {
    /// Creates an admission with `capacity` permits.
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Admission {
            capacity,
            in_use: Mutex::new(0),
            released: Condvar::new(),
        })
    }

    /// Creates an admission that never runs out of permits.
    ///
    /// Useful purely for counting in-flight work.
    pub fn unbounded() -> Arc<Self> {
        Admission::new(usize::MAX)
    }

    /// Takes a permit, blocking while none is free.
    pub fn acquire(self: &Arc<Self>) -> Permit {
        let mut in_use = self.lock();
        while *in_use >= self.capacity {
            in_use = self
                .released
                .wait(in_use)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *in_use += 1;
        Permit {
            admission: Arc::clone(self),
        }
    }

    /// Takes a permit if one is free right now.
    pub fn try_acquire(self: &Arc<Self>) -> Option<Permit> {
        let mut in_use = self.lock();
        if *in_use >= self.capacity {
            return None;
        }
        *in_use += 1;
        Some(Permit {
            admission: Arc::clone(self),
        })
    }

    /// Blocks until no permit is held.
    pub fn wait_idle(&self) {
        let mut in_use = self.lock();
        while *in_use > 0 {
            in_use = self
                .released
                .wait(in_use)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Number of permits currently held.
    pub fn in_use(&self) -> usize {
        *self.lock()
    }

    /// Total number of permits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self) {
        let mut in_use = self.lock();
        *in_use -= 1;
        // Both blocked producers and `wait_idle` callers sleep on the same
        // condvar, so everyone has to be woken.
        self.released.notify_all();
    }

    // Jobs run outside the lock, so a poisoned mutex still guards a valid count.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.in_use.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Admission")
            .field("capacity", &self.capacity)
            .field("in_use", &self.in_use())
            .finish()
    }
}

/// A held permit. Dropping it gives the permit back.
#[must_use = "the permit is released as soon as it is dropped"]
pub struct Permit {
    admission: Arc<Admission>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.admission.release();
    }
}

impl fmt::Debug for Permit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit").finish_non_exhaustive()
    }
}

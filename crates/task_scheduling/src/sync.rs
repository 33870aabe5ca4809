//! src/sync.rs
//!
//! Counting semaphore used for completion accounting across threads.
//!
//! The scheduler needs a primitive where the number of `post()` calls is
//! matched one-for-one by `wait()` calls, possibly from different threads and
//! in any order. `std::sync` offers no counting semaphore, so this builds one
//! from a `Mutex<u32>` and a `Condvar`.
//!
//! # Guarantees
//! - Every `post()` eventually satisfies exactly one `wait()`.
//! - Safe for concurrent posts and waits from any number of threads.
//! - No fairness guarantee beyond the above.

use std::sync::{Condvar, Mutex};

/// A counting wait/signal primitive.
///
/// `post()` increments the count and wakes at most one blocked waiter.
/// `wait()` blocks until the count is positive, then atomically decrements it.
#[derive(Debug, Default)]
pub struct Semaphore {
    count: Mutex<u32>,
    cond: Condvar,
}

impl Semaphore {
    /// Creates a semaphore with a count of zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the count and wakes one waiter, if any.
    pub fn post(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        *count += 1;
        self.cond.notify_one();
    }

    /// Blocks until the count is positive, then decrements it.
    pub fn wait(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        while *count == 0 {
            count = self.cond.wait(count).unwrap_or_else(|e| e.into_inner());
        }
        *count -= 1;
    }

    /// Decrements the count if it is positive, without blocking.
    ///
    /// Returns `true` if a unit was consumed.
    pub fn try_wait(&self) -> bool {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }
}

//! src/result_slot.rs
//!
//! Shared storage for a task's latest output.
//!
//! Data-collecting tasks run on pool or dedicated threads while their
//! consumers (the rendering pass) read from the control thread. A
//! `ResultSlot<T>` is the hand-off point: the task's work stores into it,
//! consumers read from it.
//!
//! For a [`ThreadedTask`](crate::threaded::ThreadedTask) with
//! `synchronized() == true`, `run_all_tasks()` does not return until the
//! update has finished, so a read immediately after the tick always observes
//! that tick's value. Non-synchronized tasks may race a tick; readers then
//! simply see the previous value.
//!
//! ```ignore
//! struct Hddtemp {
//!     host: String,
//!     temps: ResultSlot<Vec<f32>>,
//! }
//!
//! impl ThreadedTask for Hddtemp {
//!     fn update(&self) {
//!         let temps = fetch_temps(&self.host);
//!         self.temps.set(temps);
//!     }
//!     fn synchronized(&self) -> bool { true }
//! }
//! ```

use std::sync::Mutex;

/// A mutex-guarded cell holding the most recent result of a task.
#[derive(Debug, Default)]
pub struct ResultSlot<T> {
    inner: Mutex<T>,
}

impl<T> ResultSlot<T> {
    /// Creates a slot holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    /// Replaces the stored value.
    pub fn set(&self, value: T) {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = value;
    }

    /// Runs `f` with the stored value borrowed under the lock.
    ///
    /// Prefer this over [`get`](Self::get) when `T` is expensive to clone or
    /// only a part of it is needed.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Runs `f` with the stored value mutably borrowed under the lock.
    ///
    /// Lets a task update its result in place instead of rebuilding it.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl<T: Clone> ResultSlot<T> {
    /// Returns a copy of the stored value.
    pub fn get(&self) -> T {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

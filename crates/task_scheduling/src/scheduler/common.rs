//! src/scheduler/common.rs
//!
//! Shared utilities for scheduler worker threads.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process;

/// Runs one unit of task work with fail-fast panic handling.
///
/// The scheduler has no recovery policy for arbitrary task semantics: a panic
/// escaping a task's work would otherwise kill one worker thread silently and
/// leave the control thread waiting forever for a completion that never
/// comes. Aborting keeps the failure loud and the accounting sound.
pub(crate) fn run_task_work(context: &str, work: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(work)).is_err() {
        log::error!("task work panicked on {context}; aborting");
        process::abort();
    }
}

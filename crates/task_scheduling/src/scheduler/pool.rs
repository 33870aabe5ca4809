//! src/scheduler/pool.rs
//!
//! Shared worker pool for short tasks.
//!
//! A small fixed set of background threads consumes a FIFO queue of
//! ready-to-run tasks. Dispatch and completion are decoupled: the control
//! thread queues everything for a tick without blocking, then calls
//! [`TaskPool::wait_for_all`] once to block until the batch has drained.
//!
//! # Accounting invariant
//! Every [`add`](TaskPool::add) is matched by exactly one completion-semaphore
//! post from the worker that ran the task, so "wait for all N dispatched"
//! stays accurate even though completions arrive in any order. Workers drop
//! their task handle *before* posting, so `Arc` reference counts are settled
//! by the time `wait_for_all()` returns — holder liveness checks on the next
//! tick rely on this.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{ensure, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};

use super::common::run_task_work;
use crate::sync::Semaphore;
use crate::task::Task;

/// Fixed-size pool of worker threads for short, synchronous tasks.
pub(crate) struct TaskPool {
    workers: Vec<thread::JoinHandle<()>>,
    task_tx: Option<Sender<Arc<dyn Task>>>,
    completed: Arc<Semaphore>,
    outstanding: AtomicU32,
    shutdown: Arc<AtomicBool>,
}

impl TaskPool {
    /// Spawns `num_workers` named worker threads.
    pub(crate) fn new(num_workers: usize) -> Result<Self> {
        ensure!(
            num_workers > 0,
            "cannot create a task pool with 0 workers; \
             configure pool_workers > 0"
        );

        let (task_tx, task_rx) = unbounded::<Arc<dyn Task>>();
        let completed = Arc::new(Semaphore::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(num_workers);
        for worker_id in 0..num_workers {
            let task_rx = task_rx.clone();
            let completed = completed.clone();
            let shutdown = shutdown.clone();

            let handle = thread::Builder::new()
                .name(format!("pool-worker-{}", worker_id))
                .spawn(move || Self::runner(task_rx, completed, shutdown))
                .with_context(|| format!("Failed to spawn pool worker thread {}", worker_id))?;

            workers.push(handle);
        }

        Ok(Self {
            workers,
            task_tx: Some(task_tx),
            completed,
            outstanding: AtomicU32::new(0),
            shutdown,
        })
    }

    /// Queues one task for execution and records it as outstanding.
    ///
    /// Must only be called from the control thread, and never after shutdown
    /// has begun.
    pub(crate) fn add(&self, task: Arc<dyn Task>) {
        let Some(task_tx) = &self.task_tx else {
            return;
        };
        // Count only successfully queued tasks, or wait_for_all() would wait
        // for completions that can never arrive.
        if task_tx.send(task).is_ok() {
            self.outstanding.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Blocks until every task queued since the last call has completed.
    pub(crate) fn wait_for_all(&self) {
        while self.outstanding.load(Ordering::Relaxed) > 0 {
            self.completed.wait();
            self.outstanding.fetch_sub(1, Ordering::Relaxed);
        }
    }

    fn runner(
        task_rx: Receiver<Arc<dyn Task>>,
        completed: Arc<Semaphore>,
        shutdown: Arc<AtomicBool>,
    ) {
        while let Ok(task) = task_rx.recv() {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            run_task_work("pool worker", || task.tick());
            // Release our handle before posting, see module docs.
            drop(task);
            completed.post();
        }
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        // Signal shutdown and close the queue so blocked workers wake up.
        self.shutdown.store(true, Ordering::Relaxed);
        self.task_tx.take();

        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

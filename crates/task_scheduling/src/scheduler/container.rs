//! src/scheduler/container.rs
//!
//! The top-level task registry and per-tick driver.
//!
//! The hosting application constructs one [`TaskScheduler`], registers its
//! data-collecting tasks during the configuration phase, and then calls
//! [`TaskScheduler::run_all_tasks`] once per scheduling cycle from its main
//! loop. When that call returns, all work scheduled for the cycle has
//! completed and the rendering pass may read the tasks' results.
//!
//! # Deduplication
//! Registering a task whose [`TaskKey`] equals an already-registered task of
//! the same flavour does not create a second instance: the existing holder
//! absorbs the new period (the shorter one wins) and the existing task handle
//! is returned. Different flavours never merge with each other, and keyless
//! tasks never merge at all.
//!
//! # Threading
//! All methods take `&mut self`: registration and ticking belong to a single
//! control thread. The worker pool and the dedicated task threads are the
//! only concurrency behind this API.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{ensure, Result};

use super::config::SchedulerConfig;
use super::holder::{BackendKind, Holder};
use super::pool::TaskPool;
use crate::task::{Task, TaskKey};
use crate::threaded::{PipedTask, ThreadedTask};

/// Registry key: task identity scoped by dispatch flavour, or a unique id
/// for keyless tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SlotKey {
    Keyed(BackendKind, TaskKey),
    Anonymous(u64),
}

/// Owns every registered task holder, the shared worker pool, and the
/// per-tick drive logic.
pub struct TaskScheduler {
    tasks: HashMap<SlotKey, Holder>,
    pool: TaskPool,
    config: SchedulerConfig,
    next_anonymous: u64,
    next_worker: usize,
}

impl TaskScheduler {
    /// Creates a scheduler with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(SchedulerConfig::default())
    }

    /// Creates a scheduler with an explicit configuration.
    pub fn with_config(config: SchedulerConfig) -> Result<Self> {
        ensure!(
            config.max_unused_ticks > 0,
            "max_unused_ticks must be at least 1"
        );
        ensure!(config.signal_buffer > 0, "signal_buffer must be at least 1");
        let pool = TaskPool::new(config.pool_workers)?;
        Ok(Self {
            tasks: HashMap::new(),
            pool,
            config,
            next_anonymous: 0,
            next_worker: 0,
        })
    }

    /// Registers a short task to run on the shared pool every `period` ticks.
    ///
    /// Returns a handle to the registered instance — possibly a previously
    /// registered equal task rather than `task` itself. The task keeps
    /// running as long as the handle (or any clone of it) is held; after the
    /// last handle is dropped the task ages out and is retired.
    pub fn register_task<T: Task>(&mut self, period: u32, task: T) -> Result<Arc<T>> {
        ensure!(period > 0, "task period must be at least 1 tick");

        let slot = self.slot_key(BackendKind::Pooled, task.key());
        if let Some(holder) = self.tasks.get_mut(&slot) {
            let existing: Arc<T> = holder.typed_handle()?;
            existing.absorb(&task);
            holder.merge(period);
            return Ok(existing);
        }

        let task = Arc::new(task);
        let holder = Holder::pooled(period, self.config.max_unused_ticks, task.clone());
        self.tasks.insert(slot, holder);
        Ok(task)
    }

    /// Registers a task that runs on its own dedicated thread, woken every
    /// `period` ticks.
    ///
    /// The thread is spawned here, so a spawn failure surfaces to the
    /// registering caller. Deduplication and lifetime rules match
    /// [`register_task`](Self::register_task).
    pub fn register_threaded_task<T: ThreadedTask>(
        &mut self,
        period: u32,
        task: T,
    ) -> Result<Arc<T>> {
        ensure!(period > 0, "task period must be at least 1 tick");

        let slot = self.slot_key(BackendKind::Dedicated, task.key());
        if let Some(holder) = self.tasks.get_mut(&slot) {
            let existing: Arc<T> = holder.typed_handle()?;
            existing.absorb(&task);
            holder.merge(period);
            return Ok(existing);
        }

        let task = Arc::new(task);
        let holder = Holder::dedicated(
            period,
            self.config.max_unused_ticks,
            format!("task-thread-{}", self.next_worker_id()),
            task.clone(),
        )?;
        self.tasks.insert(slot, holder);
        Ok(task)
    }

    /// Registers a task that owns its thread's event loop and receives tick
    /// and stop [`Signal`](crate::threaded::Signal)s over a channel.
    pub fn register_piped_task<T: PipedTask>(&mut self, period: u32, task: T) -> Result<Arc<T>> {
        ensure!(period > 0, "task period must be at least 1 tick");

        let slot = self.slot_key(BackendKind::Piped, task.key());
        if let Some(holder) = self.tasks.get_mut(&slot) {
            let existing: Arc<T> = holder.typed_handle()?;
            existing.absorb(&task);
            holder.merge(period);
            return Ok(existing);
        }

        let task = Arc::new(task);
        let holder = Holder::piped(
            period,
            self.config.max_unused_ticks,
            self.config.signal_buffer,
            format!("task-pipe-{}", self.next_worker_id()),
            task.clone(),
        )?;
        self.tasks.insert(slot, holder);
        Ok(task)
    }

    /// Runs one scheduling cycle.
    ///
    /// Two strictly separated phases: first every holder is ticked and ready
    /// tasks are dispatched (no blocking on individual tasks), then the call
    /// blocks until the pool queue has drained and every synchronized
    /// dedicated task woken this tick has finished its update. Holders whose
    /// task aged out are erased during the walk, which stops and joins their
    /// worker threads.
    pub fn run_all_tasks(&mut self) {
        let Self { tasks, pool, .. } = self;

        let mut completions = Vec::new();
        tasks.retain(|_, holder| holder.tick_once(pool, &mut completions));

        pool.wait_for_all();
        for completion in completions {
            completion.wait();
        }
    }

    /// Number of currently registered holders.
    pub fn registered_tasks(&self) -> usize {
        self.tasks.len()
    }

    fn slot_key(&mut self, backend: BackendKind, key: Option<TaskKey>) -> SlotKey {
        match key {
            Some(key) => SlotKey::Keyed(backend, key),
            None => {
                let id = self.next_anonymous;
                self.next_anonymous += 1;
                SlotKey::Anonymous(id)
            }
        }
    }

    fn next_worker_id(&mut self) -> usize {
        let id = self.next_worker;
        self.next_worker += 1;
        id
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        // Dedicated and piped workers must stop before the pool goes down;
        // the pool's own drop then joins its workers.
        self.tasks.clear();
    }
}

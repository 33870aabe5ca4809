//! src/scheduler/holder.rs
//!
//! Per-task scheduling state and backend strategies.
//!
//! A [`Holder`] wraps one registered task together with its period, its
//! countdown to the next firing, and its idle-tick counter. The container
//! walks every holder once per scheduling tick; the holder decides whether to
//! actually dispatch the task this tick and whether it should stay alive at
//! all.
//!
//! # Backends
//! How a firing is dispatched is a construction-time choice, one variant per
//! task flavour:
//! - [`Backend::Pooled`]: enqueue the task on the shared worker pool.
//! - [`Backend::Dedicated`]: wake the task's own thread through its
//!   [`TickGate`].
//! - [`Backend::Piped`]: push a [`Signal::Tick`] into the task's signal
//!   channel without blocking.
//!
//! # Liveness
//! A holder keeps firing as long as someone outside the scheduler still holds
//! the task handle returned at registration. Once the last external handle is
//! dropped, the task fires for `max_unused` more eligible ticks (a grace
//! window covering registration churn) and is then retired: the container
//! erases the holder, which stops and joins any dedicated thread.

use std::any::Any;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Sender, TrySendError};

use super::common::run_task_work;
use super::pool::TaskPool;
use crate::sync::Semaphore;
use crate::task::Task;
use crate::threaded::{drive, PipedTask, Signal, SignalSource, ThreadedTask, TickGate};

type AnyHandle = Arc<dyn Any + Send + Sync>;

/// Discriminates the dispatch strategy in holder identity: a pooled and a
/// dedicated registration of the same logical task are distinct holders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum BackendKind {
    Pooled,
    Dedicated,
    Piped,
}

/// Scheduling state for one registered task.
pub(crate) struct Holder {
    period: u32,
    remaining: u32,
    unused: u32,
    max_unused: u32,
    backend: Backend,
}

impl Holder {
    pub(crate) fn pooled<T: Task>(period: u32, max_unused: u32, task: Arc<T>) -> Self {
        let handle: AnyHandle = task.clone();
        Self::new(
            period,
            max_unused,
            Backend::Pooled(PooledWorker { task, handle }),
        )
    }

    /// Spawns the dedicated worker thread for `task`. A spawn failure
    /// surfaces here, at registration time.
    pub(crate) fn dedicated<T: ThreadedTask>(
        period: u32,
        max_unused: u32,
        thread_name: String,
        task: Arc<T>,
    ) -> Result<Self> {
        let handle: AnyHandle = task.clone();
        let task: Arc<dyn ThreadedTask> = task;
        let gate = Arc::new(TickGate::new());
        let completion = if task.synchronized() {
            Some(Arc::new(Semaphore::new()))
        } else {
            None
        };

        let thread = {
            let task = task.clone();
            let gate = gate.clone();
            let completion = completion.clone();
            thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || {
                    run_task_work("dedicated task thread", || {
                        drive(&*task, &gate, completion.as_deref())
                    })
                })
                .with_context(|| format!("Failed to spawn task thread {}", thread_name))?
        };

        Ok(Self::new(
            period,
            max_unused,
            Backend::Dedicated(DedicatedWorker {
                task,
                handle,
                gate,
                completion,
                thread: Some(thread),
            }),
        ))
    }

    /// Spawns the piped worker thread for `task`, handing it the receiving
    /// end of a fresh signal channel of capacity `signal_buffer`.
    pub(crate) fn piped<T: PipedTask>(
        period: u32,
        max_unused: u32,
        signal_buffer: usize,
        thread_name: String,
        task: Arc<T>,
    ) -> Result<Self> {
        let handle: AnyHandle = task.clone();
        let task: Arc<dyn PipedTask> = task;
        let (signal_tx, signal_rx) = bounded(signal_buffer);

        let thread = {
            let task = task.clone();
            thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || {
                    let signals = SignalSource::new(signal_rx);
                    run_task_work("piped task thread", || task.run(&signals));
                })
                .with_context(|| format!("Failed to spawn task thread {}", thread_name))?
        };

        Ok(Self::new(
            period,
            max_unused,
            Backend::Piped(PipedWorker {
                task,
                handle,
                signal_tx,
                thread: Some(thread),
            }),
        ))
    }

    fn new(period: u32, max_unused: u32, backend: Backend) -> Self {
        Self {
            period,
            // A fresh holder fires on the very next tick.
            remaining: 0,
            unused: 0,
            max_unused,
            backend,
        }
    }

    /// Advances this holder by one scheduling tick, dispatching the task if
    /// its countdown expired. Returns whether the holder should stay alive;
    /// `false` tells the container to erase it.
    ///
    /// An unreferenced task still fires while its idle counter is below the
    /// grace threshold, so a dropped-and-re-registered task never observes a
    /// gap in its updates.
    pub(crate) fn tick_once(
        &mut self,
        pool: &TaskPool,
        completions: &mut Vec<Arc<Semaphore>>,
    ) -> bool {
        if self.remaining == 0 {
            let fire = if self.backend.externally_referenced() {
                true
            } else {
                self.unused += 1;
                self.unused < self.max_unused
            };
            if fire {
                self.remaining = self.period - 1;
                self.backend.fire(pool, completions);
            }
        } else {
            self.remaining -= 1;
        }

        let keep = self.unused < self.max_unused;
        if !keep {
            log::debug!("retiring task holder idle for {} ticks", self.unused);
        }
        keep
    }

    /// Absorbs a duplicate registration: the shorter period wins and takes
    /// effect on the very next tick, and the idle counter restarts because
    /// someone just re-registered interest in this task.
    pub(crate) fn merge(&mut self, period: u32) {
        if period < self.period {
            self.period = period;
            self.remaining = 0;
        }
        self.unused = 0;
    }

    /// The registered task instance, downcast back to its concrete type.
    pub(crate) fn typed_handle<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.backend
            .handle()
            .clone()
            .downcast()
            .map_err(|_| anyhow!("registered task key matches a different task type"))
    }
}

enum Backend {
    Pooled(PooledWorker),
    Dedicated(DedicatedWorker),
    Piped(PipedWorker),
}

impl Backend {
    fn fire(&self, pool: &TaskPool, completions: &mut Vec<Arc<Semaphore>>) {
        match self {
            Backend::Pooled(worker) => pool.add(worker.task.clone()),
            Backend::Dedicated(worker) => {
                worker.gate.tick();
                if let Some(completion) = &worker.completion {
                    completions.push(completion.clone());
                }
            }
            Backend::Piped(worker) => worker.signal_tick(),
        }
    }

    /// Whether anyone outside the scheduler still holds the task handle.
    ///
    /// The internal count is exact at tick time: pool workers release their
    /// transient clone before posting completion, and a dedicated or piped
    /// thread keeps exactly one clone for its whole life.
    fn externally_referenced(&self) -> bool {
        match self {
            Backend::Pooled(worker) => {
                Arc::strong_count(&worker.task) > PooledWorker::INTERNAL_HANDLES
            }
            Backend::Dedicated(worker) => {
                Arc::strong_count(&worker.task) > DedicatedWorker::INTERNAL_HANDLES
            }
            Backend::Piped(worker) => {
                Arc::strong_count(&worker.task) > PipedWorker::INTERNAL_HANDLES
            }
        }
    }

    fn handle(&self) -> &AnyHandle {
        match self {
            Backend::Pooled(worker) => &worker.handle,
            Backend::Dedicated(worker) => &worker.handle,
            Backend::Piped(worker) => &worker.handle,
        }
    }
}

struct PooledWorker {
    task: Arc<dyn Task>,
    handle: AnyHandle,
}

impl PooledWorker {
    // `task` + `handle` point at the same allocation.
    const INTERNAL_HANDLES: usize = 2;
}

struct DedicatedWorker {
    task: Arc<dyn ThreadedTask>,
    handle: AnyHandle,
    gate: Arc<TickGate>,
    completion: Option<Arc<Semaphore>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl DedicatedWorker {
    // `task` + `handle` + the worker thread's own clone.
    const INTERNAL_HANDLES: usize = 3;
}

impl Drop for DedicatedWorker {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.gate.stop();
            let _ = thread.join();
        }
    }
}

struct PipedWorker {
    task: Arc<dyn PipedTask>,
    handle: AnyHandle,
    signal_tx: Sender<Signal>,
    thread: Option<thread::JoinHandle<()>>,
}

impl PipedWorker {
    // `task` + `handle` + the worker thread's own clone.
    const INTERNAL_HANDLES: usize = 3;

    /// Delivers a tick signal without ever blocking the control thread.
    fn signal_tick(&self) {
        match self.signal_tx.try_send(Signal::Tick) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log::warn!("unable to signal task tick; is the worker stuck?");
            }
            Err(TrySendError::Disconnected(_)) => {
                log::error!("piped task worker dropped its signal channel while registered");
            }
        }
    }
}

impl Drop for PipedWorker {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            // The stop signal must be delivered: this send blocks until the
            // worker drains its channel. A disconnect means the worker
            // abandoned its receiver while the scheduler still owns it, and
            // there is no way to shut it down cleanly.
            if self.signal_tx.send(Signal::Stop).is_err() {
                panic!("unable to signal piped task worker to terminate");
            }
            let _ = thread.join();
        }
    }
}

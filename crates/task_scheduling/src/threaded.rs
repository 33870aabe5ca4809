//! src/threaded.rs
//!
//! Tasks that run on their own dedicated thread.
//!
//! Pool tasks must be short; anything that may block or take an unbounded
//! amount of time (network fetches, reading a slow sensor) gets a dedicated
//! thread and is *signalled*, not invoked, on each scheduling tick. Two
//! flavours exist:
//!
//! - [`ThreadedTask`]: the library owns the thread's main loop and calls
//!   [`ThreadedTask::update`] once per received tick signal. Bursts of
//!   signals caused by a slow consumer are coalesced into a single update.
//! - [`PipedTask`]: the task owns its own loop and receives [`Signal`]s
//!   through a [`SignalSource`]. This suits event-loop threads that need to
//!   multiplex tick signals with other channels (the original use case is a
//!   windowing thread selecting on a display connection).
//!
//! # Signal protocol
//!
//! A piped worker receives exactly two symbols: [`Signal::Tick`] ("new tick
//! ready") and [`Signal::Stop`] ("terminate"). Tick delivery is non-blocking
//! and may be dropped with a warning if the worker is stuck; Stop delivery
//! blocks until accepted, so a worker that drains its source is guaranteed to
//! observe it. A disconnected channel during either operation means the
//! worker abandoned its receiver, which the protocol forbids — that is a
//! fatal defect, not a recoverable condition.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Receiver;

use crate::sync::Semaphore;
use crate::task::TaskKey;

/// A task whose work may block or take unbounded time.
///
/// The scheduler runs a dedicated thread per instance; on every scheduled
/// tick it wakes that thread, which calls `update()` once. The registering
/// caller is never blocked by a slow update.
pub trait ThreadedTask: Send + Sync + 'static {
    /// Performs one unit of (potentially slow) work.
    ///
    /// Error handling is the task's own concern; a panic escaping `update()`
    /// aborts the process.
    fn update(&self);

    /// Identity used for merging duplicate registrations. `None` (the
    /// default) means never merged.
    fn key(&self) -> Option<TaskKey> {
        None
    }

    /// Whether `run_all_tasks()` must wait for this task's update to finish
    /// before returning.
    ///
    /// Defaults to `false` (fire-and-forget). Return `true` when consumers
    /// read this task's output right after the tick, e.g. through a
    /// [`ResultSlot`](crate::result_slot::ResultSlot).
    fn synchronized(&self) -> bool {
        false
    }

    /// Takes over state from a discarded duplicate on merge. `other` is the
    /// same concrete type as `self`. The default does nothing.
    fn absorb(&self, _other: &dyn Any) {}
}

/// A threaded task that owns its thread's main loop.
///
/// `run()` is the thread main. It must block on `signals` between units of
/// work and return promptly once it receives [`Signal::Stop`]; the scheduler
/// joins the thread right after delivering the stop signal.
pub trait PipedTask: Send + Sync + 'static {
    /// Thread main loop. See [`SignalSource`] for the receiving side of the
    /// protocol.
    fn run(&self, signals: &SignalSource);

    /// Identity used for merging duplicate registrations. `None` (the
    /// default) means never merged.
    fn key(&self) -> Option<TaskKey> {
        None
    }

    /// Takes over state from a discarded duplicate on merge. `other` is the
    /// same concrete type as `self`. The default does nothing.
    fn absorb(&self, _other: &dyn Any) {}
}

/// The two-symbol protocol delivered to piped workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// A new scheduling tick is ready; do one unit of work.
    Tick,
    /// Terminate: return from the work loop as soon as possible.
    Stop,
}

/// Receiving end of a piped worker's signal channel.
///
/// The worker either calls [`wait`](Self::wait) to block for the next signal,
/// or grabs the raw [`receiver`](Self::receiver) to fold signal delivery into
/// its own `crossbeam_channel::select!` loop alongside other channels.
pub struct SignalSource {
    rx: Receiver<Signal>,
}

impl SignalSource {
    pub(crate) fn new(rx: Receiver<Signal>) -> Self {
        Self { rx }
    }

    /// Blocks until the next signal arrives.
    ///
    /// # Panics
    ///
    /// Panics if the sending side disappeared: the scheduler holds the sender
    /// until the worker thread is joined, so a disconnect here means the
    /// holder invariants were violated elsewhere.
    pub fn wait(&self) -> Signal {
        match self.rx.recv() {
            Ok(signal) => signal,
            Err(_) => panic!("signal channel disconnected while the worker is still running"),
        }
    }

    /// Returns the next signal without blocking, if one is pending.
    pub fn try_next(&self) -> Option<Signal> {
        self.rx.try_recv().ok()
    }

    /// The underlying channel receiver, for `select!`-style multiplexing
    /// with the worker's other event sources.
    pub fn receiver(&self) -> &Receiver<Signal> {
        &self.rx
    }
}

/// Start semaphore plus done flag shared between a dedicated worker thread
/// and its holder.
///
/// The holder posts the gate once per scheduled tick; `stop()` raises the
/// done flag *before* posting so the worker observes it on the very next
/// wake.
#[derive(Debug, Default)]
pub(crate) struct TickGate {
    start: Semaphore,
    done: AtomicBool,
}

impl TickGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wakes the worker for one unit of work.
    pub(crate) fn tick(&self) {
        self.start.post();
    }

    /// Raises the done flag and wakes the worker so it can observe it.
    pub(crate) fn stop(&self) {
        self.done.store(true, Ordering::SeqCst);
        self.start.post();
    }

    pub(crate) fn wait(&self) {
        self.start.wait();
    }

    /// Consumes any extra pending wake-ups, coalescing a burst of ticks that
    /// piled up behind a slow update into a single one.
    pub(crate) fn drain_pending(&self) {
        while self.start.try_wait() {}
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }
}

/// Main loop of a dedicated worker thread.
///
/// The done flag is re-checked immediately after every wake, including after
/// draining a burst (a stop post may have been consumed by the drain), so
/// shutdown is observed promptly and no update runs after `stop()`.
pub(crate) fn drive(task: &dyn ThreadedTask, gate: &TickGate, completion: Option<&Semaphore>) {
    loop {
        gate.wait();
        if gate.is_done() {
            return;
        }
        gate.drain_pending();
        if gate.is_done() {
            return;
        }
        task.update();
        if let Some(sem) = completion {
            sem.post();
        }
    }
}

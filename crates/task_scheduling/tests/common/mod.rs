//! Shared probe tasks for scheduler integration tests.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use task_scheduling::{KeyValue, PipedTask, Signal, SignalSource, Task, TaskKey, ThreadedTask};

/// Keyless pool task that counts invocations.
pub struct CountingTask {
    pub hits: Arc<AtomicUsize>,
}

impl Task for CountingTask {
    fn tick(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

/// Pool task keyed by a data-source name, so equal sources merge.
pub struct SourceProbe {
    pub source: String,
    pub hits: Arc<AtomicUsize>,
}

impl Task for SourceProbe {
    fn tick(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    fn key(&self) -> Option<TaskKey> {
        Some(TaskKey::of::<Self>(self.source.as_str().into()))
    }
}

/// Keyed pool task that accumulates state from absorbed duplicates.
pub struct AbsorbingProbe {
    pub source: String,
    pub weight: usize,
    pub total_weight: AtomicUsize,
}

impl AbsorbingProbe {
    pub fn new(source: &str, weight: usize) -> Self {
        Self {
            source: source.to_owned(),
            weight,
            total_weight: AtomicUsize::new(weight),
        }
    }
}

impl Task for AbsorbingProbe {
    fn tick(&self) {}

    fn key(&self) -> Option<TaskKey> {
        Some(TaskKey::of::<Self>(self.source.as_str().into()))
    }

    fn absorb(&self, other: &dyn Any) {
        if let Some(other) = other.downcast_ref::<Self>() {
            self.total_weight.fetch_add(other.weight, Ordering::SeqCst);
        }
    }
}

/// Pool task that sleeps before counting, for drain-completeness tests.
pub struct SlowTask {
    pub delay: Duration,
    pub hits: Arc<AtomicUsize>,
}

impl Task for SlowTask {
    fn tick(&self) {
        thread::sleep(self.delay);
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

/// Dedicated-thread task counting updates, optionally slow and optionally
/// synchronized with the tick.
pub struct ThreadedProbe {
    pub updates: Arc<AtomicUsize>,
    pub delay: Duration,
    pub synchronized: bool,
    pub source: Option<String>,
}

impl ThreadedProbe {
    pub fn counting(updates: Arc<AtomicUsize>, synchronized: bool) -> Self {
        Self {
            updates,
            delay: Duration::ZERO,
            synchronized,
            source: None,
        }
    }
}

impl ThreadedTask for ThreadedProbe {
    fn update(&self) {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.updates.fetch_add(1, Ordering::SeqCst);
    }

    fn key(&self) -> Option<TaskKey> {
        self.source
            .as_deref()
            .map(|s| TaskKey::of::<Self>(KeyValue::Text(s.to_owned())))
    }

    fn synchronized(&self) -> bool {
        self.synchronized
    }
}

/// Piped task that records every signal it receives, in order.
pub struct SignalRecorder {
    pub seen: Arc<Mutex<Vec<Signal>>>,
}

impl PipedTask for SignalRecorder {
    fn run(&self, signals: &SignalSource) {
        loop {
            let signal = signals.wait();
            self.seen.lock().unwrap().push(signal);
            if signal == Signal::Stop {
                return;
            }
        }
    }
}

//! src/task.rs
//!
//! The minimal unit of periodic work and its identity model.
//!
//! A [`Task`] is a short, synchronous piece of work which the scheduler runs
//! on its shared worker pool every `period` ticks. Tasks that gather the same
//! underlying data (say, readings for the same network interface) can be
//! registered from several call sites; giving them a [`TaskKey`] lets the
//! scheduler merge those registrations into a single instance instead of
//! doing the work twice.
//!
//! # Identity
//!
//! Two registrations are considered the same logical task when their keys are
//! equal. A key combines the concrete task type (its `TypeId`) with the
//! comparable constructor arguments, encoded as a [`KeyValue`] tree. Tasks
//! that return `None` from [`Task::key`] are never merged.
//!
//! ```ignore
//! struct IfaceStats { iface: String, /* ... */ }
//!
//! impl Task for IfaceStats {
//!     fn tick(&self) { /* read counters for self.iface */ }
//!
//!     fn key(&self) -> Option<TaskKey> {
//!         Some(TaskKey::of::<Self>(self.iface.as_str().into()))
//!     }
//! }
//! ```

use std::any::{Any, TypeId};

/// A unit of periodic work, run on the scheduler's worker pool.
///
/// Implementations must be cheap: `tick()` runs synchronously on a pool
/// worker and the scheduler waits for all pooled work at the end of every
/// scheduling cycle. Work that may block for an unpredictable time belongs in
/// a [`ThreadedTask`](crate::threaded::ThreadedTask) instead.
///
/// # Failure policy
///
/// `tick()` is infallible by signature: error handling is entirely the
/// concrete task's concern. A panic escaping `tick()` aborts the process —
/// the scheduler has no recovery policy for arbitrary task semantics.
pub trait Task: Send + Sync + 'static {
    /// Performs one unit of work.
    fn tick(&self);

    /// Identity used for merging duplicate registrations.
    ///
    /// Returns `None` (the default) for tasks that must never be merged.
    fn key(&self) -> Option<TaskKey> {
        None
    }

    /// Takes over any interesting state from a discarded duplicate.
    ///
    /// When a registration merges into an existing equal task, the existing
    /// instance is kept and the new one is dropped; this hook runs first so
    /// state can be carried over. `other` is the same concrete type as
    /// `self`. The default does nothing.
    fn absorb(&self, _other: &dyn Any) {}
}

/// Identity of a mergeable task: concrete type plus comparable constructor
/// arguments.
///
/// Usable as a hash-map key; two keys are equal only when both the concrete
/// task type and the argument values match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    kind: TypeId,
    args: KeyValue,
}

impl TaskKey {
    /// Builds a key for the concrete task type `T` from its comparable
    /// constructor arguments.
    pub fn of<T: 'static>(args: KeyValue) -> Self {
        Self {
            kind: TypeId::of::<T>(),
            args,
        }
    }
}

/// A small hashable value tree for encoding task constructor arguments.
///
/// Covers the argument shapes the data collectors need (strings, numbers,
/// host/port pairs, ...) without resorting to runtime type comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    /// No distinguishing arguments; identity is the type alone.
    Unit,
    Bool(bool),
    Int(i64),
    Text(String),
    /// Composite arguments, e.g. `(host, port)`.
    List(Vec<KeyValue>),
}

impl From<bool> for KeyValue {
    fn from(v: bool) -> Self {
        KeyValue::Bool(v)
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        KeyValue::Int(v)
    }
}

impl From<u32> for KeyValue {
    fn from(v: u32) -> Self {
        KeyValue::Int(i64::from(v))
    }
}

impl From<u16> for KeyValue {
    fn from(v: u16) -> Self {
        KeyValue::Int(i64::from(v))
    }
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        KeyValue::Text(v.to_owned())
    }
}

impl From<String> for KeyValue {
    fn from(v: String) -> Self {
        KeyValue::Text(v)
    }
}

impl From<Vec<KeyValue>> for KeyValue {
    fn from(v: Vec<KeyValue>) -> Self {
        KeyValue::List(v)
    }
}

//! src/scheduler/mod.rs
//!
//! This module implements the `TaskScheduler`.
//!
//! The `TaskScheduler` coordinates registered tasks, the shared worker pool
//! and the dedicated task threads so that one call to `run_all_tasks()`
//! performs exactly one scheduling cycle and blocks until every piece of work
//! dispatched for that cycle has finished.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌───────────────┐
//!                 │ control thread│ (host main loop)
//!                 └───────┬───────┘
//!             register_*()│ run_all_tasks()
//!                         ↓
//!                 ┌───────────────┐
//!                 │ TaskScheduler │ ←───── SchedulerConfig
//!                 │  (registry of │        (pool_workers,
//!                 │    holders)   │         max_unused_ticks, ...)
//!                 └───────┬───────┘
//!        one Holder per distinct task identity
//!        (period, countdown, idle counter)
//!           ┌─────────────┼──────────────┐
//!           ↓             ↓              ↓
//!     ┌──────────┐  ┌───────────┐  ┌───────────┐
//!     │  Pooled  │  │ Dedicated │  │   Piped   │
//!     └────┬─────┘  └─────┬─────┘  └─────┬─────┘
//!          │ enqueue      │ TickGate     │ Signal::Tick
//!          ↓              ↓              ↓
//!     ┌──────────┐  ┌───────────┐  ┌───────────┐
//!     │ TaskPool │  │ own thread│  │ own thread│
//!     │ (N worker│  │ update()  │  │ run() owns│
//!     │  threads)│  │ per wake  │  │ its loop  │
//!     └────┬─────┘  └─────┬─────┘  └───────────┘
//!          │ completion   │ completion
//!          │ semaphore    │ semaphore (synchronized tasks)
//!          └──────┬───────┘
//!                 ↓
//!       run_all_tasks() returns: all work for this tick is done
//! ```
//!
//! # Module Structure
//!
//! ```text
//! src/scheduler/
//! ├── mod.rs          # Public API exports + module-level architecture docs
//! ├── config.rs       # SchedulerConfig, builder, and validation
//! ├── container.rs    # TaskScheduler registry and per-tick driver
//! ├── holder.rs       # Per-task scheduling state + backend strategies
//! ├── pool.rs         # Shared TaskPool for short tasks
//! └── common.rs       # Worker-thread utilities (panic containment)
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! let mut scheduler = TaskScheduler::new()?;
//!
//! // Configuration phase: register collectors.
//! let cpu = scheduler.register_task(1, CpuProbe::new())?;
//! let temps = scheduler.register_threaded_task(30, Hddtemp::new("localhost", 7634))?;
//!
//! // Main loop: one scheduling cycle per display update.
//! loop {
//!     scheduler.run_all_tasks();
//!     render(cpu.load(), temps.latest());
//! }
//! ```

mod common;
mod config;
mod container;
mod holder;
mod pool;

pub use config::{SchedulerConfig, SchedulerConfigBuilder};
pub use container::TaskScheduler;

//! src/scheduler/config.rs
//!
//! Configuration for scheduler behaviour.
//!
//! The `SchedulerConfig` struct stores the parameters that control how tasks
//! are pooled, retired and signalled.
//!
//! Example:
//! ```ignore
//! let config = SchedulerConfig::builder()
//!     .pool_workers(4)
//!     .max_unused_ticks(10)
//!     .build();
//! let scheduler = TaskScheduler::with_config(config)?;
//! ```
//!
//! # Tuning notes:
//! - `pool_workers`: more workers let more short tasks overlap within one
//!   tick, at the cost of idle threads between ticks.
//! - `max_unused_ticks`: a larger grace window keeps dropped tasks warm for
//!   longer (useful when registrations churn), a smaller one frees their
//!   resources sooner.

/// Configuration for a [`TaskScheduler`](crate::scheduler::TaskScheduler).
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of shared pool worker threads for short tasks.
    pub pool_workers: usize,
    /// How many fire-eligible ticks an unreferenced task survives before its
    /// holder is retired.
    pub max_unused_ticks: u32,
    /// Capacity of each piped task's signal channel. Tick signals beyond this
    /// are dropped (with a warning) until the worker catches up.
    pub signal_buffer: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pool_workers: 2,
            max_unused_ticks: 5,
            signal_buffer: 8,
        }
    }
}

impl SchedulerConfig {
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }
}

/// Builder for [`SchedulerConfig`] with method chaining.
#[derive(Debug, Default)]
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl SchedulerConfigBuilder {
    /// Set the number of pool worker threads (must be > 0).
    pub fn pool_workers(mut self, workers: usize) -> Self {
        self.config.pool_workers = workers;
        self
    }

    /// Set the retirement grace window, in fire-eligible ticks (must be > 0).
    pub fn max_unused_ticks(mut self, ticks: u32) -> Self {
        self.config.max_unused_ticks = ticks;
        self
    }

    /// Set the signal channel capacity for piped tasks (must be > 0).
    pub fn signal_buffer(mut self, capacity: usize) -> Self {
        self.config.signal_buffer = capacity;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> SchedulerConfig {
        self.config
    }
}

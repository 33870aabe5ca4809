//! Periodicity, merge and retirement tests for the TaskScheduler.
//!
//! Tests cover:
//! - Firing cadence as a function of task period
//! - Deduplication of equal-identity registrations
//! - Retirement of tasks whose handles were dropped
//! - Registration-time validation errors

mod common;
use common::{AbsorbingProbe, CountingTask, SourceProbe};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use task_scheduling::{SchedulerConfig, TaskScheduler};

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

// ============================================================================
// Periodicity
// ============================================================================

#[test]
fn test_period_one_fires_every_tick() -> Result<()> {
    let mut scheduler = TaskScheduler::new()?;
    let hits = counter();
    let _task = scheduler.register_task(1, CountingTask { hits: hits.clone() })?;

    for _ in 0..6 {
        scheduler.run_all_tasks();
    }
    assert_eq!(hits.load(Ordering::SeqCst), 6);
    Ok(())
}

#[test]
fn test_period_three_fires_on_every_third_tick() -> Result<()> {
    let mut scheduler = TaskScheduler::new()?;
    let hits = counter();
    let _task = scheduler.register_task(3, CountingTask { hits: hits.clone() })?;

    let mut observed = Vec::new();
    for _ in 0..7 {
        scheduler.run_all_tasks();
        observed.push(hits.load(Ordering::SeqCst));
    }
    // Fires on ticks 1, 4 and 7, never in between.
    assert_eq!(observed, vec![1, 1, 1, 2, 2, 2, 3]);
    Ok(())
}

#[test]
fn test_zero_period_rejected() -> Result<()> {
    let mut scheduler = TaskScheduler::new()?;
    let result = scheduler.register_task(0, CountingTask { hits: counter() });
    assert!(result.is_err());
    Ok(())
}

// ============================================================================
// Merging
// ============================================================================

#[test]
fn test_equal_keys_merge_into_one_instance() -> Result<()> {
    let mut scheduler = TaskScheduler::new()?;
    let hits = counter();

    let first = scheduler.register_task(
        3,
        SourceProbe {
            source: "cpu".into(),
            hits: hits.clone(),
        },
    )?;
    let second = scheduler.register_task(
        5,
        SourceProbe {
            source: "cpu".into(),
            hits: counter(),
        },
    )?;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(scheduler.registered_tasks(), 1);

    // Only the first instance's counter is ever driven.
    scheduler.run_all_tasks();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_merge_takes_minimum_period_and_resets_countdown() -> Result<()> {
    let mut scheduler = TaskScheduler::new()?;
    let hits = counter();

    let _slow = scheduler.register_task(
        5,
        SourceProbe {
            source: "net".into(),
            hits: hits.clone(),
        },
    )?;

    // Fires on tick 1, then counts down its 5-tick period.
    scheduler.run_all_tasks();
    scheduler.run_all_tasks();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // The merge shrinks the period to 2 and fires within one tick.
    let _fast = scheduler.register_task(
        2,
        SourceProbe {
            source: "net".into(),
            hits: counter(),
        },
    )?;
    scheduler.run_all_tasks();
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    // New cadence holds from here on.
    for _ in 0..4 {
        scheduler.run_all_tasks();
    }
    assert_eq!(hits.load(Ordering::SeqCst), 4);
    Ok(())
}

#[test]
fn test_distinct_sources_do_not_merge() -> Result<()> {
    let mut scheduler = TaskScheduler::new()?;

    let eth0 = scheduler.register_task(
        1,
        SourceProbe {
            source: "eth0".into(),
            hits: counter(),
        },
    )?;
    let eth1 = scheduler.register_task(
        1,
        SourceProbe {
            source: "eth1".into(),
            hits: counter(),
        },
    )?;

    assert!(!Arc::ptr_eq(&eth0, &eth1));
    assert_eq!(scheduler.registered_tasks(), 2);
    Ok(())
}

#[test]
fn test_keyless_tasks_never_merge() -> Result<()> {
    let mut scheduler = TaskScheduler::new()?;

    let a = scheduler.register_task(1, CountingTask { hits: counter() })?;
    let b = scheduler.register_task(1, CountingTask { hits: counter() })?;

    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(scheduler.registered_tasks(), 2);
    Ok(())
}

#[test]
fn test_absorb_carries_state_from_discarded_duplicate() -> Result<()> {
    let mut scheduler = TaskScheduler::new()?;

    let probe = scheduler.register_task(1, AbsorbingProbe::new("disk", 3))?;
    let merged = scheduler.register_task(1, AbsorbingProbe::new("disk", 4))?;

    assert!(Arc::ptr_eq(&probe, &merged));
    assert_eq!(probe.total_weight.load(Ordering::SeqCst), 7);
    Ok(())
}

// ============================================================================
// Retirement
// ============================================================================

#[test]
fn test_dropped_task_retires_after_grace_window() -> Result<()> {
    let mut scheduler = TaskScheduler::new()?;
    let hits = counter();

    let task = scheduler.register_task(1, CountingTask { hits: hits.clone() })?;
    drop(task);

    // Grace window: four more firings, retired on the fifth eligible tick.
    for tick in 1..=4 {
        scheduler.run_all_tasks();
        assert_eq!(hits.load(Ordering::SeqCst), tick);
        assert_eq!(scheduler.registered_tasks(), 1);
    }
    scheduler.run_all_tasks();
    assert_eq!(hits.load(Ordering::SeqCst), 4);
    assert_eq!(scheduler.registered_tasks(), 0);

    // And it stays gone.
    for _ in 0..5 {
        scheduler.run_all_tasks();
    }
    assert_eq!(hits.load(Ordering::SeqCst), 4);
    Ok(())
}

#[test]
fn test_held_handle_prevents_retirement() -> Result<()> {
    let mut scheduler = TaskScheduler::new()?;
    let hits = counter();

    let _task = scheduler.register_task(1, CountingTask { hits: hits.clone() })?;
    for _ in 0..20 {
        scheduler.run_all_tasks();
    }
    assert_eq!(hits.load(Ordering::SeqCst), 20);
    assert_eq!(scheduler.registered_tasks(), 1);
    Ok(())
}

#[test]
fn test_reregistration_restarts_grace_window() -> Result<()> {
    let mut scheduler = TaskScheduler::new()?;
    let hits = counter();

    let task = scheduler.register_task(
        1,
        SourceProbe {
            source: "cpu".into(),
            hits: hits.clone(),
        },
    )?;
    drop(task);

    for _ in 0..3 {
        scheduler.run_all_tasks();
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    // Re-registering the same identity freshens the holder even if the new
    // handle is immediately dropped.
    let task = scheduler.register_task(
        1,
        SourceProbe {
            source: "cpu".into(),
            hits: counter(),
        },
    )?;
    drop(task);

    for _ in 0..4 {
        scheduler.run_all_tasks();
        assert_eq!(scheduler.registered_tasks(), 1);
    }
    scheduler.run_all_tasks();
    assert_eq!(hits.load(Ordering::SeqCst), 7);
    assert_eq!(scheduler.registered_tasks(), 0);
    Ok(())
}

#[test]
fn test_custom_grace_window() -> Result<()> {
    let config = SchedulerConfig::builder().max_unused_ticks(2).build();
    let mut scheduler = TaskScheduler::with_config(config)?;
    let hits = counter();

    let task = scheduler.register_task(1, CountingTask { hits: hits.clone() })?;
    drop(task);

    scheduler.run_all_tasks();
    assert_eq!(scheduler.registered_tasks(), 1);
    scheduler.run_all_tasks();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.registered_tasks(), 0);
    Ok(())
}

// ============================================================================
// Combined scenario
// ============================================================================

#[test]
fn test_mixed_periods_with_merge_scenario() -> Result<()> {
    let mut scheduler = TaskScheduler::new()?;
    let a_hits = counter();
    let b_hits = counter();

    let _a = scheduler.register_task(
        1,
        CountingTask {
            hits: a_hits.clone(),
        },
    )?;
    let _b = scheduler.register_task(
        3,
        SourceProbe {
            source: "mail".into(),
            hits: b_hits.clone(),
        },
    )?;
    let _b2 = scheduler.register_task(
        2,
        SourceProbe {
            source: "mail".into(),
            hits: counter(),
        },
    )?;

    assert_eq!(scheduler.registered_tasks(), 2);

    for _ in 0..6 {
        scheduler.run_all_tasks();
    }
    // A fires every tick; the merged B fires with period 2, on ticks 1, 3, 5.
    assert_eq!(a_hits.load(Ordering::SeqCst), 6);
    assert_eq!(b_hits.load(Ordering::SeqCst), 3);
    Ok(())
}

// ============================================================================
// Configuration validation
// ============================================================================

#[test]
fn test_zero_pool_workers_rejected() {
    let config = SchedulerConfig::builder().pool_workers(0).build();
    assert!(TaskScheduler::with_config(config).is_err());
}

#[test]
fn test_zero_grace_window_rejected() {
    let config = SchedulerConfig::builder().max_unused_ticks(0).build();
    assert!(TaskScheduler::with_config(config).is_err());
}

#[test]
fn test_zero_signal_buffer_rejected() {
    let config = SchedulerConfig::builder().signal_buffer(0).build();
    assert!(TaskScheduler::with_config(config).is_err());
}

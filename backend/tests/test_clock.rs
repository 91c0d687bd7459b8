//! Event clock tests
//!
//! Critical invariants tested:
//! - Time never moves backwards
//! - Same-time events are delivered FIFO, in one batch
//! - Cancelled events are never delivered

use proptest::prelude::*;
use steel_plant_sim_core::{ClockError, SimulationClock};

#[test]
fn test_advance_returns_whole_same_time_batch() {
    let mut clock: SimulationClock<u32> = SimulationClock::new();
    clock.schedule(10.0, 1).unwrap();
    clock.schedule(5.0, 2).unwrap();
    clock.schedule(10.0, 3).unwrap();
    clock.schedule(5.0, 4).unwrap();

    let first = clock.advance().unwrap();
    assert_eq!(first.time, 5.0);
    let kinds: Vec<u32> = first.events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![2, 4]);

    let second = clock.advance().unwrap();
    assert_eq!(clock.now(), 10.0);
    let kinds: Vec<u32> = second.events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![1, 3]);

    assert!(clock.advance().is_none());
}

#[test]
fn test_invalid_delays_rejected() {
    let mut clock: SimulationClock<()> = SimulationClock::new();
    assert!(matches!(
        clock.schedule(-1.0, ()),
        Err(ClockError::InvalidDelay { .. })
    ));
    assert!(clock.schedule(f64::NAN, ()).is_err());
    assert!(clock.schedule(f64::INFINITY, ()).is_err());

    clock.schedule(3.0, ()).unwrap();
    clock.advance().unwrap();
    assert!(clock.schedule_at(2.0, ()).is_err());
    assert!(clock.schedule_at(3.0, ()).is_ok());
}

#[test]
fn test_cancel_withdraws_only_that_event() {
    let mut clock: SimulationClock<&str> = SimulationClock::new();
    let timeout = clock.schedule(30.0, "timeout").unwrap();
    clock.schedule(30.0, "complete").unwrap();

    assert!(clock.cancel(timeout));
    assert!(!clock.cancel(timeout));
    assert_eq!(clock.pending(), 1);

    let batch = clock.advance().unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch.events[0].kind, "complete");
}

#[test]
fn test_run_until_rests_at_horizon() {
    let mut clock: SimulationClock<u32> = SimulationClock::new();
    clock.schedule(1.0, 1).unwrap();
    clock.schedule(8.0, 2).unwrap();

    let mut seen = Vec::new();
    let batches = clock
        .run_until(5.0, |clock, batch| {
            for event in batch.events {
                seen.push(event.kind);
                if event.kind == 1 {
                    clock.schedule(2.0, 10)?;
                }
            }
            Ok::<(), ClockError>(())
        })
        .unwrap();

    assert_eq!(batches, 2);
    assert_eq!(seen, vec![1, 10]);
    assert_eq!(clock.now(), 5.0);
    assert_eq!(clock.peek_time(), Some(8.0));
}

#[test]
fn test_reset_discards_everything() {
    let mut clock: SimulationClock<u32> = SimulationClock::new();
    clock.schedule(4.0, 1).unwrap();
    clock.advance();
    clock.schedule(1.0, 2).unwrap();

    clock.reset();
    assert_eq!(clock.now(), 0.0);
    assert!(clock.is_empty());
    assert!(clock.advance().is_none());
}

proptest! {
    #[test]
    fn batches_are_ordered_and_fifo(delays in prop::collection::vec(0u8..20, 1..60)) {
        let mut clock: SimulationClock<usize> = SimulationClock::new();
        for (i, d) in delays.iter().enumerate() {
            clock.schedule(f64::from(*d), i).unwrap();
        }

        let mut last_time = -1.0;
        let mut delivered = 0;
        while let Some(batch) = clock.advance() {
            prop_assert!(batch.time > last_time);
            prop_assert_eq!(clock.now(), batch.time);
            last_time = batch.time;
            for pair in batch.events.windows(2) {
                prop_assert!(pair[0].kind < pair[1].kind);
            }
            for event in &batch.events {
                prop_assert_eq!(f64::from(delays[event.kind]), batch.time);
            }
            delivered += batch.len();
        }
        prop_assert_eq!(delivered, delays.len());
    }
}

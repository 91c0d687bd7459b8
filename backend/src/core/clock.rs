//! Discrete-event clock for the simulation
//!
//! Simulation time is a continuous `f64` measured in minutes. The clock owns
//! the future-event queue: events are ordered by timestamp and, among equal
//! timestamps, by insertion sequence, so same-time events are always handled
//! in the order they were scheduled.
//!
//! # Critical Invariants
//!
//! 1. Time never moves backwards
//! 2. Same-time events are delivered FIFO
//! 3. Nothing outside this module reads or writes the current time

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};
use thiserror::Error;

/// Identifier of a scheduled event (its insertion sequence number)
pub type EventId = u64;

/// Errors raised when scheduling events
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClockError {
    #[error("Invalid delay {delay}: events must be scheduled at a finite, non-negative offset")]
    InvalidDelay { delay: f64 },
}

/// An event popped from the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent<E> {
    pub id: EventId,
    pub time: f64,
    pub kind: E,
}

/// All events sharing one timestamp, in insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct EventBatch<E> {
    pub time: f64,
    pub events: Vec<ScheduledEvent<E>>,
}

impl<E> EventBatch<E> {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Debug, Clone)]
struct QueueEntry<E> {
    time: f64,
    seq: EventId,
    kind: E,
}

impl<E> PartialEq for QueueEntry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<E> Eq for QueueEntry<E> {}

impl<E> PartialOrd for QueueEntry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for QueueEntry<E> {
    // Reversed so the max-heap pops the earliest (time, seq) first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Future-event queue plus the current simulation time
///
/// # Example
/// ```
/// use steel_plant_sim_core::SimulationClock;
///
/// let mut clock: SimulationClock<&str> = SimulationClock::new();
/// clock.schedule(5.0, "tap").unwrap();
/// clock.schedule(5.0, "pour").unwrap();
///
/// let batch = clock.advance().unwrap();
/// assert_eq!(clock.now(), 5.0);
/// assert_eq!(batch.events[0].kind, "tap");
/// assert_eq!(batch.events[1].kind, "pour");
/// ```
#[derive(Debug, Clone)]
pub struct SimulationClock<E> {
    now: f64,
    queue: BinaryHeap<QueueEntry<E>>,
    /// Ids still eligible for delivery; cancelled entries are dropped lazily
    live: BTreeSet<EventId>,
    next_seq: EventId,
}

impl<E> Default for SimulationClock<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> SimulationClock<E> {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            queue: BinaryHeap::new(),
            live: BTreeSet::new(),
            next_seq: 0,
        }
    }

    /// Current simulation time in minutes
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Number of pending (non-cancelled) events
    pub fn pending(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Schedule `kind` at `now + delay`
    ///
    /// # Errors
    /// `ClockError::InvalidDelay` when `delay` is negative, NaN or infinite.
    pub fn schedule(&mut self, delay: f64, kind: E) -> Result<EventId, ClockError> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(ClockError::InvalidDelay { delay });
        }
        Ok(self.push(self.now + delay, kind))
    }

    /// Schedule `kind` at an absolute time, which must not be in the past
    pub fn schedule_at(&mut self, time: f64, kind: E) -> Result<EventId, ClockError> {
        if !time.is_finite() || time < self.now {
            return Err(ClockError::InvalidDelay {
                delay: time - self.now,
            });
        }
        Ok(self.push(time, kind))
    }

    fn push(&mut self, time: f64, kind: E) -> EventId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(QueueEntry { time, seq, kind });
        self.live.insert(seq);
        seq
    }

    /// Withdraw a pending event
    ///
    /// Returns `false` if the event was already delivered or cancelled.
    pub fn cancel(&mut self, id: EventId) -> bool {
        self.live.remove(&id)
    }

    fn discard_cancelled(&mut self) {
        while let Some(top) = self.queue.peek() {
            if self.live.contains(&top.seq) {
                break;
            }
            self.queue.pop();
        }
    }

    /// Timestamp of the next deliverable event
    pub fn peek_time(&mut self) -> Option<f64> {
        self.discard_cancelled();
        self.queue.peek().map(|entry| entry.time)
    }

    /// Pop the earliest event and every other event at the same timestamp
    ///
    /// Moves `now` to the batch timestamp. Returns `None` when the queue is
    /// exhausted.
    pub fn advance(&mut self) -> Option<EventBatch<E>> {
        self.discard_cancelled();
        let first = self.queue.pop()?;
        self.live.remove(&first.seq);
        let time = first.time;
        self.now = time;

        let mut events = vec![ScheduledEvent {
            id: first.seq,
            time,
            kind: first.kind,
        }];

        loop {
            self.discard_cancelled();
            match self.queue.peek() {
                Some(next) if next.time == time => {}
                _ => break,
            }
            if let Some(entry) = self.queue.pop() {
                self.live.remove(&entry.seq);
                events.push(ScheduledEvent {
                    id: entry.seq,
                    time,
                    kind: entry.kind,
                });
            }
        }

        Some(EventBatch { time, events })
    }

    /// Deliver batches to `handler` until no event remains at or before `until`
    ///
    /// Events the handler schedules at or before `until` are delivered in the
    /// same call. Afterwards the clock rests at `until` if it was ahead of the
    /// last delivered batch.
    ///
    /// # Returns
    /// Number of batches delivered
    pub fn run_until<F, Err>(&mut self, until: f64, mut handler: F) -> Result<usize, Err>
    where
        F: FnMut(&mut Self, EventBatch<E>) -> Result<(), Err>,
    {
        let mut batches = 0;
        while let Some(next) = self.peek_time() {
            if next > until {
                break;
            }
            if let Some(batch) = self.advance() {
                handler(self, batch)?;
                batches += 1;
            }
        }
        self.rest_at(until);
        Ok(batches)
    }

    /// Move the clock forward to `time` without delivering anything
    ///
    /// Ignored when `time` is behind the clock, not finite, or past a pending event.
    pub fn rest_at(&mut self, time: f64) {
        if !time.is_finite() || time <= self.now {
            return;
        }
        if let Some(next) = self.peek_time() {
            if next < time {
                return;
            }
        }
        self.now = time;
    }

    /// Drop all pending events and rewind to zero
    pub fn reset(&mut self) {
        self.now = 0.0;
        self.queue.clear();
        self.live.clear();
        self.next_seq = 0;
    }
}

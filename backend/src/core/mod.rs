//! Simulation kernel: the event clock

pub mod clock;

pub use clock::{ClockError, EventBatch, EventId, ScheduledEvent, SimulationClock};

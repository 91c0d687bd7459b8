//! Orchestrator - the plant simulation run
//!
//! See `engine.rs` for construction, event dispatch and control operations.

pub mod engine;
mod invariants;
pub mod snapshot;

pub use engine::{PlantEvent, PlantSimulation, RunStatus, RunSummary, SimulationError, StepResult};
pub use snapshot::{CraneSnapshot, PlantSnapshot, UnitSnapshot};

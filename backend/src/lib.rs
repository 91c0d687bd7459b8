//! Steel Plant Simulation Core - Rust Engine
//!
//! Discrete-event simulation of steel-plant material flow: heats are
//! generated, assigned ladles, processed through EAF → LMF → [Degasser] →
//! Caster, and moved between units by overhead cranes and ladle cars.
//!
//! # Architecture
//!
//! - **core**: Event clock (future-event queue, same-time batches)
//! - **rng**: Deterministic random number generation
//! - **config**: JSON configuration, defaults and validation
//! - **models**: Domain types (Heat, SteelGrade, ProductionUnit, Bay, Crane, Ladle, LadleCar)
//! - **routing**: Heat generation and route management
//! - **units**: Production unit state machines and per-kind behavior
//! - **transport**: Cranes, ladle cars, bay graph and ladle pool
//! - **metrics**: Sampling, bottleneck analysis, plant stats
//! - **orchestrator**: The run: event dispatch, control operations, snapshots
//!
//! # Critical Invariants
//!
//! 1. Simulation time comes only from the event clock
//! 2. All randomness is deterministic (seeded RNG)
//! 3. Unit occupancy never exceeds capacity; busy crane spans never overlap
//! 4. FFI boundary is minimal and safe

pub mod config;
pub mod core;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod rng;
pub mod routing;
pub mod transport;
pub mod units;

pub use config::{ConfigError, DispatchPolicy, PlantConfig};
pub use core::{ClockError, EventId, SimulationClock};
pub use metrics::{Bottleneck, ConditionCounters, MetricsSample, PlantStats, Recommendation};
pub use models::{
    event::{Event, EventLog},
    grade::SteelGrade,
    heat::{Heat, HeatLocation, HeatStatus, QualityFlag},
    state::PlantState,
    unit::{ProductionUnit, UnitKind, UnitState},
};
pub use orchestrator::{
    PlantEvent, PlantSimulation, PlantSnapshot, RunStatus, RunSummary, SimulationError, StepResult,
};
pub use rng::RngManager;

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn steel_plant_sim_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::PyPlantSimulation>()?;
    Ok(())
}

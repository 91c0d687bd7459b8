//! Plant snapshots
//!
//! A `PlantSnapshot` is the complete, serializable picture of a run at one
//! instant: entities, heats, counters, bottlenecks and stats.
//!
//! # Critical Invariants
//!
//! - **Determinism**: every collection is emitted in a fixed order, so the
//!   same config and seed produce byte-identical JSON
//! - **Config Matching**: `config_hash` identifies the configuration the run
//!   was built from

use crate::metrics::{Bottleneck, ConditionCounters, PlantStats};
use crate::models::crane::CraneStatus;
use crate::models::heat::Heat;
use crate::models::ladle::Ladle;
use crate::models::ladle_car::LadleCar;
use crate::models::state::compare_ids;
use crate::models::transport_request::TransportRequest;
use crate::models::unit::{BlockReason, Occupant, ProductionUnit, UnitKind, UnitState, UnitStats};
use crate::orchestrator::{PlantSimulation, RunStatus, SimulationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantSnapshot {
    pub time: f64,
    pub status: RunStatus,
    pub seed: u64,
    pub rng_state: u64,
    /// SHA-256 of the canonical config JSON
    pub config_hash: String,
    pub units: Vec<UnitSnapshot>,
    pub cranes: Vec<CraneSnapshot>,
    pub ladle_cars: Vec<LadleCar>,
    pub ladles: Vec<Ladle>,
    pub heats_in_plant: Vec<Heat>,
    /// In completion order
    pub heats_completed: Vec<Heat>,
    pub transport_requests: Vec<TransportRequest>,
    pub ladle_queue: Vec<String>,
    pub counters: ConditionCounters,
    pub bottlenecks: Vec<Bottleneck>,
    pub stats: PlantStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: String,
    pub kind: UnitKind,
    pub bay: String,
    pub x: f64,
    pub y: f64,
    pub capacity: usize,
    pub state: UnitState,
    pub occupants: Vec<Occupant>,
    pub queue: Vec<String>,
    pub inbound: usize,
    pub blocked: Option<BlockReason>,
    pub turnaround_until: Option<f64>,
    pub sequence_grade: Option<String>,
    pub sequence_length: u32,
    pub stats: UnitStats,
}

impl UnitSnapshot {
    fn capture(unit: &ProductionUnit, now: f64) -> Self {
        let mut stats = unit.stats().clone();
        stats.busy_time = unit.busy_time_at(now);
        stats.queue_area = unit.queue_area_at(now);
        Self {
            id: unit.id().to_string(),
            kind: unit.kind(),
            bay: unit.bay().to_string(),
            x: unit.x(),
            y: unit.y(),
            capacity: unit.capacity(),
            state: unit.state(),
            occupants: unit.occupants().to_vec(),
            queue: unit.queue().iter().cloned().collect(),
            inbound: unit.inbound(),
            blocked: unit.blocked_reason(),
            turnaround_until: unit.turnaround_until(),
            sequence_grade: unit.sequence().grade().map(str::to_string),
            sequence_length: unit.sequence().length(),
            stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CraneSnapshot {
    pub id: String,
    pub bay: String,
    pub position: f64,
    pub status: CraneStatus,
    pub range: Option<(f64, f64)>,
    pub request_id: Option<String>,
    pub busy_time: f64,
    pub tasks_completed: u64,
}

impl PlantSimulation {
    pub fn snapshot(&self) -> PlantSnapshot {
        let now = self.now();

        let mut units: Vec<UnitSnapshot> = self
            .plant
            .units
            .values()
            .map(|u| UnitSnapshot::capture(u, now))
            .collect();
        units.sort_by(|a, b| compare_ids(&a.id, &b.id));

        let mut cranes: Vec<CraneSnapshot> = self
            .plant
            .cranes
            .values()
            .map(|c| CraneSnapshot {
                id: c.id().to_string(),
                bay: c.bay().to_string(),
                position: c.position(),
                status: c.status_at(now),
                range: c.range(),
                request_id: c.task().map(|t| t.request_id.clone()),
                busy_time: c.busy_time_at(now),
                tasks_completed: c.tasks_completed(),
            })
            .collect();
        cranes.sort_by(|a, b| compare_ids(&a.id, &b.id));

        let mut ladle_cars: Vec<LadleCar> = self.plant.cars.values().cloned().collect();
        ladle_cars.sort_by(|a, b| compare_ids(a.id(), b.id()));
        let mut ladles: Vec<Ladle> = self.plant.ladles.values().cloned().collect();
        ladles.sort_by(|a, b| compare_ids(a.id(), b.id()));

        PlantSnapshot {
            time: now,
            status: self.status,
            seed: self.config.seed,
            rng_state: self.rng.get_state(),
            config_hash: self.config.config_hash(),
            units,
            cranes,
            ladle_cars,
            ladles,
            heats_in_plant: self.plant.heats.values().cloned().collect(),
            heats_completed: self.plant.completed.clone(),
            transport_requests: self.plant.requests.values().cloned().collect(),
            ladle_queue: self.ladle_waiting.iter().cloned().collect(),
            counters: self.counters.clone(),
            bottlenecks: self.bottlenecks(),
            stats: self.stats(),
        }
    }

    pub fn snapshot_json(&self) -> Result<String, SimulationError> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::PlantConfig;
    use crate::orchestrator::PlantSimulation;

    #[test]
    fn test_snapshot_orders_ids_numerically() {
        let config = PlantConfig::from_json_str(r#"{"max_heats": 1, "n_ladles": 12}"#).unwrap();
        let sim = PlantSimulation::new(config).unwrap();
        let snapshot = sim.snapshot();
        let ladles: Vec<&str> = snapshot.ladles.iter().map(|l| l.id()).collect();
        assert_eq!(ladles[1], "ladle_2");
        assert_eq!(ladles[11], "ladle_12");
        assert_eq!(snapshot.config_hash, sim.config().config_hash());
    }

    #[test]
    fn test_snapshot_json_round_trips() {
        let config = PlantConfig::from_json_str(r#"{"max_heats": 2}"#).unwrap();
        let mut sim = PlantSimulation::new(config).unwrap();
        sim.run().unwrap();
        let json = sim.snapshot_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["heats_completed"].as_array().unwrap().len(), 2);
        assert_eq!(value["status"], "Finished");
    }
}

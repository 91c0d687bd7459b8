//! Metrics collection
//!
//! The collector is a pure observer: every reporting interval it reads the
//! cumulative counters of units, cranes and ladle cars and turns the deltas
//! since the previous sample into one `MetricsSample`. It never mutates
//! plant state.

pub mod analyzer;

pub use analyzer::{Bottleneck, BottleneckAnalyzer, Recommendation, Signal};

use crate::models::state::PlantState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Non-fatal plant conditions, counted over the whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionCounters {
    pub ladle_shortage: u64,
    pub transport_starvation: u64,
    pub non_conforming: u64,
    pub warming_timeouts: u64,
    pub caster_turnarounds: u64,
    pub short_sequences: u64,
    /// Heats left in the plant when the run finished
    pub stranded_heats: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Unit,
    Crane,
    LadleCar,
}

impl EntityKind {
    pub fn is_transport(&self) -> bool {
        matches!(self, EntityKind::Crane | EntityKind::LadleCar)
    }
}

/// One entity's figures over one reporting window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySample {
    pub entity_id: String,
    pub entity: EntityKind,
    /// Busy share of the window (per slot for multi-slot units)
    pub utilization: f64,
    /// Time-averaged queue length
    pub queue_length: f64,
    /// Mean queue wait of heats started in the window
    pub mean_wait: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSample {
    pub time: f64,
    pub window: f64,
    pub entities: Vec<EntitySample>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Cumulative {
    busy: f64,
    queue_area: f64,
    wait_sum: f64,
    started: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SampleCollector {
    last_time: f64,
    last: BTreeMap<String, Cumulative>,
}

impl SampleCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the window ending at `now`
    pub fn take(&mut self, plant: &PlantState, now: f64) -> MetricsSample {
        let window = now - self.last_time;
        let mut entities = Vec::new();

        for unit in plant.units.values() {
            let current = Cumulative {
                busy: unit.busy_time_at(now),
                queue_area: unit.queue_area_at(now),
                wait_sum: unit.stats().wait_time_sum,
                started: unit.stats().heats_started,
            };
            let delta = self.delta(unit.id(), current);
            let started = delta.started;
            entities.push(EntitySample {
                entity_id: unit.id().to_string(),
                entity: EntityKind::Unit,
                utilization: ratio(delta.busy, unit.capacity() as f64 * window),
                queue_length: ratio(delta.queue_area, window),
                mean_wait: (started > 0).then(|| delta.wait_sum / started as f64),
            });
        }

        let transport = plant
            .cranes
            .values()
            .map(|c| (c.id(), EntityKind::Crane, c.busy_time_at(now)))
            .chain(
                plant
                    .cars
                    .values()
                    .map(|c| (c.id(), EntityKind::LadleCar, c.busy_time_at(now))),
            );
        for (id, entity, busy) in transport {
            let delta = self.delta(
                id,
                Cumulative {
                    busy,
                    ..Cumulative::default()
                },
            );
            entities.push(EntitySample {
                entity_id: id.to_string(),
                entity,
                utilization: ratio(delta.busy, window),
                queue_length: 0.0,
                mean_wait: None,
            });
        }

        self.last_time = now;
        MetricsSample {
            time: now,
            window,
            entities,
        }
    }

    fn delta(&mut self, id: &str, current: Cumulative) -> Cumulative {
        let previous = self.last.insert(id.to_string(), current).unwrap_or_default();
        Cumulative {
            busy: current.busy - previous.busy,
            queue_area: current.queue_area - previous.queue_area,
            wait_sum: current.wait_sum - previous.wait_sum,
            started: current.started - previous.started,
        }
    }
}

fn ratio(value: f64, over: f64) -> f64 {
    if over > 0.0 {
        value / over
    } else {
        0.0
    }
}

/// Run-level production figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantStats {
    pub heats_generated: usize,
    pub heats_completed: usize,
    pub heats_in_plant: usize,
    pub avg_cycle_time: Option<f64>,
    /// Mean interval between generated heats
    pub takt_time: f64,
    /// `min(avg_cycle_time / takt_time, 1)`
    pub takt_utilization: Option<f64>,
    pub total_car_distance: f64,
    pub heats_processed: BTreeMap<String, u64>,
}

impl PlantStats {
    pub fn collect(plant: &PlantState, generated: usize, takt_time: f64) -> Self {
        let cycles: Vec<f64> = plant
            .completed
            .iter()
            .filter_map(|h| h.cycle_time())
            .collect();
        let avg_cycle_time =
            (!cycles.is_empty()).then(|| cycles.iter().sum::<f64>() / cycles.len() as f64);
        let takt_utilization = avg_cycle_time
            .filter(|_| takt_time > 0.0)
            .map(|avg| (avg / takt_time).min(1.0));

        Self {
            heats_generated: generated,
            heats_completed: plant.completed.len(),
            heats_in_plant: plant.heats.len(),
            avg_cycle_time,
            takt_time,
            takt_utilization,
            total_car_distance: plant.cars.values().map(|c| c.total_distance()).sum(),
            heats_processed: plant
                .units
                .values()
                .map(|u| (u.id().to_string(), u.stats().heats_processed))
                .collect(),
        }
    }
}

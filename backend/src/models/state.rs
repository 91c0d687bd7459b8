//! Plant state arena
//!
//! `PlantState` owns every entity of a run: production units, heats, ladles,
//! cranes, ladle cars and transport requests. Components refer to each other
//! by id only. All maps are ordered so iteration (and therefore every
//! decision and snapshot) is reproducible.
//!
//! # Critical Invariants
//!
//! 1. Every id referenced by a unit, crane, car or request exists here
//! 2. A heat lives in `heats` while in the plant and in `completed` after exit

use crate::models::crane::Crane;
use crate::models::heat::Heat;
use crate::models::ladle::Ladle;
use crate::models::ladle_car::LadleCar;
use crate::models::transport_request::TransportRequest;
use crate::models::unit::{ProductionUnit, UnitKind};
use crate::orchestrator::SimulationError;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Order ids by prefix, then by trailing number (`ladle_2` < `ladle_10`)
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    fn split(id: &str) -> (&str, Option<u64>) {
        let digits = id.len() - id.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        let (prefix, number) = id.split_at(id.len() - digits);
        (prefix, number.parse().ok())
    }
    let (pa, na) = split(a);
    let (pb, nb) = split(b);
    pa.cmp(pb).then(na.cmp(&nb)).then_with(|| a.cmp(b))
}

fn unknown(kind: &str, id: &str) -> SimulationError {
    SimulationError::UnknownEntity {
        kind: kind.to_string(),
        id: id.to_string(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlantState {
    pub units: BTreeMap<String, ProductionUnit>,
    /// Heats currently in the plant
    pub heats: BTreeMap<String, Heat>,
    /// Heats that left after casting, in completion order
    pub completed: Vec<Heat>,
    pub ladles: BTreeMap<String, Ladle>,
    pub cranes: BTreeMap<String, Crane>,
    pub cars: BTreeMap<String, LadleCar>,
    /// Outstanding transport requests
    pub requests: BTreeMap<String, TransportRequest>,
}

impl PlantState {
    pub fn unit(&self, id: &str) -> Result<&ProductionUnit, SimulationError> {
        self.units.get(id).ok_or_else(|| unknown("unit", id))
    }

    pub fn unit_mut(&mut self, id: &str) -> Result<&mut ProductionUnit, SimulationError> {
        self.units.get_mut(id).ok_or_else(|| unknown("unit", id))
    }

    pub fn heat(&self, id: &str) -> Result<&Heat, SimulationError> {
        self.heats.get(id).ok_or_else(|| unknown("heat", id))
    }

    pub fn heat_mut(&mut self, id: &str) -> Result<&mut Heat, SimulationError> {
        self.heats.get_mut(id).ok_or_else(|| unknown("heat", id))
    }

    pub fn ladle_mut(&mut self, id: &str) -> Result<&mut Ladle, SimulationError> {
        self.ladles.get_mut(id).ok_or_else(|| unknown("ladle", id))
    }

    pub fn crane_mut(&mut self, id: &str) -> Result<&mut Crane, SimulationError> {
        self.cranes.get_mut(id).ok_or_else(|| unknown("crane", id))
    }

    pub fn car(&self, id: &str) -> Result<&LadleCar, SimulationError> {
        self.cars.get(id).ok_or_else(|| unknown("ladle car", id))
    }

    pub fn car_mut(&mut self, id: &str) -> Result<&mut LadleCar, SimulationError> {
        self.cars.get_mut(id).ok_or_else(|| unknown("ladle car", id))
    }

    pub fn request(&self, id: &str) -> Result<&TransportRequest, SimulationError> {
        self.requests.get(id).ok_or_else(|| unknown("transport request", id))
    }

    pub fn request_mut(&mut self, id: &str) -> Result<&mut TransportRequest, SimulationError> {
        self.requests
            .get_mut(id)
            .ok_or_else(|| unknown("transport request", id))
    }

    /// Units of one kind in id order
    pub fn units_of_kind(&self, kind: UnitKind) -> impl Iterator<Item = &ProductionUnit> {
        self.units.values().filter(move |u| u.kind() == kind)
    }

    /// Completed heat by id
    pub fn completed_heat(&self, id: &str) -> Option<&Heat> {
        self.completed.iter().find(|h| h.id() == id)
    }

    /// Heats in the plant or completed
    pub fn heat_count(&self) -> usize {
        self.heats.len() + self.completed.len()
    }

    /// Ladles not yet retired
    pub fn active_ladles(&self) -> usize {
        self.ladles
            .values()
            .filter(|l| l.status() != crate::models::ladle::LadleStatus::InMaintenance)
            .count()
    }

    /// Lowest-numbered idle ladle
    pub fn first_idle_ladle(&self) -> Option<String> {
        self.ladles
            .values()
            .filter(|l| l.is_available())
            .map(|l| l.id())
            .min_by(|a, b| compare_ids(a, b))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_ids_numeric_suffix() {
        assert_eq!(compare_ids("ladle_2", "ladle_10"), Ordering::Less);
        assert_eq!(compare_ids("bay1_EAF_1", "bay1_EAF_1"), Ordering::Equal);
        assert_eq!(compare_ids("bay1_crane_1", "bay2_crane_1"), Ordering::Less);
        assert_eq!(compare_ids("car", "car_1"), Ordering::Less);
    }

    #[test]
    fn test_first_idle_ladle_uses_numeric_order() {
        let mut state = PlantState::default();
        for i in [10, 2, 3] {
            let id = format!("ladle_{}", i);
            state.ladles.insert(id.clone(), Ladle::new(id, 5));
        }
        assert_eq!(state.first_idle_ladle().as_deref(), Some("ladle_2"));
        state.ladle_mut("ladle_2").unwrap().load("heat_00001", 1600.0);
        assert_eq!(state.first_idle_ladle().as_deref(), Some("ladle_3"));
        assert!(state.unit("nope").is_err());
    }
}

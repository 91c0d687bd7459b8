//! Plant invariants, checked after every event batch
//!
//! A violation is a bug in the engine, not a plant condition: the run halts
//! with `SimulationError::InvariantViolation` carrying a JSON snapshot of
//! the state at that moment.

use crate::models::crane::ranges_overlap;
use crate::models::heat::HeatLocation;
use crate::orchestrator::{PlantSimulation, SimulationError};
use log::error;

/// Slack for floating-point temperature comparisons
const TEMPERATURE_EPSILON: f64 = 1e-9;

impl PlantSimulation {
    /// Build an invariant error with the current state attached
    pub(crate) fn violation(&self, detail: String) -> SimulationError {
        error!("Invariant violated at t={:.1}: {}", self.now(), detail);
        let state_dump = self
            .snapshot_json()
            .unwrap_or_else(|err| format!("{{\"snapshot_error\": \"{}\"}}", err));
        SimulationError::InvariantViolation { detail, state_dump }
    }

    pub(crate) fn check_invariants(&self) -> Result<(), SimulationError> {
        self.check_units()?;
        self.check_heats()?;
        self.check_crane_ranges()
    }

    fn check_units(&self) -> Result<(), SimulationError> {
        for unit in self.plant.units.values() {
            if unit.occupants().len() > unit.capacity() {
                return Err(self.violation(format!(
                    "{} holds {} heats with capacity {}",
                    unit.id(),
                    unit.occupants().len(),
                    unit.capacity()
                )));
            }
            for occupant in unit.occupants() {
                if unit.is_queued(&occupant.heat_id) {
                    return Err(self.violation(format!(
                        "{} is both queued and processing at {}",
                        occupant.heat_id,
                        unit.id()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Each heat is owned by exactly the unit or request its location names
    fn check_heats(&self) -> Result<(), SimulationError> {
        for (id, heat) in &self.plant.heats {
            let owned = match heat.location() {
                HeatLocation::AwaitingLadle { unit } | HeatLocation::Queued { unit } => self
                    .plant
                    .units
                    .get(unit)
                    .is_some_and(|u| u.is_queued(id)),
                HeatLocation::Processing { unit }
                | HeatLocation::Warming { unit }
                | HeatLocation::AwaitingPickup { unit } => self
                    .plant
                    .units
                    .get(unit)
                    .is_some_and(|u| u.occupant(id).is_some()),
                HeatLocation::InTransit { request } => self
                    .plant
                    .requests
                    .get(request)
                    .is_some_and(|r| &r.heat_id == id),
                HeatLocation::Completed => false,
            };
            if !owned {
                return Err(self.violation(format!(
                    "{} is {:?} but not held there",
                    id,
                    heat.location()
                )));
            }

            if let Some(grade) = self.grades.get(heat.grade_id()) {
                if heat.temperature() > grade.max_temperature + TEMPERATURE_EPSILON {
                    return Err(self.violation(format!(
                        "{} at {:.1} °C exceeds the {:.1} °C maximum",
                        id,
                        heat.temperature(),
                        grade.max_temperature
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_crane_ranges(&self) -> Result<(), SimulationError> {
        for bay in self.transport.graph().bays().values() {
            let busy: Vec<(&str, (f64, f64))> = bay
                .crane_ids
                .iter()
                .filter_map(|id| self.plant.cranes.get(id))
                .filter_map(|c| c.range().map(|r| (c.id(), r)))
                .collect();
            for (i, (a, range_a)) in busy.iter().enumerate() {
                for (b, range_b) in &busy[i + 1..] {
                    if ranges_overlap(*range_a, *range_b) {
                        return Err(self.violation(format!(
                            "cranes {} {:?} and {} {:?} overlap in {}",
                            a, range_a, b, range_b, bay.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

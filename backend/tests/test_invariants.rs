//! Plant invariants observed from outside while stepping
//!
//! Critical invariants tested:
//! - A unit never holds more heats than its capacity
//! - A heat is held by exactly the unit or request its location names
//! - Busy cranes in one bay never claim overlapping rail ranges
//! - Simulated time never goes backwards

use proptest::prelude::*;
use steel_plant_sim_core::models::crane::ranges_overlap;
use steel_plant_sim_core::models::HeatLocation;
use steel_plant_sim_core::{PlantConfig, PlantSimulation};

const BUSY_BAY: &str = r#"{
    "max_heats": 15,
    "heat_generation_interval": {"distribution": "uniform", "min": 10, "max": 30},
    "n_eaf_per_bay": 2,
    "n_lmf_per_bay": 2,
    "n_cranes_per_bay": 3,
    "units": {"EAF": {}, "LMF": {}, "Caster": {}}
}"#;

const TWO_BAYS: &str = r#"{
    "max_heats": 12,
    "heat_generation_interval": 25,
    "bays": {
        "bay1": {"x": 0, "y": 0, "width": 150, "height": 50},
        "bay2": {"x": 150, "y": 0, "width": 150, "height": 50}
    },
    "units": {
        "EAF": {"bays": ["bay1"]},
        "LMF": {},
        "Caster": {"bays": ["bay2"]}
    }
}"#;

fn check_plant(sim: &PlantSimulation) -> Result<(), String> {
    let plant = sim.plant();

    for unit in plant.units.values() {
        if unit.occupants().len() > unit.capacity() {
            return Err(format!("{} over capacity", unit.id()));
        }
    }

    for (id, heat) in &plant.heats {
        let held = match heat.location() {
            HeatLocation::AwaitingLadle { unit } | HeatLocation::Queued { unit } => {
                plant.units[unit].queue().iter().any(|h| h == id)
            }
            HeatLocation::Processing { unit }
            | HeatLocation::Warming { unit }
            | HeatLocation::AwaitingPickup { unit } => plant.units[unit]
                .occupants()
                .iter()
                .any(|o| &o.heat_id == id),
            HeatLocation::InTransit { request } => plant
                .requests
                .get(request)
                .is_some_and(|r| &r.heat_id == id),
            HeatLocation::Completed => false,
        };
        if !held {
            return Err(format!("{} not held at {:?}", id, heat.location()));
        }
        if heat.temperature() > 1650.0 + 1e-9 {
            return Err(format!("{} above tapping temperature", id));
        }
    }

    let ranges: Vec<(&str, &str, (f64, f64))> = plant
        .cranes
        .values()
        .filter_map(|c| c.range().map(|r| (c.bay(), c.id(), r)))
        .collect();
    for (i, (bay_a, a, range_a)) in ranges.iter().enumerate() {
        for (bay_b, b, range_b) in &ranges[i + 1..] {
            if bay_a == bay_b && ranges_overlap(*range_a, *range_b) {
                return Err(format!("{} and {} overlap", a, b));
            }
        }
    }
    Ok(())
}

fn step_through(json: &str) -> PlantSimulation {
    let mut sim = PlantSimulation::new(PlantConfig::from_json_str(json).unwrap()).unwrap();
    sim.start();
    let mut last = sim.now();
    while let Some(result) = sim.step().unwrap() {
        assert!(result.time >= last);
        last = result.time;
        if let Err(detail) = check_plant(&sim) {
            panic!("t={}: {}", sim.now(), detail);
        }
    }
    sim
}

#[test]
fn test_single_bay_invariants_hold_while_stepping() {
    let sim = step_through(BUSY_BAY);
    assert_eq!(sim.completed_heats().len(), 15);
}

#[test]
fn test_two_bay_invariants_hold_while_stepping() {
    let sim = step_through(TWO_BAYS);
    assert_eq!(sim.completed_heats().len(), 12);
}

#[test]
fn test_completed_heats_leave_the_plant() {
    let sim = step_through(BUSY_BAY);
    assert!(sim.plant().heats.is_empty());
    for heat in sim.completed_heats() {
        assert!(matches!(heat.location(), HeatLocation::Completed));
        assert!(sim.heat(heat.id()).is_some());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10))]

    #[test]
    fn invariants_hold_for_any_seed(seed in any::<u64>()) {
        let json = BUSY_BAY.replacen('{', &format!("{{\"seed\": {},", seed), 1);
        let mut sim = PlantSimulation::new(PlantConfig::from_json_str(&json).unwrap()).unwrap();
        sim.start();
        while sim.step().unwrap().is_some() {
            prop_assert!(check_plant(&sim).is_ok(), "{:?}", check_plant(&sim));
        }
        prop_assert_eq!(sim.completed_heats().len(), 15);
    }
}

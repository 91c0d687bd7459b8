//! Routing tests: heat generation, route materialization, unit selection
//!
//! Critical invariants tested:
//! - Completed heats list their route in order, without omissions or repeats
//! - Destination choice: lowest load, then same bay, then id

use steel_plant_sim_core::models::{GradeCatalog, Heat, ProductionUnit, UnitKind};
use steel_plant_sim_core::routing::{HeatGenerator, RouteManager, RouteStep};
use steel_plant_sim_core::transport::BayGraph;
use steel_plant_sim_core::{PlantConfig, PlantSimulation, PlantState, RngManager};

const TWO_BAYS: &str = r#"{
    "max_heats": 12,
    "bays": {
        "bay1": {"x": 0, "y": 0, "width": 100, "height": 50},
        "bay2": {"x": 100, "y": 0, "width": 100, "height": 50}
    },
    "units": {
        "EAF": {"bays": ["bay1"]},
        "LMF": {},
        "Degasser": {"bays": ["bay2"]},
        "Caster": {"bays": ["bay2"]}
    },
    "grade_distribution": {"standard": 0.5, "clean": 0.5},
    "grade_properties": {"clean": {"requires_degasser": true}}
}"#;

#[test]
fn test_generation_starts_at_zero_and_respects_horizon() {
    let config = PlantConfig::from_json_str(r#"{"simulation_time": 300}"#).unwrap();
    let mut sim = PlantSimulation::new(config).unwrap();
    sim.run().unwrap();

    let created: Vec<f64> = sim
        .event_log()
        .events_of_type("HeatCreated")
        .iter()
        .map(|e| e.time())
        .collect();
    assert_eq!(created, vec![0.0, 60.0, 120.0, 180.0, 240.0]);
}

#[test]
fn test_max_heats_stops_generation() {
    let config = PlantConfig::from_json_str(r#"{"max_heats": 3, "heat_generation_interval": 20}"#)
        .unwrap();
    let mut sim = PlantSimulation::new(config).unwrap();
    let summary = sim.run().unwrap();
    assert_eq!(summary.heats_generated, 3);
    assert!(sim.heat("heat_00003").is_some());
    assert!(sim.heat("heat_00004").is_none());
}

#[test]
fn test_generator_takt_time_is_mean_interval() {
    let config = PlantConfig::from_json_str(
        r#"{"max_heats": 1, "heat_generation_interval": {"distribution": "uniform", "min": 40, "max": 80}}"#,
    )
    .unwrap();
    let generator = HeatGenerator::new(&config);
    assert_eq!(generator.takt_time(), 60.0);

    let mut rng = RngManager::new(3);
    let next = generator.next_arrival(100.0, &mut rng).unwrap();
    assert!((140.0..=180.0).contains(&next));
}

#[test]
fn test_explicit_route_skips_units() {
    let config = PlantConfig::from_json_str(
        r#"{"max_heats": 1, "grade_routes": {"standard": ["EAF", "Caster"]}}"#,
    )
    .unwrap();
    let routes = RouteManager::new(&GradeCatalog::from_config(&config).unwrap());
    let assignment = routes.materialize("standard").unwrap();
    assert_eq!(assignment.kinds, vec![UnitKind::Eaf, UnitKind::Caster]);

    let mut heat = Heat::new(
        "heat_00001".to_string(),
        assignment.grade,
        assignment.kinds,
        1650.0,
        1.0,
        "bay1_EAF_1",
        0.0,
    );
    assert_eq!(routes.advance(&mut heat).unwrap(), RouteStep::Next(UnitKind::Caster));
    assert_eq!(routes.advance(&mut heat).unwrap(), RouteStep::Exit);
}

#[test]
fn test_select_unit_prefers_load_then_bay_then_id() {
    let config = PlantConfig::from_json_str(TWO_BAYS).unwrap();
    let graph = BayGraph::new(&config).unwrap();
    let routes = RouteManager::new(&GradeCatalog::from_config(&config).unwrap());

    let mut plant = PlantState::default();
    for (id, bay, x) in [("bay1_LMF_1", "bay1", 50.0), ("bay2_LMF_1", "bay2", 150.0)] {
        plant.units.insert(
            id.to_string(),
            ProductionUnit::new(id.to_string(), UnitKind::Lmf, bay.to_string(), x, 25.0, 1),
        );
    }

    // Equal load: same bay wins, then id order
    assert_eq!(
        routes.select_unit(UnitKind::Lmf, Some("bay2"), &plant, &graph).as_deref(),
        Some("bay2_LMF_1")
    );
    assert_eq!(
        routes.select_unit(UnitKind::Lmf, None, &plant, &graph).as_deref(),
        Some("bay1_LMF_1")
    );

    // Lower load beats the same bay
    if let Some(unit) = plant.units.get_mut("bay2_LMF_1") {
        unit.add_inbound();
    }
    assert_eq!(
        routes.select_unit(UnitKind::Lmf, Some("bay2"), &plant, &graph).as_deref(),
        Some("bay1_LMF_1")
    );
}

#[test]
fn test_completed_history_follows_route() {
    let config = PlantConfig::from_json_str(TWO_BAYS).unwrap();
    let mut sim = PlantSimulation::new(config).unwrap();
    let summary = sim.run().unwrap();
    assert_eq!(summary.heats_completed, 12);

    for heat in sim.completed_heats() {
        let visited: Vec<UnitKind> = heat.history().iter().map(|r| r.kind).collect();
        assert_eq!(visited, heat.route(), "{} history out of order", heat.id());
        for record in heat.history() {
            let started = record.started_at.expect("every visit starts");
            let exited = record.exited_at.expect("every visit exits");
            assert!(record.entered_at <= started && started <= exited);
            assert_eq!(
                sim.plant().units[&record.unit_id].kind(),
                record.kind,
                "{} visited the wrong unit kind",
                heat.id()
            );
        }
        if heat.grade_id() == "clean" {
            assert!(heat.route().contains(&UnitKind::Degasser));
        }
    }
}

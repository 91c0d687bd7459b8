//! Ladle pool tests: assignment order, shortage, return and retirement

use steel_plant_sim_core::models::{HeatLocation, LadleStatus};
use steel_plant_sim_core::{Event, PlantConfig, PlantSimulation, RunStatus};

fn plant(extra: &str) -> PlantSimulation {
    let json = format!(
        r#"{{"units": {{"EAF": {{}}, "LMF": {{}}, "Caster": {{}}}}, {}}}"#,
        extra
    );
    PlantSimulation::new(PlantConfig::from_json_str(&json).unwrap()).unwrap()
}

fn assigned_ladles(sim: &PlantSimulation) -> Vec<(String, String)> {
    sim.event_log()
        .events()
        .iter()
        .filter_map(|e| match e {
            Event::LadleAssigned { heat_id, ladle_id, .. } => {
                Some((heat_id.clone(), ladle_id.clone()))
            }
            _ => None,
        })
        .collect()
}

#[test]
fn test_lowest_idle_ladle_is_assigned_first() {
    let mut sim = plant(r#""max_heats": 3, "n_ladles": 12, "heat_generation_interval": 10"#);
    sim.run_until(25.0).unwrap();

    let assigned = assigned_ladles(&sim);
    assert_eq!(
        assigned,
        vec![
            ("heat_00001".to_string(), "ladle_1".to_string()),
            ("heat_00002".to_string(), "ladle_2".to_string()),
            ("heat_00003".to_string(), "ladle_3".to_string()),
        ]
    );
    let ladle = &sim.plant().ladles["ladle_1"];
    assert_eq!(ladle.status(), LadleStatus::Loaded);
    assert_eq!(ladle.heat_id(), Some("heat_00001"));
    assert!(ladle.temperature().is_some());
}

#[test]
fn test_returned_ladle_is_reused() {
    let mut sim = plant(r#""max_heats": 3, "n_ladles": 1, "heat_generation_interval": 10"#);
    sim.run().unwrap();

    assert_eq!(sim.completed_heats().len(), 3);
    let assigned = assigned_ladles(&sim);
    assert_eq!(assigned.len(), 3);
    assert!(assigned.iter().all(|(_, ladle)| ladle == "ladle_1"));

    let ladle = &sim.plant().ladles["ladle_1"];
    assert_eq!(ladle.wear(), 3);
    assert_eq!(ladle.status(), LadleStatus::Idle);
    assert!(ladle.heat_id().is_none());
    // Heats 2 and 3 each waited once
    assert_eq!(sim.counters().ladle_shortage, 2);
    assert!(sim.ladle_queue().is_empty());
}

#[test]
fn test_waiting_heats_get_ladles_in_arrival_order() {
    let mut sim = plant(r#""max_heats": 3, "n_ladles": 1, "heat_generation_interval": 10"#);
    sim.run_until(30.0).unwrap();
    let waiting: Vec<&str> = sim.ladle_queue().iter().map(String::as_str).collect();
    assert_eq!(waiting, vec!["heat_00002", "heat_00003"]);

    sim.run().unwrap();
    let order: Vec<String> = assigned_ladles(&sim).into_iter().map(|(heat, _)| heat).collect();
    assert_eq!(order, vec!["heat_00001", "heat_00002", "heat_00003"]);
}

#[test]
fn test_retired_ladles_are_never_reassigned() {
    let mut sim = plant(
        r#""max_heats": 3, "n_ladles": 2, "ladle_max_heats": 1, "heat_generation_interval": 10"#,
    );
    let summary = sim.run().unwrap();

    assert_eq!(sim.status(), RunStatus::Finished);
    assert_eq!(summary.heats_generated, 3);
    assert_eq!(summary.heats_completed, 2);
    for ladle in sim.plant().ladles.values() {
        assert_eq!(ladle.status(), LadleStatus::InMaintenance);
        assert_eq!(ladle.wear(), 1);
    }
    assert_eq!(sim.event_log().events_of_type("LadleRetired").len(), 2);

    let stranded = sim.heat("heat_00003").unwrap();
    assert!(matches!(stranded.location(), HeatLocation::AwaitingLadle { .. }));
    assert!(stranded.ladle_id().is_none());
    assert_eq!(sim.ladle_queue().len(), 1);

    // Heat 3 found no ladle, then each retirement left the pool short
    assert_eq!(sim.counters().ladle_shortage, 3);
    let pool_events = sim
        .event_log()
        .events()
        .iter()
        .filter(|e| matches!(e, Event::LadleShortage { heat_id: None, .. }))
        .count();
    assert_eq!(pool_events, 2);

    // Counted once the clock ran dry
    assert_eq!(sim.counters().stranded_heats, 1);
    let stranded_events: Vec<&Event> = sim.event_log().events_of_type("HeatStranded");
    assert_eq!(stranded_events.len(), 1);
    assert!(matches!(
        stranded_events[0],
        Event::HeatStranded { heat_id, location: HeatLocation::AwaitingLadle { .. }, .. }
            if heat_id == "heat_00003"
    ));
}

#[test]
fn test_ladle_tracks_heat_temperature() {
    let mut sim = plant(r#""max_heats": 1"#);
    sim.run_until(55.0).unwrap();

    let heat = sim.heat("heat_00001").unwrap();
    let ladle_id = heat.ladle_id().unwrap().to_string();
    let ladle = &sim.plant().ladles[&ladle_id];
    let ladle_temperature = ladle.temperature().unwrap();
    assert!(ladle_temperature <= 1650.0);
    assert!(ladle_temperature >= heat.temperature() - 1e-9);
}

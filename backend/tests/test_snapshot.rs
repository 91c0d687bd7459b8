//! Snapshot tests: deterministic JSON, reset reproducibility, config hash

use steel_plant_sim_core::{PlantConfig, PlantSimulation, PlantSnapshot, RunStatus};

const PLANT: &str = r#"{
    "seed": 12345,
    "max_heats": 10,
    "heat_generation_interval": {"distribution": "exponential", "mean": 40},
    "n_lmf_per_bay": 2,
    "units": {"EAF": {}, "LMF": {}, "Degasser": {}, "Caster": {}},
    "grade_distribution": {"standard": 0.7, "clean": 0.3},
    "grade_properties": {"clean": {"requires_degasser": true}}
}"#;

fn plant(json: &str) -> PlantSimulation {
    PlantSimulation::new(PlantConfig::from_json_str(json).unwrap()).unwrap()
}

#[test]
fn test_reset_and_rerun_is_byte_identical() {
    let mut sim = plant(PLANT);
    sim.run().unwrap();
    let first = sim.snapshot_json().unwrap();

    sim.reset().unwrap();
    sim.run().unwrap();
    assert_eq!(sim.snapshot_json().unwrap(), first);
}

#[test]
fn test_midrun_snapshots_are_reproducible() {
    let mut a = plant(PLANT);
    let mut b = plant(PLANT);
    a.run_until(150.0).unwrap();
    b.run_until(150.0).unwrap();
    assert_eq!(a.snapshot_json().unwrap(), b.snapshot_json().unwrap());

    let snapshot = a.snapshot();
    assert_eq!(snapshot.time, 150.0);
    assert_eq!(
        snapshot.heats_in_plant.len() + snapshot.heats_completed.len(),
        a.stats().heats_generated
    );
}

#[test]
fn test_seed_changes_the_run() {
    let mut a = plant(PLANT);
    let mut b = plant(&PLANT.replace("12345", "54321"));
    a.run().unwrap();
    b.run().unwrap();
    let (a, b) = (a.snapshot(), b.snapshot());
    assert_ne!(a.config_hash, b.config_hash);
    assert_ne!(a.heats_completed, b.heats_completed);
}

#[test]
fn test_snapshot_contents() {
    let mut sim = plant(PLANT);
    sim.run().unwrap();
    let snapshot = sim.snapshot();

    assert_eq!(snapshot.status, RunStatus::Finished);
    assert_eq!(snapshot.seed, 12345);
    assert_eq!(snapshot.config_hash, sim.config().config_hash());
    assert_eq!(snapshot.config_hash.len(), 64);
    assert_eq!(snapshot.heats_completed.len(), 10);
    assert!(snapshot.heats_in_plant.is_empty());
    assert!(snapshot.transport_requests.is_empty());
    assert_eq!(snapshot.counters, *sim.counters());
    assert_eq!(snapshot.stats, sim.stats());

    let unit_ids: Vec<&str> = snapshot.units.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(
        unit_ids,
        vec!["bay1_Caster_1", "bay1_Degasser_1", "bay1_EAF_1", "bay1_LMF_1", "bay1_LMF_2"]
    );
    let completed_at: Vec<f64> = snapshot
        .heats_completed
        .iter()
        .filter_map(|h| h.completed_at())
        .collect();
    assert_eq!(completed_at.len(), 10);
    assert!(completed_at.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_snapshot_json_parses_back() {
    let mut sim = plant(PLANT);
    sim.run_until(200.0).unwrap();
    let json = sim.snapshot_json().unwrap();
    let parsed: PlantSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.time, 200.0);
    assert_eq!(parsed.units.len(), 5);
    assert_eq!(parsed.ladles.len(), 10);
    let ids: Vec<&str> = parsed.heats_in_plant.iter().map(|h| h.id()).collect();
    let expected: Vec<&str> = sim.plant().heats.keys().map(String::as_str).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_config_hash_ignores_key_order() {
    let a = PlantConfig::from_json_str(r#"{"max_heats": 3, "n_ladles": 4}"#).unwrap();
    let b = PlantConfig::from_json_str(r#"{"n_ladles": 4, "max_heats": 3}"#).unwrap();
    let c = PlantConfig::from_json_str(r#"{"n_ladles": 5, "max_heats": 3}"#).unwrap();
    assert_eq!(a.config_hash(), b.config_hash());
    assert_ne!(a.config_hash(), c.config_hash());
}

//! Production unit tests: ladle blocking, LMF warming, caster sequences,
//! process-time rules and temperature
//!
//! All scenarios use the default single bay with one EAF, LMF and caster.

use proptest::prelude::*;
use steel_plant_sim_core::models::{BlockReason, UnitKind};
use steel_plant_sim_core::{
    Event, HeatLocation, PlantConfig, PlantSimulation, QualityFlag, UnitState,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn plant(extra: &str) -> PlantSimulation {
    let json = format!(
        r#"{{"units": {{"EAF": {{}}, "LMF": {{}}, "Caster": {{}}}}, {}}}"#,
        extra
    );
    PlantSimulation::new(PlantConfig::from_json_str(&json).unwrap()).unwrap()
}

fn started(sim: &PlantSimulation, heat_id: &str, kind: UnitKind) -> Option<(f64, f64)> {
    sim.event_log().events().iter().find_map(|e| match e {
        Event::ProcessingStarted {
            time,
            heat_id: h,
            unit_id,
            duration,
        } if h == heat_id && sim.plant().units[unit_id].kind() == kind => Some((*time, *duration)),
        _ => None,
    })
}

// ============================================================================
// EAF and ladles
// ============================================================================

#[test]
fn test_eaf_blocks_until_heat_holds_ladle() {
    let mut sim = plant(r#""max_heats": 2, "heat_generation_interval": 10, "n_ladles": 1"#);
    sim.run_until(60.0).unwrap();

    let eaf = sim.plant().unit("bay1_EAF_1").unwrap();
    assert_eq!(eaf.state(), UnitState::Blocked);
    assert_eq!(eaf.blocked_reason(), Some(BlockReason::AwaitingLadle));
    assert!(matches!(
        sim.heat("heat_00002").unwrap().location(),
        HeatLocation::AwaitingLadle { .. }
    ));
    assert_eq!(sim.ladle_queue().len(), 1);

    sim.run().unwrap();
    assert_eq!(sim.completed_heats().len(), 2);
    assert_eq!(sim.counters().ladle_shortage, 1);
    let heat2 = sim.heat("heat_00002").unwrap();
    assert_eq!(heat2.ladle_id(), None);
    let (eaf_start, _) = started(&sim, "heat_00002", UnitKind::Eaf).unwrap();
    let heat1_done = sim.heat("heat_00001").unwrap().completed_at().unwrap();
    assert_eq!(eaf_start, heat1_done);
}

#[test]
fn test_eaf_shortens_when_lmf_is_free() {
    let mut sim = plant(
        r#""max_heats": 1, "grade_properties": {"standard": {"eaf_time": 50, "min_eaf_time": 40}}"#,
    );
    sim.run().unwrap();
    assert_eq!(started(&sim, "heat_00001", UnitKind::Eaf), Some((0.0, 40.0)));
}

#[test]
fn test_rigid_grade_keeps_nominal_eaf_time() {
    let mut sim = plant(
        r#""max_heats": 1,
           "grade_properties": {"standard": {"eaf_time": 50, "min_eaf_time": 40, "can_slow_down": false}}"#,
    );
    sim.run().unwrap();
    assert_eq!(started(&sim, "heat_00001", UnitKind::Eaf), Some((0.0, 50.0)));
}

#[test]
fn test_degasser_shortens_for_idle_caster() {
    let json = r#"{
        "max_heats": 1,
        "grade_routes": {"standard": ["EAF", "LMF", "Degasser", "Caster"]},
        "grade_properties": {"standard": {"degasser_time": 40, "min_degasser_time": 25}}
    }"#;
    let mut sim = PlantSimulation::new(PlantConfig::from_json_str(json).unwrap()).unwrap();
    sim.run().unwrap();
    let (_, duration) = started(&sim, "heat_00001", UnitKind::Degasser).unwrap();
    assert_eq!(duration, 25.0);
}

// ============================================================================
// LMF warming
// ============================================================================

#[test]
fn test_lmf_warms_while_caster_busy() {
    let mut sim = plant(
        r#""max_heats": 2,
           "grade_properties": {"standard": {"caster_time": 100, "max_warming_time": 200}}"#,
    );
    sim.run().unwrap();

    assert_eq!(sim.completed_heats().len(), 2);
    assert_eq!(sim.event_log().events_of_type("WarmingStarted").len(), 1);
    assert_eq!(sim.counters().warming_timeouts, 0);

    let heat2 = sim.heat("heat_00002").unwrap();
    assert!(!heat2.has_flag(QualityFlag::WarmingTimeout));
    let heat1_cast_end = sim.heat("heat_00001").unwrap().completed_at().unwrap();
    let lmf = &heat2.history()[1];
    assert_eq!(lmf.kind, UnitKind::Lmf);
    // The LMF slot is held until the caster has finished the previous heat
    assert!(lmf.exited_at.unwrap() >= heat1_cast_end);
}

#[test]
fn test_warming_timeout_releases_heat() {
    let mut sim = plant(
        r#""max_heats": 2,
           "grade_properties": {"standard": {"caster_time": 100, "max_warming_time": 10}}"#,
    );
    sim.run().unwrap();

    assert_eq!(sim.completed_heats().len(), 2);
    assert_eq!(sim.counters().warming_timeouts, 1);
    assert!(sim
        .heat("heat_00002")
        .unwrap()
        .has_flag(QualityFlag::WarmingTimeout));
    assert_eq!(sim.event_log().events_of_type("WarmingTimeout").len(), 1);
}

#[test]
fn test_warming_holds_temperature() {
    let mut sim = plant(
        r#""max_heats": 2,
           "grade_properties": {"standard": {"caster_time": 100, "max_warming_time": 200}}"#,
    );
    sim.run().unwrap();

    let heat2 = sim.heat("heat_00002").unwrap();
    let lmf = &heat2.history()[1];
    let held = lmf.exited_at.unwrap() - lmf.started_at.unwrap();
    assert!(held > 60.0, "held only {:.1} min", held);
    // Only the wait for the crane after release cools the heat
    let lost = lmf.temperature_in - lmf.temperature_out.unwrap();
    assert!(lost < 10.0, "lost {:.1} °C while warming", lost);
}

// ============================================================================
// Caster sequences
// ============================================================================

#[test]
fn test_first_sequence_needs_no_turnaround() {
    let mut sim = plant(r#""max_heats": 3"#);
    sim.run().unwrap();
    assert_eq!(sim.counters().caster_turnarounds, 0);
    let caster = sim.plant().unit("bay1_Caster_1").unwrap();
    assert_eq!(caster.sequence().length(), 3);
    assert_eq!(caster.sequence().grade(), Some("standard"));
}

#[test]
fn test_max_sequence_forces_turnaround() {
    let mut sim = plant(
        r#""max_heats": 3, "grade_properties": {"standard": {"max_sequence": 2, "turnaround_time": 30}}"#,
    );
    sim.run().unwrap();

    assert_eq!(sim.completed_heats().len(), 3);
    assert_eq!(sim.counters().caster_turnarounds, 1);
    assert_eq!(sim.counters().short_sequences, 0);
    assert!(sim.heat("heat_00003").unwrap().has_flag(QualityFlag::CasterTurnaround));
    assert!(!sim.heat("heat_00002").unwrap().has_flag(QualityFlag::CasterTurnaround));

    let turnaround = sim
        .event_log()
        .events()
        .iter()
        .find_map(|e| match e {
            Event::CasterTurnaround {
                time,
                sequence_length,
                until,
                ..
            } => Some((*time, *sequence_length, *until)),
            _ => None,
        })
        .unwrap();
    assert_eq!(turnaround.1, 2);
    assert_eq!(turnaround.2, turnaround.0 + 30.0);
    let (cast_start, _) = started(&sim, "heat_00003", UnitKind::Caster).unwrap();
    assert_eq!(cast_start, turnaround.2);
}

#[test]
fn test_flow_interruption_closes_short_sequence() {
    let mut sim = plant(
        r#""max_heats": 2,
           "grade_properties": {"standard": {"flow_interruption_threshold": 10, "min_sequence": 2}}"#,
    );
    sim.run().unwrap();

    assert_eq!(sim.counters().caster_turnarounds, 1);
    assert_eq!(sim.counters().short_sequences, 1);
    assert!(sim.heat("heat_00002").unwrap().has_flag(QualityFlag::CasterTurnaround));
}

// ============================================================================
// Temperature
// ============================================================================

#[test]
fn test_fast_cooling_flags_non_conforming_once() {
    let mut sim = plant(
        r#""max_heats": 2, "grade_properties": {"standard": {"temperature_loss_rate": 30}}"#,
    );
    sim.run().unwrap();

    assert_eq!(sim.completed_heats().len(), 2);
    assert_eq!(sim.counters().non_conforming, 2);
    assert_eq!(sim.event_log().events_of_type("HeatNonConforming").len(), 2);
    for heat in sim.completed_heats() {
        assert_eq!(
            heat.flags().iter().filter(|f| **f == QualityFlag::NonConforming).count(),
            1
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn temperature_never_rises(seed in 1u64..10_000, loss in 0.0f64..5.0, interval in 30u32..90) {
        let json = format!(
            r#"{{"seed": {}, "max_heats": 6, "heat_generation_interval": {},
                 "grade_properties": {{"standard": {{"temperature_loss_rate": {}}}}}}}"#,
            seed, interval, loss
        );
        let mut sim = PlantSimulation::new(PlantConfig::from_json_str(&json).unwrap()).unwrap();
        sim.run().unwrap();

        let max = sim.grades().get("standard").unwrap().max_temperature;
        for heat in sim.completed_heats() {
            let mut last = f64::INFINITY;
            for record in heat.history() {
                prop_assert!(record.temperature_in <= last + 1e-9);
                let out = record.temperature_out.unwrap();
                prop_assert!(out <= record.temperature_in + 1e-9);
                prop_assert!(out <= max + 1e-9);
                last = out;
            }
            prop_assert!(heat.temperature() <= last + 1e-9);
        }
    }
}

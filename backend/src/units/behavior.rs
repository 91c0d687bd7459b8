//! Per-kind unit behavior table
//!
//! The four unit kinds share one state machine. What differs between them is
//! captured here as data: how long a heat takes, whether the unit needs the
//! heat to hold a ladle, whether it holds finished heats while downstream is
//! saturated, and whether it tracks casting sequences.

use crate::models::grade::SteelGrade;
use crate::models::unit::UnitKind;

/// What the next unit kind on a heat's route looks like right now
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownstreamView {
    /// Some reachable unit can take the heat without waiting
    pub free_now: bool,
    /// Some reachable unit is completely empty
    pub idle: bool,
    /// Minutes until the earliest busy slot finishes
    pub next_free_in: Option<f64>,
}

impl Default for DownstreamView {
    fn default() -> Self {
        Self {
            free_now: true,
            idle: true,
            next_free_in: None,
        }
    }
}

pub type ProcessTimeFn = fn(&SteelGrade, &DownstreamView) -> f64;

#[derive(Debug)]
pub struct KindBehavior {
    pub kind: UnitKind,
    pub process_time: ProcessTimeFn,
    pub requires_ladle: bool,
    pub holds_for_downstream: bool,
    pub tracks_sequence: bool,
}

static BEHAVIORS: [KindBehavior; 4] = [
    KindBehavior {
        kind: UnitKind::Eaf,
        process_time: eaf_time,
        requires_ladle: true,
        holds_for_downstream: false,
        tracks_sequence: false,
    },
    KindBehavior {
        kind: UnitKind::Lmf,
        process_time: lmf_time,
        requires_ladle: false,
        holds_for_downstream: true,
        tracks_sequence: false,
    },
    KindBehavior {
        kind: UnitKind::Degasser,
        process_time: degasser_time,
        requires_ladle: false,
        holds_for_downstream: false,
        tracks_sequence: false,
    },
    KindBehavior {
        kind: UnitKind::Caster,
        process_time: caster_time,
        requires_ladle: false,
        holds_for_downstream: false,
        tracks_sequence: true,
    },
];

pub fn behavior(kind: UnitKind) -> &'static KindBehavior {
    &BEHAVIORS[kind.rank() as usize]
}

/// The EAF aims to tap when downstream frees a slot, within [min, nominal]
fn eaf_time(grade: &SteelGrade, downstream: &DownstreamView) -> f64 {
    if !grade.can_slow_down {
        return grade.eaf_time;
    }
    if downstream.free_now {
        return grade.min_eaf_time;
    }
    match downstream.next_free_in {
        Some(wait) => wait.clamp(grade.min_eaf_time, grade.eaf_time),
        None => grade.eaf_time,
    }
}

fn lmf_time(grade: &SteelGrade, _downstream: &DownstreamView) -> f64 {
    grade.lmf_time
}

/// Shortened when a caster sits empty waiting for metal
fn degasser_time(grade: &SteelGrade, downstream: &DownstreamView) -> f64 {
    if downstream.idle {
        grade.min_degasser_time
    } else {
        grade.degasser_time
    }
}

fn caster_time(grade: &SteelGrade, _downstream: &DownstreamView) -> f64 {
    grade.caster_time
}

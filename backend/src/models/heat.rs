//! Heat model
//!
//! A heat is one batch of molten steel. It is created by the heat generator,
//! visits the units of its route in order and leaves the plant after the
//! caster.
//!
//! # Critical Invariants
//!
//! 1. Temperature is non-increasing over the heat's whole life
//! 2. Temperature never exceeds the grade's maximum
//! 3. The history lists route units in order, each exactly once

use crate::models::unit::UnitKind;
use serde::{Deserialize, Serialize};

/// One visit to a production unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub unit_id: String,
    pub kind: UnitKind,
    pub entered_at: f64,
    pub started_at: Option<f64>,
    pub exited_at: Option<f64>,
    pub temperature_in: f64,
    pub temperature_out: Option<f64>,
}

/// Where a heat is and who owns it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "location")]
pub enum HeatLocation {
    /// In an EAF queue without a ladle
    AwaitingLadle { unit: String },
    Queued { unit: String },
    Processing { unit: String },
    Warming { unit: String },
    AwaitingPickup { unit: String },
    InTransit { request: String },
    Completed,
}

impl HeatLocation {
    /// Unit holding the heat (queue or slot), if any
    pub fn unit(&self) -> Option<&str> {
        match self {
            HeatLocation::AwaitingLadle { unit }
            | HeatLocation::Queued { unit }
            | HeatLocation::Processing { unit }
            | HeatLocation::Warming { unit }
            | HeatLocation::AwaitingPickup { unit } => Some(unit),
            HeatLocation::InTransit { .. } | HeatLocation::Completed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeatStatus {
    WaitingAtUnit,
    BeingProcessed,
    InTransit,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityFlag {
    NonConforming,
    WarmingTimeout,
    CasterTurnaround,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heat {
    id: String,
    grade_id: String,
    created_at: f64,
    completed_at: Option<f64>,
    temperature: f64,
    loss_rate: f64,
    /// Time up to which temperature has been settled
    thermal_clock: f64,
    cooling: bool,
    route: Vec<UnitKind>,
    route_position: usize,
    history: Vec<ProcessRecord>,
    location: HeatLocation,
    ladle_id: Option<String>,
    flags: Vec<QualityFlag>,
}

impl Heat {
    /// New heat waiting for a ladle in front of `eaf_unit`
    pub fn new(
        id: String,
        grade_id: String,
        route: Vec<UnitKind>,
        temperature: f64,
        loss_rate: f64,
        eaf_unit: &str,
        created_at: f64,
    ) -> Self {
        Self {
            id,
            grade_id,
            created_at,
            completed_at: None,
            temperature,
            loss_rate,
            thermal_clock: created_at,
            cooling: false,
            route,
            route_position: 0,
            history: Vec::new(),
            location: HeatLocation::AwaitingLadle {
                unit: eaf_unit.to_string(),
            },
            ladle_id: None,
            flags: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn grade_id(&self) -> &str {
        &self.grade_id
    }

    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<f64> {
        self.completed_at
    }

    /// Cycle time for completed heats
    pub fn cycle_time(&self) -> Option<f64> {
        self.completed_at.map(|t| t - self.created_at)
    }

    /// Temperature as of the last settle point
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Temperature at `now` without mutating
    pub fn temperature_at(&self, now: f64) -> f64 {
        if self.cooling {
            self.temperature - self.loss_rate * (now - self.thermal_clock).max(0.0)
        } else {
            self.temperature
        }
    }

    pub fn is_cooling(&self) -> bool {
        self.cooling
    }

    pub fn route(&self) -> &[UnitKind] {
        &self.route
    }

    pub fn route_position(&self) -> usize {
        self.route_position
    }

    pub fn history(&self) -> &[ProcessRecord] {
        &self.history
    }

    pub fn location(&self) -> &HeatLocation {
        &self.location
    }

    pub fn ladle_id(&self) -> Option<&str> {
        self.ladle_id.as_deref()
    }

    pub fn flags(&self) -> &[QualityFlag] {
        &self.flags
    }

    pub fn has_flag(&self, flag: QualityFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn status(&self) -> HeatStatus {
        match self.location {
            HeatLocation::Processing { .. } | HeatLocation::Warming { .. } => {
                HeatStatus::BeingProcessed
            }
            HeatLocation::InTransit { .. } => HeatStatus::InTransit,
            HeatLocation::Completed => HeatStatus::Completed,
            _ => HeatStatus::WaitingAtUnit,
        }
    }

    // ------------------------------------------------------------------
    // Thermal accounting
    // ------------------------------------------------------------------

    /// Apply linear loss accumulated since the last settle point
    pub fn settle_temperature(&mut self, now: f64) -> f64 {
        self.temperature = self.temperature_at(now);
        if now > self.thermal_clock {
            self.thermal_clock = now;
        }
        self.temperature
    }

    /// Settle, then switch cooling on or off from `now` on
    pub fn set_cooling(&mut self, cooling: bool, now: f64) {
        self.settle_temperature(now);
        self.cooling = cooling;
    }

    // ------------------------------------------------------------------
    // Route and history
    // ------------------------------------------------------------------

    /// Kind after the current position, without moving
    pub fn next_kind(&self) -> Option<UnitKind> {
        self.route.get(self.route_position + 1).copied()
    }

    /// Step to the next route position; past the last kind means exit
    pub(crate) fn bump_route_position(&mut self) {
        self.route_position += 1;
    }

    pub fn set_location(&mut self, location: HeatLocation) {
        self.location = location;
    }

    pub fn record_enter(&mut self, unit_id: &str, kind: UnitKind, now: f64) {
        let temperature = self.settle_temperature(now);
        self.history.push(ProcessRecord {
            unit_id: unit_id.to_string(),
            kind,
            entered_at: now,
            started_at: None,
            exited_at: None,
            temperature_in: temperature,
            temperature_out: None,
        });
    }

    /// Minutes spent waiting at the current unit
    pub fn record_start(&mut self, now: f64) -> f64 {
        match self.history.last_mut() {
            Some(record) => {
                record.started_at = Some(now);
                now - record.entered_at
            }
            None => 0.0,
        }
    }

    pub fn record_exit(&mut self, now: f64) {
        let temperature = self.settle_temperature(now);
        if let Some(record) = self.history.last_mut() {
            record.exited_at = Some(now);
            record.temperature_out = Some(temperature);
        }
    }

    pub fn complete(&mut self, now: f64) {
        self.set_cooling(false, now);
        self.completed_at = Some(now);
        self.location = HeatLocation::Completed;
    }

    pub fn assign_ladle(&mut self, ladle_id: &str) {
        self.ladle_id = Some(ladle_id.to_string());
    }

    pub fn release_ladle(&mut self) -> Option<String> {
        self.ladle_id.take()
    }

    /// Add a quality flag; returns `false` if it was already set
    pub fn flag(&mut self, flag: QualityFlag) -> bool {
        if self.flags.contains(&flag) {
            return false;
        }
        self.flags.push(flag);
        self.flags.sort();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heat() -> Heat {
        Heat::new(
            "heat_00001".to_string(),
            "standard".to_string(),
            vec![UnitKind::Eaf, UnitKind::Lmf, UnitKind::Caster],
            1650.0,
            1.0,
            "bay1_EAF_1",
            0.0,
        )
    }

    #[test]
    fn test_cooling_only_while_enabled() {
        let mut h = heat();
        h.settle_temperature(10.0);
        assert_eq!(h.temperature(), 1650.0);

        h.set_cooling(true, 10.0);
        assert_eq!(h.temperature_at(15.0), 1645.0);
        h.set_cooling(false, 20.0);
        assert_eq!(h.temperature(), 1640.0);
        assert_eq!(h.settle_temperature(50.0), 1640.0);
    }

    #[test]
    fn test_history_records_wait() {
        let mut h = heat();
        h.record_enter("bay1_EAF_1", UnitKind::Eaf, 0.0);
        assert_eq!(h.record_start(4.0), 4.0);
        h.record_exit(54.0);
        let record = &h.history()[0];
        assert_eq!(record.started_at, Some(4.0));
        assert_eq!(record.exited_at, Some(54.0));
        assert_eq!(record.temperature_out, Some(1650.0));
    }

    #[test]
    fn test_route_navigation() {
        let mut h = heat();
        assert_eq!(h.next_kind(), Some(UnitKind::Lmf));
        h.bump_route_position();
        h.bump_route_position();
        assert_eq!(h.next_kind(), None);
    }

    #[test]
    fn test_flags_deduplicated() {
        let mut h = heat();
        assert!(h.flag(QualityFlag::WarmingTimeout));
        assert!(!h.flag(QualityFlag::WarmingTimeout));
        assert!(h.flag(QualityFlag::NonConforming));
        assert_eq!(
            h.flags(),
            &[QualityFlag::NonConforming, QualityFlag::WarmingTimeout]
        );
    }
}

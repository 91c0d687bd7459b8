//! Ladle cars: rail vehicles moving ladles between bays

use crate::models::unit::UnitKind;
use serde::{Deserialize, Serialize};

/// Duty of a typed car. An untyped car serves every transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LadleCarType {
    Tapping,
    Treatment,
    Rh,
}

impl LadleCarType {
    /// Car duty needed to move a heat towards a unit of `kind`
    pub fn for_destination(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Caster => LadleCarType::Treatment,
            UnitKind::Degasser => LadleCarType::Rh,
            UnitKind::Eaf | UnitKind::Lmf => LadleCarType::Tapping,
        }
    }
}

impl std::fmt::Display for LadleCarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LadleCarType::Tapping => "tapping",
            LadleCarType::Treatment => "treatment",
            LadleCarType::Rh => "rh",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LadleCarStatus {
    Idle,
    Moving,
    Loading,
    Unloading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadleCar {
    id: String,
    home_bay: String,
    car_type: Option<LadleCarType>,
    current_bay: String,
    status: LadleCarStatus,
    ladle_id: Option<String>,
    request_id: Option<String>,
    total_distance: f64,
    busy_time: f64,
    busy_since: Option<f64>,
}

impl LadleCar {
    pub fn new(id: String, home_bay: String, car_type: Option<LadleCarType>) -> Self {
        Self {
            id,
            current_bay: home_bay.clone(),
            home_bay,
            car_type,
            status: LadleCarStatus::Idle,
            ladle_id: None,
            request_id: None,
            total_distance: 0.0,
            busy_time: 0.0,
            busy_since: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn home_bay(&self) -> &str {
        &self.home_bay
    }

    pub fn car_type(&self) -> Option<LadleCarType> {
        self.car_type
    }

    /// Whether this car may take a transfer needing `wanted`
    pub fn serves(&self, wanted: LadleCarType) -> bool {
        self.car_type.map_or(true, |t| t == wanted)
    }

    pub fn current_bay(&self) -> &str {
        &self.current_bay
    }

    pub fn status(&self) -> LadleCarStatus {
        self.status
    }

    pub fn ladle_id(&self) -> Option<&str> {
        self.ladle_id.as_deref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn is_idle(&self) -> bool {
        self.status == LadleCarStatus::Idle
    }

    /// Reserve the car for a request
    pub fn reserve(&mut self, request_id: &str, status: LadleCarStatus, now: f64) {
        self.request_id = Some(request_id.to_string());
        self.status = status;
        self.busy_since.get_or_insert(now);
    }

    pub fn set_status(&mut self, status: LadleCarStatus) {
        self.status = status;
    }

    pub fn depart(&mut self, distance: f64) {
        self.status = LadleCarStatus::Moving;
        self.total_distance += distance;
    }

    pub fn arrive(&mut self, bay: &str, status: LadleCarStatus) {
        self.current_bay = bay.to_string();
        self.status = status;
    }

    pub fn load_ladle(&mut self, ladle_id: &str) {
        self.ladle_id = Some(ladle_id.to_string());
    }

    pub fn unload_ladle(&mut self) -> Option<String> {
        self.ladle_id.take()
    }

    /// Job done: back to idle at the current bay
    pub fn release(&mut self, now: f64) {
        self.status = LadleCarStatus::Idle;
        self.request_id = None;
        if let Some(since) = self.busy_since.take() {
            self.busy_time += now - since;
        }
    }

    pub fn busy_time_at(&self, now: f64) -> f64 {
        self.busy_time + self.busy_since.map(|s| (now - s).max(0.0)).unwrap_or(0.0)
    }
}

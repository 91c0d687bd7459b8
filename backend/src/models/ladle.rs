//! Ladles: the refractory vessels that carry heats through the plant

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LadleStatus {
    Idle,
    Loaded,
    /// Worn out; never assigned again
    InMaintenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ladle {
    id: String,
    status: LadleStatus,
    wear: u32,
    max_heats: u32,
    heat_id: Option<String>,
    temperature: Option<f64>,
}

impl Ladle {
    pub fn new(id: String, max_heats: u32) -> Self {
        Self {
            id,
            status: LadleStatus::Idle,
            wear: 0,
            max_heats,
            heat_id: None,
            temperature: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> LadleStatus {
        self.status
    }

    pub fn wear(&self) -> u32 {
        self.wear
    }

    pub fn heat_id(&self) -> Option<&str> {
        self.heat_id.as_deref()
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    pub fn is_available(&self) -> bool {
        self.status == LadleStatus::Idle
    }

    pub fn load(&mut self, heat_id: &str, temperature: f64) {
        self.status = LadleStatus::Loaded;
        self.heat_id = Some(heat_id.to_string());
        self.temperature = Some(temperature);
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        if self.heat_id.is_some() {
            self.temperature = Some(temperature);
        }
    }

    /// Empty the ladle after a cast; returns `true` if it was retired
    pub fn unload(&mut self) -> bool {
        self.heat_id = None;
        self.temperature = None;
        self.wear += 1;
        if self.wear >= self.max_heats {
            self.status = LadleStatus::InMaintenance;
            true
        } else {
            self.status = LadleStatus::Idle;
            false
        }
    }
}

//! Bays: rectangular areas of the plant floor served by their own cranes

use crate::config::{BayConfig, ConfigError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bay {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Where ladle cars stop; cranes load and unload them here
    pub station_x: f64,
    pub unit_ids: Vec<String>,
    pub crane_ids: Vec<String>,
}

impl Bay {
    pub fn from_config(id: &str, config: &BayConfig) -> Result<Self, ConfigError> {
        let bad = |reason: &str| ConfigError::InvalidBayConfig {
            bay: id.to_string(),
            reason: reason.to_string(),
        };
        let (Some(x), Some(y), Some(width), Some(height)) =
            (config.x, config.y, config.width, config.height)
        else {
            return Err(bad("x, y, width and height are required"));
        };
        if !(width > 0.0 && height > 0.0) {
            return Err(bad("width and height must be positive"));
        }
        Ok(Self {
            id: id.to_string(),
            x,
            y,
            width,
            height,
            station_x: config.station_x.unwrap_or(x + width / 2.0),
            unit_ids: Vec::new(),
            crane_ids: Vec::new(),
        })
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    pub fn contains_x(&self, x: f64) -> bool {
        x >= self.x && x <= self.x + self.width
    }

    /// Centre-to-centre distance
    pub fn distance_to(&self, other: &Bay) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }

    /// `n` evenly spaced x positions across the bay
    pub fn spread(&self, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| self.x + self.width * (i as f64 + 0.5) / n as f64)
            .collect()
    }
}

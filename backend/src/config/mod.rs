//! Plant configuration document
//!
//! The configuration is a single JSON document. Every section is optional and
//! falls back to documented defaults, except that a horizon (`simulation_time`
//! or `max_heats`) must be given. The configuration is validated once, up
//! front, and is immutable afterwards: every constructor receives it by
//! reference.
//!
//! # Example
//! ```
//! use steel_plant_sim_core::PlantConfig;
//!
//! let config = PlantConfig::from_json_str(r#"{"simulation_time": 480}"#).unwrap();
//! assert_eq!(config.n_ladles, 10);
//! assert_eq!(config.effective_bays().len(), 1);
//! ```

use crate::models::ladle_car::LadleCarType;
use crate::models::unit::UnitKind;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;
use thiserror::Error;

/// Tolerance on the sum of grade weights
pub const GRADE_WEIGHT_TOLERANCE: f64 = 0.01;

/// Name of the bay created when `bays` is absent
pub const DEFAULT_BAY: &str = "bay1";

// ============================================================================
// Errors
// ============================================================================

/// Configuration errors (all fatal at startup)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No horizon: set simulation_time or max_heats")]
    MissingHorizon,

    #[error("Grade weights sum to {sum}, expected 1.0 ± {GRADE_WEIGHT_TOLERANCE}")]
    InvalidGradeWeights { sum: f64 },

    #[error("Grade {grade} has invalid weight {weight}")]
    NegativeWeight { grade: String, weight: f64 },

    #[error("Unknown grade: {0}")]
    UnknownGrade(String),

    #[error("Unknown unit type: {0}")]
    UnknownUnitType(String),

    #[error("Route for grade {grade} is out of order: {reason}")]
    RouteOrder { grade: String, reason: String },

    #[error("Route for grade {0} is empty")]
    EmptyRoute(String),

    #[error("Route for grade {grade} visits {kind} but no such unit is placed")]
    UnitTypeNotPlaced { grade: String, kind: UnitKind },

    #[error("Invalid bay {bay}: {reason}")]
    InvalidBayConfig { bay: String, reason: String },

    #[error("Unknown bay: {0}")]
    UnknownBay(String),

    #[error("Bay {from} cannot reach any bay hosting {kind}")]
    UnreachableBay { from: String, kind: UnitKind },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        reason: reason.into(),
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Per unit-kind settings (`units.<KIND>`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UnitTypeConfig {
    /// Simultaneous heats per unit (default 1)
    pub capacity: Option<usize>,
    /// Unit-level process time in minutes; grades may override it
    pub process_time: Option<f64>,
    /// Restrict placement to these bays (default: every bay)
    pub bays: Option<Vec<String>>,
}

impl UnitTypeConfig {
    pub fn capacity(&self) -> usize {
        self.capacity.unwrap_or(1)
    }

    pub fn process_time(&self, kind: UnitKind) -> f64 {
        self.process_time.unwrap_or_else(|| kind.default_process_time())
    }
}

/// Optional per-grade overrides (`grade_properties.<grade>`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GradePropertiesConfig {
    pub eaf_time: Option<f64>,
    pub min_eaf_time: Option<f64>,
    pub lmf_time: Option<f64>,
    pub degasser_time: Option<f64>,
    pub min_degasser_time: Option<f64>,
    pub caster_time: Option<f64>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub tapping_temperature: Option<f64>,
    pub temperature_loss_rate: Option<f64>,
    pub min_sequence: Option<u32>,
    pub max_sequence: Option<u32>,
    pub flow_interruption_threshold: Option<f64>,
    pub turnaround_time: Option<f64>,
    pub max_warming_time: Option<f64>,
    pub can_slow_down: Option<bool>,
    /// Used only when `grade_routes` has no entry for the grade
    pub requires_degasser: Option<bool>,
}

/// Bay rectangle and ladle-car station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BayConfig {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// Ladle-car station position along the rail (default: bay centre)
    pub station_x: Option<f64>,
}

/// Directed ladle-car edge between two bays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayConnectionConfig {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub travel_time: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionConfig {
    pub x: f64,
    pub y: f64,
}

/// Heat generation interval: a fixed number or a sampled distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntervalConfig {
    Fixed(f64),
    Sampled(IntervalDistribution),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "distribution", rename_all = "snake_case")]
pub enum IntervalDistribution {
    Exponential { mean: f64 },
    Uniform { min: f64, max: f64 },
}

impl IntervalConfig {
    /// Expected interval (the takt time)
    pub fn mean(&self) -> f64 {
        match self {
            IntervalConfig::Fixed(value) => *value,
            IntervalConfig::Sampled(IntervalDistribution::Exponential { mean }) => *mean,
            IntervalConfig::Sampled(IntervalDistribution::Uniform { min, max }) => {
                (min + max) / 2.0
            }
        }
    }
}

impl Default for IntervalConfig {
    fn default() -> Self {
        IntervalConfig::Fixed(60.0)
    }
}

/// Order in which queued transport requests are served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPolicy {
    #[default]
    Fifo,
    UrgentFirst,
}

/// Bottleneck thresholds and sampling cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub high_utilization: f64,
    pub queue_alert: f64,
    pub wait_time_alert: f64,
    pub reporting_interval: f64,
    pub min_samples: usize,
    pub transport_starvation_time: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            high_utilization: 0.85,
            queue_alert: 3.0,
            wait_time_alert: 30.0,
            reporting_interval: 60.0,
            min_samples: 3,
            transport_starvation_time: 60.0,
        }
    }
}

// ============================================================================
// PlantConfig
// ============================================================================

/// Complete plant configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantConfig {
    pub seed: u64,
    /// Keyed by unit kind name (`EAF`, `LMF`, `Degasser`, `Caster`).
    /// Empty means every kind with defaults.
    pub units: BTreeMap<String, UnitTypeConfig>,
    pub n_eaf_per_bay: usize,
    pub n_lmf_per_bay: usize,
    pub n_degasser_per_bay: usize,
    pub n_caster_per_bay: usize,
    pub equipment_positions: BTreeMap<String, PositionConfig>,
    pub grade_distribution: BTreeMap<String, f64>,
    pub grade_properties: BTreeMap<String, GradePropertiesConfig>,
    pub grade_routes: BTreeMap<String, Vec<String>>,
    pub bays: BTreeMap<String, BayConfig>,
    pub bay_connections: Vec<BayConnectionConfig>,
    pub n_ladles: usize,
    pub n_ladle_cars: usize,
    /// Typed fleet: `n_ladle_cars_per_type` cars of each listed duty.
    /// Empty means `n_ladle_cars` untyped cars.
    pub ladle_car_types: Vec<LadleCarType>,
    pub n_ladle_cars_per_type: usize,
    pub n_cranes_per_bay: usize,
    pub ladle_car_speed: f64,
    pub crane_speed: f64,
    pub crane_accel: Option<f64>,
    pub crane_lift_time: f64,
    pub crane_lower_time: f64,
    pub ladle_warming_time: f64,
    pub ladle_max_heats: u32,
    pub heat_generation_interval: IntervalConfig,
    pub max_heats: Option<usize>,
    pub simulation_time: Option<f64>,
    pub transport_dispatch: DispatchPolicy,
    pub analytics: AnalyticsConfig,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            units: BTreeMap::new(),
            n_eaf_per_bay: 1,
            n_lmf_per_bay: 1,
            n_degasser_per_bay: 1,
            n_caster_per_bay: 1,
            equipment_positions: BTreeMap::new(),
            grade_distribution: BTreeMap::new(),
            grade_properties: BTreeMap::new(),
            grade_routes: BTreeMap::new(),
            bays: BTreeMap::new(),
            bay_connections: Vec::new(),
            n_ladles: 10,
            n_ladle_cars: 3,
            ladle_car_types: Vec::new(),
            n_ladle_cars_per_type: 1,
            n_cranes_per_bay: 2,
            ladle_car_speed: 150.0,
            crane_speed: 100.0,
            crane_accel: None,
            crane_lift_time: 3.0,
            crane_lower_time: 3.0,
            ladle_warming_time: 30.0,
            ladle_max_heats: 100,
            heat_generation_interval: IntervalConfig::default(),
            max_heats: None,
            simulation_time: None,
            transport_dispatch: DispatchPolicy::Fifo,
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl PlantConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: PlantConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Canonical pretty JSON rendering
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    /// SHA-256 of the compact canonical JSON, hex encoded
    pub fn config_hash(&self) -> String {
        // Maps are BTreeMaps and field order is fixed, so the encoding is canonical
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    // ------------------------------------------------------------------
    // Effective views (defaults applied)
    // ------------------------------------------------------------------

    /// Unit kinds present in the plant with their settings
    pub fn effective_units(&self) -> Result<BTreeMap<UnitKind, UnitTypeConfig>, ConfigError> {
        if self.units.is_empty() {
            return Ok(UnitKind::ALL
                .iter()
                .map(|kind| (*kind, UnitTypeConfig::default()))
                .collect());
        }
        self.units
            .iter()
            .map(|(name, unit)| {
                let kind = name
                    .parse::<UnitKind>()
                    .map_err(|_| ConfigError::UnknownUnitType(name.clone()))?;
                Ok((kind, unit.clone()))
            })
            .collect()
    }

    /// Bays with the single default bay when none are configured
    pub fn effective_bays(&self) -> BTreeMap<String, BayConfig> {
        if !self.bays.is_empty() {
            return self.bays.clone();
        }
        let mut bays = BTreeMap::new();
        bays.insert(
            DEFAULT_BAY.to_string(),
            BayConfig {
                x: Some(0.0),
                y: Some(0.0),
                width: Some(100.0),
                height: Some(100.0),
                station_x: None,
            },
        );
        bays
    }

    pub fn effective_grade_distribution(&self) -> BTreeMap<String, f64> {
        if self.grade_distribution.is_empty() {
            let mut dist = BTreeMap::new();
            dist.insert("standard".to_string(), 1.0);
            return dist;
        }
        self.grade_distribution.clone()
    }

    pub fn units_per_bay(&self, kind: UnitKind) -> usize {
        match kind {
            UnitKind::Eaf => self.n_eaf_per_bay,
            UnitKind::Lmf => self.n_lmf_per_bay,
            UnitKind::Degasser => self.n_degasser_per_bay,
            UnitKind::Caster => self.n_caster_per_bay,
        }
    }

    /// Bays hosting at least one unit of `kind`, in bay order
    pub fn hosting_bays(&self, kind: UnitKind) -> Result<Vec<String>, ConfigError> {
        let units = self.effective_units()?;
        let Some(unit) = units.get(&kind) else {
            return Ok(Vec::new());
        };
        if self.units_per_bay(kind) == 0 {
            return Ok(Vec::new());
        }
        let bays = self.effective_bays();
        Ok(match &unit.bays {
            Some(restricted) => bays
                .keys()
                .filter(|bay| restricted.contains(bay))
                .cloned()
                .collect(),
            None => bays.keys().cloned().collect(),
        })
    }

    /// One entry per ladle car in id order; `None` marks an untyped car
    pub fn ladle_car_fleet(&self) -> Vec<Option<LadleCarType>> {
        if self.ladle_car_types.is_empty() {
            return vec![None; self.n_ladle_cars];
        }
        self.ladle_car_types
            .iter()
            .flat_map(|car_type| {
                std::iter::repeat(Some(*car_type)).take(self.n_ladle_cars_per_type)
            })
            .collect()
    }

    /// Route for a grade: explicit `grade_routes` entry or the canonical order
    pub fn route_for(&self, grade: &str) -> Result<Vec<UnitKind>, ConfigError> {
        if let Some(route) = self.grade_routes.get(grade) {
            return route
                .iter()
                .map(|name| {
                    name.parse::<UnitKind>()
                        .map_err(|_| ConfigError::UnknownUnitType(name.clone()))
                })
                .collect();
        }
        let requires_degasser = self
            .grade_properties
            .get(grade)
            .and_then(|p| p.requires_degasser)
            .unwrap_or(false);
        let mut route = vec![UnitKind::Eaf, UnitKind::Lmf];
        if requires_degasser {
            route.push(UnitKind::Degasser);
        }
        route.push(UnitKind::Caster);
        Ok(route)
    }

    /// Time horizon in minutes, if one is configured
    pub fn horizon(&self) -> Option<f64> {
        self.simulation_time
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Check the whole document; the first problem found is returned
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_horizon()?;
        self.validate_scalars()?;
        self.validate_bays()?;
        let units = self.effective_units()?;
        self.validate_units(&units)?;
        self.validate_grades()?;
        self.validate_connectivity()?;
        self.validate_car_circulation()?;
        Ok(())
    }

    fn validate_horizon(&self) -> Result<(), ConfigError> {
        if self.simulation_time.is_none() && self.max_heats.is_none() {
            return Err(ConfigError::MissingHorizon);
        }
        if let Some(t) = self.simulation_time {
            if !(t.is_finite() && t > 0.0) {
                return Err(invalid("simulation_time", "must be positive"));
            }
        }
        if self.max_heats == Some(0) {
            return Err(invalid("max_heats", "must be at least 1"));
        }
        Ok(())
    }

    fn validate_scalars(&self) -> Result<(), ConfigError> {
        let positive = [
            ("ladle_car_speed", self.ladle_car_speed),
            ("crane_speed", self.crane_speed),
            ("analytics.reporting_interval", self.analytics.reporting_interval),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(field, "must be positive"));
            }
        }
        let non_negative = [
            ("crane_lift_time", self.crane_lift_time),
            ("crane_lower_time", self.crane_lower_time),
            ("ladle_warming_time", self.ladle_warming_time),
            ("analytics.transport_starvation_time", self.analytics.transport_starvation_time),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(field, "must be non-negative"));
            }
        }
        if let Some(accel) = self.crane_accel {
            if !(accel.is_finite() && accel > 0.0) {
                return Err(invalid("crane_accel", "must be positive"));
            }
        }
        if self.n_ladles == 0 {
            return Err(invalid("n_ladles", "at least one ladle is required"));
        }
        if self.n_cranes_per_bay == 0 {
            return Err(invalid("n_cranes_per_bay", "every bay needs a crane"));
        }
        if !self.ladle_car_types.is_empty() && self.n_ladle_cars_per_type == 0 {
            return Err(invalid(
                "n_ladle_cars_per_type",
                "a typed fleet needs at least one car per type",
            ));
        }
        if self.ladle_max_heats == 0 {
            return Err(invalid("ladle_max_heats", "must be at least 1"));
        }
        match &self.heat_generation_interval {
            IntervalConfig::Fixed(value) => {
                if !(value.is_finite() && *value > 0.0) {
                    return Err(invalid("heat_generation_interval", "must be positive"));
                }
            }
            IntervalConfig::Sampled(IntervalDistribution::Exponential { mean }) => {
                if !(mean.is_finite() && *mean > 0.0) {
                    return Err(invalid("heat_generation_interval.mean", "must be positive"));
                }
            }
            IntervalConfig::Sampled(IntervalDistribution::Uniform { min, max }) => {
                if !(min.is_finite() && max.is_finite() && *min > 0.0 && min <= max) {
                    return Err(invalid(
                        "heat_generation_interval",
                        "uniform bounds must satisfy 0 < min <= max",
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate_bays(&self) -> Result<(), ConfigError> {
        let bays = self.effective_bays();
        for (id, bay) in &bays {
            let bad = |reason: &str| ConfigError::InvalidBayConfig {
                bay: id.clone(),
                reason: reason.to_string(),
            };
            let (Some(x), Some(y), Some(width), Some(height)) = (bay.x, bay.y, bay.width, bay.height)
            else {
                return Err(bad("x, y, width and height are required"));
            };
            if !(x.is_finite() && y.is_finite()) {
                return Err(bad("position must be finite"));
            }
            if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
                return Err(bad("width and height must be positive"));
            }
            if let Some(station) = bay.station_x {
                if station < x || station > x + width {
                    return Err(bad("station_x lies outside the bay"));
                }
            }
        }
        for edge in &self.bay_connections {
            for end in [&edge.from, &edge.to] {
                if !bays.contains_key(end) {
                    return Err(ConfigError::UnknownBay(end.clone()));
                }
            }
            if let Some(distance) = edge.distance {
                if !(distance.is_finite() && distance > 0.0) {
                    return Err(invalid("bay_connections.distance", "must be positive"));
                }
            }
            if let Some(time) = edge.travel_time {
                if !(time.is_finite() && time > 0.0) {
                    return Err(invalid("bay_connections.travel_time", "must be positive"));
                }
            }
        }
        if bays.len() > 1 && self.ladle_car_fleet().is_empty() {
            return Err(invalid(
                "n_ladle_cars",
                "a plant with several bays needs at least one ladle car",
            ));
        }
        Ok(())
    }

    fn validate_units(&self, units: &BTreeMap<UnitKind, UnitTypeConfig>) -> Result<(), ConfigError> {
        let bays = self.effective_bays();
        for (kind, unit) in units {
            if unit.capacity() == 0 {
                return Err(invalid(format!("units.{}.capacity", kind), "must be at least 1"));
            }
            let time = unit.process_time(*kind);
            if !(time.is_finite() && time > 0.0) {
                return Err(invalid(format!("units.{}.process_time", kind), "must be positive"));
            }
            if let Some(restricted) = &unit.bays {
                for bay in restricted {
                    if !bays.contains_key(bay) {
                        return Err(ConfigError::UnknownBay(bay.clone()));
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_grades(&self) -> Result<(), ConfigError> {
        let distribution = self.effective_grade_distribution();
        let mut sum = 0.0;
        for (grade, weight) in &distribution {
            if !(weight.is_finite() && *weight >= 0.0) {
                return Err(ConfigError::NegativeWeight {
                    grade: grade.clone(),
                    weight: *weight,
                });
            }
            sum += weight;
        }
        if (sum - 1.0).abs() > GRADE_WEIGHT_TOLERANCE {
            return Err(ConfigError::InvalidGradeWeights { sum });
        }

        for grade in distribution.keys() {
            let route = self.route_for(grade)?;
            validate_route_order(grade, &route)?;
            for kind in &route {
                if self.hosting_bays(*kind)?.is_empty() {
                    return Err(ConfigError::UnitTypeNotPlaced {
                        grade: grade.clone(),
                        kind: *kind,
                    });
                }
            }
        }
        for grade in self.grade_routes.keys() {
            if !distribution.contains_key(grade) {
                return Err(ConfigError::UnknownGrade(grade.clone()));
            }
        }
        Ok(())
    }

    /// Every bay hosting a route step must reach a bay hosting the next step
    fn validate_connectivity(&self) -> Result<(), ConfigError> {
        let bays = self.effective_bays();
        let adjacency = bay_adjacency(self, &bays);
        let mut checked = BTreeSet::new();
        for grade in self.effective_grade_distribution().keys() {
            let route = self.route_for(grade)?;
            for pair in route.windows(2) {
                if !checked.insert((pair[0], pair[1])) {
                    continue;
                }
                let targets = self.hosting_bays(pair[1])?;
                for from in self.hosting_bays(pair[0])? {
                    let reachable = reachable_from(&adjacency, &from);
                    if !targets.iter().any(|t| reachable.contains(t)) {
                        return Err(ConfigError::UnreachableBay {
                            from,
                            kind: pair[1],
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Cars stay in the bay where they unload, so every bay a car can come
    /// to rest in must lead back to every bay that hands work to a car.
    fn validate_car_circulation(&self) -> Result<(), ConfigError> {
        let bays = self.effective_bays();
        if bays.len() < 2 {
            return Ok(());
        }
        let adjacency = bay_adjacency(self, &bays);
        let typed = !self.ladle_car_types.is_empty();

        // Inter-bay transfers grouped by the cars that may carry them
        let mut transfers: BTreeMap<Option<LadleCarType>, BTreeSet<(String, UnitKind, String)>> =
            BTreeMap::new();
        for grade in self.effective_grade_distribution().keys() {
            let route = self.route_for(grade)?;
            for pair in route.windows(2) {
                let targets = self.hosting_bays(pair[1])?;
                for from in self.hosting_bays(pair[0])? {
                    let reachable = reachable_from(&adjacency, &from);
                    let duty = typed.then(|| LadleCarType::for_destination(pair[1]));
                    for to in targets.iter().filter(|t| **t != from && reachable.contains(*t)) {
                        transfers
                            .entry(duty)
                            .or_default()
                            .insert((from.clone(), pair[0], to.clone()));
                    }
                }
            }
        }

        let bay_ids: Vec<&String> = bays.keys().collect();
        let fleet = self.ladle_car_fleet();
        for (duty, moves) in &transfers {
            if let Some(duty) = duty {
                if !self.ladle_car_types.contains(duty) {
                    return Err(invalid(
                        "ladle_car_types",
                        format!("inter-bay transfers need a {} car", duty),
                    ));
                }
            }
            let mut resting: BTreeSet<String> = fleet
                .iter()
                .enumerate()
                .filter(|(_, car_type)| *car_type == duty)
                .map(|(index, _)| bay_ids[index % bay_ids.len()].clone())
                .collect();
            resting.extend(moves.iter().map(|(_, _, to)| to.clone()));
            for bay in resting {
                let reachable = reachable_from(&adjacency, &bay);
                let stranded = moves.iter().find(|(from, _, _)| !reachable.contains(from));
                if let Some((_, kind, _)) = stranded {
                    return Err(ConfigError::UnreachableBay { from: bay, kind: *kind });
                }
            }
        }
        Ok(())
    }
}

/// Routes must start at the EAF, end at the caster and visit kinds in plant order
pub fn validate_route_order(grade: &str, route: &[UnitKind]) -> Result<(), ConfigError> {
    let (Some(first), Some(last)) = (route.first(), route.last()) else {
        return Err(ConfigError::EmptyRoute(grade.to_string()));
    };
    let order_error = |reason: &str| ConfigError::RouteOrder {
        grade: grade.to_string(),
        reason: reason.to_string(),
    };
    if *first != UnitKind::Eaf {
        return Err(order_error("route must start at the EAF"));
    }
    if *last != UnitKind::Caster {
        return Err(order_error("route must end at the caster"));
    }
    for pair in route.windows(2) {
        if pair[0].rank() >= pair[1].rank() {
            return Err(order_error(&format!("{} cannot precede {}", pair[0], pair[1])));
        }
    }
    Ok(())
}

/// Directed bay graph: explicit connections, or consecutive bays both ways
pub(crate) fn bay_adjacency(
    config: &PlantConfig,
    bays: &BTreeMap<String, BayConfig>,
) -> BTreeMap<String, Vec<String>> {
    let mut adjacency: BTreeMap<String, Vec<String>> =
        bays.keys().map(|id| (id.clone(), Vec::new())).collect();
    if config.bay_connections.is_empty() {
        let ids: Vec<&String> = bays.keys().collect();
        for pair in ids.windows(2) {
            if let Some(out) = adjacency.get_mut(pair[0]) {
                out.push(pair[1].clone());
            }
            if let Some(out) = adjacency.get_mut(pair[1]) {
                out.push(pair[0].clone());
            }
        }
    } else {
        for edge in &config.bay_connections {
            if let Some(out) = adjacency.get_mut(&edge.from) {
                out.push(edge.to.clone());
            }
        }
    }
    adjacency
}

fn reachable_from(adjacency: &BTreeMap<String, Vec<String>>, start: &str) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut frontier = VecDeque::new();
    seen.insert(start.to_string());
    frontier.push_back(start.to_string());
    while let Some(bay) = frontier.pop_front() {
        for next in adjacency.get(&bay).into_iter().flatten() {
            if seen.insert(next.clone()) {
                frontier.push_back(next.clone());
            }
        }
    }
    seen
}

//! Steel grades
//!
//! A grade fixes a heat's route, its nominal and minimum process times and
//! its thermal and sequencing limits. Grades are resolved once from the
//! configuration and are immutable afterwards.

use crate::config::{validate_route_order, ConfigError, PlantConfig};
use crate::models::unit::UnitKind;
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteelGrade {
    pub id: String,
    pub route: Vec<UnitKind>,
    pub eaf_time: f64,
    pub min_eaf_time: f64,
    pub lmf_time: f64,
    pub degasser_time: f64,
    pub min_degasser_time: f64,
    pub caster_time: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub tapping_temperature: f64,
    /// °C per minute while not processing or warming
    pub temperature_loss_rate: f64,
    pub min_sequence: u32,
    pub max_sequence: u32,
    pub flow_interruption_threshold: f64,
    pub turnaround_time: f64,
    pub max_warming_time: f64,
    pub can_slow_down: bool,
}

impl SteelGrade {
    /// Grade with every documented default and the canonical three-step route
    pub fn with_defaults(id: &str) -> Self {
        Self {
            id: id.to_string(),
            route: vec![UnitKind::Eaf, UnitKind::Lmf, UnitKind::Caster],
            eaf_time: UnitKind::Eaf.default_process_time(),
            min_eaf_time: UnitKind::Eaf.default_process_time(),
            lmf_time: UnitKind::Lmf.default_process_time(),
            degasser_time: UnitKind::Degasser.default_process_time(),
            min_degasser_time: UnitKind::Degasser.default_process_time(),
            caster_time: UnitKind::Caster.default_process_time(),
            min_temperature: 1500.0,
            max_temperature: 1650.0,
            tapping_temperature: 1650.0,
            temperature_loss_rate: 1.0,
            min_sequence: 1,
            max_sequence: 8,
            flow_interruption_threshold: 60.0,
            turnaround_time: 30.0,
            max_warming_time: 30.0,
            can_slow_down: true,
        }
    }

    /// Resolve a grade from its overrides, falling back to unit process times
    pub fn resolve(id: &str, config: &PlantConfig) -> Result<Self, ConfigError> {
        let units = config.effective_units()?;
        let unit_time = |kind: UnitKind| {
            units
                .get(&kind)
                .map(|u| u.process_time(kind))
                .unwrap_or_else(|| kind.default_process_time())
        };
        let props = config.grade_properties.get(id).cloned().unwrap_or_default();
        let base = Self::with_defaults(id);

        let eaf_time = props.eaf_time.unwrap_or_else(|| unit_time(UnitKind::Eaf));
        let degasser_time = props
            .degasser_time
            .unwrap_or_else(|| unit_time(UnitKind::Degasser));
        let max_temperature = props.max_temperature.unwrap_or(base.max_temperature);

        let grade = Self {
            id: id.to_string(),
            route: config.route_for(id)?,
            eaf_time,
            min_eaf_time: props.min_eaf_time.unwrap_or(eaf_time),
            lmf_time: props.lmf_time.unwrap_or_else(|| unit_time(UnitKind::Lmf)),
            degasser_time,
            min_degasser_time: props.min_degasser_time.unwrap_or(degasser_time),
            caster_time: props.caster_time.unwrap_or_else(|| unit_time(UnitKind::Caster)),
            min_temperature: props.min_temperature.unwrap_or(base.min_temperature),
            max_temperature,
            tapping_temperature: props.tapping_temperature.unwrap_or(max_temperature),
            temperature_loss_rate: props
                .temperature_loss_rate
                .unwrap_or(base.temperature_loss_rate),
            min_sequence: props.min_sequence.unwrap_or(base.min_sequence),
            max_sequence: props.max_sequence.unwrap_or(base.max_sequence),
            flow_interruption_threshold: props
                .flow_interruption_threshold
                .unwrap_or(base.flow_interruption_threshold),
            turnaround_time: props.turnaround_time.unwrap_or(base.turnaround_time),
            max_warming_time: props.max_warming_time.unwrap_or(config.ladle_warming_time),
            can_slow_down: props.can_slow_down.unwrap_or(base.can_slow_down),
        };
        grade.check()?;
        Ok(grade)
    }

    fn check(&self) -> Result<(), ConfigError> {
        let field = |name: &str| format!("grade_properties.{}.{}", self.id, name);
        let bad = |name: &str, reason: &str| ConfigError::InvalidValue {
            field: field(name),
            reason: reason.to_string(),
        };

        validate_route_order(&self.id, &self.route)?;
        for (name, value) in [
            ("eaf_time", self.eaf_time),
            ("min_eaf_time", self.min_eaf_time),
            ("lmf_time", self.lmf_time),
            ("degasser_time", self.degasser_time),
            ("min_degasser_time", self.min_degasser_time),
            ("caster_time", self.caster_time),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(bad(name, "must be positive"));
            }
        }
        if self.min_eaf_time > self.eaf_time {
            return Err(bad("min_eaf_time", "exceeds eaf_time"));
        }
        if self.min_degasser_time > self.degasser_time {
            return Err(bad("min_degasser_time", "exceeds degasser_time"));
        }
        if self.min_temperature >= self.max_temperature {
            return Err(bad("min_temperature", "must be below max_temperature"));
        }
        if self.tapping_temperature > self.max_temperature {
            return Err(bad("tapping_temperature", "exceeds max_temperature"));
        }
        if !(self.temperature_loss_rate.is_finite() && self.temperature_loss_rate >= 0.0) {
            return Err(bad("temperature_loss_rate", "must be non-negative"));
        }
        if self.max_sequence == 0 || self.min_sequence > self.max_sequence {
            return Err(bad("max_sequence", "must be at least 1 and not below min_sequence"));
        }
        for (name, value) in [
            ("flow_interruption_threshold", self.flow_interruption_threshold),
            ("turnaround_time", self.turnaround_time),
            ("max_warming_time", self.max_warming_time),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(bad(name, "must be non-negative"));
            }
        }
        Ok(())
    }

    /// Nominal process time at a unit kind
    pub fn nominal_time(&self, kind: UnitKind) -> f64 {
        match kind {
            UnitKind::Eaf => self.eaf_time,
            UnitKind::Lmf => self.lmf_time,
            UnitKind::Degasser => self.degasser_time,
            UnitKind::Caster => self.caster_time,
        }
    }

    /// Shortest admissible process time at a unit kind
    pub fn min_time(&self, kind: UnitKind) -> f64 {
        match kind {
            UnitKind::Eaf => self.min_eaf_time,
            UnitKind::Degasser => self.min_degasser_time,
            other => self.nominal_time(other),
        }
    }

    pub fn requires(&self, kind: UnitKind) -> bool {
        self.route.contains(&kind)
    }
}

/// All grades of a run plus the normalized sampling weights
#[derive(Debug, Clone)]
pub struct GradeCatalog {
    grades: BTreeMap<String, SteelGrade>,
    ids: Vec<String>,
    weights: Vec<f64>,
}

impl GradeCatalog {
    pub fn from_config(config: &PlantConfig) -> Result<Self, ConfigError> {
        let distribution = config.effective_grade_distribution();
        let total: f64 = distribution.values().sum();
        if total <= 0.0 {
            return Err(ConfigError::InvalidGradeWeights { sum: total });
        }

        let mut grades = BTreeMap::new();
        let mut ids = Vec::new();
        let mut weights = Vec::new();
        for (id, weight) in &distribution {
            grades.insert(id.clone(), SteelGrade::resolve(id, config)?);
            ids.push(id.clone());
            weights.push(weight / total);
        }
        Ok(Self {
            grades,
            ids,
            weights,
        })
    }

    pub fn get(&self, id: &str) -> Option<&SteelGrade> {
        self.grades.get(id)
    }

    pub fn grades(&self) -> impl Iterator<Item = &SteelGrade> {
        self.grades.values()
    }

    /// Normalized weight of a grade
    pub fn weight(&self, id: &str) -> f64 {
        self.ids
            .iter()
            .position(|g| g == id)
            .map(|i| self.weights[i])
            .unwrap_or(0.0)
    }

    /// Draw a grade by cumulative lookup
    pub fn sample(&self, rng: &mut RngManager) -> &SteelGrade {
        let index = rng.weighted_index(&self.weights).unwrap_or(0);
        &self.grades[&self.ids[index]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_falls_back_to_unit_times() {
        let config = PlantConfig::from_json_str(
            r#"{"max_heats": 1, "units": {"EAF": {"process_time": 45}, "LMF": {}, "Caster": {}}}"#,
        )
        .unwrap();
        let grade = SteelGrade::resolve("standard", &config).unwrap();
        assert_eq!(grade.eaf_time, 45.0);
        assert_eq!(grade.min_eaf_time, 45.0);
        assert_eq!(grade.lmf_time, 30.0);
        assert_eq!(grade.tapping_temperature, 1650.0);
        assert_eq!(grade.max_warming_time, 30.0);
    }

    #[test]
    fn test_min_above_nominal_rejected() {
        let config = PlantConfig::from_json_str(
            r#"{"max_heats": 1, "grade_properties": {"standard": {"eaf_time": 40, "min_eaf_time": 50}}}"#,
        )
        .unwrap();
        assert!(matches!(
            SteelGrade::resolve("standard", &config),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_catalog_normalizes_weights() {
        let config = PlantConfig::from_json_str(
            r#"{"max_heats": 1, "grade_distribution": {"a": 0.6, "b": 0.4}}"#,
        )
        .unwrap();
        let catalog = GradeCatalog::from_config(&config).unwrap();
        assert!((catalog.weight("a") - 0.6).abs() < 1e-12);
        assert_eq!(catalog.weight("zzz"), 0.0);

        let mut rng = RngManager::new(1);
        let id = catalog.sample(&mut rng).id.clone();
        assert!(id == "a" || id == "b");
    }
}

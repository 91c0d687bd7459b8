//! Heat routing
//!
//! Each heat carries a route materialized once from its grade. When a unit
//! finishes a heat the route manager advances the heat to its next step and
//! picks the concrete destination unit.

pub mod generator;

pub use generator::HeatGenerator;

use crate::config::ConfigError;
use crate::models::grade::GradeCatalog;
use crate::models::heat::Heat;
use crate::models::state::{compare_ids, PlantState};
use crate::models::unit::UnitKind;
use crate::orchestrator::SimulationError;
use crate::transport::BayGraph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered unit kinds a heat must visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteAssignment {
    pub grade: String,
    pub kinds: Vec<UnitKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStep {
    Next(UnitKind),
    /// Route finished: the heat leaves the plant
    Exit,
}

#[derive(Debug, Clone)]
pub struct RouteManager {
    routes: BTreeMap<String, Vec<UnitKind>>,
}

impl RouteManager {
    pub fn new(grades: &GradeCatalog) -> Self {
        Self {
            routes: grades
                .grades()
                .map(|g| (g.id.clone(), g.route.clone()))
                .collect(),
        }
    }

    pub fn materialize(&self, grade: &str) -> Result<RouteAssignment, SimulationError> {
        let kinds = self
            .routes
            .get(grade)
            .ok_or_else(|| ConfigError::UnknownGrade(grade.to_string()))?;
        Ok(RouteAssignment {
            grade: grade.to_string(),
            kinds: kinds.clone(),
        })
    }

    /// Step the heat would take next, without moving it
    pub fn peek(&self, heat: &Heat) -> Result<RouteStep, SimulationError> {
        let position = heat.route_position();
        if position >= heat.route().len() {
            return Err(SimulationError::RouteExhausted {
                heat_id: heat.id().to_string(),
            });
        }
        Ok(match heat.next_kind() {
            Some(kind) => RouteStep::Next(kind),
            None => RouteStep::Exit,
        })
    }

    /// Move the heat past its current unit
    pub fn advance(&self, heat: &mut Heat) -> Result<RouteStep, SimulationError> {
        let step = self.peek(heat)?;
        heat.bump_route_position();
        Ok(step)
    }

    /// Destination unit of `kind` for a heat leaving `from_bay`
    ///
    /// Lowest load first (occupants + queue + inbound), then a unit in the
    /// same bay, then id order. Units the ladle cars cannot reach are skipped.
    pub fn select_unit(
        &self,
        kind: UnitKind,
        from_bay: Option<&str>,
        plant: &PlantState,
        graph: &BayGraph,
    ) -> Option<String> {
        plant
            .units_of_kind(kind)
            .filter(|u| from_bay.map_or(true, |bay| graph.reachable(bay, u.bay())))
            .min_by(|a, b| {
                let other_bay = |bay: &str| from_bay != Some(bay);
                a.load()
                    .cmp(&b.load())
                    .then(other_bay(a.bay()).cmp(&other_bay(b.bay())))
                    .then_with(|| compare_ids(a.id(), b.id()))
            })
            .map(|u| u.id().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlantConfig;

    fn manager() -> RouteManager {
        let config = PlantConfig::from_json_str(
            r#"{"max_heats": 1,
                "grade_distribution": {"plain": 0.5, "vacuum": 0.5},
                "grade_properties": {"vacuum": {"requires_degasser": true}}}"#,
        )
        .unwrap();
        RouteManager::new(&GradeCatalog::from_config(&config).unwrap())
    }

    #[test]
    fn test_materialize_uses_grade_route() {
        let routes = manager();
        assert_eq!(
            routes.materialize("vacuum").unwrap().kinds,
            vec![UnitKind::Eaf, UnitKind::Lmf, UnitKind::Degasser, UnitKind::Caster]
        );
        assert!(matches!(
            routes.materialize("unknown"),
            Err(SimulationError::Config(ConfigError::UnknownGrade(_)))
        ));
    }

    #[test]
    fn test_advance_until_exhausted() {
        let routes = manager();
        let assignment = routes.materialize("plain").unwrap();
        let mut heat = Heat::new(
            "heat_00001".to_string(),
            assignment.grade,
            assignment.kinds,
            1650.0,
            1.0,
            "bay1_EAF_1",
            0.0,
        );

        assert_eq!(routes.advance(&mut heat).unwrap(), RouteStep::Next(UnitKind::Lmf));
        assert_eq!(routes.advance(&mut heat).unwrap(), RouteStep::Next(UnitKind::Caster));
        assert_eq!(routes.advance(&mut heat).unwrap(), RouteStep::Exit);
        assert!(matches!(
            routes.advance(&mut heat),
            Err(SimulationError::RouteExhausted { .. })
        ));
    }
}

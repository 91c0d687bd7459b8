//! Production unit state machines
//!
//! All four unit kinds run the same cycle:
//!
//! ```text
//! enqueue ─▶ try_start ─▶ Processing ─▶ completion ─┬─▶ Warming (LMF only) ─┐
//!                ▲                                   └─▶ AwaitingPickup ◀────┘
//!                └──────────── slot released on crane pickup / exit ◀──┘
//! ```
//!
//! Kind-specific decisions (process time, ladle requirement, holding for
//! downstream, casting sequences) come from the `behavior` table.
//!
//! # Critical Invariants
//!
//! 1. A slot is only filled while `occupants < capacity`
//! 2. Heats start strictly in queue order
//! 3. A slot is held until the crane lifts the ladle, so upstream never
//!    over-commits a unit

pub mod behavior;
pub mod caster;

pub use behavior::{behavior, DownstreamView, KindBehavior};
pub use caster::{CasterSequence, SequenceBreak, SequenceDecision};

use crate::config::{ConfigError, PlantConfig};
use crate::models::event::Event;
use crate::models::grade::SteelGrade;
use crate::models::heat::{HeatLocation, QualityFlag};
use crate::models::state::PlantState;
use crate::models::unit::{BlockReason, OccupantPhase, ProductionUnit, UnitKind};
use crate::orchestrator::{PlantEvent, PlantSimulation, SimulationError};
use crate::routing::RouteStep;
use crate::transport::BayGraph;
use log::{debug, warn};

/// Place units in every bay that hosts their kind
///
/// Ids are `<bay>_<KIND>_<n>`. Units of a bay are spread evenly across its
/// width unless `equipment_positions` pins them.
pub(crate) fn build_units(
    config: &PlantConfig,
    graph: &mut BayGraph,
    plant: &mut PlantState,
) -> Result<(), ConfigError> {
    let units = config.effective_units()?;
    let bay_ids: Vec<String> = graph.bays().keys().cloned().collect();

    for bay_id in bay_ids {
        let mut placed: Vec<(String, UnitKind, usize)> = Vec::new();
        for (kind, unit_config) in &units {
            if !config.hosting_bays(*kind)?.contains(&bay_id) {
                continue;
            }
            for n in 1..=config.units_per_bay(*kind) {
                placed.push((
                    format!("{}_{}_{}", bay_id, kind.as_str(), n),
                    *kind,
                    unit_config.capacity(),
                ));
            }
        }

        let bay = graph
            .bay_mut(&bay_id)
            .ok_or_else(|| ConfigError::UnknownBay(bay_id.clone()))?;
        let slots = bay.spread(placed.len());
        let (_, centre_y) = bay.center();
        for ((id, kind, capacity), default_x) in placed.into_iter().zip(slots) {
            let (x, y) = match config.equipment_positions.get(&id) {
                Some(pos) => {
                    if !bay.contains(pos.x, pos.y) {
                        return Err(ConfigError::InvalidValue {
                            field: format!("equipment_positions.{}", id),
                            reason: format!("({}, {}) lies outside bay {}", pos.x, pos.y, bay_id),
                        });
                    }
                    (pos.x, pos.y)
                }
                None => (default_x, centre_y),
            };
            bay.unit_ids.push(id.clone());
            plant.units.insert(
                id.clone(),
                ProductionUnit::new(id, kind, bay_id.clone(), x, y, capacity),
            );
        }
    }

    for id in config.equipment_positions.keys() {
        if !plant.units.contains_key(id) {
            return Err(ConfigError::InvalidValue {
                field: format!("equipment_positions.{}", id),
                reason: "no such unit".to_string(),
            });
        }
    }
    Ok(())
}

impl PlantSimulation {
    fn grade_of(&self, heat_id: &str) -> Result<SteelGrade, SimulationError> {
        let grade_id = self.plant.heat(heat_id)?.grade_id();
        self.grades
            .get(grade_id)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownGrade(grade_id.to_string()).into())
    }

    /// Every reachable unit of `kind` is full
    pub(crate) fn downstream_saturated(&self, kind: UnitKind, from_bay: &str) -> bool {
        !self
            .plant
            .units_of_kind(kind)
            .filter(|u| self.transport.graph().reachable(from_bay, u.bay()))
            .any(|u| !u.is_saturated())
    }

    fn downstream_view(&self, next: Option<UnitKind>, from_bay: &str) -> DownstreamView {
        let Some(kind) = next else {
            return DownstreamView::default();
        };
        let now = self.clock.now();
        let mut view = DownstreamView {
            free_now: false,
            idle: false,
            next_free_in: None,
        };
        for unit in self
            .plant
            .units_of_kind(kind)
            .filter(|u| self.transport.graph().reachable(from_bay, u.bay()))
        {
            view.free_now |= !unit.is_saturated();
            view.idle |= unit.is_idle();
            if let Some(wait) = unit.next_free_in(now) {
                view.next_free_in = Some(view.next_free_in.map_or(wait, |w: f64| w.min(wait)));
            }
        }
        view
    }

    /// Flag a heat that has cooled below its grade minimum
    pub(crate) fn check_temperature(&mut self, heat_id: &str) -> Result<(), SimulationError> {
        let now = self.clock.now();
        let min = self.grade_of(heat_id)?.min_temperature;
        let heat = self.plant.heat_mut(heat_id)?;
        let temperature = heat.settle_temperature(now);
        if temperature < min && heat.flag(QualityFlag::NonConforming) {
            self.counters.non_conforming += 1;
            warn!(
                "{} dropped to {:.1} °C, below the {:.1} °C minimum",
                heat_id, temperature, min
            );
            self.log.log(Event::HeatNonConforming {
                time: now,
                heat_id: heat_id.to_string(),
                temperature,
            });
        }
        Ok(())
    }

    /// Append a heat to a unit's queue and start whatever can start
    pub(crate) fn enqueue_heat(&mut self, unit_id: &str, heat_id: &str) -> Result<(), SimulationError> {
        let now = self.clock.now();
        let kind = self.plant.unit(unit_id)?.kind();

        let heat = self.plant.heat_mut(heat_id)?;
        heat.record_enter(unit_id, kind, now);
        // Before tapping there is no molten metal to cool
        heat.set_cooling(kind != UnitKind::Eaf, now);
        let location = if kind == UnitKind::Eaf && heat.ladle_id().is_none() {
            HeatLocation::AwaitingLadle {
                unit: unit_id.to_string(),
            }
        } else {
            HeatLocation::Queued {
                unit: unit_id.to_string(),
            }
        };
        heat.set_location(location);

        let unit = self.plant.unit_mut(unit_id)?;
        unit.enqueue(heat_id.to_string(), now);
        let queue_length = unit.queue().len();
        debug!("{} queued at {} (queue {})", heat_id, unit_id, queue_length);
        self.log.log(Event::HeatQueued {
            time: now,
            heat_id: heat_id.to_string(),
            unit_id: unit_id.to_string(),
            queue_length,
        });

        if kind != UnitKind::Eaf {
            self.check_temperature(heat_id)?;
        }
        self.try_start_unit(unit_id)
    }

    /// Promote queued heats into free slots, in queue order
    pub(crate) fn try_start_unit(&mut self, unit_id: &str) -> Result<(), SimulationError> {
        let now = self.clock.now();
        loop {
            let unit = self.plant.unit(unit_id)?;
            if unit.free_slots() == 0 || unit.turnaround_until().is_some() {
                return Ok(());
            }
            let Some(heat_id) = unit.queue_front().cloned() else {
                self.plant.unit_mut(unit_id)?.set_blocked(None);
                return Ok(());
            };
            let kind = unit.kind();
            let bay = unit.bay().to_string();
            let rules = behavior(kind);

            let heat = self.plant.heat(&heat_id)?;
            if rules.requires_ladle && heat.ladle_id().is_none() {
                self.plant
                    .unit_mut(unit_id)?
                    .set_blocked(Some(BlockReason::AwaitingLadle));
                return Ok(());
            }
            let next = heat.next_kind();
            let grade = self.grade_of(&heat_id)?;

            if rules.tracks_sequence {
                let decision = self.plant.unit(unit_id)?.sequence().decide(&grade, now);
                if let SequenceDecision::Break(reason) = decision {
                    return self.begin_turnaround(unit_id, &heat_id, &grade, reason);
                }
                self.check_temperature(&heat_id)?;
            }

            let duration = (rules.process_time)(&grade, &self.downstream_view(next, &bay));
            let event = self.clock.schedule(
                duration,
                PlantEvent::ProcessingComplete {
                    unit_id: unit_id.to_string(),
                    heat_id: heat_id.clone(),
                },
            )?;

            let heat = self.plant.heat_mut(&heat_id)?;
            let waited = heat.record_start(now);
            heat.set_cooling(false, now);
            heat.set_location(HeatLocation::Processing {
                unit: unit_id.to_string(),
            });

            let unit = self.plant.unit_mut(unit_id)?;
            unit.pop_queue_front(now);
            unit.set_blocked(None);
            if rules.tracks_sequence {
                unit.sequence_mut().record_start(&grade.id);
            }
            unit.start_occupant(
                heat_id.clone(),
                OccupantPhase::Processing {
                    ends_at: now + duration,
                    event,
                },
                waited,
                now,
            );

            debug!("{} started at {} for {:.1} min", heat_id, unit_id, duration);
            self.log.log(Event::ProcessingStarted {
                time: now,
                heat_id,
                unit_id: unit_id.to_string(),
                duration,
            });
        }
    }

    fn begin_turnaround(
        &mut self,
        unit_id: &str,
        heat_id: &str,
        grade: &SteelGrade,
        reason: SequenceBreak,
    ) -> Result<(), SimulationError> {
        let now = self.clock.now();
        let unit = self.plant.unit_mut(unit_id)?;
        let closed = unit.sequence_mut().close();
        let until = now + grade.turnaround_time;
        unit.begin_turnaround(until);

        let mut sequence_length = 0;
        if let Some((closed_grade, length)) = closed {
            sequence_length = length;
            let min_sequence = self
                .grades
                .get(&closed_grade)
                .map_or(1, |g| g.min_sequence);
            if length < min_sequence {
                self.counters.short_sequences += 1;
                warn!(
                    "{} closed a {}-heat sequence of {} (minimum {})",
                    unit_id, length, closed_grade, min_sequence
                );
            }
        }

        self.clock.schedule(
            grade.turnaround_time,
            PlantEvent::TurnaroundComplete {
                unit_id: unit_id.to_string(),
            },
        )?;
        self.counters.caster_turnarounds += 1;
        self.plant.heat_mut(heat_id)?.flag(QualityFlag::CasterTurnaround);

        debug!(
            "{} turnaround until {:.1} ({:?} after {} heats)",
            unit_id, until, reason, sequence_length
        );
        self.log.log(Event::CasterTurnaround {
            time: now,
            unit_id: unit_id.to_string(),
            heat_id: heat_id.to_string(),
            reason: format!("{:?}", reason),
            sequence_length,
            until,
        });
        Ok(())
    }

    pub(crate) fn on_turnaround_complete(&mut self, unit_id: &str) -> Result<(), SimulationError> {
        self.plant.unit_mut(unit_id)?.end_turnaround();
        debug!("{} turnaround complete", unit_id);
        self.try_start_unit(unit_id)?;
        self.release_warming_heats()
    }

    /// Processing finished: exit, hold for downstream, or request transport
    pub(crate) fn on_processing_complete(
        &mut self,
        unit_id: &str,
        heat_id: &str,
    ) -> Result<(), SimulationError> {
        let now = self.clock.now();
        let unit = self.plant.unit_mut(unit_id)?;
        unit.record_processed();
        let rules = behavior(unit.kind());
        let bay = unit.bay().to_string();

        self.log.log(Event::ProcessingCompleted {
            time: now,
            heat_id: heat_id.to_string(),
            unit_id: unit_id.to_string(),
        });

        let step = self.routes.peek(self.plant.heat(heat_id)?)?;
        match step {
            RouteStep::Exit => self.complete_heat(unit_id, heat_id),
            RouteStep::Next(next) => {
                if rules.holds_for_downstream && self.downstream_saturated(next, &bay) {
                    self.start_warming(unit_id, heat_id)
                } else {
                    self.commit_departure(unit_id, heat_id)
                }
            }
        }
    }

    fn start_warming(&mut self, unit_id: &str, heat_id: &str) -> Result<(), SimulationError> {
        let now = self.clock.now();
        let max_warming = self.grade_of(heat_id)?.max_warming_time;
        let timeout_event = self.clock.schedule(
            max_warming,
            PlantEvent::WarmingTimeout {
                unit_id: unit_id.to_string(),
                heat_id: heat_id.to_string(),
            },
        )?;
        self.plant.unit_mut(unit_id)?.set_phase(
            heat_id,
            OccupantPhase::Warming {
                since: now,
                timeout_event,
            },
            now,
        );
        let heat = self.plant.heat_mut(heat_id)?;
        heat.set_cooling(false, now);
        heat.set_location(HeatLocation::Warming {
            unit: unit_id.to_string(),
        });

        debug!("{} warming at {} (downstream saturated)", heat_id, unit_id);
        self.log.log(Event::WarmingStarted {
            time: now,
            heat_id: heat_id.to_string(),
            unit_id: unit_id.to_string(),
        });
        Ok(())
    }

    pub(crate) fn on_warming_timeout(&mut self, unit_id: &str, heat_id: &str) -> Result<(), SimulationError> {
        let still_warming = matches!(
            self.plant.unit(unit_id)?.occupant(heat_id).map(|o| &o.phase),
            Some(OccupantPhase::Warming { .. })
        );
        if !still_warming {
            return Ok(());
        }

        let now = self.clock.now();
        self.counters.warming_timeouts += 1;
        self.plant.heat_mut(heat_id)?.flag(QualityFlag::WarmingTimeout);
        warn!("{} exceeded its warming time at {}", heat_id, unit_id);
        self.log.log(Event::WarmingTimeout {
            time: now,
            heat_id: heat_id.to_string(),
            unit_id: unit_id.to_string(),
        });
        self.commit_departure(unit_id, heat_id)
    }

    /// Re-check warming heats, oldest first, against downstream capacity
    pub(crate) fn release_warming_heats(&mut self) -> Result<(), SimulationError> {
        let mut warming: Vec<(f64, String, String, u64)> = Vec::new();
        for unit in self.plant.units.values() {
            for occupant in unit.occupants() {
                if let OccupantPhase::Warming {
                    since,
                    timeout_event,
                } = occupant.phase
                {
                    warming.push((
                        since,
                        occupant.heat_id.clone(),
                        unit.id().to_string(),
                        timeout_event,
                    ));
                }
            }
        }
        warming.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        for (_, heat_id, unit_id, timeout_event) in warming {
            let Some(next) = self.plant.heat(&heat_id)?.next_kind() else {
                continue;
            };
            let bay = self.plant.unit(&unit_id)?.bay().to_string();
            if !self.downstream_saturated(next, &bay) {
                self.clock.cancel(timeout_event);
                debug!("{} released from warming at {}", heat_id, unit_id);
                self.commit_departure(&unit_id, &heat_id)?;
            }
        }
        Ok(())
    }

    /// Advance the route, choose the destination and request transport
    fn commit_departure(&mut self, unit_id: &str, heat_id: &str) -> Result<(), SimulationError> {
        let now = self.clock.now();
        let bay = self.plant.unit(unit_id)?.bay().to_string();
        let step = self.routes.advance(self.plant.heat_mut(heat_id)?)?;
        let RouteStep::Next(kind) = step else {
            return Err(self.violation(format!(
                "{} asked to leave {} for transport but its route is finished",
                heat_id, unit_id
            )));
        };
        let Some(destination) =
            self.routes
                .select_unit(kind, Some(&bay), &self.plant, self.transport.graph())
        else {
            return Err(self.violation(format!("no {} reachable from bay {}", kind, bay)));
        };

        self.plant.unit_mut(unit_id)?.set_phase(
            heat_id,
            OccupantPhase::AwaitingPickup { since: now },
            now,
        );
        let heat = self.plant.heat_mut(heat_id)?;
        heat.set_cooling(true, now);
        heat.set_location(HeatLocation::AwaitingPickup {
            unit: unit_id.to_string(),
        });
        self.plant.unit_mut(&destination)?.add_inbound();
        self.request_transport(heat_id, unit_id, &destination)
    }

    /// The crane has lifted the ladle: free the slot
    pub(crate) fn release_slot(&mut self, unit_id: &str, heat_id: &str) -> Result<(), SimulationError> {
        let now = self.clock.now();
        self.plant.heat_mut(heat_id)?.record_exit(now);
        self.plant.unit_mut(unit_id)?.remove_occupant(heat_id, now);
        self.try_start_unit(unit_id)?;
        self.release_warming_heats()
    }

    /// Cast finished: the heat leaves the plant and returns its ladle
    fn complete_heat(&mut self, unit_id: &str, heat_id: &str) -> Result<(), SimulationError> {
        let now = self.clock.now();
        let unit = self.plant.unit_mut(unit_id)?;
        if behavior(unit.kind()).tracks_sequence {
            unit.sequence_mut().record_end(now);
        }
        unit.remove_occupant(heat_id, now);

        let heat = self.plant.heat_mut(heat_id)?;
        heat.record_exit(now);
        self.routes.advance(heat)?;
        heat.complete(now);
        let ladle = heat.release_ladle();
        let cycle_time = heat.cycle_time().unwrap_or_default();

        if let Some(heat) = self.plant.heats.remove(heat_id) {
            self.plant.completed.push(heat);
        }
        debug!("{} completed after {:.1} min", heat_id, cycle_time);
        self.log.log(Event::HeatCompleted {
            time: now,
            heat_id: heat_id.to_string(),
            cycle_time,
        });

        if let Some(ladle_id) = ladle {
            self.return_ladle(&ladle_id)?;
        }
        self.try_start_unit(unit_id)?;
        self.release_warming_heats()
    }
}

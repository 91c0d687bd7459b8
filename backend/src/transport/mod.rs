//! Transport subsystem: overhead cranes and ladle cars
//!
//! Heats move between units as transport requests:
//!
//! - **Intra-bay**: one crane lifts the ladle at the source unit and lowers
//!   it at the destination unit.
//! - **Inter-bay**: a ladle car is reserved (travelling empty to the source
//!   bay if needed), a source-bay crane moves the ladle onto the car at the
//!   bay station, the car runs the shortest path over the bay graph, and a
//!   destination-bay crane moves the ladle from the station to the unit.
//!
//! Each bay has its own crane queue and all bays share one car queue. Both
//! are served strictly head-of-line in request order (urgent requests first
//! under the `urgent_first` policy).
//!
//! # Critical Invariants
//!
//! 1. Busy cranes in one bay never claim intersecting rail spans
//! 2. A heat has at most one outstanding request
//! 3. The source slot is released exactly once, when the ladle is lifted

pub mod graph;
pub mod kinematics;
pub mod ladles;

pub use graph::{BayEdge, BayGraph, CarPath};
pub use kinematics::{CraneKinematics, MovePlan};

use crate::config::{ConfigError, DispatchPolicy, PlantConfig};
use crate::models::crane::{ranges_overlap, Crane, CraneTask};
use crate::models::event::Event;
use crate::models::heat::HeatLocation;
use crate::models::ladle_car::{LadleCar, LadleCarStatus, LadleCarType};
use crate::models::state::{compare_ids, PlantState};
use crate::models::transport_request::{TransferStage, TransportRequest};
use crate::models::unit::UnitKind;
use crate::orchestrator::{PlantEvent, PlantSimulation, SimulationError};
use log::{debug, warn};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct TransportSystem {
    graph: BayGraph,
    kinematics: CraneKinematics,
    policy: DispatchPolicy,
    /// Request ids waiting for a crane, per bay
    crane_queues: BTreeMap<String, Vec<String>>,
    /// Request ids waiting for a ladle car
    car_queue: Vec<String>,
    next_seq: u64,
    delivered: u64,
}

impl TransportSystem {
    pub fn new(config: &PlantConfig) -> Result<Self, ConfigError> {
        let graph = BayGraph::new(config)?;
        let crane_queues = graph
            .bays()
            .keys()
            .map(|id| (id.clone(), Vec::new()))
            .collect();
        Ok(Self {
            graph,
            kinematics: CraneKinematics::new(config),
            policy: config.transport_dispatch,
            crane_queues,
            car_queue: Vec::new(),
            next_seq: 0,
            delivered: 0,
        })
    }

    /// Place cranes at evenly spaced rest positions and home the ladle cars
    /// round-robin over the bays
    pub(crate) fn build_fleet(&mut self, config: &PlantConfig, plant: &mut PlantState) {
        let bay_ids: Vec<String> = self.graph.bays().keys().cloned().collect();
        for bay_id in &bay_ids {
            let Some(bay) = self.graph.bay_mut(bay_id) else {
                continue;
            };
            for (i, x) in bay.spread(config.n_cranes_per_bay).into_iter().enumerate() {
                let id = format!("{}_crane_{}", bay_id, i + 1);
                bay.crane_ids.push(id.clone());
                plant
                    .cranes
                    .insert(id.clone(), Crane::new(id, bay_id.clone(), x));
            }
        }

        if bay_ids.is_empty() {
            return;
        }
        for (i, car_type) in config.ladle_car_fleet().into_iter().enumerate() {
            let id = format!("car_{}", i + 1);
            let home = bay_ids[i % bay_ids.len()].clone();
            plant.cars.insert(id.clone(), LadleCar::new(id, home, car_type));
        }
    }

    pub fn graph(&self) -> &BayGraph {
        &self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut BayGraph {
        &mut self.graph
    }

    pub fn kinematics(&self) -> &CraneKinematics {
        &self.kinematics
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn crane_queue(&self, bay: &str) -> &[String] {
        self.crane_queues.get(bay).map_or(&[], Vec::as_slice)
    }

    pub fn car_queue(&self) -> &[String] {
        &self.car_queue
    }

    fn next_request_id(&mut self) -> (String, u64) {
        self.next_seq += 1;
        (format!("req_{:05}", self.next_seq), self.next_seq)
    }

    fn push_crane_queue(&mut self, bay: &str, request_id: &str) {
        self.crane_queues
            .entry(bay.to_string())
            .or_default()
            .push(request_id.to_string());
    }

    /// Order a queue for service under the dispatch policy
    fn ordered(&self, queue: &[String], plant: &PlantState) -> Vec<String> {
        let mut keyed: Vec<(bool, u64, String)> = queue
            .iter()
            .filter_map(|id| plant.requests.get(id))
            .map(|r| {
                let deferred = match self.policy {
                    DispatchPolicy::Fifo => false,
                    DispatchPolicy::UrgentFirst => !r.urgent,
                };
                (deferred, r.seq, r.id.clone())
            })
            .collect();
        keyed.sort();
        keyed.into_iter().map(|(_, _, id)| id).collect()
    }
}

fn remove_id(queue: &mut Vec<String>, id: &str) {
    queue.retain(|queued| queued != id);
}

impl PlantSimulation {
    /// Open a transport request for a heat leaving `from_unit`
    pub(crate) fn request_transport(
        &mut self,
        heat_id: &str,
        from_unit: &str,
        to_unit: &str,
    ) -> Result<(), SimulationError> {
        let now = self.clock.now();
        let from_bay = self.plant.unit(from_unit)?.bay().to_string();
        let destination = self.plant.unit(to_unit)?;
        let to_bay = destination.bay().to_string();
        let urgent = destination.kind() == UnitKind::Caster
            && destination.sequence().is_open()
            && destination.occupants().is_empty()
            && destination.queue().is_empty();
        let car_type = LadleCarType::for_destination(destination.kind());
        let ladle_id = self.plant.heat(heat_id)?.ladle_id().map(str::to_string);

        let (request_id, seq) = self.transport.next_request_id();
        let request = TransportRequest {
            id: request_id.clone(),
            seq,
            heat_id: heat_id.to_string(),
            ladle_id,
            from_unit: from_unit.to_string(),
            from_bay: from_bay.clone(),
            to_unit: to_unit.to_string(),
            to_bay,
            created_at: now,
            queued_since: now,
            urgent,
            car_type,
            stage: TransferStage::Pending,
            crane_id: None,
            car_id: None,
            starved: false,
        };
        if request.is_inter_bay() {
            self.transport.car_queue.push(request_id.clone());
        } else {
            self.transport.push_crane_queue(&from_bay, &request_id);
        }
        self.plant.requests.insert(request_id.clone(), request);

        debug!(
            "{} requested for {}: {} -> {}",
            request_id, heat_id, from_unit, to_unit
        );
        self.log.log(Event::TransportRequested {
            time: now,
            request_id,
            heat_id: heat_id.to_string(),
            from_unit: from_unit.to_string(),
            to_unit: to_unit.to_string(),
            urgent,
        });
        self.dispatch_transport()
    }

    /// Serve the car queue, then every crane queue
    pub(crate) fn dispatch_transport(&mut self) -> Result<(), SimulationError> {
        self.dispatch_cars()?;
        let bays: Vec<String> = self.transport.crane_queues.keys().cloned().collect();
        for bay in bays {
            self.dispatch_cranes(&bay)?;
        }
        Ok(())
    }

    fn closest_idle_car(&self, bay: &str, car_type: LadleCarType) -> Option<(String, f64, f64)> {
        let graph = self.transport.graph();
        self.plant
            .cars
            .values()
            .filter(|car| car.is_idle() && car.serves(car_type))
            .filter_map(|car| {
                let path = graph.path(car.current_bay(), bay)?;
                Some((car.id().to_string(), path.travel_time, path.distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| compare_ids(&a.0, &b.0)))
    }

    fn dispatch_cars(&mut self) -> Result<(), SimulationError> {
        let now = self.clock.now();
        for request_id in self.transport.ordered(&self.transport.car_queue, &self.plant) {
            let request = self.plant.request(&request_id)?;
            let (from_bay, car_type) = (request.from_bay.clone(), request.car_type);
            let Some((car_id, travel_time, distance)) = self.closest_idle_car(&from_bay, car_type)
            else {
                break;
            };
            remove_id(&mut self.transport.car_queue, &request_id);

            let car = self.plant.car_mut(&car_id)?;
            let positioned = car.current_bay() == from_bay;
            let request = self.plant.request_mut(&request_id)?;
            request.car_id = Some(car_id.clone());
            let heat_id = request.heat_id.clone();

            if positioned {
                request.stage = TransferStage::AwaitingLoadCrane;
                request.queued_since = now;
                self.plant
                    .car_mut(&car_id)?
                    .reserve(&request_id, LadleCarStatus::Loading, now);
                self.transport.push_crane_queue(&from_bay, &request_id);
                debug!("{} reserved {} at {}", request_id, car_id, from_bay);
            } else {
                request.stage = TransferStage::CarPositioning;
                let car = self.plant.car_mut(&car_id)?;
                car.reserve(&request_id, LadleCarStatus::Moving, now);
                car.depart(distance);
                self.clock.schedule(
                    travel_time,
                    PlantEvent::CarArrived {
                        car_id: car_id.clone(),
                        request_id: request_id.clone(),
                    },
                )?;
                debug!(
                    "{} sent empty to {} for {} ({:.1} min)",
                    car_id, from_bay, request_id, travel_time
                );
                self.log.log(Event::LadleCarDispatched {
                    time: now,
                    car_id,
                    request_id,
                    heat_id,
                    to_bay: from_bay,
                });
            }
        }
        Ok(())
    }

    /// Rail positions a crane task runs between for the request's stage
    fn crane_endpoints(&self, request: &TransportRequest) -> Result<(f64, f64), SimulationError> {
        let station = |bay: &str| {
            self.transport
                .graph()
                .bay(bay)
                .map(|b| b.station_x)
                .ok_or_else(|| SimulationError::UnknownEntity {
                    kind: "bay".to_string(),
                    id: bay.to_string(),
                })
        };
        match request.stage {
            TransferStage::Pending => Ok((
                self.plant.unit(&request.from_unit)?.x(),
                self.plant.unit(&request.to_unit)?.x(),
            )),
            TransferStage::AwaitingLoadCrane => Ok((
                self.plant.unit(&request.from_unit)?.x(),
                station(&request.from_bay)?,
            )),
            _ => Ok((
                station(&request.to_bay)?,
                self.plant.unit(&request.to_unit)?.x(),
            )),
        }
    }

    /// First idle crane in bay order whose span clears every busy crane
    fn free_crane(&self, bay: &str, from_x: f64, to_x: f64) -> Option<String> {
        let cranes: Vec<&Crane> = self
            .transport
            .graph()
            .bay(bay)?
            .crane_ids
            .iter()
            .filter_map(|id| self.plant.cranes.get(id))
            .collect();
        let busy: Vec<(f64, f64)> = cranes.iter().filter_map(|c| c.range()).collect();
        cranes
            .iter()
            .filter(|c| c.is_idle())
            .find(|c| {
                let span = c.span_for(from_x, to_x);
                !busy.iter().any(|range| ranges_overlap(span, *range))
            })
            .map(|c| c.id().to_string())
    }

    fn dispatch_cranes(&mut self, bay: &str) -> Result<(), SimulationError> {
        let now = self.clock.now();
        let queue = match self.transport.crane_queues.get(bay) {
            Some(queue) => self.transport.ordered(queue, &self.plant),
            None => return Ok(()),
        };

        for request_id in queue {
            let request = self.plant.request(&request_id)?;
            let (from_x, to_x) = self.crane_endpoints(request)?;
            let Some(crane_id) = self.free_crane(bay, from_x, to_x) else {
                break;
            };
            let heat_id = request.heat_id.clone();
            let next_stage = match request.stage {
                TransferStage::AwaitingLoadCrane => TransferStage::Loading,
                _ => TransferStage::CraneMoving,
            };

            let crane = self.plant.crane_mut(&crane_id)?;
            let plan = self.transport.kinematics.plan(crane.position(), from_x, to_x);
            crane.assign(
                CraneTask {
                    request_id: request_id.clone(),
                    from_x,
                    to_x,
                    lift_starts: now + plan.lift_starts,
                    picked_up_at: now + plan.picked_up_at,
                    lower_starts: now + plan.lower_starts,
                    dropped_at: now + plan.dropped_at,
                },
                now,
            );
            if let Some(queue) = self.transport.crane_queues.get_mut(bay) {
                remove_id(queue, &request_id);
            }
            let request = self.plant.request_mut(&request_id)?;
            request.stage = next_stage;
            request.crane_id = Some(crane_id.clone());

            self.clock.schedule(
                plan.picked_up_at,
                PlantEvent::CranePickup {
                    crane_id: crane_id.clone(),
                    request_id: request_id.clone(),
                },
            )?;
            self.clock.schedule(
                plan.dropped_at,
                PlantEvent::CraneDropoff {
                    crane_id: crane_id.clone(),
                    request_id: request_id.clone(),
                },
            )?;

            debug!(
                "{} takes {} ({:.1} -> {:.1}, {:.1} min)",
                crane_id, request_id, from_x, to_x, plan.dropped_at
            );
            self.log.log(Event::CraneAssigned {
                time: now,
                crane_id,
                request_id,
                heat_id,
            });
        }
        Ok(())
    }

    /// Ladle hooked: the heat leaves its unit or its car
    pub(crate) fn on_crane_pickup(&mut self, crane_id: &str, request_id: &str) -> Result<(), SimulationError> {
        let now = self.clock.now();
        self.plant.crane_mut(crane_id)?.pick_up();
        let request = self.plant.request(request_id)?.clone();

        let heat = self.plant.heat_mut(&request.heat_id)?;
        heat.settle_temperature(now);
        heat.set_location(HeatLocation::InTransit {
            request: request_id.to_string(),
        });
        self.sync_ladle_temperature(&request.heat_id)?;
        self.log.log(Event::HeatPickedUp {
            time: now,
            heat_id: request.heat_id.clone(),
            crane_id: crane_id.to_string(),
        });

        let from_car = request.is_inter_bay() && request.stage == TransferStage::CraneMoving;
        if from_car {
            if let Some(car_id) = &request.car_id {
                let car = self.plant.car_mut(car_id)?;
                car.unload_ladle();
                car.release(now);
                debug!("{} released at {}", car_id, request.to_bay);
            }
            self.dispatch_transport()
        } else {
            self.release_slot(&request.from_unit, &request.heat_id)
        }
    }

    /// Ladle lowered: onto the car, or into the destination unit
    pub(crate) fn on_crane_dropoff(&mut self, crane_id: &str, request_id: &str) -> Result<(), SimulationError> {
        let now = self.clock.now();
        self.plant.crane_mut(crane_id)?.finish(now);
        let request = self.plant.request(request_id)?.clone();
        self.sync_ladle_temperature(&request.heat_id)?;

        match request.stage {
            TransferStage::Loading => {
                let car_id = request.car_id.clone().ok_or_else(|| {
                    self.violation(format!("{} is loading without a ladle car", request_id))
                })?;
                let Some(path) = self
                    .transport
                    .graph()
                    .path(&request.from_bay, &request.to_bay)
                    .cloned()
                else {
                    return Err(self.violation(format!(
                        "no rail path {} -> {}",
                        request.from_bay, request.to_bay
                    )));
                };
                let car = self.plant.car_mut(&car_id)?;
                if let Some(ladle) = &request.ladle_id {
                    car.load_ladle(ladle);
                }
                car.depart(path.distance);
                self.plant.request_mut(request_id)?.stage = TransferStage::CarTravelling;
                self.clock.schedule(
                    path.travel_time,
                    PlantEvent::CarArrived {
                        car_id: car_id.clone(),
                        request_id: request_id.to_string(),
                    },
                )?;
                debug!(
                    "{} carries {} to {} ({:.1} min)",
                    car_id, request.heat_id, request.to_bay, path.travel_time
                );
                self.log.log(Event::LadleCarDispatched {
                    time: now,
                    car_id,
                    request_id: request_id.to_string(),
                    heat_id: request.heat_id.clone(),
                    to_bay: request.to_bay.clone(),
                });
            }
            TransferStage::CraneMoving => {
                self.plant.requests.remove(request_id);
                self.transport.delivered += 1;
                self.plant.unit_mut(&request.to_unit)?.remove_inbound();
                debug!("{} delivered to {}", request.heat_id, request.to_unit);
                self.log.log(Event::HeatDelivered {
                    time: now,
                    heat_id: request.heat_id.clone(),
                    unit_id: request.to_unit.clone(),
                });
                self.enqueue_heat(&request.to_unit, &request.heat_id)?;
            }
            stage => {
                return Err(self.violation(format!(
                    "{} dropped by {} in stage {:?}",
                    request_id, crane_id, stage
                )));
            }
        }
        self.dispatch_transport()
    }

    pub(crate) fn on_car_arrived(&mut self, car_id: &str, request_id: &str) -> Result<(), SimulationError> {
        let now = self.clock.now();
        let request = self.plant.request(request_id)?.clone();
        let (bay, car_status, next_stage) = match request.stage {
            TransferStage::CarPositioning => (
                request.from_bay.clone(),
                LadleCarStatus::Loading,
                TransferStage::AwaitingLoadCrane,
            ),
            TransferStage::CarTravelling => (
                request.to_bay.clone(),
                LadleCarStatus::Unloading,
                TransferStage::AwaitingUnloadCrane,
            ),
            stage => {
                return Err(self.violation(format!(
                    "{} arrived for {} in stage {:?}",
                    car_id, request_id, stage
                )));
            }
        };

        self.plant.car_mut(car_id)?.arrive(&bay, car_status);
        let request = self.plant.request_mut(request_id)?;
        request.stage = next_stage;
        request.queued_since = now;
        self.transport.push_crane_queue(&bay, request_id);

        debug!("{} arrived at {} for {}", car_id, bay, request_id);
        self.log.log(Event::LadleCarArrived {
            time: now,
            car_id: car_id.to_string(),
            request_id: request_id.to_string(),
            heat_id: request.heat_id.clone(),
            bay,
        });
        self.dispatch_transport()
    }

    /// Count each request once when it has waited too long in a queue
    pub(crate) fn check_starvation(&mut self) {
        let now = self.clock.now();
        let limit = self.config.analytics.transport_starvation_time;
        for request in self.plant.requests.values_mut() {
            let waited = now - request.queued_since;
            if request.starved || !request.is_waiting() || waited <= limit {
                continue;
            }
            request.starved = true;
            self.counters.transport_starvation += 1;
            warn!(
                "{} for {} has waited {:.1} min for transport",
                request.id, request.heat_id, waited
            );
            self.log.log(Event::TransportStarvation {
                time: now,
                request_id: request.id.clone(),
                heat_id: request.heat_id.clone(),
                waited,
            });
        }
    }
}

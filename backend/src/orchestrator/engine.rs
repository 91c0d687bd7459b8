//! Plant simulation engine
//!
//! `PlantSimulation` owns one run: the validated configuration, the plant
//! arena, the event clock and every subsystem. The unit state machines
//! (`units`), transport (`transport`) and ladle pool (`transport::ladles`)
//! are implemented as further `impl PlantSimulation` blocks next to their
//! models; this file holds construction, event dispatch and the control
//! operations.
//!
//! # Event loop
//!
//! ```text
//! step():
//! 1. Advance the clock to the next event time; take the whole batch
//! 2. Dispatch each event in insertion order
//! 3. Count transport starvation
//! 4. Check plant invariants (fatal on violation)
//! 5. Finish when no event is left
//! ```
//!
//! # Example
//!
//! ```rust
//! use steel_plant_sim_core::{PlantConfig, PlantSimulation};
//!
//! let config = PlantConfig::from_json_str(r#"{"max_heats": 3}"#).unwrap();
//! let mut sim = PlantSimulation::new(config).unwrap();
//! let summary = sim.run().unwrap();
//! assert_eq!(summary.heats_completed, 3);
//! ```

use crate::config::{ConfigError, PlantConfig};
use crate::core::{ClockError, SimulationClock};
use crate::metrics::{
    Bottleneck, BottleneckAnalyzer, ConditionCounters, MetricsSample, PlantStats, SampleCollector,
};
use crate::models::event::{Event, EventLog};
use crate::models::grade::GradeCatalog;
use crate::models::heat::Heat;
use crate::models::ladle::Ladle;
use crate::models::state::PlantState;
use crate::models::unit::UnitKind;
use crate::rng::RngManager;
use crate::routing::{HeatGenerator, RouteManager};
use crate::transport::TransportSystem;
use crate::units::build_units;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

// ============================================================================
// Errors and events
// ============================================================================

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Clock(#[from] ClockError),

    #[error("Heat {heat_id} has no remaining route step")]
    RouteExhausted { heat_id: String },

    /// `state_dump` is the JSON snapshot taken when the violation was found
    #[error("Invariant violated: {detail}")]
    InvariantViolation { detail: String, state_dump: String },

    #[error("Unknown {kind}: {id}")]
    UnknownEntity { kind: String, id: String },

    #[error("Failed to serialize snapshot: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Everything the plant schedules on its clock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlantEvent {
    GenerateHeat,
    ProcessingComplete { unit_id: String, heat_id: String },
    WarmingTimeout { unit_id: String, heat_id: String },
    TurnaroundComplete { unit_id: String },
    CranePickup { crane_id: String, request_id: String },
    CraneDropoff { crane_id: String, request_id: String },
    CarArrived { car_id: String, request_id: String },
    MetricsSample,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Ready,
    Running,
    Paused,
    Finished,
}

/// Outcome of one `step()`
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub time: f64,
    pub events_processed: usize,
    pub heats_in_plant: usize,
    pub heats_completed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub end_time: f64,
    pub batches: usize,
    pub events_processed: usize,
    pub heats_generated: usize,
    pub heats_completed: usize,
}

// ============================================================================
// PlantSimulation
// ============================================================================

pub struct PlantSimulation {
    pub(crate) config: PlantConfig,
    pub(crate) grades: GradeCatalog,
    pub(crate) routes: RouteManager,
    pub(crate) generator: HeatGenerator,
    pub(crate) transport: TransportSystem,
    pub(crate) plant: PlantState,
    pub(crate) clock: SimulationClock<PlantEvent>,
    pub(crate) rng: RngManager,
    pub(crate) log: EventLog,
    pub(crate) counters: ConditionCounters,
    pub(crate) collector: SampleCollector,
    pub(crate) analyzer: BottleneckAnalyzer,
    /// Heats waiting for a ladle, oldest first
    pub(crate) ladle_waiting: VecDeque<String>,
    pub(crate) status: RunStatus,
}

impl PlantSimulation {
    /// Build a fresh run from a configuration
    ///
    /// Validates the configuration, lays out units, cranes, ladle cars and
    /// ladles, and schedules the first heat at t = 0 and the first metrics
    /// sample one reporting interval later.
    ///
    /// # Errors
    ///
    /// * `SimulationError::Config` - the configuration is invalid
    pub fn new(config: PlantConfig) -> Result<Self, SimulationError> {
        config.validate()?;

        let grades = GradeCatalog::from_config(&config)?;
        let routes = RouteManager::new(&grades);
        let mut transport = TransportSystem::new(&config)?;
        let mut plant = PlantState::default();
        build_units(&config, transport.graph_mut(), &mut plant)?;
        transport.build_fleet(&config, &mut plant);
        for i in 1..=config.n_ladles {
            let id = format!("ladle_{}", i);
            plant
                .ladles
                .insert(id.clone(), Ladle::new(id, config.ladle_max_heats));
        }

        let mut clock = SimulationClock::new();
        clock.schedule(0.0, PlantEvent::GenerateHeat)?;
        let interval = config.analytics.reporting_interval;
        if config.horizon().map_or(true, |horizon| interval <= horizon) {
            clock.schedule(interval, PlantEvent::MetricsSample)?;
        }

        info!(
            "Plant ready: {} units, {} cranes, {} ladle cars, {} ladles, seed {}",
            plant.units.len(),
            plant.cranes.len(),
            plant.cars.len(),
            plant.ladles.len(),
            config.seed
        );

        Ok(Self {
            grades,
            routes,
            generator: HeatGenerator::new(&config),
            transport,
            plant,
            clock,
            rng: RngManager::new(config.seed),
            log: EventLog::new(),
            counters: ConditionCounters::default(),
            collector: SampleCollector::new(),
            analyzer: BottleneckAnalyzer::new(config.analytics.clone()),
            ladle_waiting: VecDeque::new(),
            status: RunStatus::Ready,
            config,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn config(&self) -> &PlantConfig {
        &self.config
    }

    pub fn plant(&self) -> &PlantState {
        &self.plant
    }

    pub fn grades(&self) -> &GradeCatalog {
        &self.grades
    }

    pub fn transport(&self) -> &TransportSystem {
        &self.transport
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub fn counters(&self) -> &ConditionCounters {
        &self.counters
    }

    pub fn samples(&self) -> &[MetricsSample] {
        self.analyzer.samples()
    }

    pub fn pending_events(&self) -> usize {
        self.clock.pending()
    }

    /// Heats waiting for a ladle, oldest first
    pub fn ladle_queue(&self) -> &VecDeque<String> {
        &self.ladle_waiting
    }

    /// A heat in the plant or already completed
    pub fn heat(&self, id: &str) -> Option<&Heat> {
        self.plant
            .heats
            .get(id)
            .or_else(|| self.plant.completed_heat(id))
    }

    pub fn completed_heats(&self) -> &[Heat] {
        &self.plant.completed
    }

    pub fn bottlenecks(&self) -> Vec<Bottleneck> {
        self.analyzer.analyze()
    }

    pub fn stats(&self) -> PlantStats {
        PlantStats::collect(
            &self.plant,
            self.generator.generated(),
            self.generator.takt_time(),
        )
    }

    // ========================================================================
    // Control operations
    // ========================================================================

    pub fn start(&mut self) {
        if matches!(self.status, RunStatus::Ready | RunStatus::Paused) {
            info!("Run started at t={:.1}", self.now());
            self.status = RunStatus::Running;
        }
    }

    pub fn pause(&mut self) {
        if self.status == RunStatus::Running {
            info!("Run paused at t={:.1}", self.now());
            self.status = RunStatus::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.status == RunStatus::Paused {
            info!("Run resumed at t={:.1}", self.now());
            self.status = RunStatus::Running;
        }
    }

    pub fn toggle_pause(&mut self) {
        match self.status {
            RunStatus::Running => self.pause(),
            RunStatus::Paused => self.resume(),
            RunStatus::Ready | RunStatus::Finished => {}
        }
    }

    /// Process the next batch of same-time events
    ///
    /// Returns `Ok(None)` once the run has finished. Any error halts the
    /// run: the status becomes `Finished` and the error is returned.
    pub fn step(&mut self) -> Result<Option<StepResult>, SimulationError> {
        if self.status == RunStatus::Finished {
            return Ok(None);
        }
        let Some(batch) = self.clock.advance() else {
            self.finish();
            return Ok(None);
        };
        let time = batch.time;
        let events_processed = batch.len();

        let outcome = batch
            .events
            .into_iter()
            .try_for_each(|event| self.handle_event(event.kind))
            .and_then(|()| {
                self.check_starvation();
                self.check_invariants()
            });
        if let Err(err) = outcome {
            error!("Run halted at t={:.1}: {}", time, err);
            self.status = RunStatus::Finished;
            return Err(err);
        }

        if self.clock.is_empty() {
            self.finish();
        }
        Ok(Some(StepResult {
            time,
            events_processed,
            heats_in_plant: self.plant.heats.len(),
            heats_completed: self.plant.completed.len(),
        }))
    }

    /// Run until no event is left
    ///
    /// Heats still in the plant at the horizon are carried through to
    /// completion; only generation and sampling stop at the horizon.
    pub fn run(&mut self) -> Result<RunSummary, SimulationError> {
        self.start();
        let mut batches = 0;
        let mut events_processed = 0;
        while self.status == RunStatus::Running {
            match self.step()? {
                Some(result) => {
                    batches += 1;
                    events_processed += result.events_processed;
                }
                None => break,
            }
        }
        Ok(self.summary(batches, events_processed))
    }

    /// Process every event at or before `until`, then move time to `until`
    pub fn run_until(&mut self, until: f64) -> Result<RunSummary, SimulationError> {
        let mut batches = 0;
        let mut events_processed = 0;
        while self.status != RunStatus::Finished {
            match self.clock.peek_time() {
                Some(next) if next <= until => {}
                _ => break,
            }
            if let Some(result) = self.step()? {
                batches += 1;
                events_processed += result.events_processed;
            }
        }
        self.clock.rest_at(until);
        Ok(self.summary(batches, events_processed))
    }

    fn summary(&self, batches: usize, events_processed: usize) -> RunSummary {
        RunSummary {
            end_time: self.now(),
            batches,
            events_processed,
            heats_generated: self.generator.generated(),
            heats_completed: self.plant.completed.len(),
        }
    }

    /// Discard the run and rebuild it from the current configuration
    pub fn reset(&mut self) -> Result<(), SimulationError> {
        *self = Self::new(self.config.clone())?;
        info!("Run reset");
        Ok(())
    }

    /// Replace the configuration and rebuild; the old run is kept on error
    pub fn reconfigure(&mut self, config: PlantConfig) -> Result<(), SimulationError> {
        *self = Self::new(config)?;
        info!("Run reconfigured (config {})", self.config.config_hash());
        Ok(())
    }

    fn finish(&mut self) {
        if self.status != RunStatus::Finished {
            self.status = RunStatus::Finished;
            self.report_stranded();
            info!(
                "Run finished at t={:.1}: {} of {} heats completed",
                self.now(),
                self.plant.completed.len(),
                self.generator.generated()
            );
        }
    }

    /// Nothing is left to happen: count what can no longer move
    fn report_stranded(&mut self) {
        let now = self.clock.now();
        for request in self.plant.requests.values_mut() {
            if request.starved || !request.is_waiting() {
                continue;
            }
            request.starved = true;
            self.counters.transport_starvation += 1;
            let waited = now - request.queued_since;
            warn!(
                "{} for {} can never be served (waited {:.1} min)",
                request.id, request.heat_id, waited
            );
            self.log.log(Event::TransportStarvation {
                time: now,
                request_id: request.id.clone(),
                heat_id: request.heat_id.clone(),
                waited,
            });
        }
        for heat in self.plant.heats.values() {
            self.counters.stranded_heats += 1;
            warn!("{} stranded at end of run: {:?}", heat.id(), heat.location());
            self.log.log(Event::HeatStranded {
                time: now,
                heat_id: heat.id().to_string(),
                location: heat.location().clone(),
            });
        }
    }

    // ========================================================================
    // Event dispatch
    // ========================================================================

    fn handle_event(&mut self, event: PlantEvent) -> Result<(), SimulationError> {
        match event {
            PlantEvent::GenerateHeat => self.on_generate_heat(),
            PlantEvent::ProcessingComplete { unit_id, heat_id } => {
                self.on_processing_complete(&unit_id, &heat_id)
            }
            PlantEvent::WarmingTimeout { unit_id, heat_id } => {
                self.on_warming_timeout(&unit_id, &heat_id)
            }
            PlantEvent::TurnaroundComplete { unit_id } => self.on_turnaround_complete(&unit_id),
            PlantEvent::CranePickup {
                crane_id,
                request_id,
            } => self.on_crane_pickup(&crane_id, &request_id),
            PlantEvent::CraneDropoff {
                crane_id,
                request_id,
            } => self.on_crane_dropoff(&crane_id, &request_id),
            PlantEvent::CarArrived { car_id, request_id } => {
                self.on_car_arrived(&car_id, &request_id)
            }
            PlantEvent::MetricsSample => self.on_metrics_sample(),
        }
    }

    /// New heat: grade, route, EAF, ladle, then the next arrival
    fn on_generate_heat(&mut self) -> Result<(), SimulationError> {
        let now = self.now();
        let grade = self.grades.sample(&mut self.rng).clone();
        let assignment = self.routes.materialize(&grade.id)?;
        let first = assignment.kinds.first().copied().unwrap_or(UnitKind::Eaf);
        let Some(eaf) = self
            .routes
            .select_unit(first, None, &self.plant, self.transport.graph())
        else {
            return Err(self.violation(format!("no {} placed for grade {}", first, grade.id)));
        };

        let heat_id = self.generator.next_heat_id();
        let heat = Heat::new(
            heat_id.clone(),
            grade.id.clone(),
            assignment.kinds,
            grade.tapping_temperature,
            grade.temperature_loss_rate,
            &eaf,
            now,
        );
        self.plant.heats.insert(heat_id.clone(), heat);
        debug!("{} ({}) created for {}", heat_id, grade.id, eaf);
        self.log.log(Event::HeatCreated {
            time: now,
            heat_id: heat_id.clone(),
            grade: grade.id.clone(),
            unit_id: eaf.clone(),
        });

        self.assign_ladle(&heat_id)?;
        self.enqueue_heat(&eaf, &heat_id)?;

        match self.generator.next_arrival(now, &mut self.rng) {
            Some(next) => {
                self.clock.schedule_at(next, PlantEvent::GenerateHeat)?;
            }
            None => info!(
                "Heat generation stopped after {} heats",
                self.generator.generated()
            ),
        }
        Ok(())
    }

    fn on_metrics_sample(&mut self) -> Result<(), SimulationError> {
        let now = self.now();
        let sample = self.collector.take(&self.plant, now);
        self.log.log(Event::MetricsSampled {
            time: now,
            entities: sample.entities.len(),
        });
        self.analyzer.observe(sample);

        let next = now + self.config.analytics.reporting_interval;
        let keep_sampling = match self.config.horizon() {
            Some(horizon) => next <= horizon,
            // Stop once nothing else can change the plant
            None => {
                (!self.generator.limit_reached() || !self.plant.heats.is_empty())
                    && !self.clock.is_empty()
            }
        };
        if keep_sampling {
            self.clock.schedule_at(next, PlantEvent::MetricsSample)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for PlantSimulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlantSimulation")
            .field("now", &self.now())
            .field("status", &self.status)
            .field("units", &self.plant.units.len())
            .field("heats_in_plant", &self.plant.heats.len())
            .field("heats_completed", &self.plant.completed.len())
            .field("pending_events", &self.clock.pending())
            .finish()
    }
}

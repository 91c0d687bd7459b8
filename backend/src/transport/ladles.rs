//! Ladle pool
//!
//! New heats take the lowest-numbered idle ladle. When none is idle the heat
//! waits in FIFO order until a ladle comes back from the caster. A ladle
//! that has carried `ladle_max_heats` heats is retired and never assigned
//! again.

use crate::models::event::Event;
use crate::models::heat::HeatLocation;
use crate::orchestrator::{PlantSimulation, SimulationError};
use log::{debug, info, warn};

impl PlantSimulation {
    /// Give the heat a ladle, or park it in the ladle queue
    pub(crate) fn assign_ladle(&mut self, heat_id: &str) -> Result<bool, SimulationError> {
        match self.plant.first_idle_ladle() {
            Some(ladle_id) => {
                self.load_ladle(heat_id, &ladle_id)?;
                Ok(true)
            }
            None => {
                let now = self.clock.now();
                self.ladle_waiting.push_back(heat_id.to_string());
                self.counters.ladle_shortage += 1;
                let active_ladles = self.plant.active_ladles();
                let heats_in_plant = self.plant.heats.len();
                warn!(
                    "No idle ladle for {} ({} active ladles, {} heats in plant)",
                    heat_id, active_ladles, heats_in_plant
                );
                self.log.log(Event::LadleShortage {
                    time: now,
                    heat_id: Some(heat_id.to_string()),
                    active_ladles,
                    heats_in_plant,
                });
                Ok(false)
            }
        }
    }

    fn load_ladle(&mut self, heat_id: &str, ladle_id: &str) -> Result<(), SimulationError> {
        let now = self.clock.now();
        let heat = self.plant.heat_mut(heat_id)?;
        heat.assign_ladle(ladle_id);
        let temperature = heat.settle_temperature(now);
        self.plant.ladle_mut(ladle_id)?.load(heat_id, temperature);

        debug!("{} assigned to {}", ladle_id, heat_id);
        self.log.log(Event::LadleAssigned {
            time: now,
            heat_id: heat_id.to_string(),
            ladle_id: ladle_id.to_string(),
        });
        Ok(())
    }

    /// Ladle back from the caster: wear it, retire it or hand it on
    pub(crate) fn return_ladle(&mut self, ladle_id: &str) -> Result<(), SimulationError> {
        let now = self.clock.now();
        let ladle = self.plant.ladle_mut(ladle_id)?;
        if ladle.unload() {
            let wear = ladle.wear();
            info!("{} retired after {} heats", ladle_id, wear);
            self.log.log(Event::LadleRetired {
                time: now,
                ladle_id: ladle_id.to_string(),
                wear,
            });

            let active_ladles = self.plant.active_ladles();
            let heats_in_plant = self.plant.heats.len();
            if active_ladles < heats_in_plant {
                self.counters.ladle_shortage += 1;
                warn!(
                    "Ladle pool down to {} for {} heats in plant",
                    active_ladles, heats_in_plant
                );
                self.log.log(Event::LadleShortage {
                    time: now,
                    heat_id: None,
                    active_ladles,
                    heats_in_plant,
                });
            }
        }
        self.serve_ladle_queue()
    }

    /// Hand idle ladles to waiting heats, oldest first
    fn serve_ladle_queue(&mut self) -> Result<(), SimulationError> {
        while let Some(heat_id) = self.ladle_waiting.front().cloned() {
            let Some(ladle_id) = self.plant.first_idle_ladle() else {
                break;
            };
            self.ladle_waiting.pop_front();
            self.load_ladle(&heat_id, &ladle_id)?;

            let heat = self.plant.heat_mut(&heat_id)?;
            if let HeatLocation::AwaitingLadle { unit } = heat.location().clone() {
                heat.set_location(HeatLocation::Queued { unit: unit.clone() });
                self.try_start_unit(&unit)?;
            }
        }
        Ok(())
    }

    /// Mirror the heat's temperature onto its ladle
    pub(crate) fn sync_ladle_temperature(&mut self, heat_id: &str) -> Result<(), SimulationError> {
        let heat = self.plant.heat(heat_id)?;
        let temperature = heat.temperature();
        if let Some(ladle_id) = heat.ladle_id().map(str::to_string) {
            self.plant.ladle_mut(&ladle_id)?.set_temperature(temperature);
        }
        Ok(())
    }
}

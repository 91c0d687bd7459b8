//! Event logging
//!
//! Every state change of a run is recorded as an `Event` with its simulation
//! timestamp. The log is append-only and ordered by time (then by the order
//! in which handlers ran), which makes it a complete, replayable history.

use crate::models::heat::HeatLocation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    HeatCreated {
        time: f64,
        heat_id: String,
        grade: String,
        unit_id: String,
    },
    LadleAssigned {
        time: f64,
        heat_id: String,
        ladle_id: String,
    },
    LadleShortage {
        time: f64,
        heat_id: Option<String>,
        active_ladles: usize,
        heats_in_plant: usize,
    },
    LadleRetired {
        time: f64,
        ladle_id: String,
        wear: u32,
    },
    HeatQueued {
        time: f64,
        heat_id: String,
        unit_id: String,
        queue_length: usize,
    },
    ProcessingStarted {
        time: f64,
        heat_id: String,
        unit_id: String,
        duration: f64,
    },
    ProcessingCompleted {
        time: f64,
        heat_id: String,
        unit_id: String,
    },
    WarmingStarted {
        time: f64,
        heat_id: String,
        unit_id: String,
    },
    WarmingTimeout {
        time: f64,
        heat_id: String,
        unit_id: String,
    },
    CasterTurnaround {
        time: f64,
        unit_id: String,
        heat_id: String,
        reason: String,
        sequence_length: u32,
        until: f64,
    },
    TransportRequested {
        time: f64,
        request_id: String,
        heat_id: String,
        from_unit: String,
        to_unit: String,
        urgent: bool,
    },
    CraneAssigned {
        time: f64,
        crane_id: String,
        request_id: String,
        heat_id: String,
    },
    HeatPickedUp {
        time: f64,
        heat_id: String,
        crane_id: String,
    },
    HeatDelivered {
        time: f64,
        heat_id: String,
        unit_id: String,
    },
    LadleCarDispatched {
        time: f64,
        car_id: String,
        request_id: String,
        heat_id: String,
        to_bay: String,
    },
    LadleCarArrived {
        time: f64,
        car_id: String,
        request_id: String,
        heat_id: String,
        bay: String,
    },
    TransportStarvation {
        time: f64,
        request_id: String,
        heat_id: String,
        waited: f64,
    },
    /// Still in the plant when the run ended
    HeatStranded {
        time: f64,
        heat_id: String,
        location: HeatLocation,
    },
    HeatNonConforming {
        time: f64,
        heat_id: String,
        temperature: f64,
    },
    HeatCompleted {
        time: f64,
        heat_id: String,
        cycle_time: f64,
    },
    MetricsSampled {
        time: f64,
        entities: usize,
    },
}

impl Event {
    pub fn time(&self) -> f64 {
        match self {
            Event::HeatCreated { time, .. }
            | Event::LadleAssigned { time, .. }
            | Event::LadleShortage { time, .. }
            | Event::LadleRetired { time, .. }
            | Event::HeatQueued { time, .. }
            | Event::ProcessingStarted { time, .. }
            | Event::ProcessingCompleted { time, .. }
            | Event::WarmingStarted { time, .. }
            | Event::WarmingTimeout { time, .. }
            | Event::CasterTurnaround { time, .. }
            | Event::TransportRequested { time, .. }
            | Event::CraneAssigned { time, .. }
            | Event::HeatPickedUp { time, .. }
            | Event::HeatDelivered { time, .. }
            | Event::LadleCarDispatched { time, .. }
            | Event::LadleCarArrived { time, .. }
            | Event::TransportStarvation { time, .. }
            | Event::HeatStranded { time, .. }
            | Event::HeatNonConforming { time, .. }
            | Event::HeatCompleted { time, .. }
            | Event::MetricsSampled { time, .. } => *time,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Event::HeatCreated { .. } => "HeatCreated",
            Event::LadleAssigned { .. } => "LadleAssigned",
            Event::LadleShortage { .. } => "LadleShortage",
            Event::LadleRetired { .. } => "LadleRetired",
            Event::HeatQueued { .. } => "HeatQueued",
            Event::ProcessingStarted { .. } => "ProcessingStarted",
            Event::ProcessingCompleted { .. } => "ProcessingCompleted",
            Event::WarmingStarted { .. } => "WarmingStarted",
            Event::WarmingTimeout { .. } => "WarmingTimeout",
            Event::CasterTurnaround { .. } => "CasterTurnaround",
            Event::TransportRequested { .. } => "TransportRequested",
            Event::CraneAssigned { .. } => "CraneAssigned",
            Event::HeatPickedUp { .. } => "HeatPickedUp",
            Event::HeatDelivered { .. } => "HeatDelivered",
            Event::LadleCarDispatched { .. } => "LadleCarDispatched",
            Event::LadleCarArrived { .. } => "LadleCarArrived",
            Event::TransportStarvation { .. } => "TransportStarvation",
            Event::HeatStranded { .. } => "HeatStranded",
            Event::HeatNonConforming { .. } => "HeatNonConforming",
            Event::HeatCompleted { .. } => "HeatCompleted",
            Event::MetricsSampled { .. } => "MetricsSampled",
        }
    }

    pub fn heat_id(&self) -> Option<&str> {
        match self {
            Event::HeatCreated { heat_id, .. }
            | Event::LadleAssigned { heat_id, .. }
            | Event::HeatQueued { heat_id, .. }
            | Event::ProcessingStarted { heat_id, .. }
            | Event::ProcessingCompleted { heat_id, .. }
            | Event::WarmingStarted { heat_id, .. }
            | Event::WarmingTimeout { heat_id, .. }
            | Event::CasterTurnaround { heat_id, .. }
            | Event::TransportRequested { heat_id, .. }
            | Event::CraneAssigned { heat_id, .. }
            | Event::HeatPickedUp { heat_id, .. }
            | Event::HeatDelivered { heat_id, .. }
            | Event::LadleCarDispatched { heat_id, .. }
            | Event::LadleCarArrived { heat_id, .. }
            | Event::TransportStarvation { heat_id, .. }
            | Event::HeatStranded { heat_id, .. }
            | Event::HeatNonConforming { heat_id, .. }
            | Event::HeatCompleted { heat_id, .. } => Some(heat_id),
            Event::LadleShortage { heat_id, .. } => heat_id.as_deref(),
            _ => None,
        }
    }

    pub fn unit_id(&self) -> Option<&str> {
        match self {
            Event::HeatCreated { unit_id, .. }
            | Event::HeatQueued { unit_id, .. }
            | Event::ProcessingStarted { unit_id, .. }
            | Event::ProcessingCompleted { unit_id, .. }
            | Event::WarmingStarted { unit_id, .. }
            | Event::WarmingTimeout { unit_id, .. }
            | Event::CasterTurnaround { unit_id, .. }
            | Event::HeatDelivered { unit_id, .. } => Some(unit_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn events_for_heat(&self, heat_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.heat_id() == Some(heat_id))
            .collect()
    }

    pub fn events_for_unit(&self, unit_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.unit_id() == Some(unit_id))
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let event = Event::ProcessingStarted {
            time: 12.5,
            heat_id: "heat_00001".to_string(),
            unit_id: "bay1_EAF_1".to_string(),
            duration: 50.0,
        };
        assert_eq!(event.time(), 12.5);
        assert_eq!(event.event_type(), "ProcessingStarted");
        assert_eq!(event.heat_id(), Some("heat_00001"));
        assert_eq!(event.unit_id(), Some("bay1_EAF_1"));
    }

    #[test]
    fn test_event_log_queries() {
        let mut log = EventLog::new();
        assert!(log.is_empty());

        log.log(Event::HeatCreated {
            time: 0.0,
            heat_id: "heat_00001".to_string(),
            grade: "standard".to_string(),
            unit_id: "bay1_EAF_1".to_string(),
        });
        log.log(Event::LadleRetired {
            time: 5.0,
            ladle_id: "ladle_1".to_string(),
            wear: 3,
        });
        log.log(Event::HeatCompleted {
            time: 90.0,
            heat_id: "heat_00001".to_string(),
            cycle_time: 90.0,
        });

        assert_eq!(log.len(), 3);
        assert_eq!(log.events_of_type("LadleRetired").len(), 1);
        assert_eq!(log.events_for_heat("heat_00001").len(), 2);
        assert_eq!(log.events_for_unit("bay1_EAF_1").len(), 1);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = Event::LadleRetired {
            time: 1.0,
            ladle_id: "ladle_1".to_string(),
            wear: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "LadleRetired");
        assert_eq!(json["wear"], 2);
    }
}

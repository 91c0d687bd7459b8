//! Transport requests: moving one heat's ladle from a unit to the next

use crate::models::ladle_car::LadleCarType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStage {
    /// Waiting in a crane queue (intra-bay) or the car queue (inter-bay)
    Pending,
    CarPositioning,
    AwaitingLoadCrane,
    Loading,
    CarTravelling,
    AwaitingUnloadCrane,
    CraneMoving,
    Delivered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportRequest {
    pub id: String,
    pub seq: u64,
    pub heat_id: String,
    pub ladle_id: Option<String>,
    pub from_unit: String,
    pub from_bay: String,
    pub to_unit: String,
    pub to_bay: String,
    pub created_at: f64,
    /// Entry time into the queue it currently waits in
    pub queued_since: f64,
    /// Destination caster risks a flow interruption
    pub urgent: bool,
    /// Car duty able to carry the ladle when the transfer crosses bays
    pub car_type: LadleCarType,
    pub stage: TransferStage,
    pub crane_id: Option<String>,
    pub car_id: Option<String>,
    /// Starvation already counted for this request
    pub starved: bool,
}

impl TransportRequest {
    pub fn is_inter_bay(&self) -> bool {
        self.from_bay != self.to_bay
    }

    /// Waiting in a queue rather than being worked
    pub fn is_waiting(&self) -> bool {
        matches!(
            self.stage,
            TransferStage::Pending
                | TransferStage::AwaitingLoadCrane
                | TransferStage::AwaitingUnloadCrane
        )
    }
}

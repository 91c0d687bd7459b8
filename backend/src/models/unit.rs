//! Production unit model
//!
//! A production unit (EAF, LMF, Degasser or Caster) holds up to `capacity`
//! heats in its occupant set and keeps a FIFO waiting queue in front of it.
//!
//! # Critical Invariants
//!
//! 1. `occupants.len() <= capacity`
//! 2. A heat is never both in the occupant set and in the queue
//! 3. Statistics are accrued before every occupancy change, so time integrals
//!    are exact

use crate::config::ConfigError;
use crate::core::EventId;
use crate::units::caster::CasterSequence;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/// Closed set of processing unit kinds, in plant order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    #[serde(rename = "EAF")]
    Eaf,
    #[serde(rename = "LMF")]
    Lmf,
    Degasser,
    Caster,
}

impl UnitKind {
    pub const ALL: [UnitKind; 4] = [
        UnitKind::Eaf,
        UnitKind::Lmf,
        UnitKind::Degasser,
        UnitKind::Caster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Eaf => "EAF",
            UnitKind::Lmf => "LMF",
            UnitKind::Degasser => "Degasser",
            UnitKind::Caster => "Caster",
        }
    }

    /// Position in the fixed EAF → LMF → Degasser → Caster order
    pub fn rank(&self) -> u8 {
        match self {
            UnitKind::Eaf => 0,
            UnitKind::Lmf => 1,
            UnitKind::Degasser => 2,
            UnitKind::Caster => 3,
        }
    }

    /// Process time used when neither the unit nor the grade sets one
    pub fn default_process_time(&self) -> f64 {
        match self {
            UnitKind::Eaf => 50.0,
            UnitKind::Lmf => 30.0,
            UnitKind::Degasser => 40.0,
            UnitKind::Caster => 20.0,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eaf" => Ok(UnitKind::Eaf),
            "lmf" => Ok(UnitKind::Lmf),
            "degasser" => Ok(UnitKind::Degasser),
            "caster" => Ok(UnitKind::Caster),
            _ => Err(ConfigError::UnknownUnitType(s.to_string())),
        }
    }
}

/// Coarse state derived from occupants, queue and constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitState {
    Idle,
    Queued,
    Processing,
    Blocked,
}

/// Why a unit with free capacity cannot start its head-of-queue heat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockReason {
    AwaitingLadle,
    Turnaround,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OccupantPhase {
    Processing { ends_at: f64, event: EventId },
    Warming { since: f64, timeout_event: EventId },
    AwaitingPickup { since: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occupant {
    pub heat_id: String,
    pub phase: OccupantPhase,
}

/// Cumulative per-unit statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Slot-minutes spent processing
    pub busy_time: f64,
    /// Slot-minutes held by warming or awaiting-pickup heats
    pub blocked_time: f64,
    /// Integral of queue length over time
    pub queue_area: f64,
    pub heats_started: u64,
    pub heats_processed: u64,
    /// Sum of queue waits of started heats
    pub wait_time_sum: f64,
}

/// A processing unit placed in a bay
#[derive(Debug, Clone)]
pub struct ProductionUnit {
    id: String,
    kind: UnitKind,
    bay: String,
    x: f64,
    y: f64,
    capacity: usize,
    occupants: Vec<Occupant>,
    queue: VecDeque<String>,
    inbound: usize,
    blocked: Option<BlockReason>,
    turnaround_until: Option<f64>,
    sequence: CasterSequence,
    stats: UnitStats,
    last_accrual: f64,
}

impl ProductionUnit {
    pub fn new(id: String, kind: UnitKind, bay: String, x: f64, y: f64, capacity: usize) -> Self {
        Self {
            id,
            kind,
            bay,
            x,
            y,
            capacity,
            occupants: Vec::new(),
            queue: VecDeque::new(),
            inbound: 0,
            blocked: None,
            turnaround_until: None,
            sequence: CasterSequence::default(),
            stats: UnitStats::default(),
            last_accrual: 0.0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn bay(&self) -> &str {
        &self.bay
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn occupants(&self) -> &[Occupant] {
        &self.occupants
    }

    pub fn queue(&self) -> &VecDeque<String> {
        &self.queue
    }

    pub fn inbound(&self) -> usize {
        self.inbound
    }

    pub fn blocked_reason(&self) -> Option<BlockReason> {
        self.blocked
    }

    pub fn turnaround_until(&self) -> Option<f64> {
        self.turnaround_until
    }

    pub fn sequence(&self) -> &CasterSequence {
        &self.sequence
    }

    pub fn sequence_mut(&mut self) -> &mut CasterSequence {
        &mut self.sequence
    }

    pub fn stats(&self) -> &UnitStats {
        &self.stats
    }

    pub fn state(&self) -> UnitState {
        let active = self
            .occupants
            .iter()
            .any(|o| !matches!(o.phase, OccupantPhase::AwaitingPickup { .. }));
        if active {
            UnitState::Processing
        } else if self.blocked.is_some() || self.turnaround_until.is_some() {
            UnitState::Blocked
        } else if !self.queue.is_empty() {
            UnitState::Queued
        } else {
            UnitState::Idle
        }
    }

    /// Occupants + queue + inbound transfers
    pub fn load(&self) -> usize {
        self.occupants.len() + self.queue.len() + self.inbound
    }

    pub fn free_slots(&self) -> usize {
        self.capacity.saturating_sub(self.occupants.len())
    }

    /// No room for another heat without waiting
    pub fn is_saturated(&self) -> bool {
        self.load() >= self.capacity || self.turnaround_until.is_some()
    }

    /// Empty and not in turnaround
    pub fn is_idle(&self) -> bool {
        self.load() == 0 && self.turnaround_until.is_none()
    }

    pub fn occupant(&self, heat_id: &str) -> Option<&Occupant> {
        self.occupants.iter().find(|o| o.heat_id == heat_id)
    }

    pub fn is_queued(&self, heat_id: &str) -> bool {
        self.queue.iter().any(|h| h == heat_id)
    }

    /// Minutes until the earliest processing slot finishes
    pub fn next_free_in(&self, now: f64) -> Option<f64> {
        self.occupants
            .iter()
            .filter_map(|o| match o.phase {
                OccupantPhase::Processing { ends_at, .. } => Some((ends_at - now).max(0.0)),
                _ => None,
            })
            .min_by(|a, b| a.total_cmp(b))
    }

    // ------------------------------------------------------------------
    // Mutation (always accrues first)
    // ------------------------------------------------------------------

    /// Integrate busy, blocked and queue time up to `now`
    pub fn accrue(&mut self, now: f64) {
        let dt = now - self.last_accrual;
        if dt > 0.0 {
            let (processing, holding) = self.slot_counts();
            self.stats.busy_time += processing as f64 * dt;
            self.stats.blocked_time += holding as f64 * dt;
            self.stats.queue_area += self.queue.len() as f64 * dt;
            self.last_accrual = now;
        }
    }

    fn slot_counts(&self) -> (usize, usize) {
        let processing = self
            .occupants
            .iter()
            .filter(|o| matches!(o.phase, OccupantPhase::Processing { .. }))
            .count();
        (processing, self.occupants.len() - processing)
    }

    pub fn busy_time_at(&self, now: f64) -> f64 {
        let dt = (now - self.last_accrual).max(0.0);
        self.stats.busy_time + self.slot_counts().0 as f64 * dt
    }

    pub fn queue_area_at(&self, now: f64) -> f64 {
        let dt = (now - self.last_accrual).max(0.0);
        self.stats.queue_area + self.queue.len() as f64 * dt
    }

    pub fn enqueue(&mut self, heat_id: String, now: f64) {
        self.accrue(now);
        self.queue.push_back(heat_id);
    }

    pub fn pop_queue_front(&mut self, now: f64) -> Option<String> {
        self.accrue(now);
        self.queue.pop_front()
    }

    pub fn queue_front(&self) -> Option<&String> {
        self.queue.front()
    }

    /// Put a heat into a processing slot; the caller has checked capacity
    pub fn start_occupant(&mut self, heat_id: String, phase: OccupantPhase, waited: f64, now: f64) {
        self.accrue(now);
        self.stats.heats_started += 1;
        self.stats.wait_time_sum += waited.max(0.0);
        self.occupants.push(Occupant { heat_id, phase });
    }

    /// Replace an occupant's phase, returning the previous one
    pub fn set_phase(&mut self, heat_id: &str, phase: OccupantPhase, now: f64) -> Option<OccupantPhase> {
        self.accrue(now);
        let occupant = self.occupants.iter_mut().find(|o| o.heat_id == heat_id)?;
        Some(std::mem::replace(&mut occupant.phase, phase))
    }

    pub fn remove_occupant(&mut self, heat_id: &str, now: f64) -> Option<Occupant> {
        self.accrue(now);
        let index = self.occupants.iter().position(|o| o.heat_id == heat_id)?;
        Some(self.occupants.remove(index))
    }

    pub fn record_processed(&mut self) {
        self.stats.heats_processed += 1;
    }

    pub fn add_inbound(&mut self) {
        self.inbound += 1;
    }

    pub fn remove_inbound(&mut self) {
        self.inbound = self.inbound.saturating_sub(1);
    }

    pub fn set_blocked(&mut self, reason: Option<BlockReason>) {
        self.blocked = reason;
    }

    pub fn begin_turnaround(&mut self, until: f64) {
        self.turnaround_until = Some(until);
        self.blocked = Some(BlockReason::Turnaround);
    }

    pub fn end_turnaround(&mut self) {
        self.turnaround_until = None;
        if self.blocked == Some(BlockReason::Turnaround) {
            self.blocked = None;
        }
    }
}

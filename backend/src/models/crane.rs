//! Overhead cranes
//!
//! A crane runs on a rail along its bay. While it works a task, it claims the
//! span between its own position, the pickup point and the drop-off point;
//! no two busy cranes in a bay may claim intersecting spans.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CraneStatus {
    Idle,
    Moving,
    Lifting,
    Lowering,
}

/// Timeline of one pick-and-place move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CraneTask {
    pub request_id: String,
    pub from_x: f64,
    pub to_x: f64,
    pub lift_starts: f64,
    pub picked_up_at: f64,
    pub lower_starts: f64,
    pub dropped_at: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crane {
    id: String,
    bay: String,
    position: f64,
    range: Option<(f64, f64)>,
    task: Option<CraneTask>,
    busy_time: f64,
    busy_since: Option<f64>,
    tasks_completed: u64,
}

/// Closed-interval intersection
pub fn ranges_overlap(a: (f64, f64), b: (f64, f64)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

impl Crane {
    pub fn new(id: String, bay: String, position: f64) -> Self {
        Self {
            id,
            bay,
            position,
            range: None,
            task: None,
            busy_time: 0.0,
            busy_since: None,
            tasks_completed: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bay(&self) -> &str {
        &self.bay
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        self.range
    }

    pub fn task(&self) -> Option<&CraneTask> {
        self.task.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.task.is_none()
    }

    pub fn tasks_completed(&self) -> u64 {
        self.tasks_completed
    }

    /// Span this crane would claim to move a ladle from `from_x` to `to_x`
    pub fn span_for(&self, from_x: f64, to_x: f64) -> (f64, f64) {
        let lo = self.position.min(from_x).min(to_x);
        let hi = self.position.max(from_x).max(to_x);
        (lo, hi)
    }

    pub fn status_at(&self, now: f64) -> CraneStatus {
        match &self.task {
            None => CraneStatus::Idle,
            Some(task) if now < task.lift_starts => CraneStatus::Moving,
            Some(task) if now < task.picked_up_at => CraneStatus::Lifting,
            Some(task) if now < task.lower_starts => CraneStatus::Moving,
            Some(_) => CraneStatus::Lowering,
        }
    }

    pub fn assign(&mut self, task: CraneTask, now: f64) {
        self.range = Some(self.span_for(task.from_x, task.to_x));
        self.task = Some(task);
        self.busy_since = Some(now);
    }

    /// The ladle is hooked: the crane now sits over the pickup point
    pub fn pick_up(&mut self) {
        if let Some(task) = &self.task {
            self.position = task.from_x;
        }
    }

    /// Drop the ladle and go idle at the drop-off point
    pub fn finish(&mut self, now: f64) -> Option<CraneTask> {
        let task = self.task.take()?;
        self.position = task.to_x;
        self.range = None;
        if let Some(since) = self.busy_since.take() {
            self.busy_time += now - since;
        }
        self.tasks_completed += 1;
        Some(task)
    }

    pub fn busy_time_at(&self, now: f64) -> f64 {
        self.busy_time + self.busy_since.map(|s| (now - s).max(0.0)).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> CraneTask {
        CraneTask {
            request_id: "req_00001".to_string(),
            from_x: 20.0,
            to_x: 60.0,
            lift_starts: 1.0,
            picked_up_at: 4.0,
            lower_starts: 5.0,
            dropped_at: 8.0,
        }
    }

    #[test]
    fn test_status_follows_task_timeline() {
        let mut crane = Crane::new("bay1_crane_1".to_string(), "bay1".to_string(), 10.0);
        crane.assign(task(), 0.0);
        assert_eq!(crane.range(), Some((10.0, 60.0)));
        assert_eq!(crane.status_at(0.5), CraneStatus::Moving);
        assert_eq!(crane.status_at(2.0), CraneStatus::Lifting);
        assert_eq!(crane.status_at(4.5), CraneStatus::Moving);
        assert_eq!(crane.status_at(6.0), CraneStatus::Lowering);

        crane.pick_up();
        assert_eq!(crane.position(), 20.0);
        crane.finish(8.0);
        assert_eq!(crane.position(), 60.0);
        assert!(crane.is_idle());
        assert_eq!(crane.busy_time_at(100.0), 8.0);
    }

    #[test]
    fn test_ranges_overlap_closed() {
        assert!(ranges_overlap((0.0, 10.0), (10.0, 20.0)));
        assert!(!ranges_overlap((0.0, 9.9), (10.0, 20.0)));
    }
}
